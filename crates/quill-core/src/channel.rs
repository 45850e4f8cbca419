//! Generation channel interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::GenerationRequest;

/// Outbound half of the duplex channel to the producer.
///
/// Inbound [`StreamEvent`](crate::session::StreamEvent)s are delivered
/// separately to whatever drives the stream controller. Reconnecting
/// re-establishes transport only; it never resumes a session, so a stalled
/// session keeps waiting for events or is cancelled.
#[async_trait]
pub trait GenerationChannel: Send + Sync {
    /// Establishes the connection. Connecting an open channel is a no-op.
    async fn connect(&self) -> Result<()>;

    /// Sends a generation request to the producer.
    async fn send(&self, request: GenerationRequest) -> Result<()>;

    /// Tears the connection down.
    async fn disconnect(&self) -> Result<()>;

    /// Drops and re-establishes the connection.
    async fn reconnect(&self) -> Result<()> {
        self.disconnect().await?;
        self.connect().await
    }

    fn is_connected(&self) -> bool;
}
