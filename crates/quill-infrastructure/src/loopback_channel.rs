//! In-process generation channel.
//!
//! `LoopbackChannel` is the client half: it implements [`GenerationChannel`]
//! and hands outbound requests to a `LoopbackProducer` over a tokio mpsc
//! channel. The producer half emits [`StreamEvent`]s back into an mpsc
//! channel that the event-loop driver reads. Used by tests and by the replay
//! CLI; a networked transport would implement the same trait.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

use quill_core::channel::GenerationChannel;
use quill_core::error::{QuillError, Result};
use quill_core::session::{GenerationRequest, StreamEvent};

pub struct LoopbackChannel {
    requests: mpsc::UnboundedSender<GenerationRequest>,
    connected: AtomicBool,
    connects: AtomicUsize,
    refuse_connect: AtomicBool,
}

/// Producer half of a loopback pair.
pub struct LoopbackProducer {
    requests: mpsc::UnboundedReceiver<GenerationRequest>,
    events: mpsc::Sender<StreamEvent>,
}

/// Creates a connected client/producer pair plus the inbound event receiver.
///
/// `event_buffer` bounds the number of undelivered events.
pub fn loopback(
    event_buffer: usize,
) -> (LoopbackChannel, LoopbackProducer, mpsc::Receiver<StreamEvent>) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(event_buffer);

    let channel = LoopbackChannel {
        requests: request_tx,
        connected: AtomicBool::new(false),
        connects: AtomicUsize::new(0),
        refuse_connect: AtomicBool::new(false),
    };
    let producer = LoopbackProducer {
        requests: request_rx,
        events: event_tx,
    };
    (channel, producer, event_rx)
}

impl LoopbackChannel {
    /// Number of successful connects so far (reconnects included).
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Makes subsequent connects fail, to exercise the channel-failure path.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connect.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationChannel for LoopbackChannel {
    async fn connect(&self) -> Result<()> {
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(QuillError::channel("connection refused"));
        }
        if self.requests.is_closed() {
            return Err(QuillError::channel("producer is gone"));
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(target: "quill::stream", "[LoopbackChannel] Connected");
        }
        Ok(())
    }

    async fn send(&self, request: GenerationRequest) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QuillError::channel("not connected"));
        }
        self.requests
            .send(request)
            .map_err(|_| QuillError::channel("producer is gone"))
    }

    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::debug!(target: "quill::stream", "[LoopbackChannel] Disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl LoopbackProducer {
    /// Waits for the next request from the client.
    pub async fn next_request(&mut self) -> Option<GenerationRequest> {
        self.requests.recv().await
    }

    /// Takes a request if one is already queued.
    pub fn try_next_request(&mut self) -> Option<GenerationRequest> {
        self.requests.try_recv().ok()
    }

    /// Emits an event towards the client.
    pub async fn emit(&self, event: StreamEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| QuillError::channel("client stopped listening"))
    }

    /// A cloneable sender for emitting from other tasks.
    pub fn event_sender(&self) -> mpsc::Sender<StreamEvent> {
        self.events.clone()
    }
}
