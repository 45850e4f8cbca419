//! Generation session model.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::document::NodeHandle;

/// Opaque token identifying one generation session.
///
/// Backed by a random UUID; a token is never reused once issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Issues a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of the document/entity a session targets (e.g. an assignment).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Lifecycle status of a generation session.
///
/// Sessions move `Idle → AwaitingChannel → Streaming → {Completed, Failed}`
/// and then back to `Idle` once their terminal cleanup has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    #[default]
    Idle,
    AwaitingChannel,
    Streaming,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Whether a session in this status still accepts events.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::AwaitingChannel | Self::Streaming)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingChannel => "awaiting-channel",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One generation attempt against a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Token stamped on every request and event of this attempt.
    pub correlation_id: CorrelationId,
    /// Document/entity the session targets.
    pub subject_id: SubjectId,
    /// Handle of the originating request node. Generated units are inserted
    /// right after it; its offset is looked up again on every use.
    pub anchor: NodeHandle,
    pub status: SessionStatus,
    /// Session start time (RFC3339 format)
    pub started_at: String,
}

impl Session {
    pub fn new(correlation_id: CorrelationId, subject_id: SubjectId, anchor: NodeHandle) -> Self {
        Self {
            correlation_id,
            subject_id,
            anchor,
            status: SessionStatus::AwaitingChannel,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
