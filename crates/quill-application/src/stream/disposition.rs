use quill_core::ledger::Rejection;
use quill_core::session::StreamOutcome;

/// What the controller did with one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDisposition {
    /// The event changed ledger and document state.
    Applied,
    /// The event was dropped; nothing changed.
    Ignored(IgnoreReason),
    /// The event ended the session.
    Terminated(StreamOutcome),
}

impl EventDisposition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }

    pub fn outcome(&self) -> Option<&StreamOutcome> {
        match self {
            Self::Terminated(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Why an event was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Correlation id is not the open one for the event's subject.
    Stale,
    /// The ledger refused the announce/finalize.
    Rejected(Rejection),
    /// The unit's scaffold was removed from the document before it finalized.
    ScaffoldMissing,
}
