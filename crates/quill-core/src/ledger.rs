//! Block ledger.
//!
//! Per-session, append-only record of generated units keyed by index. The
//! ledger enforces strict sequential admission: an announce is accepted only
//! for the next expected index, and only once its predecessor has a scaffold
//! in the document. Anything else is rejected and dropped, never buffered.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::document::{BlockKind, NodeHandle};

/// Materialization state of one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitState {
    /// Announced and admitted; no scaffold yet.
    Pending,
    /// A scaffold occupies the unit's slot.
    PlaceholderInserted { handle: NodeHandle },
    /// Real content replaced the scaffold (same handle).
    Finalized {
        handle: NodeHandle,
        payload: serde_json::Value,
    },
    /// The user removed the unit's node before its content landed. Takes no
    /// room in the document and does not count as output.
    Vanished,
}

/// One generated unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub index: usize,
    pub kind: BlockKind,
    pub state: UnitState,
}

impl Unit {
    /// Document handle of the unit's node, once it has one.
    pub fn handle(&self) -> Option<NodeHandle> {
        match &self.state {
            UnitState::Pending | UnitState::Vanished => None,
            UnitState::PlaceholderInserted { handle } | UnitState::Finalized { handle, .. } => {
                Some(*handle)
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, UnitState::Pending)
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, UnitState::Finalized { .. })
    }
}

/// Why the ledger refused an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unit {index} was already announced")]
    Duplicate { index: usize },

    #[error("announce for unit {got} arrived while expecting {expected}")]
    OutOfOrder { expected: usize, got: usize },

    #[error("unit {index} has no scaffold yet")]
    PredecessorPending { index: usize },

    #[error("finalize for unit {index} without an accepted announce")]
    Missing { index: usize },

    #[error("unit {index} is still pending")]
    NotPlaceholder { index: usize },

    #[error("unit {index} is already finalized")]
    AlreadyFinalized { index: usize },

    #[error("unit {index} was removed from the document")]
    Vanished { index: usize },
}

/// Verdict of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected(Rejection),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Ordered index → unit map plus the next index an announce must carry.
#[derive(Debug, Default)]
pub struct BlockLedger {
    units: BTreeMap<usize, Unit>,
    next_expected_index: usize,
}

impl BlockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits an announce for `index`.
    ///
    /// On acceptance the unit is recorded as pending and the expected index
    /// advances; the caller moves it to placeholder-inserted with
    /// [`mark_placeholder`](Self::mark_placeholder) once its scaffold exists.
    pub fn admit_announce(&mut self, index: usize, kind: BlockKind) -> Admission {
        let verdict = if index < self.next_expected_index {
            Err(Rejection::Duplicate { index })
        } else if index > self.next_expected_index {
            Err(Rejection::OutOfOrder {
                expected: self.next_expected_index,
                got: index,
            })
        } else if let Some(previous) = index.checked_sub(1).and_then(|i| self.units.get(&i))
            && previous.is_pending()
        {
            Err(Rejection::PredecessorPending {
                index: previous.index,
            })
        } else {
            Ok(())
        };

        match verdict {
            Ok(()) => {
                self.units.insert(
                    index,
                    Unit {
                        index,
                        kind,
                        state: UnitState::Pending,
                    },
                );
                self.next_expected_index += 1;
                Admission::Accepted
            }
            Err(rejection) => {
                tracing::warn!(
                    target: "quill::stream",
                    "[BlockLedger] Dropping announce: {}",
                    rejection
                );
                Admission::Rejected(rejection)
            }
        }
    }

    /// Records that the scaffold for `index` now exists as `handle`.
    ///
    /// Returns false if the unit is unknown or no longer pending.
    pub fn mark_placeholder(&mut self, index: usize, handle: NodeHandle) -> bool {
        match self.units.get_mut(&index) {
            Some(unit) if unit.is_pending() => {
                unit.state = UnitState::PlaceholderInserted { handle };
                true
            }
            _ => false,
        }
    }

    /// Admits real content for `index`.
    pub fn admit_finalize(&mut self, index: usize, payload: serde_json::Value) -> Admission {
        let Some(unit) = self.units.get_mut(&index) else {
            let rejection = Rejection::Missing { index };
            tracing::warn!(target: "quill::stream", "[BlockLedger] Dropping finalize: {}", rejection);
            return Admission::Rejected(rejection);
        };

        match unit.state {
            UnitState::PlaceholderInserted { handle } => {
                unit.state = UnitState::Finalized { handle, payload };
                Admission::Accepted
            }
            UnitState::Pending => {
                let rejection = Rejection::NotPlaceholder { index };
                tracing::warn!(target: "quill::stream", "[BlockLedger] Dropping finalize: {}", rejection);
                Admission::Rejected(rejection)
            }
            UnitState::Finalized { .. } => {
                let rejection = Rejection::AlreadyFinalized { index };
                tracing::warn!(target: "quill::stream", "[BlockLedger] Dropping finalize: {}", rejection);
                Admission::Rejected(rejection)
            }
            UnitState::Vanished => {
                let rejection = Rejection::Vanished { index };
                tracing::warn!(target: "quill::stream", "[BlockLedger] Dropping finalize: {}", rejection);
                Admission::Rejected(rejection)
            }
        }
    }

    /// Records that the unit's node is gone from the document.
    ///
    /// Returns false if the unit is unknown or never had a node.
    pub fn mark_vanished(&mut self, index: usize) -> bool {
        match self.units.get_mut(&index) {
            Some(unit) if unit.handle().is_some() => {
                unit.state = UnitState::Vanished;
                true
            }
            _ => false,
        }
    }

    /// Units in index order.
    pub fn all_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn unit(&self, index: usize) -> Option<&Unit> {
        self.units.get(&index)
    }

    pub fn handle_of(&self, index: usize) -> Option<NodeHandle> {
        self.units.get(&index).and_then(Unit::handle)
    }

    pub fn has_finalized_any(&self) -> bool {
        self.units.values().any(Unit::is_finalized)
    }

    pub fn finalized_count(&self) -> usize {
        self.units.values().filter(|u| u.is_finalized()).count()
    }

    pub fn next_expected_index(&self) -> usize {
        self.next_expected_index
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
