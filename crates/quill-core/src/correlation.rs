//! Correlation registry.
//!
//! Issues one correlation token per generation session and answers, for every
//! inbound event, whether the token it carries is the one currently open for
//! its subject. Events from closed, superseded, or foreign sessions are never
//! routed further.

use std::collections::HashMap;

use crate::session::{CorrelationId, SubjectId};

/// Tracks the single open correlation token per subject.
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    open: HashMap<SubjectId, CorrelationId>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `subject_id` and returns its fresh token.
    ///
    /// A token already open for the subject is superseded: from this call on
    /// it is no longer current.
    pub fn open(&mut self, subject_id: &SubjectId) -> CorrelationId {
        let correlation_id = CorrelationId::generate();
        if let Some(previous) = self.open.insert(subject_id.clone(), correlation_id) {
            tracing::debug!(
                target: "quill::stream",
                "[CorrelationRegistry] {} superseded by {} for subject {}",
                previous,
                correlation_id,
                subject_id
            );
        }
        correlation_id
    }

    /// Returns true only if `correlation_id` is the open token for `subject_id`.
    pub fn is_current(&self, correlation_id: &CorrelationId, subject_id: &SubjectId) -> bool {
        self.open.get(subject_id) == Some(correlation_id)
    }

    /// Closes `correlation_id`. Returns whether it was open.
    pub fn close(&mut self, correlation_id: &CorrelationId) -> bool {
        let subject = self
            .open
            .iter()
            .find(|(_, open)| *open == correlation_id)
            .map(|(subject, _)| subject.clone());

        match subject {
            Some(subject) => {
                self.open.remove(&subject);
                true
            }
            None => false,
        }
    }

    /// The open token for `subject_id`, if any.
    pub fn current(&self, subject_id: &SubjectId) -> Option<CorrelationId> {
        self.open.get(subject_id).copied()
    }

    /// Number of subjects with an open session.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_current() {
        let mut registry = CorrelationRegistry::new();
        let subject = SubjectId::new("assignment-1");
        let id = registry.open(&subject);

        assert!(registry.is_current(&id, &subject));
        assert_eq!(registry.current(&subject), Some(id));
    }

    #[test]
    fn test_foreign_subject_is_not_current() {
        let mut registry = CorrelationRegistry::new();
        let a = SubjectId::new("a");
        let b = SubjectId::new("b");
        let id_a = registry.open(&a);
        let id_b = registry.open(&b);

        assert!(!registry.is_current(&id_a, &b));
        assert!(!registry.is_current(&id_b, &a));
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn test_reopen_supersedes_previous_token() {
        let mut registry = CorrelationRegistry::new();
        let subject = SubjectId::new("a");
        let first = registry.open(&subject);
        let second = registry.open(&subject);

        assert!(!registry.is_current(&first, &subject));
        assert!(registry.is_current(&second, &subject));
        assert_eq!(registry.open_count(), 1);
        // Closing the stale token must not close the live one.
        assert!(!registry.close(&first));
        assert!(registry.is_current(&second, &subject));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut registry = CorrelationRegistry::new();
        let subject = SubjectId::new("a");
        let id = registry.open(&subject);

        assert!(registry.close(&id));
        assert!(!registry.close(&id));
        assert!(!registry.is_current(&id, &subject));
        assert_eq!(registry.current(&subject), None);
    }
}
