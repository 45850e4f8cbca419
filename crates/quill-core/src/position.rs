//! Position resolver.
//!
//! Insert offsets are a pure function of the live document and the ledger:
//! the end of the anchor node plus the footprint of every earlier unit. The
//! result is never cached, because finalized units change size and the user
//! may edit the document between two calls.

use crate::document::{DocumentModel, NodeHandle, SCAFFOLD_FOOTPRINT};
use crate::ledger::{BlockLedger, UnitState};

/// Offset at which unit `index` must be inserted.
///
/// Returns `None` when the anchor node no longer exists; the caller must then
/// abort without touching the document.
pub fn resolve_insert_position<D>(
    document: &D,
    anchor: NodeHandle,
    ledger: &BlockLedger,
    index: usize,
) -> Option<usize>
where
    D: DocumentModel + ?Sized,
{
    let mut offset = document.position_after(anchor)?;

    for unit in ledger.all_units().take_while(|u| u.index < index) {
        // Nodes the user deleted no longer take up room.
        offset += match &unit.state {
            UnitState::Pending | UnitState::Vanished => 0,
            UnitState::PlaceholderInserted { handle } => document
                .node_size(*handle)
                .map(|_| SCAFFOLD_FOOTPRINT)
                .unwrap_or(0),
            UnitState::Finalized { handle, .. } => document.node_size(*handle).unwrap_or(0),
        };
    }

    Some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockKind, NodeContent, Transaction, TransactionReceipt};
    use crate::error::DocumentError;
    use crate::session::SubjectId;
    use serde_json::json;
    use std::collections::HashMap;

    /// Document stub with hand-set positions and sizes.
    #[derive(Default)]
    struct StubDocument {
        nodes: HashMap<NodeHandle, (usize, usize)>,
    }

    impl StubDocument {
        fn with(mut self, handle: u64, position: usize, size: usize) -> Self {
            self.nodes.insert(NodeHandle::new(handle), (position, size));
            self
        }
    }

    impl DocumentModel for StubDocument {
        fn size(&self) -> usize {
            self.nodes.values().map(|(p, s)| p + s).max().unwrap_or(0)
        }
        fn node_position(&self, handle: NodeHandle) -> Option<usize> {
            self.nodes.get(&handle).map(|(p, _)| *p)
        }
        fn node_size(&self, handle: NodeHandle) -> Option<usize> {
            self.nodes.get(&handle).map(|(_, s)| *s)
        }
        fn node_at(&self, _offset: usize) -> Option<NodeHandle> {
            None
        }
        fn content(&self, _handle: NodeHandle) -> Option<&NodeContent> {
            None
        }
        fn scaffolds(&self, _subject: &SubjectId) -> Vec<(usize, NodeHandle)> {
            Vec::new()
        }
        fn apply(&mut self, _tx: Transaction) -> Result<TransactionReceipt, DocumentError> {
            Ok(TransactionReceipt::default())
        }
    }

    fn kind() -> BlockKind {
        BlockKind::new("paragraph")
    }

    #[test]
    fn test_first_unit_goes_right_after_anchor() {
        let doc = StubDocument::default().with(1, 10, 6);
        let ledger = BlockLedger::new();

        assert_eq!(resolve_insert_position(&doc, NodeHandle::new(1), &ledger, 0), Some(16));
    }

    #[test]
    fn test_placeholders_count_fixed_footprint() {
        let doc = StubDocument::default()
            .with(1, 0, 4)
            .with(2, 4, SCAFFOLD_FOOTPRINT)
            .with(3, 4 + SCAFFOLD_FOOTPRINT, SCAFFOLD_FOOTPRINT);
        let mut ledger = BlockLedger::new();
        ledger.admit_announce(0, kind());
        ledger.mark_placeholder(0, NodeHandle::new(2));
        ledger.admit_announce(1, kind());
        ledger.mark_placeholder(1, NodeHandle::new(3));

        assert_eq!(
            resolve_insert_position(&doc, NodeHandle::new(1), &ledger, 2),
            Some(4 + 2 * SCAFFOLD_FOOTPRINT)
        );
    }

    #[test]
    fn test_finalized_units_use_measured_size() {
        let doc = StubDocument::default().with(1, 0, 4).with(2, 4, 13);
        let mut ledger = BlockLedger::new();
        ledger.admit_announce(0, kind());
        ledger.mark_placeholder(0, NodeHandle::new(2));
        ledger.admit_finalize(0, json!("eleven char"));

        assert_eq!(resolve_insert_position(&doc, NodeHandle::new(1), &ledger, 1), Some(17));
    }

    #[test]
    fn test_anchor_moves_with_document() {
        let ledger = BlockLedger::new();
        let before = StubDocument::default().with(1, 0, 4);
        let after_edit = StubDocument::default().with(1, 25, 4);

        assert_eq!(resolve_insert_position(&before, NodeHandle::new(1), &ledger, 0), Some(4));
        assert_eq!(resolve_insert_position(&after_edit, NodeHandle::new(1), &ledger, 0), Some(29));
    }

    #[test]
    fn test_missing_anchor_has_no_position() {
        let doc = StubDocument::default();
        let ledger = BlockLedger::new();

        assert_eq!(resolve_insert_position(&doc, NodeHandle::new(1), &ledger, 0), None);
    }

    #[test]
    fn test_deleted_finalized_unit_has_no_footprint() {
        let doc = StubDocument::default().with(1, 0, 4);
        let mut ledger = BlockLedger::new();
        ledger.admit_announce(0, kind());
        ledger.mark_placeholder(0, NodeHandle::new(2));
        ledger.admit_finalize(0, json!("gone"));

        assert_eq!(resolve_insert_position(&doc, NodeHandle::new(1), &ledger, 1), Some(4));
    }

    #[test]
    fn test_deleted_placeholder_has_no_footprint() {
        // Scaffold 2 was removed by the user, scaffold 3 is still there.
        let doc = StubDocument::default().with(1, 0, 4).with(3, 4, SCAFFOLD_FOOTPRINT);
        let mut ledger = BlockLedger::new();
        ledger.admit_announce(0, kind());
        ledger.mark_placeholder(0, NodeHandle::new(2));
        ledger.admit_announce(1, kind());
        ledger.mark_placeholder(1, NodeHandle::new(3));

        assert_eq!(
            resolve_insert_position(&doc, NodeHandle::new(1), &ledger, 2),
            Some(4 + SCAFFOLD_FOOTPRINT)
        );
    }
}
