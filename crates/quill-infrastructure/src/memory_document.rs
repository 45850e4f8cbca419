//! In-memory document.
//!
//! A flat sequence of top-level nodes, each with a stable handle. Node sizes
//! follow the structured-editor convention: a text-bearing node occupies its
//! character count plus an open and a close position, a scaffold occupies
//! [`SCAFFOLD_FOOTPRINT`].
//!
//! Transactions are staged on a copy of the node list and swapped in only
//! when every step succeeded, so a failed transaction leaves nothing behind.

use serde::Serialize;

use quill_core::document::{
    DocumentModel, NodeContent, NodeHandle, SCAFFOLD_FOOTPRINT, Step, Transaction,
    TransactionReceipt,
};
use quill_core::error::DocumentError;
use quill_core::session::SubjectId;

#[derive(Debug, Clone, PartialEq)]
struct Node {
    handle: NodeHandle,
    content: NodeContent,
}

/// Serializable view of one node, used for rendering and inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub handle: NodeHandle,
    pub position: usize,
    pub size: usize,
    pub content: NodeContent,
}

#[derive(Debug, Default)]
pub struct InMemoryDocument {
    nodes: Vec<Node>,
    next_handle: u64,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // User edits
    // =========================================================================

    /// Appends a text node and returns its handle.
    pub fn push_text(&mut self, text: impl Into<String>) -> NodeHandle {
        let content = NodeContent::Text { text: text.into() };
        self.push(content)
    }

    /// Appends a generation request node and returns its handle.
    pub fn push_request(&mut self, subject_id: SubjectId, prompt: impl Into<String>) -> NodeHandle {
        let content = NodeContent::Request {
            subject_id,
            prompt: prompt.into(),
        };
        self.push(content)
    }

    /// Inserts a text node immediately before `handle`.
    pub fn insert_text_before(
        &mut self,
        handle: NodeHandle,
        text: impl Into<String>,
    ) -> Result<NodeHandle, DocumentError> {
        let offset = self
            .node_position(handle)
            .ok_or(DocumentError::NodeNotFound {
                handle: handle.raw(),
            })?;
        let receipt = self.apply(Transaction::new().insert(offset, NodeContent::Text { text: text.into() }))?;
        Ok(receipt.inserted[0])
    }

    /// Replaces the text of a text node.
    pub fn edit_text(&mut self, handle: NodeHandle, text: impl Into<String>) -> Result<(), DocumentError> {
        self.apply(Transaction::new().replace(handle, NodeContent::Text { text: text.into() }))?;
        Ok(())
    }

    pub fn delete_node(&mut self, handle: NodeHandle) -> Result<(), DocumentError> {
        self.apply(Transaction::new().delete(handle))?;
        Ok(())
    }

    fn push(&mut self, content: NodeContent) -> NodeHandle {
        let handle = self.allocate_handle();
        self.nodes.push(Node { handle, content });
        handle
    }

    fn allocate_handle(&mut self) -> NodeHandle {
        self.next_handle += 1;
        NodeHandle::new(self.next_handle)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node contents in document order.
    pub fn contents(&self) -> Vec<&NodeContent> {
        self.nodes.iter().map(|n| &n.content).collect()
    }

    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        let mut position = 0;
        self.nodes
            .iter()
            .map(|node| {
                let size = measure(&node.content);
                let snapshot = NodeSnapshot {
                    handle: node.handle,
                    position,
                    size,
                    content: node.content.clone(),
                };
                position += size;
                snapshot
            })
            .collect()
    }

    /// One line per node, for terminal output.
    pub fn render(&self) -> String {
        self.nodes
            .iter()
            .map(|node| match &node.content {
                NodeContent::Text { text } => text.clone(),
                NodeContent::Request { prompt, .. } => format!("[request] {}", prompt),
                NodeContent::Scaffold { index, kind, .. } => {
                    format!("[generating {} #{}]", kind, index)
                }
                NodeContent::Block { kind, payload } => {
                    format!("<{}> {}", kind, rendered_text(payload))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn index_of(&self, handle: NodeHandle) -> Option<usize> {
        self.nodes.iter().position(|n| n.handle == handle)
    }
}

impl DocumentModel for InMemoryDocument {
    fn size(&self) -> usize {
        self.nodes.iter().map(|n| measure(&n.content)).sum()
    }

    fn node_position(&self, handle: NodeHandle) -> Option<usize> {
        let index = self.index_of(handle)?;
        Some(self.nodes[..index].iter().map(|n| measure(&n.content)).sum())
    }

    fn node_size(&self, handle: NodeHandle) -> Option<usize> {
        self.nodes
            .iter()
            .find(|n| n.handle == handle)
            .map(|n| measure(&n.content))
    }

    fn node_at(&self, offset: usize) -> Option<NodeHandle> {
        let mut position = 0;
        for node in &self.nodes {
            if position == offset {
                return Some(node.handle);
            }
            position += measure(&node.content);
        }
        None
    }

    fn content(&self, handle: NodeHandle) -> Option<&NodeContent> {
        self.nodes
            .iter()
            .find(|n| n.handle == handle)
            .map(|n| &n.content)
    }

    fn scaffolds(&self, subject: &SubjectId) -> Vec<(usize, NodeHandle)> {
        let mut position = 0;
        let mut found = Vec::new();
        for node in &self.nodes {
            if node.content.is_scaffold_of(subject) {
                found.push((position, node.handle));
            }
            position += measure(&node.content);
        }
        found
    }

    fn apply(&mut self, transaction: Transaction) -> Result<TransactionReceipt, DocumentError> {
        let mut staged = self.nodes.clone();
        let mut next_handle = self.next_handle;
        let mut receipt = TransactionReceipt::default();

        for step in transaction.into_steps() {
            match step {
                Step::Insert { offset, content } => {
                    let slot = boundary_slot(&staged, offset)?;
                    next_handle += 1;
                    let handle = NodeHandle::new(next_handle);
                    staged.insert(slot, Node { handle, content });
                    receipt.inserted.push(handle);
                }
                Step::Replace { handle, content } => {
                    let node = staged
                        .iter_mut()
                        .find(|n| n.handle == handle)
                        .ok_or(DocumentError::NodeNotFound {
                            handle: handle.raw(),
                        })?;
                    node.content = content;
                }
                Step::Delete { handle } => {
                    let index = staged.iter().position(|n| n.handle == handle).ok_or(
                        DocumentError::NodeNotFound {
                            handle: handle.raw(),
                        },
                    )?;
                    staged.remove(index);
                    receipt.deleted += 1;
                }
            }
        }

        self.nodes = staged;
        self.next_handle = next_handle;
        Ok(receipt)
    }
}

/// Index in `nodes` at which a node inserted at `offset` lands.
fn boundary_slot(nodes: &[Node], offset: usize) -> Result<usize, DocumentError> {
    let mut position = 0;
    for (slot, node) in nodes.iter().enumerate() {
        if position == offset {
            return Ok(slot);
        }
        if position > offset {
            break;
        }
        position += measure(&node.content);
    }
    if position == offset {
        return Ok(nodes.len());
    }
    Err(DocumentError::InvalidPosition {
        offset,
        size: nodes.iter().map(|n| measure(&n.content)).sum(),
    })
}

fn measure(content: &NodeContent) -> usize {
    match content {
        NodeContent::Text { text } => text.chars().count() + 2,
        NodeContent::Request { prompt, .. } => prompt.chars().count() + 2,
        NodeContent::Scaffold { .. } => SCAFFOLD_FOOTPRINT,
        NodeContent::Block { payload, .. } => rendered_text(payload).chars().count() + 2,
    }
}

/// Visible text of a block payload: a bare string, the `text` field of an
/// object, or the compact JSON otherwise.
fn rendered_text(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Object(map) => match map.get("text") {
            Some(serde_json::Value::String(text)) => text.clone(),
            _ => payload.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::document::BlockKind;
    use quill_core::session::CorrelationId;
    use serde_json::json;

    fn scaffold(subject: &SubjectId, index: usize) -> NodeContent {
        NodeContent::Scaffold {
            subject_id: subject.clone(),
            correlation_id: CorrelationId::generate(),
            index,
            kind: BlockKind::new("paragraph"),
        }
    }

    #[test]
    fn test_positions_follow_sizes() {
        let mut doc = InMemoryDocument::new();
        let a = doc.push_text("abc");
        let b = doc.push_text("hello");

        assert_eq!(doc.node_position(a), Some(0));
        assert_eq!(doc.node_size(a), Some(5));
        assert_eq!(doc.node_position(b), Some(5));
        assert_eq!(doc.position_after(b), Some(12));
        assert_eq!(doc.size(), 12);
        assert_eq!(doc.node_at(5), Some(b));
        assert_eq!(doc.node_at(3), None);
    }

    #[test]
    fn test_insert_only_on_boundaries() {
        let mut doc = InMemoryDocument::new();
        doc.push_text("abc");

        let err = doc
            .apply(Transaction::new().insert(3, NodeContent::Text { text: "x".into() }))
            .unwrap_err();
        assert_eq!(err, DocumentError::InvalidPosition { offset: 3, size: 5 });

        let receipt = doc
            .apply(Transaction::new().insert(5, NodeContent::Text { text: "x".into() }))
            .unwrap();
        assert_eq!(receipt.inserted.len(), 1);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_failed_transaction_changes_nothing() {
        let mut doc = InMemoryDocument::new();
        let subject = SubjectId::new("a");
        let a = doc.push_text("abc");

        let tx = Transaction::new()
            .insert(0, scaffold(&subject, 0))
            .delete(NodeHandle::new(999));
        assert!(doc.apply(tx).is_err());

        assert_eq!(doc.len(), 1);
        assert!(doc.scaffolds(&subject).is_empty());
        // Handle numbering is also untouched.
        let b = doc.push_text("next");
        assert_eq!(b.raw(), a.raw() + 1);
    }

    #[test]
    fn test_replace_keeps_handle_and_remeasures() {
        let mut doc = InMemoryDocument::new();
        let subject = SubjectId::new("a");
        let receipt = doc.apply(Transaction::new().insert(0, scaffold(&subject, 0))).unwrap();
        let handle = receipt.inserted[0];
        assert_eq!(doc.node_size(handle), Some(SCAFFOLD_FOOTPRINT));

        doc.apply(Transaction::new().replace(
            handle,
            NodeContent::Block {
                kind: BlockKind::new("paragraph"),
                payload: json!({"text": "Photosynthesis"}),
            },
        ))
        .unwrap();

        assert_eq!(doc.node_size(handle), Some(16));
        assert!(doc.scaffolds(&subject).is_empty());
    }

    #[test]
    fn test_scaffold_scan_is_per_subject() {
        let mut doc = InMemoryDocument::new();
        let a = SubjectId::new("a");
        let b = SubjectId::new("b");
        doc.push_text("intro");
        doc.apply(
            Transaction::new()
                .insert(7, scaffold(&a, 0))
                .insert(9, scaffold(&b, 0))
                .insert(11, scaffold(&a, 1)),
        )
        .unwrap();

        let positions: Vec<usize> = doc.scaffolds(&a).into_iter().map(|(p, _)| p).collect();
        assert_eq!(positions, vec![7, 11]);
        assert_eq!(doc.scaffolds(&b).len(), 1);
    }

    #[test]
    fn test_user_edit_helpers() {
        let mut doc = InMemoryDocument::new();
        let request = doc.push_request(SubjectId::new("a"), "quiz");
        let note = doc.insert_text_before(request, "note").unwrap();

        assert_eq!(doc.node_position(note), Some(0));
        assert_eq!(doc.node_position(request), Some(6));

        doc.edit_text(note, "a longer note").unwrap();
        assert_eq!(doc.node_position(request), Some(15));

        doc.delete_node(request).unwrap();
        assert!(!doc.contains(request));
        assert_eq!(doc.render(), "a longer note");
    }

    #[test]
    fn test_rendered_text_variants() {
        assert_eq!(rendered_text(&json!("plain")), "plain");
        assert_eq!(rendered_text(&json!({"text": "field"})), "field");
        assert_eq!(rendered_text(&json!({"q": 1})), "{\"q\":1}");
    }
}
