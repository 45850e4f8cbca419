//! Document collaborator interface.
//!
//! The streaming protocol never owns the document it writes into. It talks to
//! it through [`DocumentModel`], which exposes only what the protocol needs:
//! lookup by handle and by position, size measurement, a scaffold scan, and
//! atomic transactions.
//!
//! Offsets follow the structured-editor convention: the document is a
//! sequence of top-level nodes, each occupying `node_size` positions, and an
//! insert offset must fall on a node boundary.

mod transaction;

pub use transaction::{Step, Transaction, TransactionReceipt};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DocumentError;
use crate::session::{CorrelationId, SubjectId};

/// Footprint of a scaffold node, in document positions.
///
/// A scaffold renders as an empty block, which occupies its open and close
/// positions only.
pub const SCAFFOLD_FOOTPRINT: usize = 2;

/// Stable identity of a document node, assigned when the node is inserted.
///
/// Handles survive unrelated edits and in-place replacement; they are never
/// reused within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Document-node type tag of a generated unit (e.g. `paragraph`, `heading`,
/// `multiple_choice`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKind(String);

impl BlockKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content of a top-level document node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeContent {
    /// User-authored text.
    Text { text: String },
    /// The affordance the user created to trigger generation.
    Request { subject_id: SubjectId, prompt: String },
    /// Transient "generation in progress" node for one unit.
    Scaffold {
        subject_id: SubjectId,
        correlation_id: CorrelationId,
        index: usize,
        kind: BlockKind,
    },
    /// Finalized generated content.
    Block {
        kind: BlockKind,
        payload: serde_json::Value,
    },
}

impl NodeContent {
    pub fn is_scaffold(&self) -> bool {
        matches!(self, Self::Scaffold { .. })
    }

    /// Whether this is a scaffold belonging to `subject`.
    pub fn is_scaffold_of(&self, subject: &SubjectId) -> bool {
        matches!(self, Self::Scaffold { subject_id, .. } if subject_id == subject)
    }
}

/// The document operations consumed by the streaming protocol.
///
/// Implementations must apply a [`Transaction`] all-or-nothing: when `apply`
/// returns an error the document is unchanged.
pub trait DocumentModel: Send + Sync {
    /// Total size of the document in positions.
    fn size(&self) -> usize;

    /// Start offset of the node with `handle`.
    fn node_position(&self, handle: NodeHandle) -> Option<usize>;

    /// Measured size of the node with `handle`.
    fn node_size(&self, handle: NodeHandle) -> Option<usize>;

    /// Handle of the node starting exactly at `offset`.
    fn node_at(&self, offset: usize) -> Option<NodeHandle>;

    /// Content of the node with `handle`.
    fn content(&self, handle: NodeHandle) -> Option<&NodeContent>;

    /// Every scaffold of `subject`, as `(start offset, handle)` in document order.
    fn scaffolds(&self, subject: &SubjectId) -> Vec<(usize, NodeHandle)>;

    /// Applies every step of `transaction` atomically.
    fn apply(&mut self, transaction: Transaction) -> Result<TransactionReceipt, DocumentError>;

    /// Offset immediately after the node with `handle`.
    fn position_after(&self, handle: NodeHandle) -> Option<usize> {
        let start = self.node_position(handle)?;
        let size = self.node_size(handle)?;
        Some(start + size)
    }

    fn contains(&self, handle: NodeHandle) -> bool {
        self.node_position(handle).is_some()
    }
}
