use serde::{Deserialize, Serialize};

use super::{NodeContent, NodeHandle};

/// One step of a document transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Insert a new node at a boundary offset.
    Insert { offset: usize, content: NodeContent },
    /// Replace a node's content, keeping its handle.
    Replace {
        handle: NodeHandle,
        content: NodeContent,
    },
    /// Remove a node.
    Delete { handle: NodeHandle },
}

/// Ordered list of steps applied as a unit.
///
/// Steps run in order; offsets of later steps are interpreted against the
/// document as left by earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    steps: Vec<Step>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, offset: usize, content: NodeContent) -> Self {
        self.steps.push(Step::Insert { offset, content });
        self
    }

    pub fn replace(mut self, handle: NodeHandle, content: NodeContent) -> Self {
        self.steps.push(Step::Replace { handle, content });
        self
    }

    pub fn delete(mut self, handle: NodeHandle) -> Self {
        self.steps.push(Step::Delete { handle });
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Result of a committed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Handles assigned to inserted nodes, in step order.
    pub inserted: Vec<NodeHandle>,
    /// Number of nodes removed.
    pub deleted: usize,
}
