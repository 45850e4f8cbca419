//! Document mutator.
//!
//! The only writer to the shared document on the streaming protocol's
//! behalf. Each operation takes the document write lock once, performs its
//! lookups and a single atomic transaction under that lock, and releases it,
//! so a concurrent reader sees either the state before or after the
//! operation and nothing in between.

use std::sync::Arc;
use tokio::sync::RwLock;

use quill_core::document::{DocumentModel, NodeContent, NodeHandle, Transaction};
use quill_core::error::{DocumentError, QuillError, Result};
use quill_core::session::SubjectId;

/// Document shared between the protocol and the user's own edits.
pub type SharedDocument<D> = Arc<RwLock<D>>;

pub struct DocumentMutator<D: DocumentModel> {
    document: SharedDocument<D>,
}

impl<D: DocumentModel> Clone for DocumentMutator<D> {
    fn clone(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
        }
    }
}

impl<D: DocumentModel> DocumentMutator<D> {
    pub fn new(document: SharedDocument<D>) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &SharedDocument<D> {
        &self.document
    }

    /// Inserts `scaffold` at `offset`.
    pub async fn insert_scaffold(&self, offset: usize, scaffold: NodeContent) -> Result<NodeHandle> {
        match self.insert_scaffold_with(scaffold, |_| Some(offset)).await? {
            Some(handle) => Ok(handle),
            None => Err(QuillError::internal("fixed offset resolved to nothing")),
        }
    }

    /// Resolves the insert offset with `resolve` and inserts `scaffold`
    /// there, both under the same write lock.
    ///
    /// Returns `Ok(None)` without touching the document when `resolve`
    /// finds no position.
    pub async fn insert_scaffold_with<F>(
        &self,
        scaffold: NodeContent,
        resolve: F,
    ) -> Result<Option<NodeHandle>>
    where
        F: FnOnce(&D) -> Option<usize>,
    {
        if !scaffold.is_scaffold() {
            return Err(QuillError::internal("insert_scaffold called with a non-scaffold node"));
        }

        let mut document = self.document.write().await;
        let Some(offset) = resolve(&*document) else {
            return Ok(None);
        };

        let receipt = document.apply(Transaction::new().insert(offset, scaffold))?;
        let handle = receipt
            .inserted
            .first()
            .copied()
            .ok_or_else(|| QuillError::internal("insert committed without a handle"))?;

        tracing::trace!(
            target: "quill::stream",
            "[DocumentMutator] Scaffold {} inserted at {}",
            handle,
            offset
        );
        Ok(Some(handle))
    }

    /// Replaces the scaffold `handle` with `content`, wherever it now is.
    pub async fn replace_scaffold(&self, handle: NodeHandle, content: NodeContent) -> Result<()> {
        let mut document = self.document.write().await;
        match document.content(handle) {
            Some(existing) if existing.is_scaffold() => {}
            Some(_) => {
                return Err(DocumentError::NotAScaffold {
                    handle: handle.raw(),
                }
                .into());
            }
            None => {
                return Err(DocumentError::NodeNotFound {
                    handle: handle.raw(),
                }
                .into());
            }
        }

        document.apply(Transaction::new().replace(handle, content))?;
        Ok(())
    }

    /// Deletes every scaffold of `subject_id` in one transaction, highest
    /// position first. Returns how many were removed.
    pub async fn remove_all_scaffolds(&self, subject_id: &SubjectId) -> Result<usize> {
        let mut document = self.document.write().await;
        let mut scaffolds = document.scaffolds(subject_id);
        if scaffolds.is_empty() {
            return Ok(0);
        }

        scaffolds.sort_by(|a, b| b.0.cmp(&a.0));
        let transaction = scaffolds
            .iter()
            .fold(Transaction::new(), |tx, (_, handle)| tx.delete(*handle));

        let receipt = document.apply(transaction)?;
        tracing::debug!(
            target: "quill::stream",
            "[DocumentMutator] Removed {} scaffold(s) for subject {}",
            receipt.deleted,
            subject_id
        );
        Ok(receipt.deleted)
    }

    /// Deletes the node `handle` if it still exists. Returns whether it did.
    pub async fn remove_node(&self, handle: NodeHandle) -> Result<bool> {
        let mut document = self.document.write().await;
        if !document.contains(handle) {
            return Ok(false);
        }
        document.apply(Transaction::new().delete(handle))?;
        Ok(true)
    }

    pub async fn contains(&self, handle: NodeHandle) -> bool {
        self.document.read().await.contains(handle)
    }
}
