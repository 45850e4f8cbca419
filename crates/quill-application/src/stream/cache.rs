use quill_core::document::DocumentModel;
use quill_core::session::SubjectId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::StreamController;

/// Shared handle to one subject's controller.
pub type SharedController<D> = Arc<Mutex<StreamController<D>>>;

/// One stream controller per subject.
///
/// Each controller owns its own correlation registry and ledger, so several
/// documents can stream at once without cross-talk.
pub struct ControllerCache<D: DocumentModel> {
    controllers: Arc<RwLock<HashMap<SubjectId, SharedController<D>>>>,
}

impl<D: DocumentModel> ControllerCache<D> {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self {
            controllers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets the controller for `subject_id`.
    pub async fn get(&self, subject_id: &SubjectId) -> Option<SharedController<D>> {
        let controllers = self.controllers.read().await;
        controllers.get(subject_id).cloned()
    }

    /// Gets the controller for `subject_id`, building it with `factory` on
    /// first use.
    pub async fn get_or_create<F>(&self, subject_id: &SubjectId, factory: F) -> SharedController<D>
    where
        F: FnOnce(SubjectId) -> StreamController<D>,
    {
        if let Some(existing) = self.get(subject_id).await {
            return existing;
        }

        let mut controllers = self.controllers.write().await;
        controllers
            .entry(subject_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(factory(subject_id.clone()))))
            .clone()
    }

    /// Removes the controller for `subject_id`, cancelling its session first.
    pub async fn remove(&self, subject_id: &SubjectId) {
        let removed = {
            let mut controllers = self.controllers.write().await;
            controllers.remove(subject_id)
        };
        if let Some(controller) = removed {
            controller.lock().await.cancel().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.controllers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.controllers.read().await.is_empty()
    }
}

impl<D: DocumentModel> Default for ControllerCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutator::DocumentMutator;
    use quill_infrastructure::{InMemoryDocument, loopback};

    #[tokio::test]
    async fn test_one_controller_per_subject() {
        let document = Arc::new(RwLock::new(InMemoryDocument::new()));
        let (channel, _producer, _events) = loopback(8);
        let channel: Arc<dyn quill_core::channel::GenerationChannel> = Arc::new(channel);
        let cache = ControllerCache::new();

        let make = |subject: SubjectId| {
            StreamController::new(
                subject,
                DocumentMutator::new(Arc::clone(&document)),
                Arc::clone(&channel),
            )
        };

        let a1 = cache.get_or_create(&SubjectId::new("a"), make).await;
        let a2 = cache.get_or_create(&SubjectId::new("a"), make).await;
        let b = cache.get_or_create(&SubjectId::new("b"), make).await;

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(cache.len().await, 2);

        cache.remove(&SubjectId::new("a")).await;
        assert!(cache.get(&SubjectId::new("a")).await.is_none());
        assert_eq!(cache.len().await, 1);
    }
}
