//! Stream controller.
//!
//! Drives one subject's generation sessions through
//! `Idle → AwaitingChannel → Streaming → {Completed, Failed} → Idle`.
//! Every inbound event goes through [`StreamController::handle_event`], which
//! checks correlation first and then dispatches to one handler per event
//! type. Every terminal path runs the same cleanup.

use std::sync::Arc;

use quill_core::channel::GenerationChannel;
use quill_core::correlation::CorrelationRegistry;
use quill_core::document::{BlockKind, DocumentModel, NodeContent, NodeHandle};
use quill_core::error::{QuillError, Result};
use quill_core::ledger::{Admission, BlockLedger};
use quill_core::position::resolve_insert_position;
use quill_core::session::{
    CorrelationId, FailureReason, GenerationRequest, Session, SessionStatus, StreamEvent,
    StreamEventKind, StreamOutcome, SubjectId,
};

use super::{EventDisposition, IgnoreReason};
use crate::mutator::DocumentMutator;

/// Callback through which the hosting UI learns how a session ended.
pub type OutcomeCallback = Arc<dyn Fn(&SubjectId, &StreamOutcome) + Send + Sync>;

/// State that lives exactly as long as one session.
struct ActiveSession {
    session: Session,
    ledger: BlockLedger,
}

pub struct StreamController<D: DocumentModel> {
    subject_id: SubjectId,
    registry: CorrelationRegistry,
    mutator: DocumentMutator<D>,
    channel: Arc<dyn GenerationChannel>,
    active: Option<ActiveSession>,
    status: SessionStatus,
    last_outcome: Option<StreamOutcome>,
    on_outcome: Option<OutcomeCallback>,
}

impl<D: DocumentModel> StreamController<D> {
    /// Creates a controller for `subject_id` with a fresh correlation registry.
    pub fn new(
        subject_id: SubjectId,
        mutator: DocumentMutator<D>,
        channel: Arc<dyn GenerationChannel>,
    ) -> Self {
        Self::with_registry(subject_id, CorrelationRegistry::new(), mutator, channel)
    }

    pub fn with_registry(
        subject_id: SubjectId,
        registry: CorrelationRegistry,
        mutator: DocumentMutator<D>,
        channel: Arc<dyn GenerationChannel>,
    ) -> Self {
        Self {
            subject_id,
            registry,
            mutator,
            channel,
            active: None,
            status: SessionStatus::Idle,
            last_outcome: None,
            on_outcome: None,
        }
    }

    /// Registers the callback invoked after every terminal transition.
    pub fn set_outcome_callback(&mut self, callback: OutcomeCallback) {
        self.on_outcome = Some(callback);
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn ledger(&self) -> Option<&BlockLedger> {
        self.active.as_ref().map(|a| &a.ledger)
    }

    pub fn current_correlation(&self) -> Option<CorrelationId> {
        self.registry.current(&self.subject_id)
    }

    /// Outcome of the most recent session, if any has ended.
    pub fn last_outcome(&self) -> Option<&StreamOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn mutator(&self) -> &DocumentMutator<D> {
        &self.mutator
    }

    // ============================================================================
    // Session lifecycle
    // ============================================================================

    /// Starts a session anchored after the request node `anchor`.
    ///
    /// A session already running for this subject is superseded and cleaned
    /// up first. Channel failures end the new session on the failure path and
    /// are also returned to the caller.
    pub async fn start(
        &mut self,
        anchor: NodeHandle,
        prompt: impl Into<String>,
        auxiliary_references: Vec<String>,
    ) -> Result<CorrelationId> {
        if self.active.is_some() {
            tracing::info!(
                target: "quill::stream",
                "[StreamController] Restarting generation for subject {}",
                self.subject_id
            );
            self.finish(StreamOutcome::Failed {
                reason: FailureReason::Superseded,
            })
            .await;
        }

        if !self.mutator.contains(anchor).await {
            return Err(QuillError::not_found("anchor node", anchor.to_string()));
        }

        let correlation_id = self.registry.open(&self.subject_id);
        self.active = Some(ActiveSession {
            session: Session::new(correlation_id, self.subject_id.clone(), anchor),
            ledger: BlockLedger::new(),
        });
        self.status = SessionStatus::AwaitingChannel;

        tracing::info!(
            target: "quill::stream",
            "[StreamController] Session {} opened for subject {}",
            correlation_id,
            self.subject_id
        );

        let request = GenerationRequest {
            subject_id: self.subject_id.clone(),
            correlation_id,
            prompt: prompt.into(),
            auxiliary_references,
        };

        let sent = match self.channel.connect().await {
            Ok(()) => self.channel.send(request).await,
            Err(e) => Err(e),
        };

        if let Err(e) = sent {
            tracing::error!(
                target: "quill::stream",
                "[StreamController] Could not send request for {}: {}",
                correlation_id,
                e
            );
            self.finish(StreamOutcome::Failed {
                reason: FailureReason::Channel {
                    message: e.to_string(),
                },
            })
            .await;
            return Err(e);
        }

        Ok(correlation_id)
    }

    /// Routes one inbound event. The single dispatch point of the controller.
    pub async fn handle_event(&mut self, event: StreamEvent) -> EventDisposition {
        if !self.registry.is_current(&event.correlation_id, &event.subject_id) {
            tracing::debug!(
                target: "quill::stream",
                "[StreamController] Dropping stale {} for {} (subject {})",
                event.kind.name(),
                event.correlation_id,
                event.subject_id
            );
            return EventDisposition::Ignored(IgnoreReason::Stale);
        }

        if self.status == SessionStatus::AwaitingChannel {
            self.status = SessionStatus::Streaming;
            if let Some(active) = self.active.as_mut() {
                active.session.status = SessionStatus::Streaming;
            }
            tracing::debug!(
                target: "quill::stream",
                "[StreamController] Session {} is streaming",
                event.correlation_id
            );
        }

        match event.kind {
            StreamEventKind::Announce { index, kind } => self.on_announce(index, kind).await,
            StreamEventKind::Finalize { index, payload } => self.on_finalize(index, payload).await,
            StreamEventKind::Complete { success } => self.on_complete(success).await,
            StreamEventKind::Error {
                message,
                code,
                recoverable,
            } => self.on_error(message, code, recoverable).await,
        }
    }

    /// Cancels the running session, if any.
    pub async fn cancel(&mut self) -> Option<StreamOutcome> {
        self.active.as_ref()?;
        self.finish(StreamOutcome::Failed {
            reason: FailureReason::Cancelled,
        })
        .await
    }

    /// Cancels the running session if the user removed its request node.
    ///
    /// Called after every user edit.
    pub async fn check_anchor(&mut self) -> Option<StreamOutcome> {
        let anchor = self.active.as_ref()?.session.anchor;
        if self.mutator.contains(anchor).await {
            return None;
        }

        tracing::info!(
            target: "quill::stream",
            "[StreamController] Request node {} was removed, cancelling",
            anchor
        );
        self.cancel().await
    }

    /// Removes every scaffold this subject still has in the document.
    ///
    /// Safe to call any number of times.
    pub async fn cleanup(&self) -> usize {
        match self.mutator.remove_all_scaffolds(&self.subject_id).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!(
                    target: "quill::stream",
                    "[StreamController] Scaffold cleanup failed for subject {}: {}",
                    self.subject_id,
                    e
                );
                0
            }
        }
    }

    // ============================================================================
    // Event handlers
    // ============================================================================

    async fn on_announce(&mut self, index: usize, kind: BlockKind) -> EventDisposition {
        let Some(active) = self.active.as_mut() else {
            return EventDisposition::Ignored(IgnoreReason::Stale);
        };

        if let Admission::Rejected(rejection) = active.ledger.admit_announce(index, kind.clone()) {
            return EventDisposition::Ignored(IgnoreReason::Rejected(rejection));
        }

        let anchor = active.session.anchor;
        let scaffold = NodeContent::Scaffold {
            subject_id: self.subject_id.clone(),
            correlation_id: active.session.correlation_id,
            index,
            kind,
        };
        let ledger = &active.ledger;
        let inserted = self
            .mutator
            .insert_scaffold_with(scaffold, |document| {
                resolve_insert_position(document, anchor, ledger, index)
            })
            .await;

        match inserted {
            Ok(Some(handle)) => {
                active.ledger.mark_placeholder(index, handle);
                tracing::debug!(
                    target: "quill::stream",
                    "[StreamController] Unit {} scaffolded as {}",
                    index,
                    handle
                );
                EventDisposition::Applied
            }
            Ok(None) => {
                tracing::warn!(
                    target: "quill::stream",
                    "[StreamController] Anchor {} is gone, cannot place unit {}",
                    anchor,
                    index
                );
                self.fail(FailureReason::AnchorLost).await
            }
            Err(e) => {
                tracing::error!(
                    target: "quill::stream",
                    "[StreamController] Document refused scaffold for unit {}: {}",
                    index,
                    e
                );
                self.fail(FailureReason::Document {
                    message: e.to_string(),
                })
                .await
            }
        }
    }

    async fn on_finalize(&mut self, index: usize, payload: serde_json::Value) -> EventDisposition {
        let Some(active) = self.active.as_mut() else {
            return EventDisposition::Ignored(IgnoreReason::Stale);
        };

        if let Admission::Rejected(rejection) = active.ledger.admit_finalize(index, payload.clone())
        {
            return EventDisposition::Ignored(IgnoreReason::Rejected(rejection));
        }

        let (Some(handle), Some(unit)) = (active.ledger.handle_of(index), active.ledger.unit(index))
        else {
            return EventDisposition::Ignored(IgnoreReason::ScaffoldMissing);
        };
        let block = NodeContent::Block {
            kind: unit.kind.clone(),
            payload,
        };

        match self.mutator.replace_scaffold(handle, block).await {
            Ok(()) => EventDisposition::Applied,
            Err(e) => {
                // The user deleted this scaffold; the unit is no output.
                active.ledger.mark_vanished(index);
                tracing::warn!(
                    target: "quill::stream",
                    "[StreamController] Unit {} could not be finalized: {}",
                    index,
                    e
                );
                EventDisposition::Ignored(IgnoreReason::ScaffoldMissing)
            }
        }
    }

    async fn on_complete(&mut self, success: bool) -> EventDisposition {
        let finalized_units = self.finalized_units();
        if success {
            return self.terminate(StreamOutcome::Completed { finalized_units }).await;
        }

        if finalized_units > 0 {
            self.terminate(StreamOutcome::SoftCompleted {
                finalized_units,
                message: "producer finished without success".to_string(),
            })
            .await
        } else {
            self.fail(FailureReason::Unsuccessful).await
        }
    }

    async fn on_error(
        &mut self,
        message: String,
        code: Option<String>,
        recoverable: bool,
    ) -> EventDisposition {
        let has_output = self
            .active
            .as_ref()
            .is_some_and(|a| a.ledger.has_finalized_any());

        if recoverable && has_output {
            tracing::info!(
                target: "quill::stream",
                "[StreamController] Keeping partial output after recoverable error: {}",
                message
            );
            let finalized_units = self.finalized_units();
            return self
                .terminate(StreamOutcome::SoftCompleted {
                    finalized_units,
                    message,
                })
                .await;
        }

        self.fail(FailureReason::Producer { message, code }).await
    }

    // ============================================================================
    // Termination
    // ============================================================================

    fn finalized_units(&self) -> usize {
        self.active
            .as_ref()
            .map(|a| a.ledger.finalized_count())
            .unwrap_or(0)
    }

    async fn fail(&mut self, reason: FailureReason) -> EventDisposition {
        self.terminate(StreamOutcome::Failed { reason }).await
    }

    async fn terminate(&mut self, outcome: StreamOutcome) -> EventDisposition {
        match self.finish(outcome).await {
            Some(outcome) => EventDisposition::Terminated(outcome),
            None => EventDisposition::Ignored(IgnoreReason::Stale),
        }
    }

    /// Ends the running session with `outcome`: clears scaffolds, removes the
    /// request node unless the user may still retry from it, closes the
    /// correlation and reports the outcome. No-op without a session.
    async fn finish(&mut self, outcome: StreamOutcome) -> Option<StreamOutcome> {
        let active = self.active.take()?;
        let correlation_id = active.session.correlation_id;

        self.status = if outcome.is_failure() {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };

        let removed = self.cleanup().await;

        if discards_request(&outcome) {
            if let Err(e) = self.mutator.remove_node(active.session.anchor).await {
                tracing::error!(
                    target: "quill::stream",
                    "[StreamController] Could not remove request node {}: {}",
                    active.session.anchor,
                    e
                );
            }
        }

        self.registry.close(&correlation_id);

        match &outcome {
            StreamOutcome::Failed { reason } => tracing::warn!(
                target: "quill::stream",
                "[StreamController] Session {} failed: {} ({} scaffold(s) removed)",
                correlation_id,
                reason.user_message(),
                removed
            ),
            _ => tracing::info!(
                target: "quill::stream",
                "[StreamController] Session {} {} ({} scaffold(s) removed)",
                correlation_id,
                self.status,
                removed
            ),
        }

        if let Some(callback) = &self.on_outcome {
            callback(&self.subject_id, &outcome);
        }

        self.last_outcome = Some(outcome.clone());
        self.status = SessionStatus::Idle;
        Some(outcome)
    }
}

/// Whether the request node goes away with the session.
///
/// It stays on producer and channel failures so the user can retry from it,
/// and on supersession because the next session may anchor on it.
fn discards_request(outcome: &StreamOutcome) -> bool {
    match outcome {
        StreamOutcome::Completed { .. } | StreamOutcome::SoftCompleted { .. } => true,
        StreamOutcome::Failed { reason } => matches!(reason, FailureReason::Cancelled),
    }
}
