//! Event loop for one subject.
//!
//! [`StreamDriver`] owns the inbound event receiver, an optional user-edit
//! receiver and a cancellation token, and feeds them one at a time into the
//! subject's [`StreamController`](quill_application::StreamController).
//! Nothing runs concurrently with a handler: each event or edit is processed
//! to completion before the next is taken.

use quill_application::EventDisposition;
use quill_application::stream::SharedController;
use quill_core::document::{DocumentModel, Transaction};
use quill_core::session::{StreamEvent, StreamOutcome};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct StreamDriver<D: DocumentModel> {
    controller: SharedController<D>,
    events: mpsc::Receiver<StreamEvent>,
    edits: Option<mpsc::Receiver<Transaction>>,
    cancel: CancellationToken,
    events_open: bool,
    cancel_on_close: bool,
}

impl<D: DocumentModel> StreamDriver<D> {
    pub fn new(controller: SharedController<D>, events: mpsc::Receiver<StreamEvent>) -> Self {
        Self {
            controller,
            events,
            edits: None,
            cancel: CancellationToken::new(),
            events_open: true,
            cancel_on_close: false,
        }
    }

    /// Routes user edits through the driver. Each edit is applied to the
    /// shared document and followed by an anchor check.
    pub fn with_edits(mut self, edits: mpsc::Receiver<Transaction>) -> Self {
        self.edits = Some(edits);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cancels the session once the inbound channel closes instead of
    /// waiting for an explicit cancel. Used for finite event sources.
    pub fn cancel_on_close(mut self, enabled: bool) -> Self {
        self.cancel_on_close = enabled;
        self
    }

    /// Token that cancels the running session when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn controller(&self) -> &SharedController<D> {
        &self.controller
    }

    /// Processes input until the current session ends and returns its outcome.
    ///
    /// Returns `None` when cancelled with no session running. Unless
    /// [`cancel_on_close`](Self::cancel_on_close) is set, a closed inbound
    /// channel does not end the session; the driver keeps serving edits and
    /// cancellation.
    pub async fn run(&mut self) -> Option<StreamOutcome> {
        loop {
            let edits_open = self.edits.is_some();

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    tracing::info!(target: "quill::stream", "[StreamDriver] Cancellation requested");
                    return self.controller.lock().await.cancel().await;
                }

                edit = next_edit(&mut self.edits), if edits_open => {
                    match edit {
                        Some(transaction) => {
                            if let Some(outcome) = apply_edit(&self.controller, transaction).await {
                                return Some(outcome);
                            }
                        }
                        None => {
                            tracing::debug!(target: "quill::stream", "[StreamDriver] Edit channel closed");
                            self.edits = None;
                        }
                    }
                }

                event = self.events.recv(), if self.events_open => {
                    match event {
                        Some(event) => {
                            let disposition = self.controller.lock().await.handle_event(event).await;
                            if let EventDisposition::Terminated(outcome) = disposition {
                                return Some(outcome);
                            }
                        }
                        None => {
                            self.events_open = false;
                            if self.cancel_on_close {
                                tracing::info!(
                                    target: "quill::stream",
                                    "[StreamDriver] Inbound channel closed, cancelling session"
                                );
                                return self.controller.lock().await.cancel().await;
                            }
                            tracing::warn!(
                                target: "quill::stream",
                                "[StreamDriver] Inbound channel closed; session stays open until cancelled"
                            );
                        }
                    }
                }
            }
        }
    }
}

async fn next_edit(edits: &mut Option<mpsc::Receiver<Transaction>>) -> Option<Transaction> {
    match edits {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn apply_edit<D: DocumentModel>(
    controller: &SharedController<D>,
    transaction: Transaction,
) -> Option<StreamOutcome> {
    let mut controller = controller.lock().await;

    let applied = controller
        .mutator()
        .document()
        .write()
        .await
        .apply(transaction);
    if let Err(e) = applied {
        tracing::warn!(target: "quill::stream", "[StreamDriver] User edit rejected: {}", e);
    }

    controller.check_anchor().await
}
