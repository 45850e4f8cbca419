use anyhow::{Context, Result, bail};
use quill_application::{DocumentMutator, StreamController};
use quill_core::config::QuillConfig;
use quill_core::session::{CorrelationId, StreamEvent, StreamOutcome, SubjectId};
use quill_execution::{StreamDriver, StreamTraceEvent};
use quill_infrastructure::trace_file::load_trace;
use quill_infrastructure::{InMemoryDocument, loopback};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc};

pub struct ReplayOptions {
    pub trace: PathBuf,
    pub prompt: String,
    pub subject: String,
    pub keep_ids: bool,
    pub json: bool,
}

/// Replays a recorded trace through a live session on a fresh document that
/// holds only the request node.
pub async fn run(
    config: &QuillConfig,
    options: ReplayOptions,
    mut trace_events: Option<mpsc::UnboundedReceiver<StreamTraceEvent>>,
) -> Result<()> {
    let events = load_trace(&options.trace)
        .await
        .with_context(|| format!("Failed to load trace {}", options.trace.display()))?;
    tracing::info!(
        "[Replay] Loaded {} event(s) from {}",
        events.len(),
        options.trace.display()
    );

    let subject_id = SubjectId::new(options.subject);
    let mut document = InMemoryDocument::new();
    let anchor = document.push_request(subject_id.clone(), options.prompt.clone());
    let document = Arc::new(RwLock::new(document));

    let (channel, mut producer, inbound) = loopback(config.stream.event_buffer);
    let mut controller = StreamController::new(
        subject_id.clone(),
        DocumentMutator::new(Arc::clone(&document)),
        Arc::new(channel),
    );
    let correlation_id = controller
        .start(anchor, options.prompt, Vec::new())
        .await
        .context("Failed to start session")?;

    let request = producer
        .next_request()
        .await
        .context("Producer never received the generation request")?;
    let events = if options.keep_ids {
        events
    } else {
        rebind_events(events, request.correlation_id, &request.subject_id)
    };

    let controller = Arc::new(Mutex::new(controller));
    let mut driver = StreamDriver::new(controller, inbound).cancel_on_close(true);

    let cancel = driver.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let feeder = tokio::spawn(async move {
        for event in events {
            if producer.emit(event).await.is_err() {
                break;
            }
        }
    });

    let outcome = driver.run().await;
    feeder.abort();

    let mut diagnostics = Vec::new();
    if let Some(rx) = trace_events.as_mut() {
        while let Ok(event) = rx.try_recv() {
            diagnostics.push(event);
        }
    }

    let document = document.read().await;
    if options.json {
        let report = serde_json::json!({
            "correlation_id": correlation_id,
            "subject_id": subject_id,
            "outcome": outcome,
            "document": document.snapshot(),
            "trace": diagnostics,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to render report")?
        );
    } else {
        println!("Session {} for subject {}", correlation_id, subject_id);
        println!("Outcome: {}", describe(outcome.as_ref()));
        println!("--- document ---");
        println!("{}", document.render());
        if !diagnostics.is_empty() {
            println!("--- trace ---");
            for event in &diagnostics {
                println!("{} {:5} {}", event.timestamp, event.level, event.message);
            }
        }
    }

    if let Some(reason) = outcome.as_ref().and_then(StreamOutcome::failure_reason) {
        bail!("generation failed: {}", reason.user_message());
    }
    Ok(())
}

/// Points events of the trace's first session at the live session.
///
/// Events recorded under any other correlation id are left alone, so they
/// arrive as foreign events.
fn rebind_events(
    events: Vec<StreamEvent>,
    correlation_id: CorrelationId,
    subject_id: &SubjectId,
) -> Vec<StreamEvent> {
    let Some(recorded) = events.first().map(|e| e.correlation_id) else {
        return events;
    };

    events
        .into_iter()
        .map(|mut event| {
            if event.correlation_id == recorded {
                event.correlation_id = correlation_id;
                event.subject_id = subject_id.clone();
            }
            event
        })
        .collect()
}

fn describe(outcome: Option<&StreamOutcome>) -> String {
    match outcome {
        Some(StreamOutcome::Completed { finalized_units }) => {
            format!("completed ({} unit(s))", finalized_units)
        }
        Some(StreamOutcome::SoftCompleted {
            finalized_units,
            message,
        }) => format!(
            "completed with partial output ({} unit(s)): {}",
            finalized_units, message
        ),
        Some(StreamOutcome::Failed { reason }) => format!("failed: {}", reason.user_message()),
        None => "no session was running".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::session::StreamEventKind;

    fn complete(correlation_id: CorrelationId, subject: &str) -> StreamEvent {
        StreamEvent::new(
            correlation_id,
            SubjectId::new(subject),
            StreamEventKind::Complete { success: true },
        )
    }

    #[test]
    fn test_rebind_only_touches_first_session() {
        let recorded = CorrelationId::generate();
        let foreign = CorrelationId::generate();
        let live = CorrelationId::generate();
        let live_subject = SubjectId::new("replay");

        let events = vec![
            complete(recorded, "recorded-subject"),
            complete(foreign, "recorded-subject"),
            complete(recorded, "recorded-subject"),
        ];
        let rebound = rebind_events(events, live, &live_subject);

        assert_eq!(rebound[0].correlation_id, live);
        assert_eq!(rebound[0].subject_id, live_subject);
        assert_eq!(rebound[1].correlation_id, foreign);
        assert_eq!(rebound[1].subject_id, SubjectId::new("recorded-subject"));
        assert_eq!(rebound[2].correlation_id, live);
    }

    #[test]
    fn test_rebind_empty_trace() {
        assert!(rebind_events(Vec::new(), CorrelationId::generate(), &SubjectId::new("s")).is_empty());
    }

    #[test]
    fn test_describe_outcomes() {
        assert_eq!(
            describe(Some(&StreamOutcome::Completed { finalized_units: 2 })),
            "completed (2 unit(s))"
        );
        assert_eq!(describe(None), "no session was running");
    }
}
