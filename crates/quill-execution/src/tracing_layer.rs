//! Tracing layer that forwards stream protocol diagnostics to a hosting UI.
//!
//! Events whose target starts with [`STREAM_TARGET`] are captured with their
//! fields and enclosing span fields and sent over a tokio channel.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Target used by every protocol log line.
pub const STREAM_TARGET: &str = "quill::stream";

/// One captured log event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StreamTraceEvent {
    /// Event target (e.g., "quill::stream")
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    /// Human-readable message
    pub message: String,
    /// Structured fields from the event
    pub fields: HashMap<String, Value>,
    /// Fields of the enclosing spans, outermost first
    pub span: HashMap<String, Value>,
    pub timestamp: String,
}

/// Span fields recorded at span creation.
struct SpanFields(HashMap<String, Value>);

/// Sends matching events to a channel.
pub struct StreamTraceLayer {
    sender: mpsc::UnboundedSender<StreamTraceEvent>,
    target_prefix: String,
}

impl StreamTraceLayer {
    /// Forwards events under [`STREAM_TARGET`].
    pub fn new(sender: mpsc::UnboundedSender<StreamTraceEvent>) -> Self {
        Self::with_target(sender, STREAM_TARGET)
    }

    pub fn with_target(
        sender: mpsc::UnboundedSender<StreamTraceEvent>,
        target_prefix: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            target_prefix: target_prefix.into(),
        }
    }
}

impl<S> Layer<S> for StreamTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with(&self.target_prefix) {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let mut span_fields = HashMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(stored) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(stored.0.clone());
                }
            }
        }

        let trace_event = StreamTraceEvent {
            target: event.metadata().target().to_string(),
            level: event.metadata().level().to_string(),
            message: fields
                .remove("message")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            fields,
            span: span_fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Receiver gone means nobody is listening anymore.
        let _ = self.sender.send(trace_event);
    }
}

/// Field visitor that extracts tracing event fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}
