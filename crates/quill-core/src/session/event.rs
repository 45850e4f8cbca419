use serde::{Deserialize, Serialize};

use super::{CorrelationId, SubjectId};
use crate::document::BlockKind;

/// Request sent to the producer when a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub subject_id: SubjectId,
    pub correlation_id: CorrelationId,
    pub prompt: String,
    #[serde(default)]
    pub auxiliary_references: Vec<String>,
}

/// Event emitted by the producer, tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub correlation_id: CorrelationId,
    pub subject_id: SubjectId,
    #[serde(flatten)]
    pub kind: StreamEventKind,
}

impl StreamEvent {
    pub fn new(correlation_id: CorrelationId, subject_id: SubjectId, kind: StreamEventKind) -> Self {
        Self {
            correlation_id,
            subject_id,
            kind,
        }
    }
}

/// Unit-lifecycle events carried by a [`StreamEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEventKind {
    /// A unit at `index` is about to be generated.
    Announce { index: usize, kind: BlockKind },
    /// Real content for a previously announced unit.
    Finalize {
        index: usize,
        payload: serde_json::Value,
    },
    /// Producer finished.
    Complete { success: bool },
    /// Producer failed. `recoverable` failures keep any finalized output.
    Error {
        message: String,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        recoverable: bool,
    },
}

impl StreamEventKind {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Announce { .. } => "announce",
            Self::Finalize { .. } => "finalize",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format_is_flat() {
        let json = r#"{
            "correlation_id": "6f1c2f1e-2d7c-4c53-9a0e-3a4c1b8e9d10",
            "subject_id": "assignment-7",
            "type": "announce",
            "index": 0,
            "kind": "paragraph"
        }"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.subject_id.as_str(), "assignment-7");
        assert_eq!(
            event.kind,
            StreamEventKind::Announce {
                index: 0,
                kind: BlockKind::new("paragraph"),
            }
        );
    }

    #[test]
    fn test_error_event_defaults() {
        let json = r#"{
            "correlation_id": "6f1c2f1e-2d7c-4c53-9a0e-3a4c1b8e9d10",
            "subject_id": "a",
            "type": "error",
            "message": "rate limited"
        }"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event.kind {
            StreamEventKind::Error {
                message,
                code,
                recoverable,
            } => {
                assert_eq!(message, "rate limited");
                assert_eq!(code, None);
                assert!(!recoverable);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_request_serializes_references() {
        let request = GenerationRequest {
            subject_id: SubjectId::new("assignment-7"),
            correlation_id: CorrelationId::generate(),
            prompt: "Write three questions about photosynthesis".to_string(),
            auxiliary_references: vec!["file-12".to_string()],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["auxiliary_references"][0], "file-12");
        assert_eq!(value["subject_id"], "assignment-7");
    }
}
