use serde::{Deserialize, Serialize};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamOutcome {
    /// Producer reported success.
    Completed { finalized_units: usize },
    /// Producer failed after finalizing usable output; the output is kept and
    /// no error is surfaced.
    SoftCompleted {
        finalized_units: usize,
        message: String,
    },
    /// Terminal failure surfaced to the hosting UI.
    Failed { reason: FailureReason },
}

impl StreamOutcome {
    /// Whether the hosting UI should present this outcome as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Why a session failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Non-recoverable producer error, or a recoverable one with no output.
    Producer {
        message: String,
        #[serde(default)]
        code: Option<String>,
    },
    /// Producer reported `complete` with `success = false` and nothing usable.
    Unsuccessful,
    /// The originating request node disappeared from the document.
    AnchorLost,
    /// The user discarded the request or called `cancel()`.
    Cancelled,
    /// A newer session for the same subject replaced this one.
    Superseded,
    /// Connecting or sending on the generation channel failed.
    Channel { message: String },
    /// The document refused a scaffold insert while the anchor still existed.
    Document { message: String },
}

impl FailureReason {
    /// Message suitable for the hosting UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::Producer { message, .. } => message.clone(),
            Self::Unsuccessful => "Generation did not produce any content".to_string(),
            Self::AnchorLost => "The generation target was removed from the document".to_string(),
            Self::Cancelled => "Generation was cancelled".to_string(),
            Self::Superseded => "Generation was restarted".to_string(),
            Self::Channel { message } => format!("Could not reach the generator: {}", message),
            Self::Document { message } => {
                format!("The document refused generated content: {}", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_failure_reason() {
        let outcome = StreamOutcome::Failed {
            reason: FailureReason::Producer {
                message: "y".to_string(),
                code: None,
            },
        };
        assert!(outcome.is_failure());
        assert_eq!(outcome.failure_reason().unwrap().user_message(), "y");

        let soft = StreamOutcome::SoftCompleted {
            finalized_units: 1,
            message: "x".to_string(),
        };
        assert!(!soft.is_failure());
        assert!(soft.failure_reason().is_none());
    }

    #[test]
    fn test_document_reason_round_trips() {
        let reason = FailureReason::Document {
            message: "offset 40 is out of bounds".to_string(),
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "document");
        assert!(reason.user_message().contains("offset 40"));
        assert_eq!(serde_json::from_value::<FailureReason>(json).unwrap(), reason);
    }
}
