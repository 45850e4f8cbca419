//! Error types for Quill.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a document transaction can be refused.
///
/// A refused transaction leaves the document untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentError {
    /// The offset does not fall on a node boundary, or lies past the end.
    #[error("invalid position {offset} (document size {size})")]
    InvalidPosition { offset: usize, size: usize },

    /// No node carries the given handle.
    #[error("node not found: {handle}")]
    NodeNotFound { handle: u64 },

    /// The node exists but is not a scaffold.
    #[error("node {handle} is not a scaffold")]
    NotAScaffold { handle: u64 },
}

/// A shared error type for the Quill workspace.
///
/// Typed, structured variants with automatic conversion from the common
/// error types used across the crates.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum QuillError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Document transaction refused
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// The anchor node of a session disappeared from the document
    #[error("Anchor lost for session {correlation_id}")]
    AnchorLost { correlation_id: String },

    /// Generation channel failure (connect/send)
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", "JSONL"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuillError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Channel error
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a document error
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document(_))
    }

    /// Check if this is an anchor-lost error
    pub fn is_anchor_lost(&self) -> bool {
        matches!(self, Self::AnchorLost { .. })
    }

    /// Check if this is a channel error
    pub fn is_channel(&self) -> bool {
        matches!(self, Self::Channel(_))
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for QuillError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for QuillError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for QuillError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (adapter boundaries)
impl From<anyhow::Error> for QuillError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, QuillError>`.
pub type Result<T> = std::result::Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_error_converts() {
        let err: QuillError = DocumentError::NodeNotFound { handle: 7 }.into();
        assert!(err.is_document());
        assert_eq!(err.to_string(), "Document error: node not found: 7");
    }

    #[test]
    fn test_io_error_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let err = QuillError::from(io);
        match err {
            QuillError::Io { message } => assert!(message.contains("NotFound")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_json_error_is_serialization() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = QuillError::from(parse);
        assert!(matches!(err, QuillError::Serialization { ref format, .. } if format == "JSON"));
    }
}
