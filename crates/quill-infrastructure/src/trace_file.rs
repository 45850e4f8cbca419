//! JSONL event traces.
//!
//! One [`StreamEvent`] per line. Blank lines and lines starting with `#` are
//! skipped so traces can carry comments.

use std::path::Path;

use quill_core::error::{QuillError, Result};
use quill_core::session::StreamEvent;

/// Parses a trace held in memory.
pub fn parse_trace(content: &str) -> Result<Vec<StreamEvent>> {
    let mut events = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line).map_err(|e| QuillError::Serialization {
            format: "JSONL".to_string(),
            message: format!("line {}: {}", number + 1, e),
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Reads and parses a trace file.
pub async fn load_trace(path: &Path) -> Result<Vec<StreamEvent>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            QuillError::not_found("trace", path.display().to_string())
        } else {
            QuillError::from(e)
        }
    })?;
    let events = parse_trace(&content)?;
    tracing::debug!(
        "[TraceFile] Loaded {} events from {}",
        events.len(),
        path.display()
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::session::StreamEventKind;
    use tempfile::TempDir;

    const TRACE: &str = r#"
# scenario A
{"correlation_id":"6f1c2f1e-2d7c-4c53-9a0e-3a4c1b8e9d10","subject_id":"a","type":"announce","index":0,"kind":"paragraph"}

{"correlation_id":"6f1c2f1e-2d7c-4c53-9a0e-3a4c1b8e9d10","subject_id":"a","type":"complete","success":true}
"#;

    #[test]
    fn test_skips_comments_and_blanks() {
        let events = parse_trace(TRACE).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, StreamEventKind::Complete { success: true });
    }

    #[test]
    fn test_reports_line_number() {
        let err = parse_trace("# header\n{not json}\n").unwrap_err();
        match err {
            QuillError::Serialization { format, message } => {
                assert_eq!(format, "JSONL");
                assert!(message.starts_with("line 2:"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.jsonl");
        std::fs::write(&path, TRACE).unwrap();

        assert_eq!(load_trace(&path).await.unwrap().len(), 2);
        assert!(load_trace(&temp_dir.path().join("missing.jsonl"))
            .await
            .unwrap_err()
            .is_not_found());
    }
}
