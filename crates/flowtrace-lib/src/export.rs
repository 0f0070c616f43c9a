//! Execution import and trace export
//!
//! Formats are chosen by file extension: JSON and YAML on both sides, plus a
//! JSONL export with one root span per line for downstream ingestion.

use crate::error::{TraceError, TraceResult};
use flowtrace_types::{TraceTree, WorkflowExecution};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Load a workflow execution from a `.json`, `.yaml` or `.yml` file.
pub fn load_execution(path: &Path) -> TraceResult<WorkflowExecution> {
    let content = std::fs::read_to_string(path)?;
    match extension_of(path) {
        Some("json") => Ok(serde_json::from_str(&content)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        other => Err(TraceError::unsupported_format(format!(
            "cannot load execution from extension {other:?}"
        ))),
    }
}

/// Write a trace tree as pretty JSON or YAML, chosen by extension.
pub fn export_trace(tree: &TraceTree, path: &Path) -> TraceResult<()> {
    let content = match extension_of(path) {
        Some("json") => serde_json::to_string_pretty(tree)?,
        Some("yaml") | Some("yml") => serde_yaml::to_string(tree)?,
        other => {
            return Err(TraceError::unsupported_format(format!(
                "cannot export trace to extension {other:?}"
            )))
        }
    };
    std::fs::write(path, content)?;
    Ok(())
}

/// Write a trace tree as JSONL, one root span per line.
pub fn export_trace_jsonl(tree: &TraceTree, path: &Path) -> TraceResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for span in &tree.spans {
        serde_json::to_writer(&mut writer, span)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|extension| extension.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_trace_spans;
    use chrono::DateTime;
    use flowtrace_types::BlockLog;
    use tempfile::TempDir;

    fn sample_execution() -> WorkflowExecution {
        WorkflowExecution {
            workflow_id: Some("wf-export".to_string()),
            logs: vec![BlockLog {
                block_id: Some("b1".to_string()),
                block_type: Some("agent".to_string()),
                block_name: "agent".to_string(),
                started_at: DateTime::from_timestamp_millis(0).unwrap(),
                ended_at: DateTime::from_timestamp_millis(100).unwrap(),
                duration_ms: 100,
                error: None,
                output: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_json_round_trip() -> TraceResult<()> {
        let temp_dir = TempDir::new()?;
        let execution_path = temp_dir.path().join("run.json");
        std::fs::write(
            &execution_path,
            serde_json::to_string_pretty(&sample_execution())?,
        )?;

        let loaded = load_execution(&execution_path)?;
        assert_eq!(loaded.workflow_id.as_deref(), Some("wf-export"));

        let tree = build_trace_spans(&loaded);
        let trace_path = temp_dir.path().join("trace.yaml");
        export_trace(&tree, &trace_path)?;
        assert!(std::fs::read_to_string(&trace_path)?.contains("b1-0"));

        Ok(())
    }

    #[test]
    fn test_jsonl_export_one_root_per_line() -> TraceResult<()> {
        let temp_dir = TempDir::new()?;
        let tree = build_trace_spans(&sample_execution());
        let path = temp_dir.path().join("trace.jsonl");
        export_trace_jsonl(&tree, &path)?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(content.lines().count(), 1);
        assert!(!content.contains("traceSpans"));

        Ok(())
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let tree = TraceTree::default();
        let result = export_trace(&tree, Path::new("trace.toml"));
        assert!(matches!(result, Err(TraceError::UnsupportedFormat(_))));
    }
}
