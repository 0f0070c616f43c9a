//! Run recording with an explicit lifecycle
//!
//! `RunLogger` collects block logs while a workflow runs and owns every piece
//! of state involved: init creates the log directory and output path,
//! `complete` flushes the final snapshot and tears the logger down. Debounced
//! persistence is an explicit tokio task owned by the logger, never a
//! module-level timer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use flowtrace_types::{BlockLog, WorkflowExecution};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Snapshot destination for in-flight and final run state
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Persist one snapshot of the run
    async fn write_snapshot(&self, execution: &WorkflowExecution) -> Result<()>;
}

/// Default sink: pretty JSON at a fixed path, overwritten per snapshot
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SnapshotSink for JsonFileSink {
    async fn write_snapshot(&self, execution: &WorkflowExecution) -> Result<()> {
        let json = serde_json::to_string_pretty(execution)
            .context("Failed to serialize run snapshot")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write run snapshot: {:?}", self.path))?;
        Ok(())
    }
}

struct RunState {
    workflow_id: String,
    logs: Vec<BlockLog>,
    metadata: HashMap<String, serde_json::Value>,
}

impl RunState {
    fn snapshot(&self, success: Option<bool>) -> WorkflowExecution {
        WorkflowExecution {
            workflow_id: Some(self.workflow_id.clone()),
            success,
            logs: self.logs.clone(),
            output: None,
            metadata: self.metadata.clone(),
        }
    }
}

struct AutosaveTask {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

/// Collects block logs for one workflow run
pub struct RunLogger {
    run_id: String,
    path: PathBuf,
    state: Arc<Mutex<RunState>>,
    dirty: Arc<Notify>,
    autosave: Option<AutosaveTask>,
}

impl RunLogger {
    /// Create a new run logger writing to `<log_dir>/run_<id>.json`
    pub fn new(workflow_id: impl Into<String>, log_dir: &Path) -> Result<Self> {
        let workflow_id = workflow_id.into();
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {log_dir:?}"))?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let path = log_dir.join(format!("run_{run_id}.json"));

        info!(
            run_id = %run_id,
            workflow_id = %workflow_id,
            path = %path.display(),
            "Initializing run logger"
        );

        Ok(Self {
            run_id,
            path,
            state: Arc::new(Mutex::new(RunState {
                workflow_id,
                logs: Vec::new(),
                metadata: HashMap::new(),
            })),
            dirty: Arc::new(Notify::new()),
            autosave: None,
        })
    }

    /// Enable debounced autosave to the run's own JSON file. Requires a tokio
    /// runtime; the task lives until `complete` stops it.
    pub fn with_autosave(self, debounce: Duration) -> Self {
        let sink = Arc::new(JsonFileSink::new(self.path.clone()));
        self.with_autosave_sink(debounce, sink)
    }

    /// Enable debounced autosave through a caller-provided sink
    pub fn with_autosave_sink(mut self, debounce: Duration, sink: Arc<dyn SnapshotSink>) -> Self {
        let state = Arc::clone(&self.state);
        let dirty = Arc::clone(&self.dirty);
        let shutdown = Arc::new(Notify::new());
        let shutdown_signal = Arc::clone(&shutdown);

        let handle = tokio::spawn(async move {
            autosave_loop(state, dirty, shutdown_signal, sink, debounce).await;
        });

        self.autosave = Some(AutosaveTask { handle, shutdown });
        self
    }

    /// Record one block execution
    pub fn log_block(&self, entry: BlockLog) {
        let mut state = self.lock_state();
        debug!(
            run_id = %self.run_id,
            block_id = ?entry.block_id,
            block_type = ?entry.block_type,
            "Logged block execution"
        );
        state.logs.push(entry);
        drop(state);
        self.dirty.notify_one();
    }

    /// Attach run-level metadata
    pub fn add_metadata(&self, key: impl Into<String>, value: serde_json::Value) {
        self.lock_state().metadata.insert(key.into(), value);
        self.dirty.notify_one();
    }

    /// Number of blocks recorded so far
    pub fn block_count(&self) -> usize {
        self.lock_state().logs.len()
    }

    /// Run identifier
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Path of the run's JSON file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the autosave task, write the final snapshot and return its path
    pub async fn complete(mut self, success: bool) -> Result<PathBuf> {
        if let Some(task) = self.autosave.take() {
            task.shutdown.notify_one();
            if let Err(error) = task.handle.await {
                warn!(error = %error, "Autosave task did not shut down cleanly");
            }
        }

        let snapshot = self.lock_state().snapshot(Some(success));
        let json = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize final run snapshot")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write run log: {:?}", self.path))?;

        info!(
            run_id = %self.run_id,
            path = %self.path.display(),
            blocks = snapshot.logs.len(),
            "Run log completed"
        );

        Ok(self.path)
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn autosave_loop(
    state: Arc<Mutex<RunState>>,
    dirty: Arc<Notify>,
    shutdown: Arc<Notify>,
    sink: Arc<dyn SnapshotSink>,
    debounce: Duration,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = dirty.notified() => {
                // Debounce window: later writes within it coalesce into one
                // snapshot.
                tokio::time::sleep(debounce).await;
                let snapshot = state
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .snapshot(None);
                if let Err(error) = sink.write_snapshot(&snapshot).await {
                    warn!(error = %error, "Autosave snapshot failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::load_execution;
    use chrono::DateTime;
    use tempfile::TempDir;

    fn sample_block(id: &str, start: i64, duration: u64) -> BlockLog {
        BlockLog {
            block_id: Some(id.to_string()),
            block_type: Some("tool".to_string()),
            block_name: format!("{id} block"),
            started_at: DateTime::from_timestamp_millis(start).unwrap(),
            ended_at: DateTime::from_timestamp_millis(start + duration as i64).unwrap(),
            duration_ms: duration,
            error: None,
            output: None,
        }
    }

    #[tokio::test]
    async fn test_run_logger_complete() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let logger = RunLogger::new("wf-1", temp_dir.path())?;

        logger.log_block(sample_block("b1", 0, 100));
        logger.log_block(sample_block("b2", 100, 50));
        logger.add_metadata("trigger", serde_json::json!("manual"));
        assert_eq!(logger.block_count(), 2);

        let path = logger.complete(true).await?;
        assert!(path.exists());

        let loaded = load_execution(&path)?;
        assert_eq!(loaded.workflow_id.as_deref(), Some("wf-1"));
        assert_eq!(loaded.success, Some(true));
        assert_eq!(loaded.logs.len(), 2);
        assert_eq!(loaded.metadata.get("trigger"), Some(&serde_json::json!("manual")));

        Ok(())
    }

    #[tokio::test]
    async fn test_autosave_writes_intermediate_snapshot() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let logger =
            RunLogger::new("wf-2", temp_dir.path())?.with_autosave(Duration::from_millis(10));

        logger.log_block(sample_block("b1", 0, 100));

        // Give the debounced task time to flush.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = load_execution(logger.path())?;
        assert_eq!(snapshot.logs.len(), 1);
        assert_eq!(snapshot.success, None);

        let path = logger.complete(false).await?;
        let finished = load_execution(&path)?;
        assert_eq!(finished.success, Some(false));

        Ok(())
    }
}
