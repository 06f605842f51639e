//! Agent status records and the on-disk status store
//!
//! One JSON file per agent, `<agent>-status.json`, living in the project's
//! logs directory. The launcher writes the initial record; the spawned agent
//! script owns every write after that. Readers tolerate malformed files by
//! converting them into synthetic error records.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, RunnerError};

/// Name of the per-project logs directory
pub const LOGS_DIR_NAME: &str = ".agent-logs";

/// Suffix of status record files
const STATUS_FILE_SUFFIX: &str = "-status.json";

/// Lifecycle state reported by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Agent process is still working
    Running,
    /// Agent process finished successfully
    Complete,
    /// Agent process failed, or its record could not be read
    Error,
}

impl AgentState {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk status record for a single agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Last reported lifecycle state
    pub status: AgentState,
    /// When the agent was started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    /// When the agent reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    /// Agent name (the feature name at spawn time)
    pub agent: String,
    /// Error detail for the `error` state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusRecord {
    /// Initial record written before the agent process starts
    pub fn running(agent: impl Into<String>) -> Self {
        Self {
            status: AgentState::Running,
            started: Some(Utc::now()),
            completed: None,
            agent: agent.into(),
            error: None,
        }
    }

    /// Synthetic record standing in for a file that could not be read
    fn unreadable(agent: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: AgentState::Error,
            started: None,
            completed: None,
            agent: agent.into(),
            error: Some(detail.into()),
        }
    }
}

/// Write a status record as a whole-file replace
///
/// Writes to a uniquely-named temp file in the same directory, then renames
/// over the destination so readers never observe partial content.
pub(crate) async fn write_record_atomic(path: &Path, record: &StatusRecord) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4().as_hyphenated()));

    let content = serde_json::to_string_pretty(record)?;
    tokio::fs::write(&temp_path, content).await?;

    if let Err(err) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(err.into());
    }

    Ok(())
}

/// Read access to the status records of a project
#[derive(Debug, Clone)]
pub struct StatusStore {
    /// Directory holding status and log files
    logs_dir: PathBuf,
}

impl StatusStore {
    /// Create a store for the given project root
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            logs_dir: project_root.as_ref().join(LOGS_DIR_NAME),
        }
    }

    /// Get the logs directory path
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Get the status file path for an agent
    pub fn status_path(&self, agent: &str) -> PathBuf {
        self.logs_dir
            .join(format!("{}{}", agent, STATUS_FILE_SUFFIX))
    }

    /// List all status records, sorted by agent name
    ///
    /// A missing logs directory yields an empty list. Files that fail to
    /// parse become synthetic `error` records named after the file stem, so
    /// one corrupt record never hides the others.
    pub async fn list(&self) -> Result<Vec<StatusRecord>> {
        if !self.logs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.logs_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(agent) = name.strip_suffix(STATUS_FILE_SUFFIX) else {
                continue;
            };

            let record = match tokio::fs::read_to_string(entry.path()).await {
                Ok(content) => match serde_json::from_str::<StatusRecord>(&content) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Malformed status record {}: {}", name, e);
                        StatusRecord::unreadable(agent, e.to_string())
                    }
                },
                Err(e) => {
                    warn!("Unreadable status record {}: {}", name, e);
                    StatusRecord::unreadable(agent, e.to_string())
                }
            };

            records.push(record);
        }

        records.sort_by(|a, b| a.agent.cmp(&b.agent));
        Ok(records)
    }

    /// Delete an agent's status record if present
    pub async fn remove(&self, agent: &str) -> Result<bool> {
        let path = self.status_path(agent);
        if !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(&path).await?;
        debug!("Removed status record for {}", agent);
        Ok(true)
    }

    /// Poll until no record reports `running` and at least one record exists
    ///
    /// Re-lists on every iteration and hands the fresh records to `on_poll`
    /// before deciding whether to continue; suspends cooperatively between
    /// polls. With `timeout: None` this polls indefinitely (ended only by
    /// process termination); a deadline yields `ConvergenceTimeout` with
    /// agents still running.
    pub async fn await_convergence<F>(
        &self,
        interval: Duration,
        timeout: Option<Duration>,
        mut on_poll: F,
    ) -> Result<Vec<StatusRecord>>
    where
        F: FnMut(&[StatusRecord]),
    {
        let started = Instant::now();

        loop {
            let records = self.list().await?;
            on_poll(&records);

            let running = records
                .iter()
                .filter(|r| r.status == AgentState::Running)
                .count();
            if running == 0 && !records.is_empty() {
                return Ok(records);
            }

            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    return Err(RunnerError::ConvergenceTimeout {
                        seconds: limit.as_secs(),
                    });
                }
            }

            tokio::time::sleep(interval).await;
        }
    }
}

/// Format a status summary for display
///
/// Pure formatting over the already-loaded records; safe to call on every
/// poll iteration.
pub fn render(records: &[StatusRecord]) -> String {
    let mut out = String::new();
    out.push_str("AGENT STATUS\n");

    if records.is_empty() {
        out.push_str("  No agents found. Use `hive spawn` to start one.\n");
        return out;
    }

    let mut running = 0;
    let mut complete = 0;

    for record in records {
        let icon = match record.status {
            AgentState::Running => {
                running += 1;
                "[...]"
            }
            AgentState::Complete => {
                complete += 1;
                "[ OK]"
            }
            AgentState::Error => "[ERR]",
        };

        let _ = writeln!(out, "  {} {} - {}", icon, record.agent, record.status);
        if let Some(started) = record.started {
            let _ = writeln!(out, "        Started:   {}", started.to_rfc3339());
        }
        if let Some(completed) = record.completed {
            let _ = writeln!(out, "        Completed: {}", completed.to_rfc3339());
        }
        if let Some(error) = &record.error {
            let _ = writeln!(out, "        Error:     {}", error);
        }
    }

    let _ = writeln!(
        out,
        "\nSummary: {}/{} complete, {} running",
        complete,
        records.len(),
        running
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store_with_logs_dir() -> (StatusStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::new(dir.path());
        tokio::fs::create_dir_all(store.logs_dir()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::new(dir.path());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_converts_malformed_records() {
        let (store, _dir) = store_with_logs_dir().await;

        write_record_atomic(
            &store.status_path("alpha"),
            &StatusRecord {
                status: AgentState::Complete,
                started: Some(Utc::now()),
                completed: Some(Utc::now()),
                agent: "alpha".to_string(),
                error: None,
            },
        )
        .await
        .unwrap();
        tokio::fs::write(store.status_path("broken"), "{not json")
            .await
            .unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].agent, "alpha");
        assert_eq!(records[0].status, AgentState::Complete);
        assert_eq!(records[1].agent, "broken");
        assert_eq!(records[1].status, AgentState::Error);
        assert!(records[1].error.is_some());
    }

    #[tokio::test]
    async fn test_list_ignores_other_files() {
        let (store, _dir) = store_with_logs_dir().await;

        tokio::fs::write(store.logs_dir().join("alpha-2026-01-01.log"), "output")
            .await
            .unwrap();
        write_record_atomic(&store.status_path("alpha"), &StatusRecord::running("alpha"))
            .await
            .unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent, "alpha");
    }

    #[tokio::test]
    async fn test_remove_record() {
        let (store, _dir) = store_with_logs_dir().await;

        write_record_atomic(&store.status_path("alpha"), &StatusRecord::running("alpha"))
            .await
            .unwrap();

        assert!(store.remove("alpha").await.unwrap());
        assert!(!store.remove("alpha").await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_render_counts() {
        let records = vec![
            StatusRecord {
                status: AgentState::Complete,
                started: None,
                completed: None,
                agent: "a".to_string(),
                error: None,
            },
            StatusRecord::running("b"),
        ];

        let rendered = render(&records);
        assert!(rendered.contains("[ OK] a - complete"));
        assert!(rendered.contains("[...] b - running"));
        assert!(rendered.contains("1/2 complete, 1 running"));
    }

    #[tokio::test]
    async fn test_render_empty() {
        let rendered = render(&[]);
        assert!(rendered.contains("No agents found"));
    }

    #[tokio::test]
    async fn test_convergence_returns_once_nothing_runs() {
        let (store, _dir) = store_with_logs_dir().await;

        write_record_atomic(&store.status_path("alpha"), &StatusRecord::running("alpha"))
            .await
            .unwrap();

        // Flip the record to complete while the watcher is polling
        let flip_path = store.status_path("alpha");
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            let record = StatusRecord {
                status: AgentState::Complete,
                started: Some(Utc::now()),
                completed: Some(Utc::now()),
                agent: "alpha".to_string(),
                error: None,
            };
            write_record_atomic(&flip_path, &record).await.unwrap();
        });

        let mut polls = 0;
        let records = store
            .await_convergence(
                Duration::from_millis(10),
                Some(Duration::from_secs(5)),
                |_| polls += 1,
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AgentState::Complete);
        assert!(polls >= 2);
    }

    #[tokio::test]
    async fn test_convergence_never_reported_without_records() {
        let (store, _dir) = store_with_logs_dir().await;

        let result = store
            .await_convergence(
                Duration::from_millis(5),
                Some(Duration::from_millis(50)),
                |_| {},
            )
            .await;

        assert!(matches!(
            result,
            Err(RunnerError::ConvergenceTimeout { .. })
        ));
    }
}
