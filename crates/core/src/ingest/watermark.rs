//! Sync run bookkeeping.
//!
//! Every orchestrated sync writes a `SyncRun` row before touching the
//! exchanges and closes it on the way out. The completion timestamp of
//! the most recent successful run is the watermark that incremental
//! syncs resume from.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::orchestrator::SyncMode;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: String,
    pub mode: SyncMode,
    pub status: RunStatus,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    /// Present only for failed runs.
    pub error: Option<String>,
}

#[async_trait]
pub trait SyncRunStore: Send + Sync {
    /// Open a run in `Running` state and return it.
    async fn begin_run(&self, mode: SyncMode) -> Result<SyncRun>;

    /// Mark a run `Completed` and stamp its completion time.
    async fn complete_run(&self, run_id: &str) -> Result<()>;

    /// Mark a run `Failed`, recording the failure message.
    async fn fail_run(&self, run_id: &str, error: &str) -> Result<()>;

    /// Completion timestamp of the newest `Completed` run, if any.
    async fn last_successful_completion(&self) -> Result<Option<NaiveDateTime>>;
}
