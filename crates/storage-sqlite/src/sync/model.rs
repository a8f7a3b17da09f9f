//! Database model for sync runs.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use bondboard_core::ingest::{RunStatus, SyncMode, SyncRun};

#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Serialize,
    Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::sync_runs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncRunDB {
    pub id: String,
    pub mode: String,
    pub status: String,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub error: Option<String>,
}

impl SyncRunDB {
    pub fn begin(mode: SyncMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode: mode.as_str().to_string(),
            status: RunStatus::Running.as_str().to_string(),
            started_at: chrono::Utc::now().naive_utc(),
            completed_at: None,
            error: None,
        }
    }
}

impl From<SyncRunDB> for SyncRun {
    fn from(db: SyncRunDB) -> Self {
        Self {
            id: db.id,
            mode: match db.mode.as_str() {
                "FULL" => SyncMode::Full,
                _ => SyncMode::Incremental,
            },
            status: match db.status.as_str() {
                "COMPLETED" => RunStatus::Completed,
                "FAILED" => RunStatus::Failed,
                _ => RunStatus::Running,
            },
            started_at: db.started_at,
            completed_at: db.completed_at,
            error: db.error,
        }
    }
}
