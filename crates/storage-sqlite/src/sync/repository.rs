//! Repository for sync run rows and the incremental watermark.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;

use bondboard_core::errors::{DatabaseError, Result};
use bondboard_core::ingest::{RunStatus, SyncMode, SyncRun, SyncRunStore};

use super::model::SyncRunDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::sync_runs;

pub struct SyncRunRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncRunRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl SyncRunStore for SyncRunRepository {
    async fn begin_run(&self, mode: SyncMode) -> Result<SyncRun> {
        self.writer
            .exec(move |conn| {
                let row = SyncRunDB::begin(mode);
                diesel::insert_into(sync_runs::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(SyncRun::from(row))
            })
            .await
    }

    async fn complete_run(&self, run_id: &str) -> Result<()> {
        let run_id = run_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(sync_runs::table.find(&run_id))
                    .set((
                        sync_runs::status.eq(RunStatus::Completed.as_str()),
                        sync_runs::completed_at.eq(Some(chrono::Utc::now().naive_utc())),
                    ))
                    .execute(conn)
                    .into_core()?;
                if updated == 0 {
                    return Err(DatabaseError::NotFound(run_id.clone()).into());
                }
                Ok(())
            })
            .await
    }

    async fn fail_run(&self, run_id: &str, error: &str) -> Result<()> {
        let run_id = run_id.to_string();
        let error = error.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(sync_runs::table.find(&run_id))
                    .set((
                        sync_runs::status.eq(RunStatus::Failed.as_str()),
                        sync_runs::completed_at.eq(Some(chrono::Utc::now().naive_utc())),
                        sync_runs::error.eq(Some(error.clone())),
                    ))
                    .execute(conn)
                    .into_core()?;
                if updated == 0 {
                    return Err(DatabaseError::NotFound(run_id.clone()).into());
                }
                Ok(())
            })
            .await
    }

    async fn last_successful_completion(&self) -> Result<Option<NaiveDateTime>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_runs::table
            .filter(sync_runs::status.eq(RunStatus::Completed.as_str()))
            .order(sync_runs::completed_at.desc())
            .select(SyncRunDB::as_select())
            .first::<SyncRunDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.and_then(|run| run.completed_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use tempfile::TempDir;

    async fn repository(dir: &TempDir) -> SyncRunRepository {
        let db_path = dir.path().join("test.db");
        let db_path = db_path.to_str().unwrap();
        crate::db::init(db_path).unwrap();
        let pool = create_pool(db_path).unwrap();
        run_migrations(&pool).unwrap();
        let writer = spawn_writer((*pool).clone());
        SyncRunRepository::new(pool, writer)
    }

    #[tokio::test]
    async fn test_watermark_ignores_running_and_failed_runs() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        assert!(repo.last_successful_completion().await.unwrap().is_none());

        let failed = repo.begin_run(SyncMode::Full).await.unwrap();
        repo.fail_run(&failed.id, "fetch blew up").await.unwrap();
        assert!(repo.last_successful_completion().await.unwrap().is_none());

        let good = repo.begin_run(SyncMode::Full).await.unwrap();
        repo.complete_run(&good.id).await.unwrap();
        let _still_running = repo.begin_run(SyncMode::Incremental).await.unwrap();

        assert!(repo.last_successful_completion().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_completing_unknown_run_is_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        assert!(repo.complete_run("no-such-run").await.is_err());
    }
}
