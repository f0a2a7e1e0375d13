use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::job::{JobRecord, JobStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("job table unavailable: {0}")]
    Unavailable(String),
}

/// Job table keyed by `job_id`.
///
/// Writes are last-writer-wins; no transactional guarantees are made across calls.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or overwrite a record. `created_at` of an existing record is kept.
    async fn put(&self, job: &JobRecord) -> Result<(), StoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Rewrite `status` and `updated_at` in place.
    async fn update_status(
        &self,
        job_id: &str,
        status: &JobStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Every record in the table.
    async fn scan(&self) -> Result<Vec<JobRecord>, StoreError>;
}
