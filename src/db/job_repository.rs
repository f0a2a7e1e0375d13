use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::api::job::{JobRecord, JobStatus};
use crate::db::models::JobRow;
use crate::db::store::{JobStore, StoreError};

/// PostgreSQL-backed job table
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

impl JobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn put(&self, job: &JobRecord) -> Result<(), StoreError> {
        debug!("Upserting job: job_id={}, status={}", job.job_id, job.status);

        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, status, source_url, s3_key, processed_s3_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (job_id) DO UPDATE SET
                status = EXCLUDED.status,
                source_url = EXCLUDED.source_url,
                s3_key = EXCLUDED.s3_key,
                processed_s3_key = EXCLUDED.processed_s3_key,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&job.job_id)
        .bind(job.status.as_str())
        .bind(&job.source_url)
        .bind(&job.s3_key)
        .bind(&job.processed_s3_key)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, status, source_url, s3_key, processed_s3_key, created_at, updated_at
            FROM jobs
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(JobRecord::from))
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: &JobStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE jobs SET status = $2, updated_at = $3 WHERE job_id = $1")
            .bind(job_id)
            .bind(status.as_str())
            .bind(updated_at)
            .execute(&self.pool)
            .await?;

        debug!(
            "Status update for job {}: status={}, rows={}",
            job_id,
            status,
            result.rows_affected()
        );
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<JobRecord>, StoreError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, status, source_url, s3_key, processed_s3_key, created_at, updated_at
            FROM jobs
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Scanned {} job records", rows.len());
        Ok(rows.into_iter().map(JobRecord::from).collect())
    }
}
