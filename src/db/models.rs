use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::api::job::{JobRecord, JobStatus};

/// Database representation of a job with all fields
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub job_id: String,
    pub status: String,
    pub source_url: String,
    pub s3_key: String,
    pub processed_s3_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        JobRecord {
            job_id: row.job_id,
            status: JobStatus::parse(&row.status),
            source_url: row.source_url,
            s3_key: row.s3_key,
            processed_s3_key: row.processed_s3_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
