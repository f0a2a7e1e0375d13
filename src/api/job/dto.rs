use chrono::{DateTime, Utc};
use serde::Serialize;

use super::models::{JobRecord, JobStatus};

/// 202 body for `POST /process`
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
    pub s3_location: String,
}

/// 200 body for `GET /status/{job_id}`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_url: String,
    pub processed_files: Vec<String>,
}

impl StatusResponse {
    pub fn new(job: JobRecord, processed_files: Vec<String>) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
            source_url: job.source_url,
            processed_files,
        }
    }
}

/// One derived artifact with a time-limited download link
#[derive(Debug, Serialize)]
pub struct ProcessedFile {
    pub file_name: String,
    pub s3_key: String,
    pub size: usize,
    pub last_modified: DateTime<Utc>,
    pub download_url: String,
}

/// Job counts by status. Jobs with any other status count only toward the total.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatistics {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub processing_jobs: usize,
}

impl JobStatistics {
    pub fn tally(jobs: &[JobRecord]) -> Self {
        jobs.iter().fold(
            Self {
                total_jobs: jobs.len(),
                ..Self::default()
            },
            |mut stats, job| {
                match job.status {
                    JobStatus::Completed => stats.completed_jobs += 1,
                    JobStatus::Processing => stats.processing_jobs += 1,
                    JobStatus::Other(_) => {}
                }
                stats
            },
        )
    }
}

/// 200 body for `GET /results`
#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub processed_files: Vec<ProcessedFile>,
    pub statistics: JobStatistics,
    pub total_files: usize,
}
