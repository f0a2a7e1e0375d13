use actix_web::{http::StatusCode, HttpResponse};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dto::{JobStatistics, ProcessedFile, ResultsResponse, StatusResponse, SubmitResponse};
use super::models::{JobRecord, JobStatus, ProcessRequest};
use crate::api::response::{respond, ErrorResponse};
use crate::db::{JobStore, StoreError};
use crate::fetch::{FetchError, Fetcher};
use crate::storage::{paths, ArtifactStore, StorageError};
use crate::tabular;

/// Lifetime of download links returned by the results listing.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(3600);

const INTERNAL_ERROR: &str = "Internal server error";

/// Service-level errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Required input missing
    #[error("{0}")]
    Validation(String),

    #[error("Job not found")]
    NotFound,

    /// Source URL could not be fetched
    #[error("Failed to download from URL: {0}")]
    Upstream(#[source] FetchError),

    /// Raw artifact could not be written
    #[error("Failed to upload to S3: {0}")]
    Upload(#[source] StorageError),

    /// Job table read failed
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Framework error outside the handlers
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::Upstream(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Upload(_) | ServiceError::Store(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Render the error envelope. With `expose_details` off, 500 bodies carry
    /// no raw error text.
    pub fn to_response(&self, expose_details: bool) -> HttpResponse {
        let status = self.status_code();
        match self {
            ServiceError::Validation(_) | ServiceError::NotFound | ServiceError::Upstream(_) => {
                warn!("Request rejected: {}", self);
                respond(status, &ErrorResponse::new(self.to_string()))
            }
            ServiceError::Upload(_) | ServiceError::Store(_) => {
                error!("Request failed: {}", self);
                let body = if expose_details {
                    ErrorResponse::new(self.to_string())
                } else {
                    ErrorResponse::new(INTERNAL_ERROR)
                };
                respond(status, &body)
            }
            ServiceError::Internal(details) => {
                error!("Error processing request: {}", details);
                let body = if expose_details {
                    ErrorResponse::with_details(INTERNAL_ERROR, details.clone())
                } else {
                    ErrorResponse::new(INTERNAL_ERROR)
                };
                respond(status, &body)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub expose_error_details: bool,
    pub service_version: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            expose_error_details: true,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Job service containing business logic
///
/// Holds the process-wide handles to the job table, the artifact store and the
/// upstream HTTP client. Built once at startup and shared by every request.
pub struct JobService {
    jobs: Arc<dyn JobStore>,
    artifacts: ArtifactStore,
    fetcher: Fetcher,
    settings: ServiceSettings,
}

impl JobService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        artifacts: ArtifactStore,
        fetcher: Fetcher,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            jobs,
            artifacts,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Submit a fetch-and-derive job
    ///
    /// # Business Logic
    /// - Fetches the source URL (errors are reported, never retried)
    /// - Writes the raw payload under `raw-data/{job_id}/`
    /// - Derives CSV; a derivation failure only leaves the job `processing`
    /// - Upserts the job record, best effort
    pub async fn submit(&self, request: ProcessRequest) -> Result<SubmitResponse, ServiceError> {
        let url = request
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ServiceError::Validation("URL is required".to_string()))?;

        let job_id = Uuid::new_v4().to_string();
        info!("Job {}: downloading data from URL: {}", job_id, url);

        let payload = self
            .fetcher
            .get_success(&url)
            .await
            .map_err(ServiceError::Upstream)?;

        let derived = tabular::derive_document(&payload);

        let s3_key = paths::raw_key(&job_id);
        self.artifacts
            .put(&s3_key, payload, "application/json")
            .await
            .map_err(ServiceError::Upload)?;
        info!("Raw data uploaded: {}", self.artifacts.location(&s3_key));

        let processed_s3_key = match derived {
            Ok(csv) => self.store_processed(&job_id, csv).await,
            Err(e) => {
                warn!("Job {}: failed to process data to CSV: {}", job_id, e);
                None
            }
        };

        let record = JobRecord::new(
            job_id.clone(),
            url,
            s3_key.clone(),
            processed_s3_key,
            Utc::now(),
        );
        if let Err(e) = self.jobs.put(&record).await {
            warn!("Job {}: failed to store job record: {}", job_id, e);
        }

        Ok(SubmitResponse {
            job_id,
            status: JobStatus::Processing,
            message: "Data processing started".to_string(),
            s3_location: self.artifacts.location(&s3_key),
        })
    }

    async fn store_processed(&self, job_id: &str, csv: String) -> Option<String> {
        let key = paths::processed_key(job_id);
        match self.artifacts.put(&key, csv, "text/csv").await {
            Ok(()) => {
                info!("Processed data uploaded: {}", self.artifacts.location(&key));
                Some(key)
            }
            Err(e) => {
                warn!("Job {}: failed to upload processed CSV: {}", job_id, e);
                None
            }
        }
    }

    /// Look up a job and reconcile its status with the artifacts present.
    ///
    /// Any artifact under `processed-data/{job_id}/` marks the job completed;
    /// the correction is written back to the job table.
    pub async fn status(&self, job_id: &str) -> Result<StatusResponse, ServiceError> {
        if job_id.trim().is_empty() {
            return Err(ServiceError::Validation("Job ID is required".to_string()));
        }

        let mut job = self.jobs.get(job_id).await?.ok_or(ServiceError::NotFound)?;

        let processed_files: Vec<String> = match self
            .artifacts
            .list(&paths::processed_prefix(job_id))
            .await
        {
            Ok(entries) => entries.into_iter().map(|meta| meta.key).collect(),
            Err(e) => {
                warn!("Job {}: error checking processed files: {}", job_id, e);
                Vec::new()
            }
        };

        if !processed_files.is_empty() && job.status != JobStatus::Completed {
            let now = Utc::now();
            job.status = JobStatus::Completed;
            match self
                .jobs
                .update_status(job_id, &JobStatus::Completed, now)
                .await
            {
                Ok(()) => {
                    info!("Job {}: status corrected to completed", job_id);
                    job.updated_at = now;
                }
                Err(e) => warn!("Job {}: failed to persist status correction: {}", job_id, e),
            }
        }

        Ok(StatusResponse::new(job, processed_files))
    }

    /// List every derived CSV with a download link, plus job counts by status.
    pub async fn results(&self) -> Result<ResultsResponse, ServiceError> {
        let mut processed_files = Vec::new();

        match self.artifacts.list(&paths::all_processed_prefix()).await {
            Ok(entries) => {
                for meta in entries.into_iter().filter(|m| m.key.ends_with(".csv")) {
                    match self.artifacts.download_url(&meta.key, DOWNLOAD_URL_TTL).await {
                        Ok(download_url) => processed_files.push(ProcessedFile {
                            file_name: paths::file_name(&meta.key).to_string(),
                            size: meta.size,
                            last_modified: meta.last_modified,
                            download_url,
                            s3_key: meta.key,
                        }),
                        Err(e) => warn!("Failed to sign download link for {}: {}", meta.key, e),
                    }
                }
            }
            Err(e) => warn!("Error listing processed files: {}", e),
        }

        let statistics = match self.jobs.scan().await {
            Ok(jobs) => JobStatistics::tally(&jobs),
            Err(e) => {
                warn!("Error getting job statistics: {}", e);
                JobStatistics::default()
            }
        };

        Ok(ResultsResponse {
            total_files: processed_files.len(),
            processed_files,
            statistics,
        })
    }
}
