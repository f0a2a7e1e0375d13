//! Scheduled extraction: fetch one document, store it as JSON and CSV.

pub mod scheduler;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::fetch::{FetchError, Fetcher};
use crate::storage::paths::ExtractionKeys;
use crate::storage::{ArtifactStore, StorageError};
use crate::tabular::{self, TabularError};

pub use scheduler::ExtractionScheduler;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("API error: {0}")]
    Api(u16),

    #[error("invalid JSON from source: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Tabular(#[from] TabularError),
}

/// Result of one extraction, reported only to logs (and the `extract` command).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    Success {
        message: String,
        records_processed: usize,
        json_file: String,
        csv_file: Option<String>,
    },
    Failure {
        error: String,
    },
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success { .. })
    }

    pub fn status_code(&self) -> u16 {
        if self.is_success() {
            200
        } else {
            500
        }
    }
}

/// Stored form of an extracted document.
#[derive(Debug, Serialize)]
struct WrappedDocument<'a> {
    extraction_timestamp: DateTime<Utc>,
    source_api: &'a str,
    record_count: usize,
    data: &'a Value,
}

/// Fetches the configured source and writes both renderings.
#[derive(Debug, Clone)]
pub struct Extractor {
    artifacts: ArtifactStore,
    fetcher: Fetcher,
    api_url: String,
}

impl Extractor {
    pub fn new(artifacts: ArtifactStore, fetcher: Fetcher, api_url: impl Into<String>) -> Self {
        Self {
            artifacts,
            fetcher,
            api_url: api_url.into(),
        }
    }

    /// Run one extraction stamped at `now`. Never fails; errors become a
    /// `Failure` outcome. A JSON artifact already written before a later
    /// failure stays in place.
    pub async fn run_once(&self, now: DateTime<Utc>) -> ExtractionOutcome {
        match self.extract(now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error in data extraction: {}", e);
                ExtractionOutcome::Failure {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn extract(&self, now: DateTime<Utc>) -> Result<ExtractionOutcome, ExtractionError> {
        info!("Extracting data from: {}", self.api_url);

        let fetched = self.fetcher.get(&self.api_url).await?;
        if fetched.status != 200 {
            return Err(ExtractionError::Api(fetched.status));
        }

        let data: Value = serde_json::from_str(&fetched.body)?;
        let records = tabular::records_of(&data);
        info!("Data extracted: {} records", records.len());

        let keys = ExtractionKeys::at(now);
        let wrapped = WrappedDocument {
            extraction_timestamp: now,
            source_api: &self.api_url,
            record_count: records.len(),
            data: &data,
        };
        self.artifacts
            .put(&keys.json, serde_json::to_string_pretty(&wrapped)?, "application/json")
            .await?;
        info!("Data saved: {}", self.artifacts.location(&keys.json));

        let csv_file = if records.is_empty() {
            info!("No records extracted, skipping CSV rendering");
            None
        } else {
            let csv = tabular::derive(records)?;
            self.artifacts.put(&keys.csv, csv, "text/csv").await?;
            info!("CSV data saved: {}", self.artifacts.location(&keys.csv));
            Some(keys.csv)
        };

        Ok(ExtractionOutcome::Success {
            message: "Data extracted and saved successfully".to_string(),
            records_processed: records.len(),
            json_file: keys.json,
            csv_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_source_is_failure_without_artifacts() {
        let artifacts = ArtifactStore::in_memory();
        let extractor = Extractor::new(
            artifacts.clone(),
            Fetcher::new().unwrap(),
            "http://127.0.0.1:1/users",
        );

        let outcome = extractor.run_once(Utc::now()).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.status_code(), 500);
        assert!(artifacts.list("data/").await.unwrap().is_empty());
    }

    #[test]
    fn test_outcome_serialization() {
        let success = ExtractionOutcome::Success {
            message: "ok".to_string(),
            records_processed: 2,
            json_file: "data/users/a_users.json".to_string(),
            csv_file: None,
        };
        let failure = ExtractionOutcome::Failure {
            error: "API error: 503".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({
                "message": "ok",
                "records_processed": 2,
                "json_file": "data/users/a_users.json",
                "csv_file": null
            })
        );
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({"error": "API error: 503"})
        );
    }
}
