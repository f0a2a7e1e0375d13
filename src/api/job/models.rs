use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Job status as stored in the job table.
///
/// Only `processing` and `completed` are written by this service; any other
/// value found in the table is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    #[serde(untagged)]
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Other(s) => s,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted fetch-and-derive request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub source_url: String,
    pub s3_key: String,
    pub processed_s3_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// New record; `completed` when a derived artifact was written, else `processing`.
    pub fn new(
        job_id: String,
        source_url: String,
        s3_key: String,
        processed_s3_key: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let status = if processed_s3_key.is_some() {
            JobStatus::Completed
        } else {
            JobStatus::Processing
        };

        Self {
            job_id,
            status,
            source_url,
            s3_key,
            processed_s3_key,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `POST /process`.
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequest {
    #[validate(
        required(message = "URL is required"),
        length(min = 1, message = "URL is required")
    )]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Other("failed".to_string()),
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_status_serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_value(JobStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
        assert_eq!(
            serde_json::to_value(JobStatus::Other("unknown".into())).unwrap(),
            serde_json::json!("unknown")
        );
    }

    #[test]
    fn test_new_record_status_follows_derivation() {
        let now = Utc::now();
        let done = JobRecord::new("a".into(), "u".into(), "k".into(), Some("p".into()), now);
        let pending = JobRecord::new("b".into(), "u".into(), "k".into(), None, now);

        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(pending.status, JobStatus::Processing);
        assert_eq!(done.created_at, done.updated_at);
    }

    #[test]
    fn test_process_request_requires_url() {
        let missing: ProcessRequest = serde_json::from_str("{}").unwrap();
        let empty: ProcessRequest = serde_json::from_str(r#"{"url": ""}"#).unwrap();
        let ok: ProcessRequest = serde_json::from_str(r#"{"url": "http://x"}"#).unwrap();

        assert!(missing.validate().is_err());
        assert!(empty.validate().is_err());
        assert!(ok.validate().is_ok());
    }
}
