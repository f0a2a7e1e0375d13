//! Artifact key conventions.
//!
//! Every write goes to a fresh key derived from a job id or an extraction
//! timestamp, so artifacts are never overwritten.

use chrono::{DateTime, Utc};

pub const RAW_PREFIX: &str = "raw-data";
pub const PROCESSED_PREFIX: &str = "processed-data";

const EXTRACTION_JSON_PREFIX: &str = "data/users";
const EXTRACTION_CSV_PREFIX: &str = "data/users_csv";
const EXTRACTION_STAMP: &str = "%Y/%m/%d/%H%M%S";

/// `raw-data/{job_id}/data.json`
pub fn raw_key(job_id: &str) -> String {
    format!("{RAW_PREFIX}/{job_id}/data.json")
}

/// `processed-data/{job_id}/data.csv`
pub fn processed_key(job_id: &str) -> String {
    format!("{PROCESSED_PREFIX}/{job_id}/data.csv")
}

/// Prefix under which every derived artifact of a job lives.
pub fn processed_prefix(job_id: &str) -> String {
    format!("{PROCESSED_PREFIX}/{job_id}/")
}

/// Prefix covering derived artifacts of all jobs.
pub fn all_processed_prefix() -> String {
    format!("{PROCESSED_PREFIX}/")
}

/// Keys written by one scheduled extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionKeys {
    pub json: String,
    pub csv: String,
}

impl ExtractionKeys {
    /// Build the `data/users/...` and `data/users_csv/...` keys for an extraction at `at`.
    pub fn at(at: DateTime<Utc>) -> Self {
        let stamp = at.format(EXTRACTION_STAMP);
        Self {
            json: format!("{EXTRACTION_JSON_PREFIX}/{stamp}_users.json"),
            csv: format!("{EXTRACTION_CSV_PREFIX}/{stamp}_users.csv"),
        }
    }
}

/// Last path segment of a key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_job_keys() {
        assert_eq!(raw_key("abc"), "raw-data/abc/data.json");
        assert_eq!(processed_key("abc"), "processed-data/abc/data.csv");
        assert!(processed_key("abc").starts_with(&processed_prefix("abc")));
        assert!(processed_prefix("abc").starts_with(&all_processed_prefix()));
    }

    #[test]
    fn test_extraction_keys() {
        let at = Utc.with_ymd_and_hms(2026, 1, 8, 4, 5, 9).unwrap();
        let keys = ExtractionKeys::at(at);

        assert_eq!(keys.json, "data/users/2026/01/08/040509_users.json");
        assert_eq!(keys.csv, "data/users_csv/2026/01/08/040509_users.csv");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("processed-data/abc/data.csv"), "data.csv");
        assert_eq!(file_name("plain"), "plain");
    }
}
