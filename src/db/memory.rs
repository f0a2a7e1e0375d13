use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::api::job::{JobRecord, JobStatus};
use crate::db::store::{JobStore, StoreError};

/// Process-local job table for development and tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: &JobRecord) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let mut record = job.clone();
        if let Some(existing) = jobs.get(&job.job_id) {
            record.created_at = existing.created_at;
        }
        jobs.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: &JobStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(job) = self.jobs.write().await.get_mut(job_id) {
            job.status = status.clone();
            job.updated_at = updated_at;
        }
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<JobRecord>, StoreError> {
        let mut jobs: Vec<JobRecord> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(job_id: &str, processed: Option<&str>) -> JobRecord {
        JobRecord::new(
            job_id.to_string(),
            "http://example.test/users".to_string(),
            format!("raw-data/{job_id}/data.json"),
            processed.map(str::to_string),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryJobStore::new();
        let job = record("a", None);
        store.put(&job).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(job));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_keeps_created_at() {
        let store = MemoryJobStore::new();
        let first = record("a", None);
        store.put(&first).await.unwrap();

        let mut second = record("a", Some("processed-data/a/data.csv"));
        second.created_at = first.created_at + Duration::seconds(30);
        store.put(&second).await.unwrap();

        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_status_in_place() {
        let store = MemoryJobStore::new();
        let job = record("a", None);
        store.put(&job).await.unwrap();

        let later = job.updated_at + Duration::seconds(5);
        store
            .update_status("a", &JobStatus::Completed, later)
            .await
            .unwrap();

        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.updated_at, later);
        assert_eq!(stored.created_at, job.created_at);
    }

    #[tokio::test]
    async fn test_update_unknown_job_is_noop() {
        let store = MemoryJobStore::new();
        store
            .update_status("ghost", &JobStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert!(store.scan().await.unwrap().is_empty());
    }
}
