//! End-to-end check of a running deployment.
//!
//! Walks health, submission, status and results in order against `base_url`.
//! Each step is recorded and the walk stops at the first failure.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Source used for the submission step when none is given.
pub const DEFAULT_SOURCE_URL: &str = "https://jsonplaceholder.typicode.com/posts";

#[derive(Debug, Clone, Serialize)]
pub struct SmokeStep {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SmokeReport {
    pub steps: Vec<SmokeStep>,
}

impl SmokeReport {
    pub fn passed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|step| step.passed)
    }

    fn record(&mut self, name: &'static str, result: Result<String, String>) -> bool {
        let (passed, detail) = match result {
            Ok(detail) => (true, detail),
            Err(detail) => (false, detail),
        };
        if passed {
            info!("[smoke] {}: ok ({})", name, detail);
        } else {
            warn!("[smoke] {}: FAILED ({})", name, detail);
        }
        self.steps.push(SmokeStep {
            name,
            passed,
            detail,
        });
        passed
    }
}

async fn call(
    request: reqwest::RequestBuilder,
    expected: u16,
) -> Result<Value, String> {
    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status().as_u16();
    let body: Value = response.json().await.map_err(|e| e.to_string())?;
    if status != expected {
        return Err(format!("expected {expected}, got {status}: {body}"));
    }
    Ok(body)
}

/// Run the steps against `base_url` in order, stopping at the first failure.
pub async fn run(client: &reqwest::Client, base_url: &str, source_url: &str) -> SmokeReport {
    let base = base_url.trim_end_matches('/');
    let mut report = SmokeReport::default();

    let health = call(client.get(format!("{base}/health")), 200)
        .await
        .and_then(|body| match body["status"].as_str() {
            Some("healthy") => Ok(format!("version {}", body["version"])),
            other => Err(format!("unexpected status {other:?}")),
        });
    if !report.record("health", health) {
        return report;
    }

    let submitted = call(
        client
            .post(format!("{base}/process"))
            .json(&serde_json::json!({ "url": source_url })),
        202,
    )
    .await
    .and_then(|body| {
        body["job_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("no job_id in {body}"))
    });
    let job_id = match submitted {
        Ok(job_id) => {
            report.record("process", Ok(format!("job {job_id}")));
            job_id
        }
        Err(e) => {
            report.record("process", Err(e));
            return report;
        }
    };

    let status = call(client.get(format!("{base}/status/{job_id}")), 200)
        .await
        .and_then(|body| match body["job_id"].as_str() {
            Some(id) if id == job_id => Ok(format!("status {}", body["status"])),
            _ => Err(format!("job id mismatch in {body}")),
        });
    if !report.record("status", status) {
        return report;
    }

    let results = call(client.get(format!("{base}/results")), 200)
        .await
        .and_then(|body| match body["total_files"].as_u64() {
            Some(total) => Ok(format!(
                "{total} files, {} jobs",
                body["statistics"]["total_jobs"]
            )),
            None => Err(format!("no total_files in {body}")),
        });
    report.record("results", results);

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_passes_only_when_every_step_passes() {
        let mut report = SmokeReport::default();
        assert!(!report.passed());

        report.record("health", Ok("version 1.0.0".to_string()));
        assert!(report.passed());

        report.record("process", Err("expected 202, got 400".to_string()));
        assert!(!report.passed());
        assert_eq!(report.steps.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_deployment_stops_at_health() {
        let client = reqwest::Client::new();
        let report = run(&client, "http://127.0.0.1:1/", DEFAULT_SOURCE_URL).await;

        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].name, "health");
        assert!(!report.passed());
    }
}
