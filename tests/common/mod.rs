#![allow(dead_code)]

use actix_web::{dev::ServerHandle, web, App, HttpResponse, HttpServer};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use data_pipeline::api::job::{JobRecord, JobService, JobStatus, ServiceSettings};
use data_pipeline::db::{JobStore, MemoryJobStore, StoreError};
use data_pipeline::fetch::Fetcher;
use data_pipeline::storage::ArtifactStore;

pub const MAX_PAYLOAD: usize = 1024 * 1024;

pub const USERS: &str = r#"[
  {"id": 1, "name": "Leanne Graham", "address": {"city": "Gwenborough", "geo": {"lat": "-37.3159"}}},
  {"id": 2, "name": "Ervin Howell", "address": {"city": "Wisokyburgh", "geo": {"lat": "-43.9509"}}}
]"#;

/// Source server standing in for third-party APIs.
pub struct Upstream {
    pub base_url: String,
    handle: ServerHandle,
}

impl Upstream {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

fn json_body(body: &'static str) -> HttpResponse {
    HttpResponse::Ok().content_type("application/json").body(body)
}

pub async fn spawn_upstream() -> Upstream {
    let server = HttpServer::new(|| {
        App::new()
            .route("/users", web::get().to(|| async { json_body(USERS) }))
            .route("/empty", web::get().to(|| async { json_body("[]") }))
            .route("/scalars", web::get().to(|| async { json_body("[1, 2]") }))
            .route("/single", web::get().to(|| async { json_body(r#"{"id": 7, "tags": [1, 2]}"#) }))
            .route(
                "/html",
                web::get().to(|| async {
                    HttpResponse::Ok()
                        .content_type("text/html")
                        .body("<html>not json</html>")
                }),
            )
            .route(
                "/unavailable",
                web::get().to(|| async { HttpResponse::ServiceUnavailable().finish() }),
            )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind upstream");

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    Upstream {
        base_url: format!("http://{addr}"),
        handle,
    }
}

/// Job table whose every call fails.
pub struct FailingStore;

#[async_trait]
impl JobStore for FailingStore {
    async fn put(&self, _job: &JobRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn get(&self, _job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn update_status(
        &self,
        _job_id: &str,
        _status: &JobStatus,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn scan(&self) -> Result<Vec<JobRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

pub struct TestContext {
    pub jobs: Arc<MemoryJobStore>,
    pub artifacts: ArtifactStore,
    pub service: web::Data<JobService>,
}

pub fn service_with(
    jobs: Arc<dyn JobStore>,
    artifacts: ArtifactStore,
    settings: ServiceSettings,
) -> web::Data<JobService> {
    web::Data::new(JobService::new(
        jobs,
        artifacts,
        Fetcher::new().expect("http client"),
        settings,
    ))
}

pub fn context() -> TestContext {
    let jobs = Arc::new(MemoryJobStore::new());
    let artifacts = ArtifactStore::in_memory();
    let service = service_with(jobs.clone(), artifacts.clone(), ServiceSettings::default());
    TestContext {
        jobs,
        artifacts,
        service,
    }
}
