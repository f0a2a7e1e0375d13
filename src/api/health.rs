use actix_web::{get, http::StatusCode, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::job::JobService;
use crate::api::response::respond;

pub const SERVICE_NAME: &str = "AWS Data Pipeline API";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Health check endpoint
///
/// Always reports `healthy`; no dependency is checked.
#[get("/health")]
async fn health_check(service: web::Data<JobService>) -> HttpResponse {
    respond(
        StatusCode::OK,
        &HealthResponse {
            status: "healthy",
            service: SERVICE_NAME,
            timestamp: Utc::now(),
            version: service.settings().service_version.clone(),
        },
    )
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config.service(health_check);
}
