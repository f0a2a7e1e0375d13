use actix_web::{
    get,
    guard,
    http::StatusCode,
    post,
    web::{self, Data, Path, ServiceConfig},
    HttpResponse,
};
use actix_web_validator::Json;
use tracing::info;

use super::models::ProcessRequest;
use super::service::{JobService, ServiceError};
use crate::api::response::respond;

#[post("/process")]
async fn process(service: Data<JobService>, body: Json<ProcessRequest>) -> HttpResponse {
    info!("Processing POST request to /process");
    match service.submit(body.into_inner()).await {
        Ok(response) => respond(StatusCode::ACCEPTED, &response),
        Err(err) => err.to_response(service.settings().expose_error_details),
    }
}

#[get("/status/{job_id}")]
async fn status(service: Data<JobService>, job_id: Path<String>) -> HttpResponse {
    let job_id = job_id.into_inner();
    info!("Processing GET request to /status/{}", job_id);
    match service.status(&job_id).await {
        Ok(response) => respond(StatusCode::OK, &response),
        Err(err) => err.to_response(service.settings().expose_error_details),
    }
}

async fn status_without_id(service: Data<JobService>) -> HttpResponse {
    ServiceError::Validation("Job ID is required".to_string())
        .to_response(service.settings().expose_error_details)
}

#[get("/results")]
async fn results(service: Data<JobService>) -> HttpResponse {
    info!("Processing GET request to /results");
    match service.results().await {
        Ok(response) => respond(StatusCode::OK, &response),
        Err(err) => err.to_response(service.settings().expose_error_details),
    }
}

pub fn job_config(config: &mut ServiceConfig) {
    config
        .service(process)
        .service(status)
        .service(
            web::resource(["/status", "/status/"])
                .guard(guard::Get())
                .to(status_without_id),
        )
        .service(results);
}
