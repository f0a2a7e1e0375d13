pub mod health;
pub mod job;
pub mod response;
pub mod validation;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::{ErrorHandlerResponse, ErrorHandlers},
    web, App, Error,
};

use self::job::{JobService, ServiceError};

/// Re-render framework 5xx errors in the API envelope.
///
/// Responses built by the handlers carry no error and pass through unchanged.
pub fn internal_errors<B: 'static>(expose_details: bool) -> ErrorHandlers<B> {
    ErrorHandlers::new().default_handler_server(move |res: ServiceResponse<B>| {
        let Some(details) = res.response().error().map(|e| e.to_string()) else {
            return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
        };

        let (req, _) = res.into_parts();
        let response = ServiceError::Internal(details).to_response(expose_details);
        Ok(ErrorHandlerResponse::Response(
            ServiceResponse::new(req, response).map_into_right_body(),
        ))
    })
}

/// Build the application: every route, the uniform 404 fallback, CORS headers
/// and the 500 envelope for framework errors.
pub fn build_app(
    service: web::Data<JobService>,
    max_payload_size: usize,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let expose_details = service.settings().expose_error_details;

    App::new()
        .app_data(service)
        .app_data(web::PayloadConfig::default().limit(max_payload_size))
        .app_data(validation::json_config(max_payload_size))
        .wrap(internal_errors(expose_details))
        .wrap(response::cors())
        .configure(health::health_config)
        .configure(job::handlers::job_config)
        .default_service(web::to(response::fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, error, http::StatusCode, test, HttpResponse};

    async fn call(expose_details: bool, path: &str) -> (StatusCode, serde_json::Value) {
        let app = test::init_service(
            App::new()
                .wrap(internal_errors(expose_details))
                .route(
                    "/broken",
                    web::get().to(|| async {
                        Err::<HttpResponse, _>(error::ErrorInternalServerError("boom"))
                    }),
                )
                .route(
                    "/handled",
                    web::get().to(|| async {
                        response::respond(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            &response::ErrorResponse::new("Failed to upload to S3: denied"),
                        )
                    }),
                ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri(path).to_request()).await;
        let status = resp.status();
        let body = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[actix_web::test]
    async fn test_framework_error_uses_envelope() {
        let (status, body) = call(true, "/broken").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            serde_json::json!({"error": "Internal server error", "details": "boom"})
        );
    }

    #[actix_web::test]
    async fn test_framework_error_hides_details() {
        let (status, body) = call(false, "/broken").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"error": "Internal server error"}));
    }

    #[actix_web::test]
    async fn test_handler_500_passes_through() {
        let (status, body) = call(false, "/handled").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to upload to S3: denied");
    }
}
