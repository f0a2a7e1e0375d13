use actix_web::{
    http::{header::ContentType, Method, StatusCode},
    middleware::DefaultHeaders,
    HttpRequest, HttpResponse,
};
use serde::Serialize;
use tracing::error;

/// Headers attached to every response so browser clients can call the API directly.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Headers",
        "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token",
    ),
    ("Access-Control-Allow-Methods", "GET,POST,OPTIONS"),
];

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Uniform response envelope: status code, CORS headers, pretty JSON body.
pub fn respond<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let (status, json) = match serde_json::to_string_pretty(body) {
        Ok(json) => (status, json),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error": "Internal server error"}"#.to_string(),
            )
        }
    };

    let mut response = HttpResponse::build(status);
    response.content_type(ContentType::json());
    for header in CORS_HEADERS {
        response.insert_header(header);
    }
    response.body(json)
}

/// CORS headers for responses produced by the framework itself.
pub fn cors() -> DefaultHeaders {
    CORS_HEADERS
        .iter()
        .fold(DefaultHeaders::new(), |headers, &header| headers.add(header))
}

/// Handler for every unmatched method/path combination.
pub async fn fallback(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return respond(StatusCode::OK, &serde_json::json!({}));
    }
    respond(StatusCode::NOT_FOUND, &ErrorResponse::new("Endpoint not found"))
}
