use actix_web::{error::JsonPayloadError, http::StatusCode, HttpResponse};
use actix_web_validator::{error::DeserializeErrors, Error as ValidatorError};
use validator::ValidationErrors;

use crate::api::response::{respond, ErrorResponse};

pub const URL_REQUIRED: &str = "URL is required";
pub const INVALID_JSON: &str = "Invalid JSON in request body";
pub const BODY_TOO_LARGE: &str = "Request body too large";

fn first_message(errors: &ValidationErrors) -> Option<String> {
    errors
        .field_errors()
        .values()
        .flat_map(|errors| errors.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
}

/// An empty body fails at the very first byte; a truncated one fails later.
fn is_empty_body(error: &serde_json::Error) -> bool {
    error.is_eof() && error.line() == 1 && error.column() == 0
}

/// Map a body extraction failure onto the API's error envelope.
pub fn body_error_response(err: &ValidatorError) -> HttpResponse {
    let (status, message) = match err {
        ValidatorError::Validate(validation_errors) => (
            StatusCode::BAD_REQUEST,
            first_message(validation_errors).unwrap_or_else(|| "Validation failed".to_string()),
        ),
        ValidatorError::JsonPayloadError(JsonPayloadError::Deserialize(e))
        | ValidatorError::Deserialize(DeserializeErrors::DeserializeJson(e))
            if is_empty_body(e) =>
        {
            (StatusCode::BAD_REQUEST, URL_REQUIRED.to_string())
        }
        ValidatorError::JsonPayloadError(
            JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. },
        ) => (StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE.to_string()),
        _ => (StatusCode::BAD_REQUEST, INVALID_JSON.to_string()),
    };

    respond(status, &ErrorResponse::new(message))
}

/// JSON body config with the API's error envelope.
///
/// Any content type is accepted. An empty body reads as a missing URL; any
/// other body that does not parse is invalid JSON.
pub fn json_config(limit: usize) -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default()
        .limit(limit)
        .content_type(|_| true)
        .error_handler(|err, _req| {
            actix_web::error::InternalError::from_response("", body_error_response(&err)).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error(body: &str) -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>(body).unwrap_err()
    }

    fn status_of(err: &ValidatorError) -> StatusCode {
        body_error_response(err).status()
    }

    #[test]
    fn test_only_empty_input_counts_as_empty_body() {
        assert!(is_empty_body(&parse_error("")));
        assert!(!is_empty_body(&parse_error(r#"{"url": "http://example.com/x""#)));
        assert!(!is_empty_body(&parse_error("{not json")));
    }

    #[test]
    fn test_oversized_body_is_413() {
        let err = ValidatorError::JsonPayloadError(JsonPayloadError::OverflowKnownLength {
            length: 100,
            limit: 10,
        });
        assert_eq!(status_of(&err), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_parse_failures_are_400() {
        for body in ["", "{\"url\": ", "[1"] {
            let err = ValidatorError::JsonPayloadError(JsonPayloadError::Deserialize(parse_error(body)));
            assert_eq!(status_of(&err), StatusCode::BAD_REQUEST);
        }
    }
}
