use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use signer_protocol::{error_codes, HttpErrorEnvelope};

pub type HttpResult<T> = Result<T, Response>;

fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(HttpErrorEnvelope {
            code: code.to_owned(),
            error: message.into(),
            details: None,
        }),
    )
        .into_response()
}

/// `code` is one of the constants in [`error_codes`]; callers pick it
/// because `bad_request` covers several distinct failure reasons.
pub fn bad_request(code: &'static str, message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, code, message)
}

pub fn not_found(message: impl Into<String>) -> Response {
    json_error(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, message)
}

pub fn conflict(message: impl Into<String>) -> Response {
    json_error(StatusCode::CONFLICT, error_codes::ALREADY_SIGNED, message)
}

pub fn payload_too_large(message: impl Into<String>) -> Response {
    json_error(StatusCode::PAYLOAD_TOO_LARGE, error_codes::PAYLOAD_TOO_LARGE, message)
}

pub fn internal_error(err: impl std::fmt::Display) -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR, err.to_string())
}
