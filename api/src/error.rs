//! Maps engine failures onto HTTP responses.

use crate::response::ApiResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use services::{ErrorKind, ServiceError};
use validator::ValidationErrors;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Inactive | ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Invalid => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Builds the error envelope for `err`. Database failures are logged and
/// reported without their driver message.
pub fn service_error(err: ServiceError) -> Response {
    let status = status_for(err.kind());
    let message = match &err {
        ServiceError::Internal(e) => {
            tracing::error!(error = %e, "Database error while handling request");
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };
    let data = err.detail().unwrap_or_else(|| json!({}));

    (status, Json(ApiResponse::<Value>::error_with(data, message))).into_response()
}

pub fn validation_error(errors: &ValidationErrors) -> Response {
    bad_request(util::validation::format_validation_errors(errors))
}

pub fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<Value>::error_with(json!({}), message)),
    )
        .into_response()
}

pub fn forbidden(message: impl Into<String>) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ApiResponse::<Value>::error_with(json!({}), message)),
    )
        .into_response()
}
