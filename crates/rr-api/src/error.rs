//! Maps domain errors onto HTTP responses.

use axum::extract::path::ErrorKind;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rr_core::{AppError, FieldError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    /// Missing, malformed, forged or expired bearer token
    #[error("authentication required: {0}")]
    Unauthenticated(&'static str),

    /// Body is not JSON or does not fit the payload type
    #[error(transparent)]
    Body(#[from] JsonRejection),

    /// A path segment does not parse, e.g. a malformed id
    #[error(transparent)]
    Path(#[from] PathRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated(reason) => (StatusCode::UNAUTHORIZED, reason.to_string()),
            ApiError::App(AppError::ValidationFailed(errors)) => return invalid(errors),
            ApiError::Body(rejection) => {
                let detail = match &rejection {
                    JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                        serde_detail(&rejection.body_text(), "body")
                    }
                    _ => FieldError::new("body", rejection.body_text()),
                };
                return invalid(vec![detail]);
            }
            ApiError::Query(rejection) => return invalid(vec![serde_detail(&rejection.body_text(), "query")]),
            ApiError::Path(rejection) => return invalid(vec![path_detail(&rejection)]),
            ApiError::App(err @ AppError::DuplicateReview { .. }) => {
                tracing::debug!("{}", err);
                (StatusCode::CONFLICT, "You have already reviewed this product".to_string())
            }
            ApiError::App(err @ AppError::NotFound(..)) => (StatusCode::NOT_FOUND, err.to_string()),
            ApiError::App(err @ AppError::Unauthorized(_)) => (StatusCode::FORBIDDEN, err.to_string()),
            ApiError::App(AppError::StoreUnavailable(detail)) => {
                tracing::error!("store error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

fn invalid(errors: Vec<FieldError>) -> Response {
    let status = StatusCode::BAD_REQUEST;
    (status, Json(json!({ "errors": errors, "status": status.as_u16() }))).into_response()
}

/// Turns a serde rejection text (`<summary>: <path>: <reason> at line ..`)
/// into a field error, falling back to `fallback` when no path is given.
fn serde_detail(text: &str, fallback: &str) -> FieldError {
    let detail = text.split_once(": ").map_or(text, |(_, detail)| detail);
    let detail = detail.split(" at line ").next().unwrap_or(detail);

    if let Some(field) = detail
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
    {
        return FieldError::new(field, format!("{field} is required"));
    }

    match detail.split_once(": ") {
        Some((path, reason)) if !path.contains(char::is_whitespace) => FieldError::new(path, reason),
        _ => FieldError::new(fallback, detail),
    }
}

fn path_detail(rejection: &PathRejection) -> FieldError {
    let PathRejection::FailedToDeserializePathParams(err) = rejection else {
        return FieldError::new("path", rejection.body_text());
    };

    match err.kind() {
        ErrorKind::DeserializeError { key, value, .. } | ErrorKind::ParseErrorAtKey { key, value, .. } => {
            FieldError::new(key.as_str(), format!("'{value}' is not a valid {key}"))
        }
        kind => FieldError::new("path", kind.to_string()),
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
