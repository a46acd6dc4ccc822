use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::error::AlertError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// HTTP-facing error. Every variant renders an `{"errors": ...}` body.
#[derive(Debug)]
pub enum ApiError {
    InvalidId,
    Validation(Vec<FieldError>),
    MalformedBody(String),
    Unauthorized,
    NotFound,
    Internal,
}

impl From<AlertError> for ApiError {
    fn from(err: AlertError) -> Self {
        match err {
            AlertError::NotFound => Self::NotFound,
            AlertError::InvalidId(_) => Self::InvalidId,
            // Already logged by the store; details stay server-side.
            AlertError::Store(_) => Self::Internal,
        }
    }
}

fn message(text: &str) -> serde_json::Value {
    json!({ "errors": { "message": text } })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidId => {
                (StatusCode::BAD_REQUEST, Json(message("invalid identifier format"))).into_response()
            }
            Self::Validation(fields) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": fields }))).into_response()
            }
            Self::MalformedBody(reason) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": { "body": reason } })),
            )
                .into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"alert-service\"")],
                Json(message("unauthorized")),
            )
                .into_response(),
            Self::NotFound => {
                (StatusCode::NOT_FOUND, Json(message("alert not found"))).into_response()
            }
            Self::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(message("internal error"))).into_response()
            }
        }
    }
}
