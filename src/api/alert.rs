use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::field::display;

use super::error::{ApiError, FieldError};
use super::SharedStore;
use crate::entities::alert;
use crate::identifier::ExternalId;

#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    pub message: Option<String>,
}

/// Public view of an alert. The internal row key is deliberately absent.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub external_id: ExternalId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message: String,
}

impl From<alert::Model> for AlertResponse {
    fn from(model: alert::Model) -> Self {
        Self {
            external_id: ExternalId::from(model.external_id),
            created_at: model.created_at,
            updated_at: model.updated_at,
            message: model.message,
        }
    }
}

fn required_message(payload: Result<Json<AlertRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Json(request) = payload.map_err(|e| match e {
        // Well-formed JSON whose `message` is not a string.
        JsonRejection::JsonDataError(_) => ApiError::Validation(vec![FieldError {
            field: "message",
            message: "invalid type for field",
        }]),
        other => ApiError::MalformedBody(other.body_text()),
    })?;
    // Only the empty string counts as missing; whitespace is a valid message.
    match request.message {
        Some(message) if !message.is_empty() => Ok(message),
        _ => Err(ApiError::Validation(vec![FieldError {
            field: "message",
            message: "this field is required",
        }])),
    }
}

fn parse_id(raw: &str, action: &'static str) -> Result<ExternalId, ApiError> {
    let span = tracing::Span::current();
    span.record("action", action);

    match ExternalId::parse(raw) {
        Ok(id) => {
            span.record("external_id", display(id));
            Ok(id)
        }
        Err(e) => {
            tracing::warn!("Invalid identifier format, returning 400: {}", e);
            Err(ApiError::InvalidId)
        }
    }
}

// POST /alert
pub async fn create_alert(
    Extension(store): Extension<SharedStore>,
    payload: Result<Json<AlertRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AlertResponse>), ApiError> {
    tracing::Span::current().record("action", "create_alert");
    let message = required_message(payload)?;

    let alert = store.create(message).await?;
    tracing::Span::current().record("external_id", display(alert.external_id));

    Ok((StatusCode::CREATED, Json(alert.into())))
}

// GET /alert/:external_id
pub async fn get_alert(
    Extension(store): Extension<SharedStore>,
    Path(raw_id): Path<String>,
) -> Result<Json<AlertResponse>, ApiError> {
    let id = parse_id(&raw_id, "get_alert")?;
    let alert = store.get_by_external_id(id).await?;
    Ok(Json(alert.into()))
}

// PUT /alert/:external_id
pub async fn update_alert(
    Extension(store): Extension<SharedStore>,
    Path(raw_id): Path<String>,
    payload: Result<Json<AlertRequest>, JsonRejection>,
) -> Result<Json<AlertResponse>, ApiError> {
    let id = parse_id(&raw_id, "update_alert")?;
    let message = required_message(payload)?;

    let alert = store.update_by_external_id(id, message).await?;
    Ok(Json(alert.into()))
}

// DELETE /alert/:external_id
// Responds with the alert as it was just before removal.
pub async fn delete_alert(
    Extension(store): Extension<SharedStore>,
    Path(raw_id): Path<String>,
) -> Result<Json<AlertResponse>, ApiError> {
    let id = parse_id(&raw_id, "delete_alert")?;
    let alert = store.get_by_external_id(id).await?;
    store.delete_by_external_id(id).await?;
    Ok(Json(alert.into()))
}
