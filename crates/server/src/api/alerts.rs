//! Emergency alert intake.
//!
//! `POST /api/notify-alert` emails the alert to every admin, every approved
//! user and any emergency contact that has an email address.
//! `POST /api/send-alert-notifications` is kept as an alias for older clients.

use crate::AppResources;
use crate::api::{ErrorResponse, parse_body};
use crate::error::ApiError;
use crate::notify::AlertEvent;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const ALERTS_TAG: &str = "Alerts";

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotifyAlertRequest {
    pub alert: Option<AlertEvent>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotifyAlertResponse {
    pub success: bool,
    pub message: String,
    /// Recipients the email was delivered to
    pub emailed: usize,
    /// Distinct recipients the alert was addressed to
    pub total_targets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub alert_id: Option<serde_json::Value>,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(notify_alert))
        .route("/api/send-alert-notifications", post(notify_alert))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/api/notify-alert",
    tag = ALERTS_TAG,
    operation_id = "Notify Alert",
    summary = "Email an emergency alert to the community",
    description = "Resolves recipients from the admin list, approved users and the alert's emergency \
                   contacts, then emails each of them once.\n\n\
                   Individual delivery failures do not fail the request: `emailed` may be lower than \
                   `totalTargets`. An alert nobody can be notified about still succeeds with \
                   `totalTargets: 0`.",
    request_body(content = NotifyAlertRequest, description = "The alert raised by the app"),
    responses(
        (status = 200, description = "Alert processed", body = NotifyAlertResponse),
        (status = 400, description = "Missing or malformed alert", body = ErrorResponse),
        (status = 413, description = "Body exceeds the configured size limit", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn notify_alert(
    Extension(resources): Extension<AppResources>,
    payload: Result<Json<NotifyAlertRequest>, JsonRejection>,
) -> Result<Json<NotifyAlertResponse>, ApiError> {
    let alert = parse_body(payload)?
        .alert
        .ok_or_else(|| ApiError::Validation("No alert data provided".into()))?;

    tracing::info!(
        name = %alert.display_name(),
        location = alert.location.as_deref().unwrap_or_default(),
        contacts = alert.contacts().len(),
        has_photo = alert.photo.is_some(),
        "Emergency alert received"
    );

    let alert_id = alert.id.clone();
    let result = resources.notifier.notify_alert(alert).await?;

    Ok(Json(NotifyAlertResponse {
        success: true,
        message: "Alert processed and notifications sent.".to_string(),
        emailed: result.sent,
        total_targets: result.attempted,
        alert_id,
    }))
}
