//! Admin broadcasts.

use crate::AppResources;
use crate::api::users::ADMIN_TAG;
use crate::api::{ErrorResponse, parse_body};
use crate::error::ApiError;
use crate::notify::BroadcastEvent;
use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    /// Extra recipients on top of admins and approved users
    pub emails: Option<Vec<String>>,
    pub admin_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub success: bool,
    pub message: String,
    pub total: usize,
    pub sent_count: usize,
    pub failed_count: usize,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(broadcast_message))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/api/broadcast-message",
    tag = ADMIN_TAG,
    operation_id = "Broadcast Message",
    summary = "Send an informational message to the community",
    description = "Only addresses on the admin allow-list may broadcast. The message goes to every admin, \
                   every approved user and the addresses listed in `emails`, each exactly once.",
    request_body(content = BroadcastRequest, description = "Broadcast content and sender"),
    responses(
        (status = 200, description = "Broadcast completed", body = BroadcastResponse),
        (status = 400, description = "Missing title, body, or email list", body = ErrorResponse),
        (status = 403, description = "Sender is not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn broadcast_message(
    Extension(resources): Extension<AppResources>,
    payload: Result<Json<BroadcastRequest>, JsonRejection>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let request = parse_body(payload)?;
    resources.admins.authorize(request.admin_email.as_deref())?;

    let (Some(title), Some(body), Some(emails), Some(admin_email)) = (
        request.title,
        request.body,
        request.emails.filter(|e| !e.is_empty()),
        request.admin_email,
    ) else {
        return Err(ApiError::Validation(
            "Missing title, body, or email list".into(),
        ));
    };

    tracing::info!(admin = %admin_email, %title, listed = emails.len(), "Broadcast initiated");

    let result = resources
        .notifier
        .broadcast(BroadcastEvent {
            title,
            body,
            admin_email,
            explicit_recipients: emails,
        })
        .await?;

    Ok(Json(BroadcastResponse {
        success: true,
        message: "Broadcast completed".to_string(),
        total: result.attempted,
        sent_count: result.sent,
        failed_count: result.failed,
    }))
}
