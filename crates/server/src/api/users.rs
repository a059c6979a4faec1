//! Admin-only user management.
//!
//! Registered users start out `pending`; an admin approves them, after which
//! they receive alert emails.

use crate::AppResources;
use crate::api::{ErrorResponse, parse_body};
use crate::entity::user::{self, UserStatus};
use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const ADMIN_TAG: &str = "Admin";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<user::Model> for UserDto {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveUserRequest {
    pub user_id: Option<String>,
    pub admin_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApproveUserResponse {
    pub success: bool,
    pub message: String,
    pub user: UserDto,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingUsersRequest {
    pub admin_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingUsersResponse {
    pub success: bool,
    pub users: Vec<UserDto>,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(approve_user))
        .routes(routes!(get_pending_users))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/api/approve-user",
    tag = ADMIN_TAG,
    operation_id = "Approve User",
    summary = "Approve a pending user",
    description = "Sets the user's status to `approved`, making them eligible for alert emails.",
    request_body(content = ApproveUserRequest, description = "User to approve and the acting admin"),
    responses(
        (status = 200, description = "User approved", body = ApproveUserResponse),
        (status = 400, description = "Missing userId or adminEmail", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn approve_user(
    Extension(resources): Extension<AppResources>,
    payload: Result<Json<ApproveUserRequest>, JsonRejection>,
) -> Result<Json<ApproveUserResponse>, ApiError> {
    let request = parse_body(payload)?;
    let (Some(user_id), Some(admin_email)) = (
        request.user_id.filter(|id| !id.trim().is_empty()),
        request.admin_email.filter(|e| !e.trim().is_empty()),
    ) else {
        return Err(ApiError::Validation(
            "Missing userId or adminEmail".into(),
        ));
    };
    resources.admins.authorize(Some(&admin_email))?;

    let user = resources
        .users
        .approve_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))?;

    tracing::info!(user_id = %user.id, admin = %admin_email, "User approved");

    Ok(Json(ApproveUserResponse {
        success: true,
        message: "User approved successfully".to_string(),
        user: user.into(),
    }))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/api/get-pending-users",
    tag = ADMIN_TAG,
    operation_id = "Get Pending Users",
    summary = "List users waiting for approval",
    request_body(content = PendingUsersRequest, description = "The acting admin"),
    responses(
        (status = 200, description = "Pending users", body = PendingUsersResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_pending_users(
    Extension(resources): Extension<AppResources>,
    payload: Result<Json<PendingUsersRequest>, JsonRejection>,
) -> Result<Json<PendingUsersResponse>, ApiError> {
    let request = parse_body(payload)?;
    resources.admins.authorize(request.admin_email.as_deref())?;

    let users = resources.users.pending_users().await?;
    Ok(Json(PendingUsersResponse {
        success: true,
        users: users.into_iter().map(UserDto::from).collect(),
    }))
}
