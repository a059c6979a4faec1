//! Clone reports sent by the website when it detects it is served from an
//! unknown domain. Only admins are told.

use crate::AppResources;
use crate::api::{ErrorResponse, parse_body};
use crate::email_templates::CloneReportEmailTemplate;
use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const SECURITY_TAG: &str = "Security";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CloneReportRequest {
    pub domain: Option<String>,
    pub url: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloneReportResponse {
    pub success: bool,
    pub emailed: usize,
    pub total_targets: usize,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(report_clone))
}

fn field(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/api/report-clone",
    tag = SECURITY_TAG,
    operation_id = "Report Clone",
    summary = "Report a copy of the website",
    description = "Emails every admin on the allow-list about the reported domain.",
    request_body(content = CloneReportRequest, description = "Where the copy was seen"),
    responses(
        (status = 200, description = "Admins notified", body = CloneReportResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn report_clone(
    Extension(resources): Extension<AppResources>,
    payload: Result<Json<CloneReportRequest>, JsonRejection>,
) -> Result<Json<CloneReportResponse>, ApiError> {
    let request = parse_body(payload)?;
    let report = CloneReportEmailTemplate {
        domain: field(request.domain),
        url: field(request.url),
        time: field(request.time),
    };
    tracing::warn!(domain = %report.domain, url = %report.url, "Clone detected");

    let result = resources.notifier.report_clone(report).await?;
    Ok(Json(CloneReportResponse {
        success: true,
        emailed: result.sent,
        total_targets: result.attempted,
    }))
}
