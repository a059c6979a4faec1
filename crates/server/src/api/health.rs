//! Health check endpoint.

use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const MISC_TAG: &str = "Miscellaneous";

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    /// Server time
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(health))
}

/// Health check endpoint.
#[tracing::instrument()]
#[utoipa::path(
    get,
    path = "/api/health",
    tag = MISC_TAG,
    operation_id = "Health Check",
    summary = "Service health check",
    description = "Returns `ok: true` and the current server time while the service is accepting requests.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        time: OffsetDateTime::now_utc(),
    })
}
