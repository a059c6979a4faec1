//! HTTP surface.
//!
//! - `alerts` - emergency alert intake (/api/notify-alert)
//! - `broadcast` - admin broadcasts (/api/broadcast-message)
//! - `users` - user approval (/api/approve-user, /api/get-pending-users)
//! - `reports` - clone reports (/api/report-clone)
//! - `health` - health check (/api/health)
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod alerts;
pub mod broadcast;
pub mod health;
pub mod openapi;
pub mod reports;
pub mod users;

pub use alerts::ALERTS_TAG;
pub use health::MISC_TAG;
pub use users::ADMIN_TAG;

use crate::AppResources;
use crate::error::ApiError;
use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_redoc::{Redoc, Servable};

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Unwraps a JSON body. Oversized bodies keep their 413, any other rejection
/// is a 400.
pub(crate) fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|e| {
        let message = format!("Invalid request body: {}", e.body_text());
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(message)
        } else {
            ApiError::Validation(message)
        }
    })
}

/// Builds the full application router, including API docs at `/api-docs`.
pub fn router(resources: AppResources) -> Router {
    let body_limit = resources.config.http.body_limit_bytes;
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .merge(alerts::router())
        .merge(broadcast::router())
        .merge(users::router())
        .merge(reports::router())
        .merge(health::router())
        .layer(axum::Extension(resources))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Binds the configured address and serves until the process stops.
#[tracing::instrument(skip(resources))]
pub async fn start_webserver(resources: AppResources) -> color_eyre::Result<()> {
    let addr = resources.config.http.bind_address;
    let app = router(resources);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, app)
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
