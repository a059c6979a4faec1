//! OpenAPI/Utoipa configuration.

use crate::api::{
    alerts::ALERTS_TAG, health::MISC_TAG, reports::SECURITY_TAG, users::ADMIN_TAG,
};
use utoipa::OpenApi;

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "GuardianshipApp Notification API",
        version = "1.0.0",
        description = "Receives emergency alerts and admin broadcasts and emails them to the community."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = ALERTS_TAG, description = "Emergency alert endpoints"),
        (name = ADMIN_TAG, description = "Admin-only endpoints, gated by the admin allow-list"),
        (name = SECURITY_TAG, description = "Security reports")
    )
)]
pub struct ApiDoc;
