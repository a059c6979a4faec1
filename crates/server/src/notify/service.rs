//! The notification pipeline: render → resolve → dispatch → audit.

use crate::email_templates::{self, CloneReportEmailTemplate};
use crate::error::ApiError;
use crate::notify::dispatch::{DispatchResult, Dispatcher};
use crate::notify::event::{AlertEvent, BroadcastEvent, Event};
use crate::notify::recipients::{AdminAllowList, RecipientResolver, RecipientSet};
use crate::notify::transport::RenderedMessage;
use crate::store::AuditLog;
use std::sync::Arc;

/// Entry point for every notification the server sends.
///
/// Dispatch and the audit write run on a spawned task which the caller
/// awaits. A request that is dropped half-way (client gone, timeout) does not
/// cut a run short; it finishes and is audited regardless.
#[derive(Clone)]
pub struct NotificationService {
    resolver: RecipientResolver,
    dispatcher: Dispatcher,
    audit: Arc<dyn AuditLog>,
    admins: Arc<AdminAllowList>,
}

impl NotificationService {
    pub fn new(
        resolver: RecipientResolver,
        dispatcher: Dispatcher,
        audit: Arc<dyn AuditLog>,
        admins: Arc<AdminAllowList>,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            audit,
            admins,
        }
    }

    /// Emails an emergency alert to admins, approved users and the alert's
    /// own contacts.
    #[tracing::instrument(skip_all, fields(name = alert.display_name()))]
    pub async fn notify_alert(&self, alert: AlertEvent) -> Result<DispatchResult, ApiError> {
        let message = email_templates::render_alert(&alert).map_err(render_failed)?;
        self.run(Event::Alert(alert), message).await
    }

    /// Sends an admin broadcast. The caller is expected to have authorized the
    /// sender already.
    #[tracing::instrument(skip_all, fields(admin = %broadcast.admin_email))]
    pub async fn broadcast(&self, broadcast: BroadcastEvent) -> Result<DispatchResult, ApiError> {
        let message = email_templates::render_broadcast(&broadcast).map_err(render_failed)?;
        self.run(Event::Broadcast(broadcast), message).await
    }

    /// Warns the admins that a copy of the site was spotted. Nobody else is
    /// notified and nothing is audited.
    #[tracing::instrument(skip_all, fields(domain = %report.domain))]
    pub async fn report_clone(
        &self,
        report: CloneReportEmailTemplate,
    ) -> Result<DispatchResult, ApiError> {
        let message = email_templates::render_clone_report(&report).map_err(render_failed)?;
        let recipients: RecipientSet = self.admins.iter().collect();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(recipients, &message).await })
            .await
            .map_err(join_failed)
    }

    async fn run(&self, event: Event, message: RenderedMessage) -> Result<DispatchResult, ApiError> {
        let recipients = self.resolver.resolve(&event).await?;
        tracing::info!(
            kind = event.kind(),
            recipients = recipients.len(),
            "Resolved recipients"
        );

        let dispatcher = self.dispatcher.clone();
        let audit = self.audit.clone();
        tokio::spawn(async move {
            let result = dispatcher.dispatch(recipients, &message).await;
            if let Err(e) = audit.record(&event, &result).await {
                tracing::warn!(
                    name = "notify.audit.write_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    error = %e,
                    kind = event.kind(),
                    message = "Failed to write audit record, ignoring"
                );
            }
            result
        })
        .await
        .map_err(join_failed)
    }
}

fn render_failed(e: askama::Error) -> ApiError {
    ApiError::Internal(format!("failed to render email template: {e}"))
}

fn join_failed(e: tokio::task::JoinError) -> ApiError {
    ApiError::Internal(format!("dispatch task failed: {e}"))
}
