//! Notification backend for a community emergency-alert app.
//!
//! Receives alerts, broadcasts and security reports over HTTP, resolves who
//! should hear about them and emails every recipient through an SMTP relay.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::notify::{
    AdminAllowList, Dispatcher, FixedRate, MailTransport, NotificationService, RecipientResolver,
};
use crate::store::{AuditLog, UserDirectory};

pub mod api;
pub mod config;
pub mod email_templates;
pub mod entity;
pub mod error;
pub mod notify;
pub mod store;

/// Long-lived handles shared by every request.
#[derive(Clone)]
pub struct AppResources {
    pub config: Arc<AppConfig>,
    pub admins: Arc<AdminAllowList>,
    pub users: Arc<dyn UserDirectory>,
    pub notifier: NotificationService,
}

impl AppResources {
    /// Wires the notification pipeline from its collaborators.
    pub fn new(
        config: Arc<AppConfig>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditLog>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let admins = Arc::new(AdminAllowList::new(config.admin_emails.iter().cloned()));
        let resolver = RecipientResolver::new(admins.clone(), users.clone());
        let pacer = Arc::new(FixedRate::per_second(config.dispatch.messages_per_second));
        let dispatcher = Dispatcher::new(transport, pacer);
        let notifier = NotificationService::new(resolver, dispatcher, audit, admins.clone());
        Self {
            config,
            admins,
            users,
            notifier,
        }
    }
}
