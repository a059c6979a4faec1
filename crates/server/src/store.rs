//! Data-source seams used by the notification flow.
//!
//! [`UserDirectory`] answers "who is approved / pending" and performs the one
//! mutation the server owns (approval). [`AuditLog`] persists best-effort
//! snapshots of processed events. [`DbStore`] backs both with SeaORM.

use crate::entity::user::UserStatus;
use crate::entity::{alerts_log, broadcast_message, user};
use crate::error::StoreError;
use crate::notify::dispatch::DispatchResult;
use crate::notify::event::{AlertEvent, BroadcastEvent, Event};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Users whose status is `approved`, in a stable order.
    async fn approved_users(&self) -> Result<Vec<user::Model>, StoreError>;

    async fn pending_users(&self) -> Result<Vec<user::Model>, StoreError>;

    /// Marks a user approved. `None` when no user has this id.
    async fn approve_user(&self, user_id: &str) -> Result<Option<user::Model>, StoreError>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record_alert(
        &self,
        alert: &AlertEvent,
        result: &DispatchResult,
    ) -> Result<(), StoreError>;

    async fn record_broadcast(
        &self,
        broadcast: &BroadcastEvent,
        result: &DispatchResult,
    ) -> Result<(), StoreError>;

    /// Writes the audit record matching the event's kind.
    async fn record(&self, event: &Event, result: &DispatchResult) -> Result<(), StoreError> {
        match event {
            Event::Alert(alert) => self.record_alert(alert, result).await,
            Event::Broadcast(broadcast) => self.record_broadcast(broadcast, result).await,
        }
    }
}

/// SeaORM-backed implementation of both store traits.
#[derive(Clone, Debug)]
pub struct DbStore {
    db: Arc<DatabaseConnection>,
}

impl DbStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn users_with_status(&self, status: UserStatus) -> Result<Vec<user::Model>, StoreError> {
        let users = user::Entity::find()
            .filter(user::Column::Status.eq(status))
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(users)
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[async_trait]
impl UserDirectory for DbStore {
    #[tracing::instrument(skip(self))]
    async fn approved_users(&self) -> Result<Vec<user::Model>, StoreError> {
        self.users_with_status(UserStatus::Approved).await
    }

    #[tracing::instrument(skip(self))]
    async fn pending_users(&self) -> Result<Vec<user::Model>, StoreError> {
        self.users_with_status(UserStatus::Pending).await
    }

    #[tracing::instrument(skip(self))]
    async fn approve_user(&self, user_id: &str) -> Result<Option<user::Model>, StoreError> {
        let Some(found) = user::Entity::find_by_id(user_id.to_string())
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };

        let mut model: user::ActiveModel = found.into();
        model.status = Set(UserStatus::Approved);
        Ok(Some(model.update(self.db.as_ref()).await?))
    }
}

#[async_trait]
impl AuditLog for DbStore {
    #[tracing::instrument(skip_all)]
    async fn record_alert(
        &self,
        alert: &AlertEvent,
        result: &DispatchResult,
    ) -> Result<(), StoreError> {
        let now = OffsetDateTime::now_utc();
        let time = match &alert.time {
            Some(t) if !t.is_empty() => t.clone(),
            _ => now.format(&Rfc3339).unwrap_or_default(),
        };
        let entry = alerts_log::ActiveModel {
            id: NotSet,
            name: Set(alert.name.clone()),
            phone: Set(alert.phone.clone()),
            latitude: Set(alert.latitude),
            longitude: Set(alert.longitude),
            location: Set(alert.location.clone()),
            photo: Set(alert.photo.clone()),
            time: Set(time),
            raw: Set(serde_json::to_string(alert)?),
            recipients: Set(count(result.attempted)),
            emailed: Set(count(result.sent)),
            created_at: Set(now),
        };
        entry.insert(self.db.as_ref()).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn record_broadcast(
        &self,
        broadcast: &BroadcastEvent,
        result: &DispatchResult,
    ) -> Result<(), StoreError> {
        let entry = broadcast_message::ActiveModel {
            id: NotSet,
            admin_email: Set(broadcast.admin_email.clone()),
            title: Set(broadcast.title.clone()),
            body: Set(broadcast.body.clone()),
            sent_to_count: Set(count(result.attempted)),
            sent_count: Set(count(result.sent)),
            failed_count: Set(count(result.failed)),
            sent_at: Set(OffsetDateTime::now_utc()),
        };
        entry.insert(self.db.as_ref()).await?;
        Ok(())
    }
}
