use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BroadcastMessages::Table)
                    .if_not_exists()
                    .col(pk_auto(BroadcastMessages::Id))
                    .col(string(BroadcastMessages::AdminEmail))
                    .col(string(BroadcastMessages::Title))
                    .col(text(BroadcastMessages::Body))
                    .col(integer(BroadcastMessages::SentToCount))
                    .col(integer(BroadcastMessages::SentCount))
                    .col(integer(BroadcastMessages::FailedCount))
                    .col(
                        timestamp_with_time_zone(BroadcastMessages::SentAt)
                            .default(Expr::current_timestamp()),
                    )
                    .index(
                        Index::create()
                            .name("idx_broadcast_messages_sent_at")
                            .col(BroadcastMessages::SentAt),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BroadcastMessages::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum BroadcastMessages {
    Table,
    Id,
    AdminEmail,
    Title,
    Body,
    SentToCount,
    SentCount,
    FailedCount,
    SentAt,
}
