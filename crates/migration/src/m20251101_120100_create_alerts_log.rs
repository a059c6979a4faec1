use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Audit trail of processed emergency alerts
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AlertsLog::Table)
                    .if_not_exists()
                    .col(pk_auto(AlertsLog::Id))
                    .col(string_null(AlertsLog::Name))
                    .col(string_null(AlertsLog::Phone))
                    .col(double_null(AlertsLog::Latitude))
                    .col(double_null(AlertsLog::Longitude))
                    .col(string_null(AlertsLog::Location))
                    .col(text_null(AlertsLog::Photo))
                    .col(string(AlertsLog::Time))
                    .col(text(AlertsLog::Raw).comment("Alert payload as received, JSON"))
                    .col(integer(AlertsLog::Recipients))
                    .col(integer(AlertsLog::Emailed))
                    .col(
                        timestamp_with_time_zone(AlertsLog::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .index(
                        Index::create()
                            .name("idx_alerts_log_created_at")
                            .col(AlertsLog::CreatedAt),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AlertsLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum AlertsLog {
    Table,
    Id,
    Name,
    Phone,
    Latitude,
    Longitude,
    Location,
    Photo,
    Time,
    Raw,
    Recipients,
    Emailed,
    CreatedAt,
}
