pub use sea_orm_migration::prelude::*;

mod m20251101_120000_create_users;
mod m20251101_120100_create_alerts_log;
mod m20251101_120200_create_broadcast_messages;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251101_120000_create_users::Migration),
            Box::new(m20251101_120100_create_alerts_log::Migration),
            Box::new(m20251101_120200_create_broadcast_messages::Migration),
        ]
    }
}
