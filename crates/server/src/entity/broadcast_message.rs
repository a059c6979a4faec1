use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "broadcast_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub admin_email: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub sent_to_count: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub sent_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
