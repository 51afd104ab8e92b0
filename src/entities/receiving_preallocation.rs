use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Operator instruction to address received goods at a final location
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "receiving_preallocations")]
#[schema(as = Preallocation)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub receiving_order_id: Uuid,
    pub location_id: Uuid,
    pub product_id: Uuid,
    pub batch: Option<String>,
    pub quantity: i32,
    pub status: PreallocationStatus,
    pub created_by: String,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::receiving_order::Entity",
        from = "Column::ReceivingOrderId",
        to = "super::receiving_order::Column::Id"
    )]
    ReceivingOrder,
}

impl Related<super::receiving_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReceivingOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PreallocationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "executed")]
    Executed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}
