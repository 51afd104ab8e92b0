use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Inbound receipt whose goods wait in the receiving zone until addressed
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "receiving_orders")]
#[schema(as = ReceivingOrder)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub status: ReceivingOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::receiving_preallocation::Entity")]
    Preallocations,
}

impl Related<super::receiving_preallocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Preallocations.def()
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
pub enum ReceivingOrderStatus {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "in_quarantine")]
    InQuarantine,
    #[sea_orm(string_value = "addressing")]
    Addressing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ReceivingOrderStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        use ReceivingOrderStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress)
                | (InProgress, InQuarantine)
                | (InProgress | InQuarantine, Addressing)
                | (Addressing, Completed)
                | (Scheduled | InProgress | InQuarantine | Addressing, Cancelled)
        )
    }
}
