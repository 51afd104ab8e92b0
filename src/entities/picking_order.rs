use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Outbound customer order as seen by the picking floor
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "picking_orders")]
#[schema(as = PickingOrder)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub customer_order_number: Option<String>,
    pub status: PickingOrderStatus,
    pub wave_id: Option<Uuid>,
    pub picked_by: Option<String>,
    pub picked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::picking_order_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::picking_wave::Entity",
        from = "Column::WaveId",
        to = "super::picking_wave::Column::Id"
    )]
    Wave,
}

impl Related<super::picking_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::picking_wave::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wave.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
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
pub enum PickingOrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "validated")]
    Validated,
    #[sea_orm(string_value = "in_wave")]
    InWave,
    #[sea_orm(string_value = "picking")]
    Picking,
    #[sea_orm(string_value = "picked")]
    Picked,
    #[sea_orm(string_value = "staged")]
    Staged,
    #[sea_orm(string_value = "checking")]
    Checking,
    #[sea_orm(string_value = "packed")]
    Packed,
    #[sea_orm(string_value = "invoiced")]
    Invoiced,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PickingOrderStatus {
    /// Statuses from which an order may join a new wave.
    pub fn is_wave_eligible(self) -> bool {
        matches!(self, Self::Pending | Self::Validated)
    }

    /// Whether the order still competes for stock and therefore counts as reserved demand.
    pub fn is_active_demand(self) -> bool {
        !matches!(self, Self::Shipped | Self::Cancelled)
    }

    /// Every status counted as active demand, in lifecycle order.
    pub fn active_demand() -> Vec<Self> {
        use sea_orm::Iterable;
        Self::iter().filter(|status| status.is_active_demand()).collect()
    }

    /// Legal moves of the outer order lifecycle driven by waves and shipping.
    pub fn can_transition_to(self, next: Self) -> bool {
        use PickingOrderStatus::*;
        match (self, next) {
            (Pending, Validated) => true,
            (Pending | Validated, InWave) => true,
            (InWave, Picking) => true,
            (InWave | Picking, Picked) => true,
            // wave cancelled, deleted or undone
            (InWave | Picking | Picked, Pending) => true,
            // completed wave reopened for correction
            (Picked, Picking) => true,
            (Picked, Staged) | (Picked | Staged, Checking) => true,
            (Checking, Packed) | (Packed, Invoiced) | (Invoiced, Shipped) => true,
            (current, Cancelled) => current != Shipped && current != Cancelled,
            _ => false,
        }
    }
}
