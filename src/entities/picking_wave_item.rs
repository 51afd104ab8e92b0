use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One consolidated picking line of a wave, bound to a source location and batch
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "picking_wave_items")]
#[schema(as = WaveItem)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub wave_id: Uuid,
    /// First order in the wave that demanded this product
    pub picking_order_id: Uuid,
    pub product_id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub total_quantity: i32,
    pub picked_quantity: i32,
    pub unit: String,
    pub location_id: Option<Uuid>,
    pub location_code: String,
    pub batch: Option<String>,
    pub expiry_date: Option<Date>,
    pub status: WaveItemStatus,
    pub picked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn remaining_quantity(&self) -> i32 {
        self.total_quantity - self.picked_quantity
    }

    pub fn is_fully_picked(&self) -> bool {
        self.picked_quantity == self.total_quantity
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::picking_wave::Entity",
        from = "Column::WaveId",
        to = "super::picking_wave::Column::Id"
    )]
    Wave,
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
pub enum WaveItemStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "picking")]
    Picking,
    #[sea_orm(string_value = "picked")]
    Picked,
}

impl WaveItemStatus {
    /// Status implied by a picked quantity after a scan or a correction.
    pub fn for_quantities(picked: i32, total: i32) -> Self {
        if picked >= total {
            WaveItemStatus::Picked
        } else {
            WaveItemStatus::Picking
        }
    }
}
