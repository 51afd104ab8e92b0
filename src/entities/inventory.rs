use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stock held for one (tenant, product, location, batch)
///
/// `reserved_quantity` is derived from active order demand and is rewritten by
/// the reservation reconciler; it is never incremented by hand.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "inventory")]
#[schema(as = InventoryRecord)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub batch: Option<String>,
    pub expiry_date: Option<Date>,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub status: InventoryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Available-to-promise quantity
    pub fn available_quantity(&self) -> i32 {
        (self.quantity - self.reserved_quantity).max(0)
    }

    /// Arrival order: oldest record first, ties broken by id.
    pub fn arrival_cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// First-expired order: earliest expiry first, undated stock last, then arrival.
    pub fn fefo_cmp(&self, other: &Self) -> Ordering {
        let key = |m: &Self| (m.expiry_date.is_none(), m.expiry_date);
        key(self)
            .cmp(&key(other))
            .then_with(|| self.arrival_cmp(other))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse_location::Entity",
        from = "Column::LocationId",
        to = "super::warehouse_location::Column::Id"
    )]
    Location,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::warehouse_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
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
pub enum InventoryStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "quarantine")]
    Quarantine,
    #[sea_orm(string_value = "blocked")]
    Blocked,
    #[sea_orm(string_value = "damaged")]
    Damaged,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "counting")]
    Counting,
}

impl InventoryStatus {
    /// Only available stock can be allocated to waves or carry reservations.
    pub fn is_pickable(self) -> bool {
        matches!(self, InventoryStatus::Available)
    }
}
