use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Warehouse customer owning stock and orders
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "tenants")]
#[schema(as = Tenant)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Sequencing rule used when waves allocate stock for this tenant
    pub picking_rule: PickingRule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

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
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PickingRule {
    /// First in, first out
    #[sea_orm(string_value = "FIFO")]
    Fifo,
    /// First expired, first out
    #[sea_orm(string_value = "FEFO")]
    Fefo,
    /// Operator directed; stock is taken in arrival order
    #[sea_orm(string_value = "DIRECTED")]
    Directed,
}

impl Default for PickingRule {
    fn default() -> Self {
        PickingRule::Fifo
    }
}
