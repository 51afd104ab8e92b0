use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Demand line of a picking order
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "picking_order_items")]
#[schema(as = PickingOrderItem)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub picking_order_id: Uuid,
    pub product_id: Uuid,
    pub requested_quantity: i32,
    pub unit: String,
    pub batch: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::picking_order::Entity",
        from = "Column::PickingOrderId",
        to = "super::picking_order::Column::Id"
    )]
    PickingOrder,
}

impl Related<super::picking_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickingOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
