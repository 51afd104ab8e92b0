use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::tenant::PickingRule;

/// Group of orders picked together
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "picking_waves")]
#[schema(as = Wave)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Human readable number, `OS-YYYYMMDD-NNNN`
    #[sea_orm(unique)]
    pub wave_number: String,
    pub status: WaveStatus,
    pub total_orders: i32,
    pub total_items: i32,
    pub total_quantity: i32,
    pub picking_rule: PickingRule,
    pub created_by: String,
    pub completed_by: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::picking_wave_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::picking_order::Entity")]
    Orders,
}

impl Related<super::picking_wave_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::picking_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
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
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WaveStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "picking")]
    Picking,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl WaveStatus {
    /// Wave state machine.
    ///
    /// `completed -> picking` reopens a wave after a quantity correction and
    /// `completed -> cancelled` undoes a wave finished by mistake; every other
    /// move is forward only.
    pub fn can_transition_to(self, next: WaveStatus) -> bool {
        use WaveStatus::*;
        matches!(
            (self, next),
            (Pending, Picking)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Picking, Completed)
                | (Picking, Cancelled)
                | (Completed, Picking)
                | (Completed, Cancelled)
        )
    }

    /// Scans are only accepted while the wave is open.
    pub fn accepts_scans(self) -> bool {
        matches!(self, WaveStatus::Pending | WaveStatus::Picking)
    }

    /// A wave can be removed outright only before work starts or after it was cancelled.
    pub fn is_deletable(self) -> bool {
        matches!(self, WaveStatus::Pending | WaveStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::WaveStatus::*;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Pending, Picking, true)]
    #[case(Picking, Completed, true)]
    #[case(Pending, Cancelled, true)]
    #[case(Picking, Cancelled, true)]
    #[case(Completed, Cancelled, true)]
    #[case(Completed, Picking, true)]
    #[case(Cancelled, Pending, false)]
    #[case(Cancelled, Picking, false)]
    #[case(Completed, Pending, false)]
    #[case(Picking, Pending, false)]
    fn wave_transitions(#[case] from: WaveStatus, #[case] to: WaveStatus, #[case] legal: bool) {
        assert_eq!(from.can_transition_to(to), legal);
    }

    #[test]
    fn parses_query_string_values() {
        assert_eq!("picking".parse::<WaveStatus>().unwrap(), Picking);
        assert!("done".parse::<WaveStatus>().is_err());
    }
}
