use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::WarehouseConfig,
    entities::{inventory, picking_order, picking_order_item, InventoryModel, PickingOrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::waves::receiving_location_ids,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReservationCorrection {
    pub inventory_id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub tenant_id: Uuid,
    pub batch: Option<String>,
    pub old_reserved: i32,
    pub new_reserved: i32,
    pub difference: i32,
}

/// Result of a full reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SyncReport {
    pub total_processed: usize,
    pub corrections_applied: usize,
    /// Records changed by someone else mid-pass, left for the next run
    pub skipped: usize,
    pub corrections: Vec<ReservationCorrection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InventoryReservationStats {
    pub total_records: u64,
    pub records_with_reservation: u64,
    pub total_reserved_units: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderDemandStats {
    pub by_status: BTreeMap<String, i64>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReservationStats {
    pub inventory: InventoryReservationStats,
    pub orders: OrderDemandStats,
}

/// Spreads `demand` units over `records`, which must already be in
/// reservation order. Only available stock takes a share; each record gets at
/// most its on-hand quantity.
pub fn distribute_demand(demand: i64, records: &[&InventoryModel]) -> Vec<(Uuid, i32)> {
    let mut remaining = demand.max(0);
    records
        .iter()
        .map(|record| {
            if !record.status.is_pickable() {
                return (record.id, 0);
            }
            let share = remaining.min(i64::from(record.quantity.max(0)));
            remaining -= share;
            // share never exceeds an i32 quantity
            (record.id, share as i32)
        })
        .collect()
}

/// Recomputes every stock record's reserved quantity from active order demand
#[derive(Clone)]
pub struct ReservationReconciler {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    warehouse: Arc<WarehouseConfig>,
}

impl ReservationReconciler {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: EventSender,
        warehouse: Arc<WarehouseConfig>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            warehouse,
        }
    }

    /// Demand per (tenant, product) summed over orders still competing for stock.
    async fn active_demand(&self) -> Result<HashMap<(Uuid, Uuid), i64>, ServiceError> {
        let rows: Vec<(Uuid, Uuid, Option<i64>)> = picking_order_item::Entity::find()
            .select_only()
            .column_as(picking_order::Column::TenantId, "tenant_id")
            .column_as(picking_order_item::Column::ProductId, "product_id")
            .column_as(
                Expr::col((
                    picking_order_item::Entity,
                    picking_order_item::Column::RequestedQuantity,
                ))
                .sum(),
                "demand",
            )
            .join(
                JoinType::InnerJoin,
                picking_order_item::Relation::PickingOrder.def(),
            )
            .filter(picking_order::Column::Status.is_in(PickingOrderStatus::active_demand()))
            .group_by(picking_order::Column::TenantId)
            .group_by(picking_order_item::Column::ProductId)
            .into_tuple()
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|(tenant_id, product_id, demand)| ((tenant_id, product_id), demand.unwrap_or(0)))
            .collect())
    }

    /// Full reconciliation pass. Safe to interrupt and to repeat: a second run
    /// over an unchanged order set applies no corrections. Stock still in the
    /// receiving zone is never picked by a wave, so it reconciles to zero.
    #[instrument(skip(self))]
    pub async fn sync_inventory_reservations(&self) -> Result<SyncReport, ServiceError> {
        let demand = self.active_demand().await?;
        let holding =
            receiving_location_ids(&*self.db_pool, &self.warehouse.receiving_zone_code).await?;
        let records = inventory::Entity::find()
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let mut groups: HashMap<(Uuid, Uuid), Vec<&InventoryModel>> = HashMap::new();
        for record in &records {
            groups
                .entry((record.tenant_id, record.product_id))
                .or_default()
                .push(record);
        }

        let mut report = SyncReport {
            total_processed: records.len(),
            ..SyncReport::default()
        };
        let mut events = Vec::new();

        for (key, mut group) in groups {
            group.sort_by(|a, b| a.fefo_cmp(b));
            let wanted = demand.get(&key).copied().unwrap_or(0);
            let pickable: Vec<&InventoryModel> = group
                .iter()
                .copied()
                .filter(|record| !holding.contains(&record.location_id))
                .collect();
            let targets: HashMap<Uuid, i32> =
                distribute_demand(wanted, &pickable).into_iter().collect();

            for record in &group {
                let new_reserved = targets.get(&record.id).copied().unwrap_or(0);
                if record.reserved_quantity == new_reserved {
                    continue;
                }

                let result = inventory::Entity::update_many()
                    .set(inventory::ActiveModel {
                        reserved_quantity: Set(new_reserved),
                        updated_at: Set(Utc::now()),
                        ..Default::default()
                    })
                    .filter(inventory::Column::Id.eq(record.id))
                    .filter(inventory::Column::ReservedQuantity.eq(record.reserved_quantity))
                    .filter(inventory::Column::Quantity.eq(record.quantity))
                    .exec(&*self.db_pool)
                    .await
                    .map_err(ServiceError::db_error)?;

                if result.rows_affected == 0 {
                    warn!(
                        inventory_id = %record.id,
                        "Stock record changed during reconciliation, skipped"
                    );
                    report.skipped += 1;
                    continue;
                }

                info!(
                    inventory_id = %record.id,
                    product_id = %record.product_id,
                    old_reserved = record.reserved_quantity,
                    new_reserved,
                    "Reservation corrected"
                );
                events.push(Event::ReservationCorrected {
                    inventory_id: record.id,
                    product_id: record.product_id,
                    old_reserved: record.reserved_quantity,
                    new_reserved,
                });
                report.corrections.push(ReservationCorrection {
                    inventory_id: record.id,
                    product_id: record.product_id,
                    location_id: record.location_id,
                    tenant_id: record.tenant_id,
                    batch: record.batch.clone(),
                    old_reserved: record.reserved_quantity,
                    new_reserved,
                    difference: new_reserved - record.reserved_quantity,
                });
            }
        }

        report.corrections_applied = report.corrections.len();
        counter!(
            "wms.reservations.corrections",
            report.corrections_applied as u64
        );
        info!(
            processed = report.total_processed,
            corrections = report.corrections_applied,
            skipped = report.skipped,
            "Reservation sync finished"
        );
        self.event_sender.publish_all(events);
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn reservation_stats(&self) -> Result<ReservationStats, ServiceError> {
        let db = &*self.db_pool;

        let active = PickingOrderStatus::active_demand();

        let total_records = inventory::Entity::find().count(db);
        let records_with_reservation = inventory::Entity::find()
            .filter(inventory::Column::ReservedQuantity.gt(0))
            .count(db);
        let total_reserved_units = inventory::Entity::find()
            .select_only()
            .column_as(
                Expr::col((inventory::Entity, inventory::Column::ReservedQuantity)).sum(),
                "total",
            )
            .into_tuple::<Option<i64>>()
            .one(db);
        let counts = picking_order::Entity::find()
            .select_only()
            .column(picking_order::Column::Status)
            .column_as(
                Expr::col((picking_order::Entity, picking_order::Column::Id)).count(),
                "count",
            )
            .filter(picking_order::Column::Status.is_in(active.clone()))
            .group_by(picking_order::Column::Status)
            .into_tuple::<(PickingOrderStatus, i64)>()
            .all(db);

        let (total_records, records_with_reservation, total_reserved_units, counts) =
            futures::try_join!(
                total_records,
                records_with_reservation,
                total_reserved_units,
                counts
            )
            .map_err(ServiceError::db_error)?;

        let mut by_status: BTreeMap<String, i64> =
            active.iter().map(|status| (status.to_string(), 0)).collect();
        for (status, count) in counts {
            by_status.insert(status.to_string(), count);
        }
        let total = by_status.values().sum();

        Ok(ReservationStats {
            inventory: InventoryReservationStats {
                total_records,
                records_with_reservation,
                total_reserved_units: total_reserved_units.flatten().unwrap_or(0),
            },
            orders: OrderDemandStats { by_status, total },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::InventoryStatus;
    use chrono::TimeZone;

    fn record(id: u128, quantity: i32, status: InventoryStatus) -> InventoryModel {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        InventoryModel {
            id: Uuid::from_u128(id),
            tenant_id: Uuid::nil(),
            product_id: Uuid::nil(),
            location_id: Uuid::nil(),
            batch: None,
            expiry_date: None,
            quantity,
            reserved_quantity: 0,
            status,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn demand_fills_records_in_order() {
        let a = record(1, 30, InventoryStatus::Available);
        let b = record(2, 50, InventoryStatus::Available);
        let shares = distribute_demand(40, &[&a, &b]);
        assert_eq!(shares, vec![(a.id, 30), (b.id, 10)]);
    }

    #[test]
    fn reservation_never_exceeds_on_hand() {
        let a = record(1, 5, InventoryStatus::Available);
        let shares = distribute_demand(500, &[&a]);
        assert_eq!(shares, vec![(a.id, 5)]);
    }

    #[test]
    fn blocked_stock_is_never_reserved() {
        let blocked = record(1, 20, InventoryStatus::Quarantine);
        let open = record(2, 20, InventoryStatus::Available);
        let shares = distribute_demand(10, &[&blocked, &open]);
        assert_eq!(shares, vec![(blocked.id, 0), (open.id, 10)]);
    }

    #[test]
    fn no_demand_clears_reservations() {
        let a = record(1, 20, InventoryStatus::Available);
        assert_eq!(distribute_demand(0, &[&a]), vec![(a.id, 0)]);
    }
}
