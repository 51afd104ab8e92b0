use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::WarehouseConfig,
    entities::{
        inventory,
        label_association::{self, LabelStatus},
        picking_order, picking_order_item, picking_wave,
        picking_wave_item, product, tenant, warehouse_location, warehouse_zone, InventoryModel,
        InventoryStatus, PickingOrderModel, PickingOrderStatus, PickingRule, WaveItemModel,
        WaveItemStatus, WaveModel, WaveStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Filters accepted by [`WaveService::list_waves`].
#[derive(Debug, Clone, Default)]
pub struct WaveListFilter {
    pub status: Option<WaveStatus>,
    pub tenant_id: Option<Uuid>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWaveRequest {
    #[validate(length(min = 1, message = "At least one order is required"))]
    pub order_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaveOrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub customer_order_number: Option<String>,
    pub status: PickingOrderStatus,
}

impl From<&PickingOrderModel> for WaveOrderSummary {
    fn from(order: &PickingOrderModel) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            customer_order_number: order.customer_order_number.clone(),
            status: order.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LocationScanRequest {
    #[validate(length(min = 1, message = "Location code is required"))]
    pub location_code: String,
}

/// A scanned pick location confirmed against the wave
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationCheck {
    pub location: warehouse_location::Model,
    pub item_count: usize,
    pub items: Vec<WaveItemModel>,
}

/// A wave with its picking lines and member orders
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaveDetails {
    pub wave: WaveModel,
    pub items: Vec<WaveItemModel>,
    pub orders: Vec<WaveOrderSummary>,
}

/// Wave line decorated for the picker's handheld
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressItem {
    #[serde(flatten)]
    pub item: WaveItemModel,
    pub label_code: Option<String>,
    pub order_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PickingProgress {
    pub total_items: usize,
    pub completed_items: usize,
    pub total_quantity: i64,
    pub picked_quantity: i64,
    pub percent_complete: u32,
}

impl PickingProgress {
    pub fn from_items(items: &[WaveItemModel]) -> Self {
        let total_items = items.len();
        let completed_items = items
            .iter()
            .filter(|item| item.status == WaveItemStatus::Picked)
            .count();
        let total_quantity = items.iter().map(|i| i64::from(i.total_quantity)).sum();
        let picked_quantity = items.iter().map(|i| i64::from(i.picked_quantity)).sum();
        let percent_complete = if total_items == 0 {
            0
        } else {
            ((completed_items as f64 / total_items as f64) * 100.0).round() as u32
        };

        Self {
            total_items,
            completed_items,
            total_quantity,
            picked_quantity,
            percent_complete,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaveProgressView {
    pub wave: WaveModel,
    pub items: Vec<ProgressItem>,
    pub progress: PickingProgress,
}

/// New picked quantity for one line of a completed wave
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct PickedQuantityEdit {
    pub wave_item_id: Uuid,
    pub picked_quantity: i32,
}

/// Formats `{prefix}-{YYYYMMDD}-{NNNN}`.
pub fn format_wave_number(prefix: &str, date: NaiveDate, sequence: u32) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), sequence)
}

/// Next wave number for `date` given the numbers already issued that day.
pub fn next_wave_number<'a, I>(prefix: &str, date: NaiveDate, issued: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let day_prefix = format!("{}-{}-", prefix, date.format("%Y%m%d"));
    let last = issued
        .into_iter()
        .filter_map(|number| number.strip_prefix(day_prefix.as_str()))
        .filter_map(|sequence| sequence.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format_wave_number(prefix, date, last + 1)
}

/// Consolidated demand for one (product, requested batch) across the wave's orders.
#[derive(Debug, Clone)]
struct DemandLine {
    product_id: Uuid,
    batch: Option<String>,
    quantity: i32,
    unit: String,
    first_order_id: Uuid,
}

#[derive(Debug, Clone)]
struct Allocation {
    line: usize,
    inventory_id: Uuid,
    quantity: i32,
}

fn allocation_cmp(rule: PickingRule, a: &InventoryModel, b: &InventoryModel) -> std::cmp::Ordering {
    match rule {
        PickingRule::Fefo => a.fefo_cmp(b),
        PickingRule::Fifo | PickingRule::Directed => a.arrival_cmp(b),
    }
}

/// Splits each demand line over the stock records, in `stock` order. Lines
/// that name a batch are served first so unbatched demand does not consume
/// the lots they require.
fn allocate_demand(
    lines: &[DemandLine],
    stock: &[InventoryModel],
) -> Result<Vec<Allocation>, Vec<(usize, i32)>> {
    let mut consumed: HashMap<Uuid, i32> = HashMap::new();
    let mut allocations = Vec::new();
    let mut shortages = Vec::new();

    let mut order: Vec<usize> = (0..lines.len()).collect();
    order.sort_by_key(|&idx| lines[idx].batch.is_none());

    for idx in order {
        let line = &lines[idx];
        let mut remaining = line.quantity;
        for record in stock.iter().filter(|r| {
            r.product_id == line.product_id
                && line.batch.as_ref().map_or(true, |b| r.batch.as_ref() == Some(b))
        }) {
            if remaining == 0 {
                break;
            }
            let used = consumed.entry(record.id).or_insert(0);
            let take = (record.quantity - *used).min(remaining);
            if take <= 0 {
                continue;
            }
            *used += take;
            remaining -= take;
            allocations.push(Allocation {
                line: idx,
                inventory_id: record.id,
                quantity: take,
            });
        }
        if remaining > 0 {
            shortages.push((idx, line.quantity - remaining));
        }
    }

    if !shortages.is_empty() {
        shortages.sort_unstable();
        return Err(shortages);
    }

    // one line per stock record, listed in demand order
    allocations.sort_by_key(|a| a.line);
    let mut merged: Vec<Allocation> = Vec::with_capacity(allocations.len());
    for allocation in allocations {
        match merged
            .iter_mut()
            .find(|m| m.inventory_id == allocation.inventory_id)
        {
            Some(existing) => existing.quantity += allocation.quantity,
            None => merged.push(allocation),
        }
    }
    Ok(merged)
}

/// Ids of every location in the receiving (holding) zone. Stock there is not
/// pickable until it has been addressed.
pub(crate) async fn receiving_location_ids<C: ConnectionTrait>(
    db: &C,
    receiving_zone_code: &str,
) -> Result<HashSet<Uuid>, ServiceError> {
    let zone = warehouse_zone::Entity::find()
        .filter(warehouse_zone::Column::Code.eq(receiving_zone_code))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?;
    let Some(zone) = zone else {
        return Ok(HashSet::new());
    };
    let ids: Vec<Uuid> = warehouse_location::Entity::find()
        .select_only()
        .column(warehouse_location::Column::Id)
        .filter(warehouse_location::Column::ZoneId.eq(zone.id))
        .into_tuple()
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(ids.into_iter().collect())
}

/// Loads a wave under a row lock (a plain read on SQLite).
pub(crate) async fn lock_wave<C: ConnectionTrait>(
    db: &C,
    wave_id: Uuid,
) -> Result<WaveModel, ServiceError> {
    picking_wave::Entity::find_by_id(wave_id)
        .lock_exclusive()
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Wave {} not found", wave_id)))
}

async fn set_order_status<C: ConnectionTrait>(
    db: &C,
    wave_id: Uuid,
    from: &[PickingOrderStatus],
    to: PickingOrderStatus,
    picked: Option<(String, DateTime<Utc>)>,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, ServiceError> {
    let orders = picking_order::Entity::find()
        .filter(picking_order::Column::WaveId.eq(wave_id))
        .filter(picking_order::Column::Status.is_in(from.iter().copied()))
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let (picked_by, picked_at) = match picked {
        Some((actor, at)) => (Some(actor), Some(at)),
        None => (None, None),
    };
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    picking_order::Entity::update_many()
        .set(picking_order::ActiveModel {
            status: Set(to),
            picked_by: Set(picked_by),
            picked_at: Set(picked_at),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(picking_order::Column::Id.is_in(ids))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(orders
        .into_iter()
        .map(|order| Event::OrderStatusChanged {
            order_id: order.id,
            wave_id: Some(wave_id),
            to,
        })
        .collect())
}

/// Moves a wave to `completed` and its orders to `picked`. Returns no events
/// when another request already completed the wave.
pub(crate) async fn mark_wave_completed<C: ConnectionTrait>(
    db: &C,
    wave: &WaveModel,
    actor: &str,
) -> Result<Vec<Event>, ServiceError> {
    let now = Utc::now();
    let result = picking_wave::Entity::update_many()
        .set(picking_wave::ActiveModel {
            status: Set(WaveStatus::Completed),
            completed_by: Set(Some(actor.to_string())),
            completed_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(picking_wave::Column::Id.eq(wave.id))
        .filter(picking_wave::Column::Status.ne(WaveStatus::Completed))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Ok(Vec::new());
    }

    let mut events = vec![Event::WaveStatusChanged {
        wave_id: wave.id,
        from: wave.status,
        to: WaveStatus::Completed,
        actor: Some(actor.to_string()),
    }];
    events.extend(
        set_order_status(
            db,
            wave.id,
            &[PickingOrderStatus::InWave, PickingOrderStatus::Picking],
            PickingOrderStatus::Picked,
            Some((actor.to_string(), now)),
            now,
        )
        .await?,
    );
    counter!("wms.waves.completed", 1);
    Ok(events)
}

/// First scan of a pending wave: wave and orders move to `picking`.
pub(crate) async fn promote_to_picking<C: ConnectionTrait>(
    db: &C,
    wave: &WaveModel,
    actor: &str,
) -> Result<Vec<Event>, ServiceError> {
    let now = Utc::now();
    let result = picking_wave::Entity::update_many()
        .set(picking_wave::ActiveModel {
            status: Set(WaveStatus::Picking),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(picking_wave::Column::Id.eq(wave.id))
        .filter(picking_wave::Column::Status.eq(WaveStatus::Pending))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Ok(Vec::new());
    }

    let mut events = vec![Event::WaveStatusChanged {
        wave_id: wave.id,
        from: WaveStatus::Pending,
        to: WaveStatus::Picking,
        actor: Some(actor.to_string()),
    }];
    events.extend(
        set_order_status(
            db,
            wave.id,
            &[PickingOrderStatus::InWave],
            PickingOrderStatus::Picking,
            None,
            now,
        )
        .await?,
    );
    Ok(events)
}

/// Reverts every order of the wave to `pending` and clears its wave reference.
pub(crate) async fn detach_orders<C: ConnectionTrait>(
    db: &C,
    wave_id: Uuid,
) -> Result<Vec<Event>, ServiceError> {
    let orders = picking_order::Entity::find()
        .filter(picking_order::Column::WaveId.eq(wave_id))
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    picking_order::Entity::update_many()
        .set(picking_order::ActiveModel {
            status: Set(PickingOrderStatus::Pending),
            wave_id: Set(None),
            picked_by: Set(None),
            picked_at: Set(None),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(picking_order::Column::WaveId.eq(wave_id))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(orders
        .into_iter()
        .map(|order| Event::OrderStatusChanged {
            order_id: order.id,
            wave_id: None,
            to: PickingOrderStatus::Pending,
        })
        .collect())
}

/// Service for building, tracking and closing picking waves
#[derive(Clone)]
pub struct WaveService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    warehouse: Arc<WarehouseConfig>,
}

impl WaveService {
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

    /// Lists waves, newest first
    #[instrument(skip(self))]
    pub async fn list_waves(&self, filter: WaveListFilter) -> Result<Vec<WaveModel>, ServiceError> {
        let mut query = picking_wave::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(picking_wave::Column::Status.eq(status));
        }
        if let Some(tenant_id) = filter.tenant_id {
            query = query.filter(picking_wave::Column::TenantId.eq(tenant_id));
        }

        query
            .order_by_desc(picking_wave::Column::CreatedAt)
            .order_by_desc(picking_wave::Column::WaveNumber)
            .limit(self.warehouse.clamp_list_limit(filter.limit))
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Creates a wave from a set of orders belonging to a single tenant.
    ///
    /// Demand is consolidated per product (and requested batch) and allocated
    /// over the tenant's available stock following the tenant's picking rule.
    /// Nothing is written when any order is rejected or stock is short.
    #[instrument(skip(self, order_ids), fields(order_count = order_ids.len()))]
    pub async fn create_wave(
        &self,
        order_ids: Vec<Uuid>,
        actor_id: &str,
        tenant_scope: Option<Uuid>,
    ) -> Result<WaveDetails, ServiceError> {
        let mut seen = HashSet::new();
        let order_ids: Vec<Uuid> = order_ids.into_iter().filter(|id| seen.insert(*id)).collect();
        if order_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one order is required to create a wave".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let found = picking_order::Entity::find()
            .filter(picking_order::Column::Id.is_in(order_ids.clone()))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let mut by_id: HashMap<Uuid, PickingOrderModel> =
            found.into_iter().map(|o| (o.id, o)).collect();

        let missing: Vec<String> = order_ids
            .iter()
            .filter(|id| !by_id.contains_key(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Orders not found: {}",
                missing.join(", ")
            )));
        }
        let orders: Vec<PickingOrderModel> = order_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        let tenants: BTreeSet<Uuid> = orders.iter().map(|o| o.tenant_id).collect();
        if tenants.len() > 1 {
            return Err(ServiceError::ValidationError(format!(
                "All orders of a wave must belong to the same tenant; found {} tenants",
                tenants.len()
            )));
        }
        let tenant_id = orders[0].tenant_id;
        if let Some(scope) = tenant_scope {
            if scope != tenant_id {
                return Err(ServiceError::Forbidden(
                    "Orders belong to another tenant".to_string(),
                ));
            }
        }

        let ineligible: Vec<String> = orders
            .iter()
            .filter(|o| !o.status.is_wave_eligible() || o.wave_id.is_some())
            .map(|o| format!("{} ({})", o.order_number, o.status))
            .collect();
        if !ineligible.is_empty() {
            return Err(ServiceError::BadRequest(format!(
                "Orders not eligible for a wave: {}",
                ineligible.join(", ")
            )));
        }

        let picking_rule = tenant::Entity::find_by_id(tenant_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|t| t.picking_rule)
            .unwrap_or_default();

        let mut order_items = picking_order_item::Entity::find()
            .filter(picking_order_item::Column::PickingOrderId.is_in(order_ids.clone()))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if order_items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Selected orders have no items to pick".to_string(),
            ));
        }
        let position: HashMap<Uuid, usize> =
            order_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        order_items.sort_by_key(|item| position.get(&item.picking_order_id).copied());

        let mut lines: Vec<DemandLine> = Vec::new();
        let mut line_index: HashMap<(Uuid, Option<String>), usize> = HashMap::new();
        let mut first_order_by_product: HashMap<Uuid, Uuid> = HashMap::new();
        for item in &order_items {
            let first_order = *first_order_by_product
                .entry(item.product_id)
                .or_insert(item.picking_order_id);
            let batch = item
                .batch
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string);
            match line_index.get(&(item.product_id, batch.clone())) {
                Some(&idx) => {
                    lines[idx].quantity = lines[idx]
                        .quantity
                        .checked_add(item.requested_quantity)
                        .ok_or_else(|| {
                            ServiceError::ValidationError(format!(
                                "Requested quantity for product {} is too large",
                                item.product_id
                            ))
                        })?;
                }
                None => {
                    line_index.insert((item.product_id, batch.clone()), lines.len());
                    lines.push(DemandLine {
                        product_id: item.product_id,
                        batch,
                        quantity: item.requested_quantity,
                        unit: item.unit.clone(),
                        first_order_id: first_order,
                    });
                }
            }
        }
        lines.retain(|line| line.quantity > 0);

        let product_ids: Vec<Uuid> = first_order_by_product.keys().copied().collect();
        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids.clone()))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let holding_locations =
            receiving_location_ids(&txn, &self.warehouse.receiving_zone_code).await?;
        let mut stock: Vec<InventoryModel> = inventory::Entity::find()
            .filter(inventory::Column::TenantId.eq(tenant_id))
            .filter(inventory::Column::ProductId.is_in(product_ids))
            .filter(inventory::Column::Status.eq(InventoryStatus::Available))
            .filter(inventory::Column::Quantity.gt(0))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .filter(|record| !holding_locations.contains(&record.location_id))
            .collect();
        stock.sort_by(|a, b| allocation_cmp(picking_rule, a, b));

        let allocations = allocate_demand(&lines, &stock).map_err(|shortages| {
            let detail: Vec<String> = shortages
                .into_iter()
                .map(|(idx, available)| {
                    let line = &lines[idx];
                    let sku = products
                        .get(&line.product_id)
                        .map(|p| p.sku.clone())
                        .unwrap_or_else(|| line.product_id.to_string());
                    let sku = match &line.batch {
                        Some(batch) => format!("{} batch {}", sku, batch),
                        None => sku,
                    };
                    format!(
                        "{}: requested {}, available {}",
                        sku, line.quantity, available
                    )
                })
                .collect();
            ServiceError::InsufficientStock(detail.join("; "))
        })?;

        let stock_by_id: HashMap<Uuid, &InventoryModel> = stock.iter().map(|r| (r.id, r)).collect();
        let location_ids: Vec<Uuid> = stock.iter().map(|r| r.location_id).collect();
        let location_codes: HashMap<Uuid, String> = warehouse_location::Entity::find()
            .filter(warehouse_location::Column::Id.is_in(location_ids))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|l| (l.id, l.code))
            .collect();

        let now = Utc::now();
        let issued: Vec<String> = picking_wave::Entity::find()
            .select_only()
            .column(picking_wave::Column::WaveNumber)
            .filter(picking_wave::Column::WaveNumber.starts_with(format!(
                "{}-{}-",
                self.warehouse.wave_number_prefix,
                now.date_naive().format("%Y%m%d")
            )))
            .into_tuple()
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let wave_number = next_wave_number(
            &self.warehouse.wave_number_prefix,
            now.date_naive(),
            issued.iter().map(String::as_str),
        );

        let total_quantity = allocations
            .iter()
            .try_fold(0i32, |total, a| total.checked_add(a.quantity))
            .ok_or_else(|| {
                ServiceError::ValidationError("Wave quantity is too large".to_string())
            })?;
        let wave = picking_wave::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            wave_number: Set(wave_number.clone()),
            status: Set(WaveStatus::Pending),
            total_orders: Set(orders.len() as i32),
            total_items: Set(allocations.len() as i32),
            total_quantity: Set(total_quantity),
            picking_rule: Set(picking_rule),
            created_by: Set(actor_id.to_string()),
            completed_by: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!(
                "Wave number {} was issued concurrently; retry",
                wave_number
            )),
            _ => ServiceError::db_error(e),
        })?;

        let mut items = Vec::with_capacity(allocations.len());
        for allocation in &allocations {
            let line = &lines[allocation.line];
            let record = stock_by_id.get(&allocation.inventory_id).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Allocated stock record {} vanished",
                    allocation.inventory_id
                ))
            })?;
            let (sku, name) = products
                .get(&line.product_id)
                .map(|p| (p.sku.clone(), p.description.clone()))
                .unwrap_or_default();
            let item = picking_wave_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                wave_id: Set(wave.id),
                picking_order_id: Set(line.first_order_id),
                product_id: Set(line.product_id),
                product_sku: Set(sku),
                product_name: Set(name),
                total_quantity: Set(allocation.quantity),
                picked_quantity: Set(0),
                unit: Set(line.unit.clone()),
                location_id: Set(Some(record.location_id)),
                location_code: Set(location_codes
                    .get(&record.location_id)
                    .cloned()
                    .unwrap_or_default()),
                batch: Set(record.batch.clone()),
                expiry_date: Set(record.expiry_date),
                status: Set(WaveItemStatus::Pending),
                picked_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(item);
        }

        let stamped = picking_order::Entity::update_many()
            .set(picking_order::ActiveModel {
                status: Set(PickingOrderStatus::InWave),
                wave_id: Set(Some(wave.id)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(picking_order::Column::Id.is_in(order_ids.clone()))
            .filter(picking_order::Column::WaveId.is_null())
            .filter(picking_order::Column::Status.is_in([
                PickingOrderStatus::Pending,
                PickingOrderStatus::Validated,
            ]))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if stamped.rows_affected != orders.len() as u64 {
            return Err(ServiceError::Conflict(
                "Orders changed while the wave was being created; retry".to_string(),
            ));
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            wave_id = %wave.id,
            wave_number = %wave.wave_number,
            orders = orders.len(),
            items = items.len(),
            "Wave created"
        );
        counter!("wms.waves.created", 1);

        let mut events = vec![Event::WaveCreated {
            wave_id: wave.id,
            wave_number: wave.wave_number.clone(),
            tenant_id,
            order_count: orders.len(),
            created_by: actor_id.to_string(),
        }];
        events.extend(orders.iter().map(|order| Event::OrderStatusChanged {
            order_id: order.id,
            wave_id: Some(wave.id),
            to: PickingOrderStatus::InWave,
        }));
        self.event_sender.publish_all(events);

        let orders = orders
            .iter()
            .map(|order| WaveOrderSummary {
                status: PickingOrderStatus::InWave,
                ..WaveOrderSummary::from(order)
            })
            .collect();
        Ok(WaveDetails {
            wave,
            items,
            orders,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_wave(&self, wave_id: Uuid) -> Result<WaveDetails, ServiceError> {
        let db = &*self.db_pool;
        let wave = picking_wave::Entity::find_by_id(wave_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Wave {} not found", wave_id)))?;

        let items = self.wave_items(db, wave_id).await?;
        let orders = picking_order::Entity::find()
            .filter(picking_order::Column::WaveId.eq(wave_id))
            .order_by_asc(picking_order::Column::OrderNumber)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .iter()
            .map(WaveOrderSummary::from)
            .collect();

        Ok(WaveDetails {
            wave,
            items,
            orders,
        })
    }

    async fn wave_items<C: ConnectionTrait>(
        &self,
        db: &C,
        wave_id: Uuid,
    ) -> Result<Vec<WaveItemModel>, ServiceError> {
        picking_wave_item::Entity::find()
            .filter(picking_wave_item::Column::WaveId.eq(wave_id))
            .order_by_asc(picking_wave_item::Column::LocationCode)
            .order_by_asc(picking_wave_item::Column::ProductSku)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Confirms that a scanned location holds lines of the wave.
    #[instrument(skip(self))]
    pub async fn validate_location(
        &self,
        wave_id: Uuid,
        location_code: &str,
    ) -> Result<LocationCheck, ServiceError> {
        let db = &*self.db_pool;
        let wave = picking_wave::Entity::find_by_id(wave_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Wave {} not found", wave_id)))?;

        let code = location_code.trim();
        let location = warehouse_location::Entity::find()
            .filter(warehouse_location::Column::Code.eq(code))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", code)))?;

        let items = picking_wave_item::Entity::find()
            .filter(picking_wave_item::Column::WaveId.eq(wave_id))
            .filter(picking_wave_item::Column::LocationId.eq(location.id))
            .order_by_asc(picking_wave_item::Column::ProductSku)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if items.is_empty() {
            return Err(ServiceError::BadRequest(format!(
                "Wave {} has no items at location {}",
                wave.wave_number, location.code
            )));
        }

        Ok(LocationCheck {
            location,
            item_count: items.len(),
            items,
        })
    }

    /// Wave, its lines decorated with label codes and order numbers, and
    /// aggregate progress.
    #[instrument(skip(self))]
    pub async fn picking_progress(&self, wave_id: Uuid) -> Result<WaveProgressView, ServiceError> {
        let details = self.get_wave(wave_id).await?;
        let db = &*self.db_pool;

        let product_ids: BTreeSet<Uuid> = details.items.iter().map(|i| i.product_id).collect();
        let labels = label_association::Entity::find()
            .filter(label_association::Column::ProductId.is_in(product_ids))
            .filter(label_association::Column::Status.eq(LabelStatus::Available))
            .order_by_asc(label_association::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let mut label_codes: HashMap<(Uuid, Option<String>), String> = HashMap::new();
        for label in labels {
            label_codes
                .entry((label.product_id, label.batch))
                .or_insert(label.label_code);
        }

        let order_numbers: HashMap<Uuid, String> = picking_order::Entity::find()
            .filter(picking_order::Column::Id.is_in(
                details.items.iter().map(|i| i.picking_order_id).collect::<BTreeSet<_>>(),
            ))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|o| (o.id, o.order_number))
            .collect();

        let progress = PickingProgress::from_items(&details.items);
        let items = details
            .items
            .into_iter()
            .map(|item| ProgressItem {
                label_code: label_codes
                    .get(&(item.product_id, item.batch.clone()))
                    .map(|code| code.trim().to_string()),
                order_number: order_numbers.get(&item.picking_order_id).cloned(),
                item,
            })
            .collect();

        Ok(WaveProgressView {
            wave: details.wave,
            items,
            progress,
        })
    }

    /// Cancels a pending or picking wave and returns its orders to `pending`.
    /// Reservations follow the orders and are not touched.
    #[instrument(skip(self))]
    pub async fn cancel_wave(&self, wave_id: Uuid, actor_id: &str) -> Result<WaveModel, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let wave = lock_wave(&txn, wave_id).await?;

        match wave.status {
            WaveStatus::Cancelled => {
                return Err(ServiceError::BadRequest(format!(
                    "Wave {} is already cancelled",
                    wave.wave_number
                )))
            }
            WaveStatus::Completed => {
                return Err(ServiceError::BadRequest(format!(
                    "Wave {} is completed; use undo to roll it back",
                    wave.wave_number
                )))
            }
            WaveStatus::Pending | WaveStatus::Picking => {}
        }

        let now = Utc::now();
        let mut active: picking_wave::ActiveModel = wave.clone().into();
        active.status = Set(WaveStatus::Cancelled);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut events = vec![Event::WaveStatusChanged {
            wave_id,
            from: wave.status,
            to: WaveStatus::Cancelled,
            actor: Some(actor_id.to_string()),
        }];
        events.extend(detach_orders(&txn, wave_id).await?);

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(wave_id = %wave_id, wave_number = %wave.wave_number, actor = %actor_id, "Wave cancelled");
        counter!("wms.waves.cancelled", 1);
        self.event_sender.publish_all(events);
        Ok(updated)
    }

    /// Undo path for a wave completed by mistake: picked quantities are zeroed,
    /// the wave is cancelled and its orders return to `pending`.
    #[instrument(skip(self))]
    pub async fn delete_completed_wave(
        &self,
        wave_id: Uuid,
        actor_id: &str,
    ) -> Result<WaveModel, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let wave = lock_wave(&txn, wave_id).await?;

        if wave.status != WaveStatus::Completed {
            return Err(ServiceError::BadRequest(format!(
                "Only completed waves can be undone; wave {} is {}",
                wave.wave_number, wave.status
            )));
        }

        let now = Utc::now();
        picking_wave_item::Entity::update_many()
            .set(picking_wave_item::ActiveModel {
                picked_quantity: Set(0),
                status: Set(WaveItemStatus::Pending),
                picked_at: Set(None),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(picking_wave_item::Column::WaveId.eq(wave_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let mut active: picking_wave::ActiveModel = wave.clone().into();
        active.status = Set(WaveStatus::Cancelled);
        active.completed_by = Set(None);
        active.completed_at = Set(None);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut events = vec![Event::WaveStatusChanged {
            wave_id,
            from: WaveStatus::Completed,
            to: WaveStatus::Cancelled,
            actor: Some(actor_id.to_string()),
        }];
        events.extend(detach_orders(&txn, wave_id).await?);

        txn.commit().await.map_err(ServiceError::db_error)?;

        warn!(wave_id = %wave_id, wave_number = %wave.wave_number, actor = %actor_id, "Completed wave rolled back");
        counter!("wms.waves.cancelled", 1);
        self.event_sender.publish_all(events);
        Ok(updated)
    }

    /// Permanently removes a pending or cancelled wave. Callers must check the
    /// administrative capability first.
    #[instrument(skip(self))]
    pub async fn delete_wave(&self, wave_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let wave = lock_wave(&txn, wave_id).await?;

        if !wave.status.is_deletable() {
            return Err(ServiceError::BadRequest(format!(
                "Wave {} is {}; only pending or cancelled waves can be deleted",
                wave.wave_number, wave.status
            )));
        }

        let mut events = detach_orders(&txn, wave_id).await?;
        picking_wave_item::Entity::delete_many()
            .filter(picking_wave_item::Column::WaveId.eq(wave_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        picking_wave::Entity::delete_by_id(wave_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(wave_id = %wave_id, wave_number = %wave.wave_number, "Wave deleted");
        events.push(Event::WaveDeleted {
            wave_id,
            wave_number: wave.wave_number,
        });
        self.event_sender.publish_all(events);
        Ok(())
    }

    /// Overwrites picked quantities on a completed wave. The wave stays
    /// completed only if every line is still fully picked; otherwise it and its
    /// orders reopen as `picking`.
    #[instrument(skip(self, edits), fields(edits = edits.len()))]
    pub async fn edit_completed_wave_quantities(
        &self,
        wave_id: Uuid,
        edits: Vec<PickedQuantityEdit>,
        actor_id: &str,
    ) -> Result<WaveDetails, ServiceError> {
        if edits.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one item quantity is required".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let wave = lock_wave(&txn, wave_id).await?;
        if wave.status != WaveStatus::Completed {
            return Err(ServiceError::BadRequest(format!(
                "Only completed waves can be edited; wave {} is {}",
                wave.wave_number, wave.status
            )));
        }

        let items = self.wave_items(&txn, wave_id).await?;
        let by_id: HashMap<Uuid, &WaveItemModel> = items.iter().map(|i| (i.id, i)).collect();

        let mut seen = HashSet::new();
        for edit in &edits {
            if !seen.insert(edit.wave_item_id) {
                return Err(ServiceError::BadRequest(format!(
                    "Item {} appears more than once",
                    edit.wave_item_id
                )));
            }
            let item = by_id.get(&edit.wave_item_id).ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Item {} not found in wave {}",
                    edit.wave_item_id, wave.wave_number
                ))
            })?;
            if edit.picked_quantity < 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Picked quantity for {} cannot be negative",
                    item.product_sku
                )));
            }
            if edit.picked_quantity > item.total_quantity {
                return Err(ServiceError::BadRequest(format!(
                    "Picked quantity {} for {} exceeds total {}",
                    edit.picked_quantity, item.product_sku, item.total_quantity
                )));
            }
        }

        let now = Utc::now();
        let mut events = Vec::new();
        let mut new_quantities: HashMap<Uuid, i32> = HashMap::new();
        for edit in &edits {
            let item = by_id[&edit.wave_item_id];
            new_quantities.insert(item.id, edit.picked_quantity);
            if edit.picked_quantity == item.picked_quantity {
                continue;
            }
            let status = WaveItemStatus::for_quantities(edit.picked_quantity, item.total_quantity);
            let result = picking_wave_item::Entity::update_many()
                .set(picking_wave_item::ActiveModel {
                    picked_quantity: Set(edit.picked_quantity),
                    status: Set(status),
                    updated_at: Set(now),
                    ..Default::default()
                })
                .filter(picking_wave_item::Column::Id.eq(item.id))
                .filter(picking_wave_item::Column::PickedQuantity.eq(item.picked_quantity))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            if result.rows_affected == 0 {
                return Err(ServiceError::ConcurrentModification(item.id));
            }
            events.push(Event::WaveItemAdjusted {
                wave_id,
                wave_item_id: item.id,
                old_picked_quantity: item.picked_quantity,
                new_picked_quantity: edit.picked_quantity,
            });
        }

        let all_picked = items.iter().all(|item| {
            let picked = new_quantities
                .get(&item.id)
                .copied()
                .unwrap_or(item.picked_quantity);
            picked == item.total_quantity
        });

        if !all_picked {
            let mut active: picking_wave::ActiveModel = wave.clone().into();
            active.status = Set(WaveStatus::Picking);
            active.completed_by = Set(None);
            active.completed_at = Set(None);
            active.updated_at = Set(now);
            active.update(&txn).await.map_err(ServiceError::db_error)?;

            events.push(Event::WaveStatusChanged {
                wave_id,
                from: WaveStatus::Completed,
                to: WaveStatus::Picking,
                actor: Some(actor_id.to_string()),
            });
            events.extend(
                set_order_status(
                    &txn,
                    wave_id,
                    &[PickingOrderStatus::Picked],
                    PickingOrderStatus::Picking,
                    None,
                    now,
                )
                .await?,
            );
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            wave_id = %wave_id,
            actor = %actor_id,
            reopened = !all_picked,
            "Completed wave quantities edited"
        );
        self.event_sender.publish_all(events);
        self.get_wave(wave_id).await
    }

    /// Completes a wave once every line is picked. Completing an already
    /// completed wave succeeds without side effects.
    #[instrument(skip(self))]
    pub async fn complete_wave(&self, wave_id: Uuid, actor_id: &str) -> Result<WaveModel, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let wave = lock_wave(&txn, wave_id).await?;

        match wave.status {
            WaveStatus::Completed => return Ok(wave),
            WaveStatus::Cancelled => {
                return Err(ServiceError::BadRequest(format!(
                    "Wave {} is cancelled and cannot be completed",
                    wave.wave_number
                )))
            }
            WaveStatus::Pending | WaveStatus::Picking => {}
        }

        let items = self.wave_items(&txn, wave_id).await?;
        let unpicked = items
            .iter()
            .filter(|item| item.status != WaveItemStatus::Picked)
            .count();
        if unpicked > 0 {
            return Err(ServiceError::PreconditionFailed(format!(
                "{} wave item(s) are not fully picked",
                unpicked
            )));
        }

        let events = mark_wave_completed(&txn, &wave, actor_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(wave_id = %wave_id, wave_number = %wave.wave_number, actor = %actor_id, "Wave completed");
        self.event_sender.publish_all(events);

        picking_wave::Entity::find_by_id(wave_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Wave {} not found", wave_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: u128, product: Uuid, batch: Option<&str>, quantity: i32) -> InventoryModel {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        InventoryModel {
            id: Uuid::from_u128(id),
            tenant_id: Uuid::nil(),
            product_id: product,
            location_id: Uuid::from_u128(1000 + id),
            batch: batch.map(str::to_string),
            expiry_date: None,
            quantity,
            reserved_quantity: 0,
            status: InventoryStatus::Available,
            created_at: at,
            updated_at: at,
        }
    }

    fn line(product: Uuid, batch: Option<&str>, quantity: i32) -> DemandLine {
        DemandLine {
            product_id: product,
            batch: batch.map(str::to_string),
            quantity,
            unit: "UN".into(),
            first_order_id: Uuid::nil(),
        }
    }

    #[test]
    fn wave_numbers_continue_the_daily_sequence() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(next_wave_number("OS", day, std::iter::empty()), "OS-20240315-0001");
        assert_eq!(
            next_wave_number("OS", day, ["OS-20240315-0001", "OS-20240315-0007"]),
            "OS-20240315-0008"
        );
        assert_eq!(
            next_wave_number("OS", day, ["OS-20240314-0042"]),
            "OS-20240315-0001"
        );
    }

    #[test]
    fn demand_spills_over_records_in_order() {
        let product = Uuid::from_u128(7);
        let stock = vec![record(1, product, Some("L1"), 4), record(2, product, Some("L2"), 10)];
        let allocations = allocate_demand(&[line(product, None, 6)], &stock).unwrap();

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].inventory_id, Uuid::from_u128(1));
        assert_eq!(allocations[0].quantity, 4);
        assert_eq!(allocations[1].quantity, 2);
    }

    #[test]
    fn batch_specific_demand_is_served_first() {
        let product = Uuid::from_u128(7);
        let stock = vec![record(1, product, Some("L1"), 5), record(2, product, Some("L2"), 5)];
        let lines = [line(product, None, 5), line(product, Some("L1"), 5)];
        let allocations = allocate_demand(&lines, &stock).unwrap();

        let unbatched = allocations.iter().find(|a| a.line == 0).unwrap();
        assert_eq!(unbatched.inventory_id, Uuid::from_u128(2));
    }

    #[test]
    fn shortage_reports_available_quantity() {
        let product = Uuid::from_u128(7);
        let stock = vec![record(1, product, None, 3)];
        let shortages = allocate_demand(&[line(product, None, 5)], &stock).unwrap_err();
        assert_eq!(shortages, vec![(0, 3)]);
    }

    #[test]
    fn progress_rounds_percentage() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let item = |picked: i32, total: i32| WaveItemModel {
            id: Uuid::new_v4(),
            wave_id: Uuid::nil(),
            picking_order_id: Uuid::nil(),
            product_id: Uuid::nil(),
            product_sku: "SKU".into(),
            product_name: "Item".into(),
            total_quantity: total,
            picked_quantity: picked,
            unit: "UN".into(),
            location_id: None,
            location_code: "A01-01-01".into(),
            batch: None,
            expiry_date: None,
            status: if picked == total {
                WaveItemStatus::Picked
            } else {
                WaveItemStatus::Pending
            },
            picked_at: None,
            created_at: at,
            updated_at: at,
        };

        let progress = PickingProgress::from_items(&[item(10, 10), item(0, 5), item(1, 2)]);
        assert_eq!(progress.completed_items, 1);
        assert_eq!(progress.percent_complete, 33);
        assert_eq!(progress.total_quantity, 17);
        assert_eq!(progress.picked_quantity, 11);
        assert_eq!(PickingProgress::from_items(&[]).percent_complete, 0);
    }
}
