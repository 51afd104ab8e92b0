//! Goods-in addressing: operator preallocation sheets are validated, saved as
//! pending instructions and finally executed, moving received stock out of the
//! receiving zone to its final location.

use chrono::Utc;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::SimpleExpr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::WarehouseConfig,
    entities::{
        inventory, inventory_movement, product, receiving_order, receiving_preallocation,
        warehouse_location, warehouse_zone, InventoryModel, InventoryStatus, LocationType,
        PreallocationStatus, ReceivingOrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::placement::{PlacementDecision, PlacementValidator},
};

static WHOLE_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]\d{2}-\d{2}-\d{2}$").expect("valid whole location pattern"));
static FRACTION_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]\d{2}-\d{2}-\d[A-Z]$").expect("valid fraction location pattern")
});

/// Location type implied by an address code, `None` when the code has neither format.
pub fn classify_location_code(code: &str) -> Option<LocationType> {
    if WHOLE_LOCATION.is_match(code) {
        Some(LocationType::Whole)
    } else if FRACTION_LOCATION.is_match(code) {
        Some(LocationType::Fraction)
    } else {
        None
    }
}

/// One parsed line of a preallocation sheet
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreallocationRow {
    pub location_code: String,
    pub sku: String,
    #[serde(default)]
    pub batch: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProcessFileRequest {
    #[validate(length(min = 1, message = "The file has no rows"))]
    pub rows: Vec<PreallocationRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RowValidation {
    /// Sheet row, the header being row 1
    pub row_number: usize,
    pub location_code: String,
    pub sku: String,
    pub batch: Option<String>,
    pub quantity: i32,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub location_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SavePreallocationsRequest {
    #[validate(length(min = 1, message = "Nothing to save"))]
    pub validations: Vec<RowValidation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreallocationView {
    pub id: Uuid,
    pub location_id: Uuid,
    pub location_code: Option<String>,
    pub product_id: Uuid,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub batch: Option<String>,
    pub quantity: i32,
    pub status: PreallocationStatus,
    pub created_by: String,
    pub created_at: chrono::DateTime<Utc>,
    pub executed_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddressingFailure {
    pub preallocation_id: Uuid,
    pub reason: String,
}

/// Outcome of executing a receiving order's preallocations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressingResult {
    pub moved_items: i64,
    pub executed: usize,
    pub failures: Vec<AddressingFailure>,
    pub order_completed: bool,
    pub message: String,
}

enum RowOutcome {
    Moved { quantity: i32, events: Vec<Event> },
    Failed(String),
}

fn normalize_batch(batch: Option<&str>) -> Option<String> {
    batch
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

fn batch_matches(column: inventory::Column, batch: Option<&str>) -> SimpleExpr {
    match batch {
        Some(batch) => column.eq(batch),
        None => column.is_null(),
    }
}

#[derive(Clone)]
pub struct PreallocationService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    warehouse: Arc<WarehouseConfig>,
    placement: PlacementValidator,
}

impl PreallocationService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: EventSender,
        warehouse: Arc<WarehouseConfig>,
    ) -> Self {
        let placement = PlacementValidator::new(db_pool.clone(), warehouse.clone());
        Self {
            db_pool,
            event_sender,
            warehouse,
            placement,
        }
    }

    async fn load_order<C: ConnectionTrait>(
        db: &C,
        order_id: Uuid,
    ) -> Result<receiving_order::Model, ServiceError> {
        receiving_order::Entity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Receiving order {} not found", order_id)))
    }

    fn ensure_open(order: &receiving_order::Model) -> Result<(), ServiceError> {
        match order.status {
            ReceivingOrderStatus::Completed | ReceivingOrderStatus::Cancelled => {
                Err(ServiceError::BadRequest(format!(
                    "Receiving order {} is {}",
                    order.order_number, order.status
                )))
            }
            _ => Ok(()),
        }
    }

    /// Validates the rows of a preallocation sheet. Every row gets a verdict;
    /// nothing is persisted.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn process_file(
        &self,
        receiving_order_id: Uuid,
        rows: Vec<PreallocationRow>,
    ) -> Result<Vec<RowValidation>, ServiceError> {
        let db = &*self.db_pool;
        let order = Self::load_order(db, receiving_order_id).await?;
        Self::ensure_open(&order)?;

        let codes: BTreeSet<String> = rows
            .iter()
            .map(|r| r.location_code.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        let skus: BTreeSet<String> = rows
            .iter()
            .map(|r| r.sku.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let locations: HashMap<String, warehouse_location::Model> =
            warehouse_location::Entity::find()
                .filter(warehouse_location::Column::Code.is_in(codes))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|l| (l.code.clone(), l))
                .collect();
        let products: HashMap<String, product::Model> = product::Entity::find()
            .filter(product::Column::TenantId.eq(order.tenant_id))
            .filter(product::Column::Sku.is_in(skus))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.sku.clone(), p))
            .collect();

        let mut validations = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let location_code = row.location_code.trim().to_uppercase();
            let sku = row.sku.trim().to_string();
            let batch = normalize_batch(row.batch.as_deref());
            let mut errors = Vec::new();

            let location = if location_code.is_empty() {
                errors.push("Location code is required".to_string());
                None
            } else {
                let format = classify_location_code(&location_code);
                if format.is_none() {
                    errors.push(format!(
                        "Location code {} does not match the A00-00-00 or A00-00-0A format",
                        location_code
                    ));
                }
                match locations.get(&location_code) {
                    None => {
                        errors.push(format!("Location {} not found", location_code));
                        None
                    }
                    Some(location) => {
                        if let Some(format) = format {
                            if location.location_type != format {
                                errors.push(format!(
                                    "Location {} is a {} location but the code has the {} format",
                                    location_code, location.location_type, format
                                ));
                            }
                        }
                        if location.tenant_id.map_or(false, |t| t != order.tenant_id) {
                            errors.push(format!(
                                "Location {} belongs to another tenant",
                                location_code
                            ));
                        }
                        Some(location)
                    }
                }
            };

            let product = if sku.is_empty() {
                errors.push("SKU is required".to_string());
                None
            } else {
                let found = products.get(&sku);
                if found.is_none() {
                    errors.push(format!("Product with SKU {} not found", sku));
                }
                found
            };

            if row.quantity <= 0 {
                errors.push("Quantity must be greater than zero".to_string());
            }

            if let (Some(location), Some(product)) = (location, product) {
                match self
                    .placement
                    .validate(location.id, product.id, batch.as_deref())
                    .await?
                {
                    PlacementDecision::Allowed => {}
                    PlacementDecision::Rejected { reason, .. } => errors.push(reason),
                }
            }

            validations.push(RowValidation {
                row_number: index + 2,
                location_code,
                sku,
                batch,
                quantity: row.quantity,
                is_valid: errors.is_empty(),
                errors,
                location_id: location.map(|l| l.id),
                product_id: product.map(|p| p.id),
            });
        }

        let valid = validations.iter().filter(|v| v.is_valid).count();
        info!(
            receiving_order_id = %receiving_order_id,
            rows = validations.len(),
            valid,
            "Preallocation sheet validated"
        );
        Ok(validations)
    }

    /// Persists the valid rows as pending preallocations and returns how many were saved.
    #[instrument(skip(self, validations), fields(rows = validations.len()))]
    pub async fn save(
        &self,
        receiving_order_id: Uuid,
        validations: Vec<RowValidation>,
        actor_id: &str,
    ) -> Result<usize, ServiceError> {
        let valid: Vec<RowValidation> = validations.into_iter().filter(|v| v.is_valid).collect();
        if valid.is_empty() {
            return Err(ServiceError::BadRequest(
                "No valid preallocation rows to save".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let order = Self::load_order(&txn, receiving_order_id).await?;
        Self::ensure_open(&order)?;

        let location_ids: BTreeSet<Uuid> = valid.iter().filter_map(|v| v.location_id).collect();
        let product_ids: BTreeSet<Uuid> = valid.iter().filter_map(|v| v.product_id).collect();
        let known_locations: BTreeSet<Uuid> = warehouse_location::Entity::find()
            .filter(warehouse_location::Column::Id.is_in(location_ids))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|l| l.id)
            .collect();
        let known_products: BTreeSet<Uuid> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .filter(product::Column::TenantId.eq(order.tenant_id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let now = Utc::now();
        for row in &valid {
            let (location_id, product_id) = match (row.location_id, row.product_id) {
                (Some(l), Some(p)) if known_locations.contains(&l) && known_products.contains(&p) => {
                    (l, p)
                }
                _ => {
                    return Err(ServiceError::BadRequest(format!(
                        "Row {} does not reference a known location and product; validate the file again",
                        row.row_number
                    )))
                }
            };
            if row.quantity <= 0 {
                return Err(ServiceError::BadRequest(format!(
                    "Row {} has a non-positive quantity",
                    row.row_number
                )));
            }

            receiving_preallocation::ActiveModel {
                id: Set(Uuid::new_v4()),
                receiving_order_id: Set(receiving_order_id),
                location_id: Set(location_id),
                product_id: Set(product_id),
                batch: Set(normalize_batch(row.batch.as_deref())),
                quantity: Set(row.quantity),
                status: Set(PreallocationStatus::Pending),
                created_by: Set(actor_id.to_string()),
                executed_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(
            receiving_order_id = %receiving_order_id,
            saved = valid.len(),
            actor = %actor_id,
            "Preallocations saved"
        );
        Ok(valid.len())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, receiving_order_id: Uuid) -> Result<Vec<PreallocationView>, ServiceError> {
        let db = &*self.db_pool;
        Self::load_order(db, receiving_order_id).await?;

        let rows = receiving_preallocation::Entity::find()
            .filter(receiving_preallocation::Column::ReceivingOrderId.eq(receiving_order_id))
            .filter(receiving_preallocation::Column::Status.is_in([
                PreallocationStatus::Pending,
                PreallocationStatus::Executed,
            ]))
            .order_by_asc(receiving_preallocation::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(rows.iter().map(|r| r.product_id).collect::<BTreeSet<_>>()))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let locations: HashMap<Uuid, String> = warehouse_location::Entity::find()
            .filter(
                warehouse_location::Column::Id
                    .is_in(rows.iter().map(|r| r.location_id).collect::<BTreeSet<_>>()),
            )
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|l| (l.id, l.code))
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let product = products.get(&row.product_id);
                PreallocationView {
                    id: row.id,
                    location_id: row.location_id,
                    location_code: locations.get(&row.location_id).cloned(),
                    product_id: row.product_id,
                    sku: product.map(|p| p.sku.clone()),
                    description: product.map(|p| p.description.clone()),
                    batch: row.batch,
                    quantity: row.quantity,
                    status: row.status,
                    created_by: row.created_by,
                    created_at: row.created_at,
                    executed_at: row.executed_at,
                }
            })
            .collect())
    }

    /// Removes the order's pending preallocations; executed ones are history.
    #[instrument(skip(self))]
    pub async fn delete(&self, receiving_order_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        Self::load_order(db, receiving_order_id).await?;

        let result = receiving_preallocation::Entity::delete_many()
            .filter(receiving_preallocation::Column::ReceivingOrderId.eq(receiving_order_id))
            .filter(receiving_preallocation::Column::Status.eq(PreallocationStatus::Pending))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(
            receiving_order_id = %receiving_order_id,
            deleted = result.rows_affected,
            "Pending preallocations deleted"
        );
        Ok(result.rows_affected)
    }

    /// Receiving-zone locations usable for this tenant, ordered by code.
    async fn holding_locations<C: ConnectionTrait>(
        &self,
        db: &C,
        tenant_id: Uuid,
    ) -> Result<Vec<warehouse_location::Model>, ServiceError> {
        let zone = warehouse_zone::Entity::find()
            .filter(warehouse_zone::Column::Code.eq(self.warehouse.receiving_zone_code.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        let Some(zone) = zone else {
            return Ok(Vec::new());
        };

        let locations = warehouse_location::Entity::find()
            .filter(warehouse_location::Column::ZoneId.eq(zone.id))
            .order_by_asc(warehouse_location::Column::Code)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(locations
            .into_iter()
            .filter(|l| l.tenant_id.map_or(true, |t| t == tenant_id))
            .collect())
    }

    /// Moves received stock to the preallocated addresses. Rows that cannot be
    /// executed are reported and stay pending; the receiving order completes
    /// once none are left.
    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        receiving_order_id: Uuid,
        actor_id: &str,
    ) -> Result<AddressingResult, ServiceError> {
        let db = &*self.db_pool;
        let order = Self::load_order(db, receiving_order_id).await?;
        if order.status != ReceivingOrderStatus::Addressing {
            return Err(ServiceError::PreconditionFailed(format!(
                "Receiving order {} is {}; addressing requires status addressing",
                order.order_number, order.status
            )));
        }

        let pending = receiving_preallocation::Entity::find()
            .filter(receiving_preallocation::Column::ReceivingOrderId.eq(receiving_order_id))
            .filter(receiving_preallocation::Column::Status.eq(PreallocationStatus::Pending))
            .order_by_asc(receiving_preallocation::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if pending.is_empty() {
            return Err(ServiceError::PreconditionFailed(format!(
                "Receiving order {} has no pending preallocations",
                order.order_number
            )));
        }

        let holding = self.holding_locations(db, order.tenant_id).await?;
        if holding.is_empty() {
            return Err(ServiceError::PreconditionFailed(format!(
                "No {} location available to address from",
                self.warehouse.receiving_zone_code
            )));
        }

        let mut moved_items: i64 = 0;
        let mut executed = 0;
        let mut failures = Vec::new();
        for row in &pending {
            let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
            match self.execute_row(&txn, &order, row, &holding, actor_id).await? {
                RowOutcome::Moved { quantity, events } => {
                    txn.commit().await.map_err(ServiceError::db_error)?;
                    moved_items += i64::from(quantity);
                    executed += 1;
                    counter!("wms.preallocations.executed", 1);
                    self.event_sender.publish_all(events);
                }
                RowOutcome::Failed(reason) => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    warn!(preallocation_id = %row.id, reason = %reason, "Preallocation not executed");
                    failures.push(AddressingFailure {
                        preallocation_id: row.id,
                        reason,
                    });
                }
            }
        }

        let remaining = receiving_preallocation::Entity::find()
            .filter(receiving_preallocation::Column::ReceivingOrderId.eq(receiving_order_id))
            .filter(receiving_preallocation::Column::Status.eq(PreallocationStatus::Pending))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut order_completed = false;
        if remaining == 0 {
            let result = receiving_order::Entity::update_many()
                .set(receiving_order::ActiveModel {
                    status: Set(ReceivingOrderStatus::Completed),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                })
                .filter(receiving_order::Column::Id.eq(receiving_order_id))
                .filter(receiving_order::Column::Status.eq(ReceivingOrderStatus::Addressing))
                .exec(db)
                .await
                .map_err(ServiceError::db_error)?;
            order_completed = result.rows_affected > 0;
        }

        let message = if failures.is_empty() {
            format!(
                "{} preallocation(s) executed, {} unit(s) moved",
                executed, moved_items
            )
        } else {
            format!(
                "{} preallocation(s) executed, {} unit(s) moved, {} failed",
                executed,
                moved_items,
                failures.len()
            )
        };
        info!(
            receiving_order_id = %receiving_order_id,
            executed,
            moved_items,
            failed = failures.len(),
            order_completed,
            "Addressing finished"
        );

        Ok(AddressingResult {
            moved_items,
            executed,
            failures,
            order_completed,
            message,
        })
    }

    async fn execute_row(
        &self,
        txn: &DatabaseTransaction,
        order: &receiving_order::Model,
        row: &receiving_preallocation::Model,
        holding: &[warehouse_location::Model],
        actor_id: &str,
    ) -> Result<RowOutcome, ServiceError> {
        let batch = row.batch.as_deref();
        let holding_ids: Vec<Uuid> = holding.iter().map(|l| l.id).collect();

        let mut sources: Vec<InventoryModel> = inventory::Entity::find()
            .filter(inventory::Column::TenantId.eq(order.tenant_id))
            .filter(inventory::Column::ProductId.eq(row.product_id))
            .filter(batch_matches(inventory::Column::Batch, batch))
            .filter(inventory::Column::LocationId.is_in(holding_ids))
            .filter(inventory::Column::Status.eq(InventoryStatus::Available))
            .filter(inventory::Column::Quantity.gt(0))
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;
        let position = |id: Uuid| holding.iter().position(|l| l.id == id);
        sources.sort_by(|a, b| {
            position(a.location_id)
                .cmp(&position(b.location_id))
                .then_with(|| a.arrival_cmp(b))
        });
        let Some(source) = sources.into_iter().next() else {
            return Ok(RowOutcome::Failed(format!(
                "No stock of batch {} in the {} zone",
                batch.unwrap_or("NO BATCH"),
                self.warehouse.receiving_zone_code
            )));
        };

        match self
            .placement
            .validate_with(txn, row.location_id, row.product_id, batch)
            .await
        {
            Ok(PlacementDecision::Allowed) => {}
            Ok(PlacementDecision::Rejected { reason, .. }) => return Ok(RowOutcome::Failed(reason)),
            Err(ServiceError::NotFound(reason)) => return Ok(RowOutcome::Failed(reason)),
            Err(e) => return Err(e),
        }

        let quantity = row.quantity.min(source.quantity);
        let now = Utc::now();
        let left = source.quantity - quantity;
        let source_updated = if left == 0 && source.reserved_quantity == 0 {
            inventory::Entity::delete_many()
                .filter(inventory::Column::Id.eq(source.id))
                .filter(inventory::Column::Quantity.eq(source.quantity))
                .exec(txn)
                .await
                .map_err(ServiceError::db_error)?
                .rows_affected
        } else {
            inventory::Entity::update_many()
                .set(inventory::ActiveModel {
                    quantity: Set(left),
                    reserved_quantity: Set(source.reserved_quantity.min(left)),
                    updated_at: Set(now),
                    ..Default::default()
                })
                .filter(inventory::Column::Id.eq(source.id))
                .filter(inventory::Column::Quantity.eq(source.quantity))
                .exec(txn)
                .await
                .map_err(ServiceError::db_error)?
                .rows_affected
        };
        if source_updated == 0 {
            return Ok(RowOutcome::Failed(
                "Receiving stock changed concurrently; run addressing again".to_string(),
            ));
        }

        let destination = inventory::Entity::find()
            .filter(inventory::Column::TenantId.eq(order.tenant_id))
            .filter(inventory::Column::ProductId.eq(row.product_id))
            .filter(inventory::Column::LocationId.eq(row.location_id))
            .filter(batch_matches(inventory::Column::Batch, batch))
            .filter(inventory::Column::Status.eq(InventoryStatus::Available))
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?;
        match destination {
            Some(existing) => {
                let result = inventory::Entity::update_many()
                    .set(inventory::ActiveModel {
                        quantity: Set(existing.quantity + quantity),
                        updated_at: Set(now),
                        ..Default::default()
                    })
                    .filter(inventory::Column::Id.eq(existing.id))
                    .filter(inventory::Column::Quantity.eq(existing.quantity))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if result.rows_affected == 0 {
                    return Ok(RowOutcome::Failed(
                        "Destination stock changed concurrently; run addressing again".to_string(),
                    ));
                }
            }
            None => {
                inventory::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    tenant_id: Set(order.tenant_id),
                    product_id: Set(row.product_id),
                    location_id: Set(row.location_id),
                    batch: Set(row.batch.clone()),
                    expiry_date: Set(source.expiry_date),
                    quantity: Set(quantity),
                    reserved_quantity: Set(0),
                    status: Set(InventoryStatus::Available),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)?;
            }
        }

        let movement = inventory_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(order.tenant_id),
            product_id: Set(row.product_id),
            batch: Set(row.batch.clone()),
            from_location_id: Set(Some(source.location_id)),
            to_location_id: Set(Some(row.location_id)),
            quantity: Set(quantity),
            movement_type: Set(inventory_movement::MovementType::Receiving),
            reference: Set(Some(order.order_number.clone())),
            performed_by: Set(actor_id.to_string()),
            notes: Set(Some(format!("Preallocation {}", row.id))),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(ServiceError::db_error)?;

        let marked = receiving_preallocation::Entity::update_many()
            .set(receiving_preallocation::ActiveModel {
                status: Set(PreallocationStatus::Executed),
                executed_at: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(receiving_preallocation::Column::Id.eq(row.id))
            .filter(receiving_preallocation::Column::Status.eq(PreallocationStatus::Pending))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if marked.rows_affected == 0 {
            return Ok(RowOutcome::Failed(
                "Preallocation was already processed".to_string(),
            ));
        }

        info!(
            preallocation_id = %row.id,
            product_id = %row.product_id,
            from = %source.location_id,
            to = %row.location_id,
            quantity,
            "Stock addressed"
        );

        Ok(RowOutcome::Moved {
            quantity,
            events: vec![
                Event::InventoryMoved {
                    movement_id: movement.id,
                    product_id: row.product_id,
                    from_location_id: Some(source.location_id),
                    to_location_id: row.location_id,
                    quantity,
                },
                Event::PreallocationExecuted {
                    preallocation_id: row.id,
                    receiving_order_id: order.id,
                },
            ],
        })
    }
}
