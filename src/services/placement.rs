//! Single-batch-per-location rule applied before stock is put away.

use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::WarehouseConfig;
use crate::entities::{inventory, warehouse_location, warehouse_zone};
use crate::errors::ServiceError;

/// Label used for stock without a batch in rejection messages.
pub const NO_BATCH_LABEL: &str = "NO BATCH";

/// Outcome of a placement check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PlacementDecision {
    Allowed,
    Rejected {
        reason: String,
        conflicting_batches: Vec<String>,
    },
}

impl PlacementDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PlacementDecision::Allowed)
    }
}

#[derive(Clone)]
pub struct PlacementValidator {
    db_pool: Arc<DatabaseConnection>,
    warehouse: Arc<WarehouseConfig>,
}

impl PlacementValidator {
    pub fn new(db_pool: Arc<DatabaseConnection>, warehouse: Arc<WarehouseConfig>) -> Self {
        Self { db_pool, warehouse }
    }

    /// Decides whether `batch` of `product_id` may be stored at `location_id`.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        batch: Option<&str>,
    ) -> Result<PlacementDecision, ServiceError> {
        self.validate_with(&*self.db_pool, location_id, product_id, batch)
            .await
    }

    /// Same as [`validate`](Self::validate) but reads through the caller's
    /// connection so the check sees the caller's uncommitted writes.
    pub async fn validate_with<C: ConnectionTrait>(
        &self,
        db: &C,
        location_id: Uuid,
        product_id: Uuid,
        batch: Option<&str>,
    ) -> Result<PlacementDecision, ServiceError> {
        let batch = match batch.map(str::trim).filter(|b| !b.is_empty()) {
            Some(batch) => batch,
            None => return Ok(PlacementDecision::Allowed),
        };

        let location = warehouse_location::Entity::find_by_id(location_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Location {} not found", location_id))
            })?;

        let zone = warehouse_zone::Entity::find_by_id(location.zone_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;

        if let Some(zone) = &zone {
            if self.warehouse.is_multi_batch_zone(&zone.code) {
                debug!(location = %location.code, zone = %zone.code, "multi-batch zone");
                return Ok(PlacementDecision::Allowed);
            }
        }

        let existing = inventory::Entity::find()
            .filter(inventory::Column::LocationId.eq(location_id))
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::Quantity.gt(0))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let conflicting: BTreeSet<String> = existing
            .iter()
            .filter(|record| record.batch.as_deref().map(str::trim) != Some(batch))
            .map(|record| {
                record
                    .batch
                    .clone()
                    .unwrap_or_else(|| NO_BATCH_LABEL.to_string())
            })
            .collect();

        if conflicting.is_empty() {
            return Ok(PlacementDecision::Allowed);
        }

        let conflicting_batches: Vec<String> = conflicting.into_iter().collect();
        let reason = format!(
            "Location {} already holds batch(es) {} of this product; batch {} cannot share it. \
             Multiple batches are only allowed in zones {}",
            location.code,
            conflicting_batches.join(", "),
            batch,
            self.warehouse.multi_batch_zones.join(", ")
        );

        Ok(PlacementDecision::Rejected {
            reason,
            conflicting_batches,
        })
    }
}
