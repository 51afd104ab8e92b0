//! Scan validation for wave lines.
//!
//! A scan is accepted only when the scanned code identifies the line's
//! product (and batch) and the quantity fits in what is left to pick. The
//! accepted quantity is applied with a compare-and-swap on the previous picked
//! quantity, and the wave completes as soon as its last line is picked.

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        label_association::{self, LabelStatus},
        picking_wave_item, WaveItemModel, WaveItemStatus, WaveStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::waves::{lock_wave, mark_wave_completed, promote_to_picking},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PickScanRequest {
    #[validate(length(min = 1, max = 128, message = "Scanned code is required"))]
    pub scanned_code: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Outcome of an accepted scan
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PickResult {
    pub wave_item: WaveItemModel,
    /// This scan brought the line to its total
    pub item_completed: bool,
    /// This scan completed the whole wave
    pub wave_completed: bool,
    pub wave_status: WaveStatus,
}

/// Checks a scanned code against what the line expects.
///
/// A registered label for the (product, batch) pair wins; otherwise a batched
/// line accepts its batch code or anything starting with the SKU, and an
/// unbatched line requires the SKU as prefix. The error names the expected value.
pub fn check_scanned_code(
    scanned: &str,
    sku: &str,
    batch: Option<&str>,
    label_code: Option<&str>,
) -> Result<(), String> {
    let scanned = scanned.trim();
    if scanned.is_empty() {
        return Err("Scanned code is empty".to_string());
    }

    if let Some(label) = label_code.map(str::trim) {
        return if scanned == label {
            Ok(())
        } else {
            Err(format!(
                "Scanned code {} does not match expected label {}",
                scanned, label
            ))
        };
    }

    match batch.map(str::trim).filter(|b| !b.is_empty()) {
        Some(batch) if scanned == batch || scanned.starts_with(sku) => Ok(()),
        Some(batch) => Err(format!(
            "Scanned code {} does not match expected batch {} or SKU {}",
            scanned, batch, sku
        )),
        None if scanned.starts_with(sku) => Ok(()),
        None => Err(format!(
            "Scanned code {} does not match expected SKU {}",
            scanned, sku
        )),
    }
}

async fn find_label<C: ConnectionTrait>(
    db: &C,
    item: &WaveItemModel,
) -> Result<Option<String>, ServiceError> {
    let batch_filter = match &item.batch {
        Some(batch) => label_association::Column::Batch.eq(batch.as_str()),
        None => label_association::Column::Batch.is_null(),
    };
    let label = label_association::Entity::find()
        .filter(label_association::Column::ProductId.eq(item.product_id))
        .filter(batch_filter)
        .filter(label_association::Column::Status.eq(LabelStatus::Available))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(label.map(|l| l.label_code))
}

#[derive(Clone)]
pub struct PickingScanService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PickingScanService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Registers `quantity` units of a wave line as picked after validating the scan.
    #[instrument(skip(self))]
    pub async fn register_picked_item(
        &self,
        wave_id: Uuid,
        wave_item_id: Uuid,
        scanned_code: &str,
        quantity: i32,
        actor_id: &str,
    ) -> Result<PickResult, ServiceError> {
        let result = self
            .apply_scan(wave_id, wave_item_id, scanned_code, quantity, actor_id)
            .await;
        match &result {
            Ok(_) => counter!("wms.scans.accepted", 1),
            Err(ServiceError::BadRequest(reason)) => {
                counter!("wms.scans.rejected", 1);
                warn!(wave_id = %wave_id, wave_item_id = %wave_item_id, reason = %reason, "Scan rejected");
            }
            Err(_) => {}
        }
        result
    }

    async fn apply_scan(
        &self,
        wave_id: Uuid,
        wave_item_id: Uuid,
        scanned_code: &str,
        quantity: i32,
        actor_id: &str,
    ) -> Result<PickResult, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let wave = lock_wave(&txn, wave_id).await?;

        let item = picking_wave_item::Entity::find_by_id(wave_item_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|item| item.wave_id == wave_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Item {} not found in wave {}",
                    wave_item_id, wave.wave_number
                ))
            })?;

        if !wave.status.accepts_scans() {
            return Err(ServiceError::BadRequest(format!(
                "Wave {} is {} and does not accept scans",
                wave.wave_number, wave.status
            )));
        }

        let label = find_label(&txn, &item).await?;
        check_scanned_code(
            scanned_code,
            &item.product_sku,
            item.batch.as_deref(),
            label.as_deref(),
        )
        .map_err(ServiceError::BadRequest)?;

        if quantity > item.remaining_quantity() {
            return Err(ServiceError::BadRequest(format!(
                "Quantity exceeds what is left to pick for {}: total {}, already picked {}, requested {}",
                item.product_sku, item.total_quantity, item.picked_quantity, quantity
            )));
        }

        let new_picked = item.picked_quantity + quantity;
        let now = Utc::now();
        let status = WaveItemStatus::for_quantities(new_picked, item.total_quantity);
        let updated = picking_wave_item::Entity::update_many()
            .set(picking_wave_item::ActiveModel {
                picked_quantity: Set(new_picked),
                status: Set(status),
                picked_at: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(picking_wave_item::Column::Id.eq(item.id))
            .filter(picking_wave_item::Column::PickedQuantity.eq(item.picked_quantity))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if updated.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(item.id));
        }

        let siblings = picking_wave_item::Entity::find()
            .filter(picking_wave_item::Column::WaveId.eq(wave_id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let all_picked = siblings.iter().all(|sibling| {
            if sibling.id == item.id {
                status == WaveItemStatus::Picked
            } else {
                sibling.status == WaveItemStatus::Picked
            }
        });

        let mut events = vec![Event::WaveItemPicked {
            wave_id,
            wave_item_id: item.id,
            quantity,
            picked_quantity: new_picked,
            status,
        }];
        let wave_status = if all_picked {
            events.extend(mark_wave_completed(&txn, &wave, actor_id).await?);
            WaveStatus::Completed
        } else if wave.status == WaveStatus::Pending {
            events.extend(promote_to_picking(&txn, &wave, actor_id).await?);
            WaveStatus::Picking
        } else {
            wave.status
        };

        txn.commit().await.map_err(ServiceError::db_error)?;

        let item_completed = status == WaveItemStatus::Picked;
        info!(
            wave_id = %wave_id,
            wave_item_id = %item.id,
            sku = %item.product_sku,
            quantity,
            picked = new_picked,
            total = item.total_quantity,
            wave_completed = all_picked,
            "Scan accepted"
        );
        self.event_sender.publish_all(events);

        Ok(PickResult {
            wave_item: WaveItemModel {
                picked_quantity: new_picked,
                status,
                picked_at: Some(now),
                updated_at: now,
                ..item
            },
            item_completed,
            wave_completed: all_picked,
            wave_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("LBL-0001", Some("L24"), Some("LBL-0001"), true)]
    #[case(" LBL-0001 ", None, Some("LBL-0001 "), true)]
    #[case("L24", Some("L24"), Some("LBL-0001"), false)]
    #[case("L24", Some("L24"), None, true)]
    #[case("SKU-100-XYZ", Some("L24"), None, true)]
    #[case("L25", Some("L24"), None, false)]
    #[case("SKU-100", None, None, true)]
    #[case("SKU-1000", None, None, true)]
    #[case("SKU-10", None, None, false)]
    #[case("   ", None, None, false)]
    fn scanned_codes(
        #[case] scanned: &str,
        #[case] batch: Option<&str>,
        #[case] label: Option<&str>,
        #[case] accepted: bool,
    ) {
        assert_eq!(
            check_scanned_code(scanned, "SKU-100", batch, label).is_ok(),
            accepted
        );
    }

    #[test]
    fn rejection_names_expected_value() {
        let err = check_scanned_code("XYZ", "SKU-100", Some("L24"), None).unwrap_err();
        assert!(err.contains("L24"));
        assert!(err.contains("SKU-100"));

        let err = check_scanned_code("XYZ", "SKU-100", None, Some("LBL-9")).unwrap_err();
        assert!(err.contains("LBL-9"));
    }
}
