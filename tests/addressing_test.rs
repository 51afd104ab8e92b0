mod common;

use assert_matches::assert_matches;
use common::TestApp;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;
use wms_api::{
    config::WarehouseConfig,
    entities::{
        inventory, inventory_movement, receiving_order, LocationType, PickingRule,
        PreallocationStatus, ReceivingOrderStatus,
    },
    errors::ServiceError,
    services::{
        factory::ServiceFactory,
        placement::{PlacementDecision, PlacementValidator, NO_BATCH_LABEL},
        preallocation::PreallocationRow,
    },
};

struct Site {
    app: TestApp,
    tenant: Uuid,
    product: Uuid,
    shelf: Uuid,
    free_shelf: Uuid,
    dock: Uuid,
    dev_slot: Uuid,
}

/// Storage zone ARM with two shelves, receiving dock REC, and a DEV returns slot.
async fn site() -> Site {
    let app = TestApp::new().await;
    let tenant = app.seed_tenant("Acme", PickingRule::Fefo).await;
    let product = app.seed_product(tenant, "SKU-100").await.id;
    let storage = app.seed_zone("ARM").await;
    let receiving = app.seed_zone("REC").await;
    let returns = app.seed_zone("DEV").await;
    Site {
        tenant,
        product,
        shelf: app
            .seed_location(storage, "A01-01-01", LocationType::Whole, None)
            .await,
        free_shelf: app
            .seed_location(storage, "A01-01-2B", LocationType::Fraction, None)
            .await,
        dock: app
            .seed_location(receiving, "R01-01-01", LocationType::Whole, None)
            .await,
        dev_slot: app
            .seed_location(returns, "D01-01-01", LocationType::Whole, None)
            .await,
        app,
    }
}

fn placement(app: &TestApp) -> PlacementValidator {
    ServiceFactory::new(
        app.state.db.clone(),
        app.state.event_sender.clone(),
        WarehouseConfig::default(),
    )
    .placement_validator()
}

fn row(location: &str, sku: &str, batch: Option<&str>, quantity: i32) -> PreallocationRow {
    PreallocationRow {
        location_code: location.to_string(),
        sku: sku.to_string(),
        batch: batch.map(str::to_string),
        quantity,
    }
}

#[tokio::test]
async fn placement_enforces_one_batch_per_slot() {
    let s = site().await;
    let validator = placement(&s.app);

    assert!(validator
        .validate(s.shelf, s.product, Some("L1"))
        .await
        .unwrap()
        .is_allowed());

    s.app
        .insert_stock(TestApp::stock(s.tenant, s.product, s.shelf, Some("L1"), 10))
        .await;
    s.app
        .insert_stock(TestApp::stock(s.tenant, s.product, s.shelf, None, 4))
        .await;
    // empty records do not hold the slot
    s.app
        .insert_stock(TestApp::stock(s.tenant, s.product, s.shelf, Some("L7"), 0))
        .await;

    assert_matches!(
        validator.validate(s.shelf, s.product, Some("L2")).await.unwrap(),
        PlacementDecision::Rejected { reason, conflicting_batches }
            if reason.contains("A01-01-01")
                && conflicting_batches == vec!["L1".to_string(), NO_BATCH_LABEL.to_string()]
    );

    // same batch still conflicts with the unbatched record
    assert_matches!(
        validator.validate(s.shelf, s.product, Some("L1")).await.unwrap(),
        PlacementDecision::Rejected { conflicting_batches, .. }
            if conflicting_batches == vec![NO_BATCH_LABEL.to_string()]
    );

    assert!(validator
        .validate(s.shelf, s.product, None)
        .await
        .unwrap()
        .is_allowed());
    assert!(validator
        .validate(s.shelf, s.product, Some("  "))
        .await
        .unwrap()
        .is_allowed());

    // another product may share the slot
    let other = s.app.seed_product(s.tenant, "SKU-200").await.id;
    assert!(validator
        .validate(s.shelf, other, Some("L2"))
        .await
        .unwrap()
        .is_allowed());

    assert_matches!(
        validator.validate(Uuid::new_v4(), s.product, Some("L1")).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn transient_zones_accept_mixed_batches() {
    let s = site().await;
    let validator = placement(&s.app);

    for slot in [s.dock, s.dev_slot] {
        s.app
            .insert_stock(TestApp::stock(s.tenant, s.product, slot, Some("L1"), 10))
            .await;
        assert!(validator
            .validate(slot, s.product, Some("L9"))
            .await
            .unwrap()
            .is_allowed());
    }
}

#[tokio::test]
async fn sheet_rows_are_validated_individually() {
    let s = site().await;
    s.app
        .insert_stock(TestApp::stock(s.tenant, s.product, s.shelf, Some("L1"), 10))
        .await;
    let other_tenant = s.app.seed_tenant("Globex", PickingRule::Fifo).await;
    let storage = s.app.seed_zone("ARX").await;
    s.app
        .seed_location(storage, "B01-01-01", LocationType::Whole, Some(other_tenant))
        .await;
    let order = s
        .app
        .seed_receiving_order(s.tenant, "RC-1", ReceivingOrderStatus::Addressing)
        .await;

    let validations = s
        .app
        .state
        .services
        .preallocations
        .process_file(
            order,
            vec![
                row(" a01-01-01 ", "SKU-100", Some("L1"), 5),
                row("A01-01-2B", "SKU-100", Some(" L2 "), 3),
                row("A01-1-01", "SKU-100", None, 1),
                row("A01-01-01", "SKU-404", None, 1),
                row("A01-01-01", "SKU-100", Some("L2"), 2),
                row("A01-01-2B", "SKU-100", None, 0),
                row("A01-01-03", "SKU-100", None, 1),
                row("B01-01-01", "SKU-100", None, 1),
            ],
        )
        .await
        .unwrap();

    assert_eq!(validations.len(), 8);
    let valid: Vec<usize> = validations
        .iter()
        .filter(|v| v.is_valid)
        .map(|v| v.row_number)
        .collect();
    assert_eq!(valid, vec![2, 3]);

    let first = &validations[0];
    assert_eq!(first.location_code, "A01-01-01");
    assert_eq!(first.location_id, Some(s.shelf));
    assert_eq!(first.product_id, Some(s.product));
    assert_eq!(validations[1].batch.as_deref(), Some("L2"));

    let errors = |i: usize| validations[i].errors.join(" | ");
    assert!(errors(2).contains("format"));
    assert!(errors(3).contains("SKU-404"));
    assert!(errors(4).contains("L1"));
    assert!(errors(5).contains("greater than zero"));
    assert!(errors(6).contains("not found"));
    assert!(errors(7).contains("another tenant"));

    let closed = s
        .app
        .seed_receiving_order(s.tenant, "RC-2", ReceivingOrderStatus::Completed)
        .await;
    assert_matches!(
        s.app
            .state
            .services
            .preallocations
            .process_file(closed, vec![row("A01-01-01", "SKU-100", None, 1)])
            .await,
        Err(ServiceError::BadRequest(_))
    );
}

#[tokio::test]
async fn executing_moves_received_stock_to_its_address() {
    let s = site().await;
    let dock_stock = s
        .app
        .insert_stock(TestApp::stock(s.tenant, s.product, s.dock, Some("L5"), 30))
        .await;
    let order = s
        .app
        .seed_receiving_order(s.tenant, "RC-1", ReceivingOrderStatus::Addressing)
        .await;
    let service = &s.app.state.services.preallocations;

    let validations = service
        .process_file(
            order,
            vec![
                row("A01-01-01", "SKU-100", Some("L5"), 20),
                row("A01-01-2B", "SKU-100", Some("L5"), 10),
                row("A01-01-01", "SKU-404", None, 1),
            ],
        )
        .await
        .unwrap();
    assert_eq!(service.save(order, validations, "operator-1").await.unwrap(), 2);

    let listed = service.list(order).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|p| p.status == PreallocationStatus::Pending));
    assert!(listed.iter().all(|p| p.sku.as_deref() == Some("SKU-100")));
    assert_eq!(listed[0].created_by, "operator-1");

    let result = service.execute(order, "operator-1").await.unwrap();
    assert_eq!(result.executed, 2);
    assert_eq!(result.moved_items, 30);
    assert!(result.failures.is_empty());
    assert!(result.order_completed);

    // the dock record is emptied and removed
    assert!(s.app.stock_record(dock_stock.id).await.is_none());
    let shelved = inventory::Entity::find()
        .filter(inventory::Column::ProductId.eq(s.product))
        .all(s.app.db())
        .await
        .unwrap();
    let at = |location: Uuid| {
        shelved
            .iter()
            .find(|r| r.location_id == location)
            .map(|r| (r.quantity, r.batch.clone()))
    };
    assert_eq!(at(s.shelf), Some((20, Some("L5".to_string()))));
    assert_eq!(at(s.free_shelf), Some((10, Some("L5".to_string()))));

    let movements = inventory_movement::Entity::find()
        .filter(inventory_movement::Column::ProductId.eq(s.product))
        .all(s.app.db())
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
    assert!(movements.iter().all(|m| {
        m.movement_type == inventory_movement::MovementType::Receiving
            && m.from_location_id == Some(s.dock)
            && m.reference.as_deref() == Some("RC-1")
    }));

    let order_row = receiving_order::Entity::find_by_id(order)
        .one(s.app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order_row.status, ReceivingOrderStatus::Completed);
    assert!(service
        .list(order)
        .await
        .unwrap()
        .iter()
        .all(|p| p.status == PreallocationStatus::Executed && p.executed_at.is_some()));
}

#[tokio::test]
async fn failed_rows_stay_pending_and_block_completion() {
    let s = site().await;
    s.app
        .insert_stock(TestApp::stock(s.tenant, s.product, s.dock, Some("L5"), 8))
        .await;
    // occupies the shelf with another batch
    s.app
        .insert_stock(TestApp::stock(s.tenant, s.product, s.shelf, Some("L1"), 3))
        .await;
    let order = s
        .app
        .seed_receiving_order(s.tenant, "RC-1", ReceivingOrderStatus::Addressing)
        .await;
    let blocked = s
        .app
        .seed_preallocation(order, s.shelf, s.product, Some("L5"), 4)
        .await;
    s.app
        .seed_preallocation(order, s.free_shelf, s.product, Some("L5"), 4)
        .await;
    let missing = s
        .app
        .seed_preallocation(order, s.free_shelf, s.product, Some("L9"), 1)
        .await;

    let service = &s.app.state.services.preallocations;
    let result = service.execute(order, "operator-1").await.unwrap();

    assert_eq!(result.executed, 1);
    assert_eq!(result.moved_items, 4);
    assert!(!result.order_completed);
    assert_eq!(result.failures.len(), 2);
    let reason = |id: Uuid| {
        result
            .failures
            .iter()
            .find(|f| f.preallocation_id == id)
            .map(|f| f.reason.clone())
            .unwrap()
    };
    assert!(reason(blocked).contains("L1"));
    assert!(reason(missing).contains("L9"));

    let pending = service
        .list(order)
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.status == PreallocationStatus::Pending)
        .count();
    assert_eq!(pending, 2);

    // only pending rows are deleted
    assert_eq!(service.delete(order).await.unwrap(), 2);
    let left = service.list(order).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].status, PreallocationStatus::Executed);

    assert_matches!(
        service.execute(order, "operator-1").await,
        Err(ServiceError::PreconditionFailed(msg)) if msg.contains("no pending")
    );
}

#[tokio::test]
async fn execution_requires_addressing_status_and_a_dock() {
    let s = site().await;
    let service = &s.app.state.services.preallocations;

    let scheduled = s
        .app
        .seed_receiving_order(s.tenant, "RC-1", ReceivingOrderStatus::Scheduled)
        .await;
    s.app
        .seed_preallocation(scheduled, s.shelf, s.product, None, 1)
        .await;
    assert_matches!(
        service.execute(scheduled, "operator-1").await,
        Err(ServiceError::PreconditionFailed(msg)) if msg.contains("addressing")
    );

    assert_matches!(
        service.execute(Uuid::new_v4(), "operator-1").await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        service.save(scheduled, Vec::new(), "operator-1").await,
        Err(ServiceError::BadRequest(_))
    );
}
