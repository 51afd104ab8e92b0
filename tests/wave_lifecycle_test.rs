mod common;

use assert_matches::assert_matches;
use common::{expiry, TestApp};
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;
use wms_api::{
    entities::{picking_wave, LocationType, PickingOrderStatus, PickingRule, WaveStatus},
    errors::ServiceError,
    services::waves::WaveListFilter,
};

struct Floor {
    tenant: Uuid,
    product: Uuid,
    shelf_a: Uuid,
    shelf_b: Uuid,
    dock: Uuid,
}

/// One tenant, one product, two storage shelves and a receiving dock.
async fn floor(app: &TestApp, rule: PickingRule) -> Floor {
    let tenant = app.seed_tenant("Acme", rule).await;
    let product = app.seed_product(tenant, "SKU-100").await.id;
    let storage = app.seed_zone("ARM").await;
    let receiving = app.seed_zone("REC").await;
    Floor {
        tenant,
        product,
        shelf_a: app
            .seed_location(storage, "A01-01-01", LocationType::Whole, None)
            .await,
        shelf_b: app
            .seed_location(storage, "A01-01-02", LocationType::Whole, None)
            .await,
        dock: app
            .seed_location(receiving, "R01-01-01", LocationType::Whole, None)
            .await,
    }
}

#[tokio::test]
async fn wave_consolidates_demand_and_follows_fefo() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fefo).await;

    let mut later = TestApp::stock(f.tenant, f.product, f.shelf_b, Some("L2"), 6);
    later.expiry_date = expiry(2025, 1, 1);
    app.insert_stock(later).await;
    let mut sooner = TestApp::stock(f.tenant, f.product, f.shelf_a, Some("L1"), 10);
    sooner.expiry_date = expiry(2024, 6, 1);
    app.insert_stock(sooner).await;
    // received goods are never picked from the dock
    let mut docked = TestApp::stock(f.tenant, f.product, f.dock, Some("L0"), 50);
    docked.expiry_date = expiry(2024, 1, 1);
    app.insert_stock(docked).await;

    let first = app
        .seed_order(f.tenant, "PO-1", PickingOrderStatus::Pending, &[(f.product, 5, None)])
        .await;
    let second = app
        .seed_order(f.tenant, "PO-2", PickingOrderStatus::Validated, &[(f.product, 4, None)])
        .await;

    let details = app
        .state
        .services
        .waves
        .create_wave(vec![first, second], "supervisor-1", None)
        .await
        .expect("wave created");

    assert_eq!(details.wave.status, WaveStatus::Pending);
    assert!(details.wave.wave_number.starts_with("OS-"));
    assert!(details.wave.wave_number.ends_with("-0001"));
    assert_eq!(details.wave.total_orders, 2);
    assert_eq!(details.wave.total_items, 1);
    assert_eq!(details.wave.total_quantity, 9);
    assert_eq!(details.wave.picking_rule, PickingRule::Fefo);

    let item = &details.items[0];
    assert_eq!(item.total_quantity, 9);
    assert_eq!(item.picked_quantity, 0);
    assert_eq!(item.location_code, "A01-01-01");
    assert_eq!(item.batch.as_deref(), Some("L1"));
    assert_eq!(item.picking_order_id, first);

    for order_id in [first, second] {
        let order = app.order(order_id).await;
        assert_eq!(order.status, PickingOrderStatus::InWave);
        assert_eq!(order.wave_id, Some(details.wave.id));
    }
}

#[tokio::test]
async fn fifo_tenant_spills_over_oldest_records() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fifo).await;

    let mut old = TestApp::stock(f.tenant, f.product, f.shelf_b, None, 3);
    old.created_at = old.created_at - chrono::Duration::days(10);
    app.insert_stock(old).await;
    app.insert_stock(TestApp::stock(f.tenant, f.product, f.shelf_a, None, 20))
        .await;

    let order = app
        .seed_order(f.tenant, "PO-1", PickingOrderStatus::Pending, &[(f.product, 8, None)])
        .await;
    let details = app
        .state
        .services
        .waves
        .create_wave(vec![order], "supervisor-1", None)
        .await
        .unwrap();

    assert_eq!(details.items.len(), 2);
    let from_old = details
        .items
        .iter()
        .find(|i| i.location_code == "A01-01-02")
        .unwrap();
    let from_new = details
        .items
        .iter()
        .find(|i| i.location_code == "A01-01-01")
        .unwrap();
    assert_eq!(from_old.total_quantity, 3);
    assert_eq!(from_new.total_quantity, 5);
    assert_eq!(details.wave.total_quantity, 8);
}

#[tokio::test]
async fn shortage_rejects_wave_without_side_effects() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fefo).await;
    app.insert_stock(TestApp::stock(f.tenant, f.product, f.shelf_a, None, 10))
        .await;
    let order = app
        .seed_order(f.tenant, "PO-1", PickingOrderStatus::Pending, &[(f.product, 12, None)])
        .await;

    let err = app
        .state
        .services
        .waves
        .create_wave(vec![order], "supervisor-1", None)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(ref msg) if msg.contains("SKU-100") && msg.contains("requested 12, available 10"));
    assert_eq!(app.order(order).await.status, PickingOrderStatus::Pending);
    assert_eq!(
        picking_wave::Entity::find().count(app.db()).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn orders_must_be_eligible_and_share_a_tenant() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fefo).await;
    app.insert_stock(TestApp::stock(f.tenant, f.product, f.shelf_a, None, 100))
        .await;
    let waves = &app.state.services.waves;

    let picked = app
        .seed_order(f.tenant, "PO-1", PickingOrderStatus::Picked, &[(f.product, 1, None)])
        .await;
    assert_matches!(
        waves.create_wave(vec![picked], "u", None).await,
        Err(ServiceError::BadRequest(msg)) if msg.contains("PO-1")
    );

    let other_tenant = app.seed_tenant("Globex", PickingRule::Fifo).await;
    let other_product = app.seed_product(other_tenant, "SKU-900").await.id;
    let ours = app
        .seed_order(f.tenant, "PO-2", PickingOrderStatus::Pending, &[(f.product, 1, None)])
        .await;
    let theirs = app
        .seed_order(other_tenant, "PO-3", PickingOrderStatus::Pending, &[(other_product, 1, None)])
        .await;
    assert_matches!(
        waves.create_wave(vec![ours, theirs], "u", None).await,
        Err(ServiceError::ValidationError(_))
    );

    assert_matches!(
        waves.create_wave(vec![ours, Uuid::new_v4()], "u", None).await,
        Err(ServiceError::NotFound(_))
    );

    assert_matches!(
        waves.create_wave(vec![ours], "u", Some(other_tenant)).await,
        Err(ServiceError::Forbidden(_))
    );

    waves.create_wave(vec![ours], "u", Some(f.tenant)).await.unwrap();
    // already wave-bound
    assert_matches!(
        waves.create_wave(vec![ours], "u", None).await,
        Err(ServiceError::BadRequest(_))
    );
}

#[tokio::test]
async fn wave_numbers_follow_daily_sequence() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fefo).await;
    app.insert_stock(TestApp::stock(f.tenant, f.product, f.shelf_a, None, 100))
        .await;
    let waves = &app.state.services.waves;

    let a = app
        .seed_order(f.tenant, "PO-1", PickingOrderStatus::Pending, &[(f.product, 1, None)])
        .await;
    let b = app
        .seed_order(f.tenant, "PO-2", PickingOrderStatus::Pending, &[(f.product, 1, None)])
        .await;
    let first = waves.create_wave(vec![a], "u", None).await.unwrap().wave;
    let second = waves.create_wave(vec![b], "u", None).await.unwrap().wave;

    assert!(first.wave_number.ends_with("-0001"));
    assert!(second.wave_number.ends_with("-0002"));
    assert_eq!(
        first.wave_number[..first.wave_number.len() - 4],
        second.wave_number[..second.wave_number.len() - 4]
    );

    let listed = waves
        .list_waves(WaveListFilter {
            tenant_id: Some(f.tenant),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);

    let none = waves
        .list_waves(WaveListFilter {
            status: Some(WaveStatus::Completed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn cancelled_wave_releases_orders_and_can_be_deleted() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fefo).await;
    app.insert_stock(TestApp::stock(f.tenant, f.product, f.shelf_a, None, 100))
        .await;
    let waves = &app.state.services.waves;

    let order = app
        .seed_order(f.tenant, "PO-1", PickingOrderStatus::Pending, &[(f.product, 3, None)])
        .await;
    let wave = waves.create_wave(vec![order], "u", None).await.unwrap().wave;

    assert_matches!(
        waves.complete_wave(wave.id, "u").await,
        Err(ServiceError::PreconditionFailed(_))
    );

    let cancelled = waves.cancel_wave(wave.id, "supervisor-1").await.unwrap();
    assert_eq!(cancelled.status, WaveStatus::Cancelled);
    let released = app.order(order).await;
    assert_eq!(released.status, PickingOrderStatus::Pending);
    assert_eq!(released.wave_id, None);

    assert_matches!(
        waves.cancel_wave(wave.id, "supervisor-1").await,
        Err(ServiceError::BadRequest(_))
    );
    assert_matches!(
        waves.complete_wave(wave.id, "u").await,
        Err(ServiceError::BadRequest(_))
    );

    waves.delete_wave(wave.id).await.unwrap();
    assert_matches!(waves.get_wave(wave.id).await, Err(ServiceError::NotFound(_)));

    // the released order can join a new wave
    waves.create_wave(vec![order], "u", None).await.unwrap();
}

#[tokio::test]
async fn deleting_a_pending_wave_detaches_its_orders() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fefo).await;
    app.insert_stock(TestApp::stock(f.tenant, f.product, f.shelf_a, None, 100))
        .await;
    let waves = &app.state.services.waves;

    let order = app
        .seed_order(f.tenant, "PO-1", PickingOrderStatus::Pending, &[(f.product, 3, None)])
        .await;
    let details = waves.create_wave(vec![order], "u", None).await.unwrap();

    waves.delete_wave(details.wave.id).await.unwrap();

    let order = app.order(order).await;
    assert_eq!(order.status, PickingOrderStatus::Pending);
    assert_eq!(order.wave_id, None);
    assert_eq!(
        picking_wave::Entity::find().count(app.db()).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn oversized_demand_is_a_validation_error() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fefo).await;
    app.insert_stock(TestApp::stock(f.tenant, f.product, f.shelf_a, None, 50))
        .await;
    let first = app
        .seed_order(f.tenant, "PO-1", PickingOrderStatus::Pending, &[(f.product, i32::MAX, None)])
        .await;
    let second = app
        .seed_order(f.tenant, "PO-2", PickingOrderStatus::Pending, &[(f.product, 2, None)])
        .await;

    let err = app
        .state
        .services
        .waves
        .create_wave(vec![first, second], "supervisor-1", None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(picking_wave::Entity::find().count(app.db()).await.unwrap(), 0);
    assert_eq!(app.order(first).await.status, PickingOrderStatus::Pending);
}

#[tokio::test]
async fn wave_total_beyond_range_is_a_validation_error() {
    let app = TestApp::new().await;
    let f = floor(&app, PickingRule::Fefo).await;
    let other = app.seed_product(f.tenant, "SKU-200").await.id;
    app.insert_stock(TestApp::stock(f.tenant, f.product, f.shelf_a, None, i32::MAX))
        .await;
    app.insert_stock(TestApp::stock(f.tenant, other, f.shelf_b, None, i32::MAX))
        .await;
    let order = app
        .seed_order(
            f.tenant,
            "PO-1",
            PickingOrderStatus::Pending,
            &[(f.product, i32::MAX, None), (other, i32::MAX, None)],
        )
        .await;

    let err = app
        .state
        .services
        .waves
        .create_wave(vec![order], "supervisor-1", None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(picking_wave::Entity::find().count(app.db()).await.unwrap(), 0);
}
