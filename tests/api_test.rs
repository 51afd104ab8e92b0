mod common;

use axum::http::{Method, StatusCode};
use common::{Caller, TestApp};
use serde_json::json;
use uuid::Uuid;
use wms_api::entities::{LocationType, PickingOrderStatus, PickingRule, ReceivingOrderStatus};

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "up");
    assert_eq!(body["data"]["database"]["status"], "up");
}

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/waves", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn wave_flow_over_http() {
    let app = TestApp::new().await;
    let tenant = app.seed_tenant("Acme", PickingRule::Fefo).await;
    let product = app.seed_product(tenant, "SKU-100").await.id;
    let zone = app.seed_zone("ARM").await;
    let shelf = app
        .seed_location(zone, "A01-01-01", LocationType::Whole, None)
        .await;
    app.insert_stock(TestApp::stock(tenant, product, shelf, Some("L1"), 20))
        .await;
    let order = app
        .seed_order(tenant, "PO-1", PickingOrderStatus::Pending, &[(product, 4, None)])
        .await;
    let picker = Caller::picker(tenant);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/waves",
            Some(json!({ "order_ids": [] })),
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/waves",
            Some(json!({ "order_ids": [order] })),
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let wave_id = body["data"]["wave"]["id"].as_str().unwrap().to_string();
    let item_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["wave"]["status"], "pending");
    assert_eq!(body["data"]["orders"][0]["order_number"], "PO-1");

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/waves/{}/locations/validate", wave_id),
            Some(json!({ "location_code": "A01-01-01" })),
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["item_count"], 1);
    assert_eq!(body["data"]["location"]["code"], "A01-01-01");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/waves/{}/locations/validate", wave_id),
            Some(json!({ "location_code": "" })),
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/waves/{}/items/{}/pick", wave_id, item_id),
            Some(json!({ "scanned_code": "WRONG", "quantity": 4 })),
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("SKU-100"));

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/waves/{}/complete", wave_id),
            None,
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/waves/{}/items/{}/pick", wave_id, item_id),
            Some(json!({ "scanned_code": "L1", "quantity": 4 })),
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["wave_completed"], true);
    assert_eq!(body["data"]["wave_status"], "completed");

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/waves/{}/progress", wave_id),
            None,
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["progress"]["percent_complete"], 100);
    assert_eq!(body["data"]["items"][0]["order_number"], "PO-1");

    let (status, body) = app
        .request(Method::GET, "/api/v1/waves?status=completed", None, Some(&picker))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(Method::GET, "/api/v1/waves?status=lost", None, Some(&picker))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // another tenant's picker does not see the wave
    let outsider = Caller::picker(Uuid::new_v4());
    let (_, body) = app
        .request(Method::GET, "/api/v1/waves", None, Some(&outsider))
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn destructive_operations_need_an_admin() {
    let app = TestApp::new().await;
    let tenant = app.seed_tenant("Acme", PickingRule::Fefo).await;
    let product = app.seed_product(tenant, "SKU-100").await.id;
    let zone = app.seed_zone("ARM").await;
    let shelf = app
        .seed_location(zone, "A01-01-01", LocationType::Whole, None)
        .await;
    app.insert_stock(TestApp::stock(tenant, product, shelf, None, 20))
        .await;
    let order = app
        .seed_order(tenant, "PO-1", PickingOrderStatus::Pending, &[(product, 2, None)])
        .await;
    let wave = app
        .state
        .services
        .waves
        .create_wave(vec![order], "supervisor-1", None)
        .await
        .unwrap()
        .wave;
    let picker = Caller::picker(tenant);
    let uri = format!("/api/v1/waves/{}", wave.id);

    let (status, body) = app.request(Method::DELETE, &uri, None, Some(&picker)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/maintenance/reservations/sync",
            None,
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/maintenance/reservations/sync",
            None,
            Some(&Caller::admin()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_processed"], 1);
    assert_eq!(body["data"]["corrections_applied"], 1);
    assert_eq!(body["data"]["corrections"][0]["new_reserved"], 2);

    let (status, body) = app
        .request(
            Method::GET,
            "/api/v1/maintenance/reservations/stats",
            None,
            Some(&picker),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["inventory"]["total_reserved_units"], 2);

    let (status, body) = app
        .request(Method::DELETE, &uri, None, Some(&Caller::admin()))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = app.request(Method::GET, &uri, None, Some(&picker)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preallocation_sheet_over_http() {
    let app = TestApp::new().await;
    let tenant = app.seed_tenant("Acme", PickingRule::Fefo).await;
    let product = app.seed_product(tenant, "SKU-100").await.id;
    let storage = app.seed_zone("ARM").await;
    let receiving = app.seed_zone("REC").await;
    app.seed_location(storage, "A01-01-01", LocationType::Whole, None)
        .await;
    let dock = app
        .seed_location(receiving, "R01-01-01", LocationType::Whole, None)
        .await;
    app.insert_stock(TestApp::stock(tenant, product, dock, Some("L5"), 6))
        .await;
    let order = app
        .seed_receiving_order(tenant, "RC-1", ReceivingOrderStatus::Addressing)
        .await;
    let operator = Caller::picker(tenant);
    let base = format!("/api/v1/receiving-orders/{}/preallocations", order);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("{}/validate", base),
            Some(json!({
                "rows": [
                    { "location_code": "A01-01-01", "sku": "SKU-100", "batch": "L5", "quantity": 6 },
                    { "location_code": "A01-01-01", "sku": "SKU-404", "quantity": 1 }
                ]
            })),
            Some(&operator),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let validations = body["data"].clone();
    assert_eq!(validations[0]["is_valid"], true);
    assert_eq!(validations[1]["is_valid"], false);

    let (status, body) = app
        .request(
            Method::POST,
            &base,
            Some(json!({ "validations": validations })),
            Some(&operator),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["saved"], 1);

    let (status, body) = app.request(Method::GET, &base, None, Some(&operator)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["location_code"], "A01-01-01");
    assert_eq!(body["data"][0]["status"], "pending");

    let (status, body) = app
        .request(
            Method::POST,
            &format!("{}/execute", base),
            None,
            Some(&operator),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["moved_items"], 6);
    assert_eq!(body["data"]["order_completed"], true);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("{}/execute", base),
            None,
            Some(&operator),
        )
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
}
