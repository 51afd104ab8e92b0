#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;
use wms_api::{
    auth::{TENANT_ID_HEADER, USER_ID_HEADER, USER_ROLES_HEADER},
    config::AppConfig,
    db,
    entities::{
        inventory,
        label_association::{self, LabelStatus},
        picking_order, picking_order_item, product, receiving_order, receiving_preallocation, tenant, warehouse_location, warehouse_zone,
        InventoryModel, InventoryStatus, LocationType, PickingOrderStatus, PickingRule,
        PreallocationStatus, ReceivingOrderStatus,
    },
    events::{self, EventSender},
    AppState,
};

/// Caller identity sent through the gateway headers.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub roles: Vec<String>,
    pub tenant_id: Option<Uuid>,
}

impl Caller {
    pub fn admin() -> Self {
        Self {
            user_id: "admin-1".into(),
            roles: vec!["admin".into()],
            tenant_id: None,
        }
    }

    pub fn picker(tenant_id: Uuid) -> Self {
        Self {
            user_id: "picker-1".into(),
            roles: vec!["picker".into()],
            tenant_id: Some(tenant_id),
        }
    }
}

/// Application backed by a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // every in-memory connection is its own database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = EventSender::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = wms_api::build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    /// Sends a request, optionally as `caller`, and returns status and JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        caller: Option<&Caller>,
    ) -> (axum::http::StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(caller) = caller {
            builder = builder
                .header(USER_ID_HEADER, caller.user_id.as_str())
                .header(USER_ROLES_HEADER, caller.roles.join(","));
            if let Some(tenant_id) = caller.tenant_id {
                builder = builder.header(TENANT_ID_HEADER, tenant_id.to_string());
            }
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read response body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    // ---- fixtures -------------------------------------------------------

    pub async fn seed_tenant(&self, name: &str, rule: PickingRule) -> Uuid {
        let now = Utc::now();
        tenant::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            picking_rule: Set(rule),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed tenant")
        .id
    }

    pub async fn seed_product(&self, tenant_id: Uuid, sku: &str) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            sku: Set(sku.to_string()),
            description: Set(format!("Product {}", sku)),
            unit_of_measure: Set("UN".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }

    pub async fn seed_zone(&self, code: &str) -> Uuid {
        warehouse_zone::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Zone {}", code)),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed zone")
        .id
    }

    pub async fn seed_location(
        &self,
        zone_id: Uuid,
        code: &str,
        location_type: LocationType,
        tenant_id: Option<Uuid>,
    ) -> Uuid {
        let now = Utc::now();
        warehouse_location::ActiveModel {
            id: Set(Uuid::new_v4()),
            zone_id: Set(zone_id),
            tenant_id: Set(tenant_id),
            code: Set(code.to_string()),
            location_type: Set(location_type),
            status: Set(warehouse_location::LocationStatus::Available),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed location")
        .id
    }

    /// Stock record with sensible defaults; adjust fields before [`insert_stock`](Self::insert_stock).
    pub fn stock(
        tenant_id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        batch: Option<&str>,
        quantity: i32,
    ) -> InventoryModel {
        let now = Utc::now();
        InventoryModel {
            id: Uuid::new_v4(),
            tenant_id,
            product_id,
            location_id,
            batch: batch.map(str::to_string),
            expiry_date: None,
            quantity,
            reserved_quantity: 0,
            status: InventoryStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert_stock(&self, record: InventoryModel) -> InventoryModel {
        inventory::ActiveModel {
            id: Set(record.id),
            tenant_id: Set(record.tenant_id),
            product_id: Set(record.product_id),
            location_id: Set(record.location_id),
            batch: Set(record.batch),
            expiry_date: Set(record.expiry_date),
            quantity: Set(record.quantity),
            reserved_quantity: Set(record.reserved_quantity),
            status: Set(record.status),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        }
        .insert(self.db())
        .await
        .expect("seed stock")
    }

    pub async fn seed_order(
        &self,
        tenant_id: Uuid,
        order_number: &str,
        status: PickingOrderStatus,
        lines: &[(Uuid, i32, Option<&str>)],
    ) -> Uuid {
        let now = Utc::now();
        let order = picking_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            order_number: Set(order_number.to_string()),
            customer_order_number: Set(Some(format!("C-{}", order_number))),
            status: Set(status),
            wave_id: Set(None),
            picked_by: Set(None),
            picked_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed order");

        for (product_id, quantity, batch) in lines {
            picking_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                picking_order_id: Set(order.id),
                product_id: Set(*product_id),
                requested_quantity: Set(*quantity),
                unit: Set("UN".to_string()),
                batch: Set(batch.map(str::to_string)),
            }
            .insert(self.db())
            .await
            .expect("seed order item");
        }
        order.id
    }

    pub async fn seed_label(&self, product_id: Uuid, batch: Option<&str>, code: &str) {
        label_association::ActiveModel {
            id: Set(Uuid::new_v4()),
            label_code: Set(code.to_string()),
            product_id: Set(product_id),
            batch: Set(batch.map(str::to_string)),
            units_per_box: Set(1),
            status: Set(LabelStatus::Available),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed label");
    }

    pub async fn retire_label(&self, code: &str) {
        label_association::Entity::update_many()
            .set(label_association::ActiveModel {
                status: Set(LabelStatus::Retired),
                ..Default::default()
            })
            .filter(label_association::Column::LabelCode.eq(code))
            .exec(self.db())
            .await
            .expect("retire label");
    }

    pub async fn seed_receiving_order(
        &self,
        tenant_id: Uuid,
        order_number: &str,
        status: ReceivingOrderStatus,
    ) -> Uuid {
        let now = Utc::now();
        receiving_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            order_number: Set(order_number.to_string()),
            status: Set(status),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed receiving order")
        .id
    }

    pub async fn seed_preallocation(
        &self,
        receiving_order_id: Uuid,
        location_id: Uuid,
        product_id: Uuid,
        batch: Option<&str>,
        quantity: i32,
    ) -> Uuid {
        let now = Utc::now();
        receiving_preallocation::ActiveModel {
            id: Set(Uuid::new_v4()),
            receiving_order_id: Set(receiving_order_id),
            location_id: Set(location_id),
            product_id: Set(product_id),
            batch: Set(batch.map(str::to_string)),
            quantity: Set(quantity),
            status: Set(PreallocationStatus::Pending),
            created_by: Set("operator-1".to_string()),
            executed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed preallocation")
        .id
    }

    pub async fn stock_record(&self, id: Uuid) -> Option<InventoryModel> {
        inventory::Entity::find_by_id(id)
            .one(self.db())
            .await
            .expect("load stock")
    }

    pub async fn order(&self, id: Uuid) -> picking_order::Model {
        picking_order::Entity::find_by_id(id)
            .one(self.db())
            .await
            .expect("load order")
            .expect("order present")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn expiry(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}
