use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WMS API",
        version = "1.0.0",
        description = r#"
# Warehouse picking and addressing API

Wave picking, scan validation, reservation reconciliation and goods-in
addressing for a multi-tenant warehouse.

## Authentication

Callers are identified by gateway headers:

```
X-User-Id: <user id>
X-User-Roles: admin,picker
X-Tenant-Id: <tenant uuid>
```

Requests without `X-User-Id` are rejected with 401. Destructive and
maintenance operations require the `admin` role.

## Error Handling

Errors share one body shape:

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock: SKU-100: requested 50, available 30",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-12-09T10:30:00.000Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Waves", description = "Wave creation, listing and lifecycle"),
        (name = "Picking", description = "Scan registration and picking progress"),
        (name = "Preallocations", description = "Goods-in addressing of receiving orders"),
        (name = "Maintenance", description = "Reservation reconciliation"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Waves
        crate::handlers::waves::list_waves,
        crate::handlers::waves::create_wave,
        crate::handlers::waves::get_wave,
        crate::handlers::waves::complete_wave,
        crate::handlers::waves::cancel_wave,
        crate::handlers::waves::undo_completed_wave,
        crate::handlers::waves::edit_picked_quantities,
        crate::handlers::waves::delete_wave,

        // Picking
        crate::handlers::waves::get_picking_progress,
        crate::handlers::waves::validate_location,
        crate::handlers::waves::register_picked_item,

        // Preallocations
        crate::handlers::preallocations::validate_preallocations,
        crate::handlers::preallocations::save_preallocations,
        crate::handlers::preallocations::list_preallocations,
        crate::handlers::preallocations::delete_preallocations,
        crate::handlers::preallocations::execute_preallocations,

        // Maintenance
        crate::handlers::maintenance::sync_reservations,
        crate::handlers::maintenance::reservation_stats,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::ResponseMeta,

            // Storage models
            crate::entities::WaveModel,
            crate::entities::WaveItemModel,
            crate::entities::PickingOrderModel,
            crate::entities::InventoryModel,
            crate::entities::warehouse_location::Model,
            crate::entities::LocationType,
            crate::entities::warehouse_location::LocationStatus,
            crate::entities::WaveStatus,
            crate::entities::WaveItemStatus,
            crate::entities::PickingOrderStatus,
            crate::entities::PreallocationStatus,
            crate::entities::PickingRule,

            // Waves and picking
            crate::handlers::waves::WaveListQuery,
            crate::handlers::waves::EditPickedQuantitiesRequest,
            crate::services::waves::CreateWaveRequest,
            crate::services::waves::WaveDetails,
            crate::services::waves::WaveOrderSummary,
            crate::services::waves::WaveProgressView,
            crate::services::waves::ProgressItem,
            crate::services::waves::PickingProgress,
            crate::services::waves::PickedQuantityEdit,
            crate::services::waves::LocationScanRequest,
            crate::services::waves::LocationCheck,
            crate::services::picking::PickScanRequest,
            crate::services::picking::PickResult,

            // Preallocations
            crate::services::preallocation::PreallocationRow,
            crate::services::preallocation::ProcessFileRequest,
            crate::services::preallocation::RowValidation,
            crate::services::preallocation::SavePreallocationsRequest,
            crate::services::preallocation::PreallocationView,
            crate::services::preallocation::AddressingResult,
            crate::services::preallocation::AddressingFailure,
            crate::handlers::preallocations::SavedPreallocations,
            crate::handlers::preallocations::DeletedPreallocations,

            // Maintenance
            crate::services::reservations::SyncReport,
            crate::services::reservations::ReservationCorrection,
            crate::services::reservations::ReservationStats,
            crate::services::reservations::InventoryReservationStats,
            crate::services::reservations::OrderDemandStats,

            // Health
            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentHealth,
            crate::handlers::health::ComponentStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
