use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::{WaveModel, WaveStatus},
    errors::ServiceError,
    services::{
        picking::{PickResult, PickScanRequest},
        waves::{
            CreateWaveRequest, LocationCheck, LocationScanRequest, PickedQuantityEdit, WaveDetails,
            WaveListFilter, WaveProgressView,
        },
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default, IntoParams, ToSchema)]
pub struct WaveListQuery {
    /// Optional status filter (pending, picking, completed, cancelled)
    pub status: Option<String>,
    /// Maximum number of waves returned
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EditPickedQuantitiesRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<PickedQuantityEdit>,
}

pub fn wave_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_waves).post(create_wave))
        .route("/:id", get(get_wave).delete(delete_wave))
        .route("/:id/progress", get(get_picking_progress))
        .route("/:id/locations/validate", post(validate_location))
        .route("/:id/items/:item_id/pick", post(register_picked_item))
        .route("/:id/complete", post(complete_wave))
        .route("/:id/cancel", post(cancel_wave))
        .route("/:id/undo", post(undo_completed_wave))
        .route("/:id/picked-quantities", put(edit_picked_quantities))
}

#[utoipa::path(
    get,
    path = "/api/v1/waves",
    summary = "List waves",
    params(WaveListQuery),
    responses(
        (status = 200, description = "Waves, newest first", body = ApiResponse<Vec<WaveModel>>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn list_waves(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<WaveListQuery>,
) -> ApiResult<Vec<WaveModel>> {
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            raw.trim()
                .to_ascii_lowercase()
                .parse::<WaveStatus>()
                .map_err(|_| ServiceError::BadRequest(format!("Unknown wave status {}", raw)))
        })
        .transpose()?;

    let waves = state
        .services
        .waves
        .list_waves(WaveListFilter {
            status,
            tenant_id: auth.tenant_scope(),
            limit: query.limit,
        })
        .await?;
    Ok(Json(ApiResponse::success(waves)))
}

#[utoipa::path(
    post,
    path = "/api/v1/waves",
    summary = "Create wave",
    description = "Groups orders of one tenant into a new picking wave",
    request_body = CreateWaveRequest,
    responses(
        (status = 201, description = "Wave created", body = ApiResponse<WaveDetails>),
        (status = 400, description = "Orders rejected", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn create_wave(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateWaveRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WaveDetails>>), ServiceError> {
    payload.validate()?;

    let details = state
        .services
        .waves
        .create_wave(payload.order_ids, &auth.user_id, auth.tenant_scope())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(details))))
}

#[utoipa::path(
    get,
    path = "/api/v1/waves/{id}",
    summary = "Get wave",
    params(("id" = Uuid, Path, description = "Wave id")),
    responses(
        (status = 200, description = "Wave with items and orders", body = ApiResponse<WaveDetails>),
        (status = 404, description = "Wave not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn get_wave(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<WaveDetails> {
    let details = state.services.waves.get_wave(id).await?;
    Ok(Json(ApiResponse::success(details)))
}

#[utoipa::path(
    get,
    path = "/api/v1/waves/{id}/progress",
    summary = "Picking progress",
    params(("id" = Uuid, Path, description = "Wave id")),
    responses(
        (status = 200, description = "Items with label codes and progress", body = ApiResponse<WaveProgressView>),
        (status = 404, description = "Wave not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn get_picking_progress(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<WaveProgressView> {
    let progress = state.services.waves.picking_progress(id).await?;
    Ok(Json(ApiResponse::success(progress)))
}

#[utoipa::path(
    post,
    path = "/api/v1/waves/{id}/locations/validate",
    summary = "Validate pick location",
    description = "Confirms that a scanned location code holds items of the wave",
    params(("id" = Uuid, Path, description = "Wave id")),
    request_body = LocationScanRequest,
    responses(
        (status = 200, description = "Location holds wave items", body = ApiResponse<LocationCheck>),
        (status = 400, description = "No wave items at the location", body = crate::errors::ErrorResponse),
        (status = 404, description = "Wave or location not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Picking"
)]
pub async fn validate_location(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationScanRequest>,
) -> ApiResult<LocationCheck> {
    payload.validate()?;

    let check = state
        .services
        .waves
        .validate_location(id, &payload.location_code)
        .await?;
    Ok(Json(ApiResponse::success(check)))
}

#[utoipa::path(
    post,
    path = "/api/v1/waves/{id}/items/{item_id}/pick",
    summary = "Register picked item",
    description = "Validates a scanned code and adds the quantity to the wave line",
    params(
        ("id" = Uuid, Path, description = "Wave id"),
        ("item_id" = Uuid, Path, description = "Wave item id"),
    ),
    request_body = PickScanRequest,
    responses(
        (status = 200, description = "Scan accepted", body = ApiResponse<PickResult>),
        (status = 400, description = "Scan or quantity rejected", body = crate::errors::ErrorResponse),
        (status = 404, description = "Wave or item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent scan on the same item", body = crate::errors::ErrorResponse),
    ),
    tag = "Picking"
)]
pub async fn register_picked_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<PickScanRequest>,
) -> ApiResult<PickResult> {
    payload.validate()?;

    let result = state
        .services
        .picking
        .register_picked_item(
            id,
            item_id,
            &payload.scanned_code,
            payload.quantity,
            &auth.user_id,
        )
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/waves/{id}/complete",
    summary = "Complete wave",
    params(("id" = Uuid, Path, description = "Wave id")),
    responses(
        (status = 200, description = "Wave completed", body = ApiResponse<WaveModel>),
        (status = 412, description = "Items still unpicked", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn complete_wave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<WaveModel> {
    let wave = state.services.waves.complete_wave(id, &auth.user_id).await?;
    Ok(Json(ApiResponse::success(wave)))
}

#[utoipa::path(
    post,
    path = "/api/v1/waves/{id}/cancel",
    summary = "Cancel wave",
    params(("id" = Uuid, Path, description = "Wave id")),
    responses(
        (status = 200, description = "Wave cancelled", body = ApiResponse<WaveModel>),
        (status = 400, description = "Wave already cancelled or completed", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn cancel_wave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<WaveModel> {
    let wave = state.services.waves.cancel_wave(id, &auth.user_id).await?;
    Ok(Json(ApiResponse::success(wave)))
}

#[utoipa::path(
    post,
    path = "/api/v1/waves/{id}/undo",
    summary = "Undo completed wave",
    description = "Zeroes picked quantities of a completed wave, cancels it and releases its orders",
    params(("id" = Uuid, Path, description = "Wave id")),
    responses(
        (status = 200, description = "Wave rolled back", body = ApiResponse<WaveModel>),
        (status = 400, description = "Wave is not completed", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn undo_completed_wave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<WaveModel> {
    let wave = state
        .services
        .waves
        .delete_completed_wave(id, &auth.user_id)
        .await?;
    Ok(Json(ApiResponse::success(wave)))
}

#[utoipa::path(
    put,
    path = "/api/v1/waves/{id}/picked-quantities",
    summary = "Edit picked quantities of a completed wave",
    params(("id" = Uuid, Path, description = "Wave id")),
    request_body = EditPickedQuantitiesRequest,
    responses(
        (status = 200, description = "Quantities updated", body = ApiResponse<WaveDetails>),
        (status = 400, description = "Wave not completed or quantity above total", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn edit_picked_quantities(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditPickedQuantitiesRequest>,
) -> ApiResult<WaveDetails> {
    payload.validate()?;

    let details = state
        .services
        .waves
        .edit_completed_wave_quantities(id, payload.items, &auth.user_id)
        .await?;
    Ok(Json(ApiResponse::success(details)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/waves/{id}",
    summary = "Delete wave",
    description = "Permanently removes a pending or cancelled wave. Administrators only.",
    params(("id" = Uuid, Path, description = "Wave id")),
    responses(
        (status = 204, description = "Wave deleted"),
        (status = 400, description = "Wave is picking or completed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = crate::errors::ErrorResponse),
    ),
    tag = "Waves"
)]
pub async fn delete_wave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    auth.require_admin("delete waves")?;

    state.services.waves.delete_wave(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
