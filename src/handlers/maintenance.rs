use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::{
    auth::AuthUser,
    services::reservations::{ReservationStats, SyncReport},
    ApiResponse, ApiResult, AppState,
};

pub fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/reservations/sync", post(sync_reservations))
        .route("/reservations/stats", get(reservation_stats))
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenance/reservations/sync",
    summary = "Reconcile reserved quantities",
    description = "Recomputes every stock record's reserved quantity from active order demand. Administrators only.",
    responses(
        (status = 200, description = "Reconciliation report", body = ApiResponse<SyncReport>),
        (status = 403, description = "Caller is not an administrator", body = crate::errors::ErrorResponse),
    ),
    tag = "Maintenance"
)]
pub async fn sync_reservations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<SyncReport> {
    auth.require_admin("synchronize reservations")?;
    info!(actor = %auth.user_id, "Reservation sync requested");

    let report = state
        .services
        .reservations
        .sync_inventory_reservations()
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance/reservations/stats",
    summary = "Reservation statistics",
    responses(
        (status = 200, description = "Reserved stock and active order counts", body = ApiResponse<ReservationStats>),
    ),
    tag = "Maintenance"
)]
pub async fn reservation_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<ReservationStats> {
    let stats = state.services.reservations.reservation_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
