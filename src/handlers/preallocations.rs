use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::preallocation::{
        AddressingResult, PreallocationView, ProcessFileRequest, RowValidation,
        SavePreallocationsRequest,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct SavedPreallocations {
    pub saved: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedPreallocations {
    pub deleted: u64,
}

pub fn preallocation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:id/preallocations",
            post(save_preallocations)
                .get(list_preallocations)
                .delete(delete_preallocations),
        )
        .route("/:id/preallocations/validate", post(validate_preallocations))
        .route("/:id/preallocations/execute", post(execute_preallocations))
}

#[utoipa::path(
    post,
    path = "/api/v1/receiving-orders/{id}/preallocations/validate",
    summary = "Validate preallocation sheet",
    params(("id" = Uuid, Path, description = "Receiving order id")),
    request_body = ProcessFileRequest,
    responses(
        (status = 200, description = "Verdict per row", body = ApiResponse<Vec<RowValidation>>),
        (status = 404, description = "Receiving order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Preallocations"
)]
pub async fn validate_preallocations(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProcessFileRequest>,
) -> ApiResult<Vec<RowValidation>> {
    payload.validate()?;

    let validations = state
        .services
        .preallocations
        .process_file(id, payload.rows)
        .await?;
    Ok(Json(ApiResponse::success(validations)))
}

#[utoipa::path(
    post,
    path = "/api/v1/receiving-orders/{id}/preallocations",
    summary = "Save validated preallocations",
    params(("id" = Uuid, Path, description = "Receiving order id")),
    request_body = SavePreallocationsRequest,
    responses(
        (status = 201, description = "Valid rows saved as pending", body = ApiResponse<SavedPreallocations>),
        (status = 400, description = "No valid rows", body = crate::errors::ErrorResponse),
    ),
    tag = "Preallocations"
)]
pub async fn save_preallocations(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SavePreallocationsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SavedPreallocations>>), ServiceError> {
    payload.validate()?;

    let saved = state
        .services
        .preallocations
        .save(id, payload.validations, &auth.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SavedPreallocations { saved })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/receiving-orders/{id}/preallocations",
    summary = "List preallocations",
    params(("id" = Uuid, Path, description = "Receiving order id")),
    responses(
        (status = 200, description = "Pending and executed preallocations", body = ApiResponse<Vec<PreallocationView>>),
        (status = 404, description = "Receiving order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Preallocations"
)]
pub async fn list_preallocations(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<PreallocationView>> {
    let rows = state.services.preallocations.list(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/receiving-orders/{id}/preallocations",
    summary = "Delete pending preallocations",
    params(("id" = Uuid, Path, description = "Receiving order id")),
    responses(
        (status = 200, description = "Pending preallocations removed", body = ApiResponse<DeletedPreallocations>),
    ),
    tag = "Preallocations"
)]
pub async fn delete_preallocations(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletedPreallocations> {
    let deleted = state.services.preallocations.delete(id).await?;
    Ok(Json(ApiResponse::success(DeletedPreallocations { deleted })))
}

#[utoipa::path(
    post,
    path = "/api/v1/receiving-orders/{id}/preallocations/execute",
    summary = "Execute addressing",
    description = "Moves received stock to the preallocated locations",
    params(("id" = Uuid, Path, description = "Receiving order id")),
    responses(
        (status = 200, description = "Addressing report", body = ApiResponse<AddressingResult>),
        (status = 412, description = "Order not in addressing or nothing pending", body = crate::errors::ErrorResponse),
    ),
    tag = "Preallocations"
)]
pub async fn execute_preallocations(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<AddressingResult> {
    let result = state
        .services
        .preallocations
        .execute(id, &auth.user_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
