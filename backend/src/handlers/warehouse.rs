//! Warehouse request HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::{check_permission, CurrentUser};
use crate::services::warehouse::{CreateWarehouseRequestInput, WarehouseService};
use crate::AppState;

/// List warehouse requests for the current company
pub async fn list_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.list_requests(current_user.0.company_id).await {
        Ok(requests) => (
            StatusCode::OK,
            Json(serde_json::json!({ "requests": requests })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific warehouse request
pub async fn get_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.get_request(current_user.0.company_id, request_id).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a warehouse request (material issue or return)
pub async fn create_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateWarehouseRequestInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "warehouse", "create") {
        return e.into_response();
    }

    let service = WarehouseService::new(state.db.clone());

    match service
        .create_request(current_user.0.company_id, current_user.0.user_id, input)
        .await
    {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Approve a pending material issue, deducting stock
pub async fn approve_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "warehouse", "approve") {
        return e.into_response();
    }

    let service = WarehouseService::with_max_retries(
        state.db.clone(),
        state.config.stock.max_transaction_retries,
    );

    match service
        .approve_material_request(current_user.0.company_id, current_user.0.user_id, request_id)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Complete a pending material return, re-entering stock
pub async fn complete_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "warehouse", "return") {
        return e.into_response();
    }

    let service = WarehouseService::with_max_retries(
        state.db.clone(),
        state.config.stock.max_transaction_retries,
    );

    match service
        .complete_return_request(current_user.0.company_id, current_user.0.user_id, request_id)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reject a pending warehouse request
pub async fn reject_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "warehouse", "approve") {
        return e.into_response();
    }

    let service = WarehouseService::new(state.db.clone());

    match service
        .reject_request(current_user.0.company_id, current_user.0.user_id, request_id)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => e.into_response(),
    }
}
