//! Lot management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::{check_permission, CurrentUser};
use crate::services::lot::{AddToLotInput, CreateLotInput, LotService};
use crate::AppState;

/// List all lots for the current company
pub async fn list_lots(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.list_lots(current_user.0.company_id).await {
        Ok(lots) => (StatusCode::OK, Json(serde_json::json!({ "lots": lots }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a lot with its member requests
pub async fn get_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service
        .get_lot_with_requests(current_user.0.company_id, lot_id)
        .await
    {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new lot
pub async fn create_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateLotInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "lots", "manage") {
        return e.into_response();
    }

    let service = LotService::new(state.db.clone());

    match service
        .create_lot(current_user.0.company_id, current_user.0.user_id, input)
        .await
    {
        Ok(lot) => (StatusCode::CREATED, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Add an approved request to a lot
pub async fn add_to_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<AddToLotInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "lots", "manage") {
        return e.into_response();
    }

    let service = LotService::new(state.db.clone());

    match service
        .add_to_lot(
            current_user.0.company_id,
            current_user.0.user_id,
            lot_id,
            input,
        )
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Pull a batched request back out of its lot
pub async fn remove_from_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "lots", "manage") {
        return e.into_response();
    }

    let service = LotService::new(state.db.clone());

    match service
        .remove_from_lot(current_user.0.company_id, request_id)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a lot, reverting its members
pub async fn delete_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "lots", "manage") {
        return e.into_response();
    }

    let service = LotService::new(state.db.clone());

    match service.delete_lot(current_user.0.company_id, lot_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
