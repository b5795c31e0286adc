//! Purchase request HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::PurchaseRequestStatus;

use crate::middleware::{check_permission, CurrentUser};
use crate::services::purchase_request::{
    CreateRequestInput, DecideRequestInput, PurchaseRequestService,
};
use crate::services::receiving::{ReceiveInput, ReceivingService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
}

/// List purchase requests, optionally filtered by status
pub async fn list_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListRequestsQuery>,
) -> impl IntoResponse {
    let status = match query.status.as_deref() {
        Some(s) => match PurchaseRequestStatus::parse(s) {
            Some(status) => Some(status),
            None => {
                return crate::error::AppError::ValidationError(format!(
                    "unknown status filter '{}'",
                    s
                ))
                .into_response()
            }
        },
        None => None,
    };

    let service = PurchaseRequestService::new(state.db.clone());

    match service.list_requests(current_user.0.company_id, status).await {
        Ok(requests) => (
            StatusCode::OK,
            Json(serde_json::json!({ "requests": requests })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific purchase request
pub async fn get_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = PurchaseRequestService::new(state.db.clone());

    match service.get_request(current_user.0.company_id, request_id).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new purchase request
pub async fn create_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRequestInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "purchase_requests", "create") {
        return e.into_response();
    }

    let service = PurchaseRequestService::new(state.db.clone());

    match service
        .create_request(current_user.0.company_id, current_user.0.user_id, input)
        .await
    {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Approve or reject a pending purchase request
pub async fn decide_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(input): Json<DecideRequestInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "purchase_requests", "approve") {
        return e.into_response();
    }

    let service = PurchaseRequestService::new(state.db.clone());

    match service
        .decide_request(
            current_user.0.company_id,
            current_user.0.user_id,
            request_id,
            input,
        )
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a purchase request
pub async fn delete_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "purchase_requests", "delete") {
        return e.into_response();
    }

    let service = PurchaseRequestService::new(state.db.clone());

    match service.delete_request(current_user.0.company_id, request_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Receive a delivery against an ordered purchase request
pub async fn receive_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(input): Json<ReceiveInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "stock", "receive_order") {
        return e.into_response();
    }

    let service = ReceivingService::with_max_retries(
        state.db.clone(),
        state.config.stock.max_transaction_retries,
    );

    match service
        .receive(
            current_user.0.company_id,
            current_user.0.user_id,
            request_id,
            input,
        )
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}
