//! Purchase order HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::{check_permission, CurrentUser};
use crate::services::order::{GenerateQuoteInput, IssueOrderInput, OrderService};
use crate::AppState;

/// List purchase orders for the current company
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.list_orders(current_user.0.company_id).await {
        Ok(orders) => (
            StatusCode::OK,
            Json(serde_json::json!({ "orders": orders })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific purchase order
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.get_order(current_user.0.company_id, order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Generate a quote request for a lot
pub async fn generate_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<GenerateQuoteInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "orders", "generate") {
        return e.into_response();
    }

    let service = OrderService::new(state.db.clone());

    match service
        .generate_quote(current_user.0.company_id, current_user.0.user_id, input)
        .await
    {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Issue a binding purchase order against a lot
pub async fn issue_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<IssueOrderInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "orders", "issue") {
        return e.into_response();
    }

    let service = OrderService::new(state.db.clone());

    match service
        .issue_order(current_user.0.company_id, current_user.0.user_id, input)
        .await
    {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a purchase order, reverting its requests into the lot
pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "orders", "cancel") {
        return e.into_response();
    }

    let service = OrderService::new(state.db.clone());

    match service.cancel_order(current_user.0.company_id, order_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
