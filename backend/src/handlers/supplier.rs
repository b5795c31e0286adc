//! Supplier catalog HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::middleware::{check_permission, CurrentUser};
use crate::services::supplier::{CreateSupplierInput, SupplierService};
use crate::AppState;

/// List suppliers for the current company
pub async fn list_suppliers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> impl IntoResponse {
    let service = SupplierService::new(state.db.clone());

    match service.list_suppliers(current_user.0.company_id).await {
        Ok(suppliers) => (
            StatusCode::OK,
            Json(serde_json::json!({ "suppliers": suppliers })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSupplierInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "suppliers", "create") {
        return e.into_response();
    }

    let service = SupplierService::new(state.db.clone());

    match service.create_supplier(current_user.0.company_id, input).await {
        Ok(supplier) => (StatusCode::CREATED, Json(supplier)).into_response(),
        Err(e) => e.into_response(),
    }
}
