//! Stock ledger HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::types::Pagination;
use uuid::Uuid;

use crate::middleware::{check_permission, CurrentUser};
use crate::services::stock::{ManualEntryInput, StockService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListMovementsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// List all ledger entries for the current company
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListMovementsQuery>,
) -> impl IntoResponse {
    let defaults = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page).min(500),
    };

    let service = StockService::new(state.db.clone());

    match service
        .list_movements(current_user.0.company_id, pagination)
        .await
    {
        Ok(movements) => (
            StatusCode::OK,
            Json(serde_json::json!({ "movements": movements })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// List ledger entries for one material
pub async fn get_material_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service
        .get_material_movements(current_user.0.company_id, material_id)
        .await
    {
        Ok(movements) => (
            StatusCode::OK,
            Json(serde_json::json!({ "movements": movements })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record a manual stock adjustment for a material
pub async fn manual_entry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
    Json(input): Json<ManualEntryInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "stock", "adjust") {
        return e.into_response();
    }

    let service = StockService::with_max_retries(
        state.db.clone(),
        state.config.stock.max_transaction_retries,
    );

    match service
        .manual_entry(
            current_user.0.company_id,
            current_user.0.user_id,
            material_id,
            input,
        )
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => e.into_response(),
    }
}
