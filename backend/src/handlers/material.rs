//! Material catalog HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::{check_permission, CurrentUser};
use crate::services::material::{CreateMaterialInput, MaterialService};
use crate::AppState;

/// List all materials for the current company
pub async fn list_materials(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> impl IntoResponse {
    let service = MaterialService::new(state.db.clone());

    match service.list_materials(current_user.0.company_id).await {
        Ok(materials) => (
            StatusCode::OK,
            Json(serde_json::json!({ "materials": materials })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific material
pub async fn get_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = MaterialService::new(state.db.clone());

    match service
        .get_material(current_user.0.company_id, material_id)
        .await
    {
        Ok(material) => (StatusCode::OK, Json(material)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new material, optionally seeding initial stock
pub async fn create_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMaterialInput>,
) -> impl IntoResponse {
    if let Err(e) = check_permission(&current_user.0, "materials", "create") {
        return e.into_response();
    }

    let service = MaterialService::new(state.db.clone());

    match service
        .create_material(current_user.0.company_id, current_user.0.user_id, input)
        .await
    {
        Ok(material) => (StatusCode::CREATED, Json(material)).into_response(),
        Err(e) => e.into_response(),
    }
}
