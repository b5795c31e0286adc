//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
}

#[derive(Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DatabaseHealth {
    Reachable { pool_connections: u32 },
    Unreachable,
}

/// Report service liveness and database reachability
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => DatabaseHealth::Reachable {
            pool_connections: state.db.size(),
        },
        Err(_) => DatabaseHealth::Unreachable,
    };

    let status = match database {
        DatabaseHealth::Reachable { .. } => "ok",
        DatabaseHealth::Unreachable => "degraded",
    };

    Json(HealthResponse {
        status,
        service: "obra-operations",
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
