//! Route definitions for the Obra Operations Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - purchase request lifecycle
        .nest("/purchase-requests", purchase_request_routes())
        // Protected routes - lot aggregation
        .nest("/lots", lot_routes())
        // Protected routes - purchase orders
        .nest("/orders", order_routes())
        // Protected routes - materials and stock ledger
        .nest("/materials", material_routes())
        // Protected routes - stock ledger overview
        .nest("/stock", stock_routes())
        // Protected routes - internal warehouse requests
        .nest("/warehouse-requests", warehouse_routes())
        // Protected routes - supplier catalog
        .nest("/suppliers", supplier_routes())
}

/// Purchase request routes (protected)
fn purchase_request_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_requests).post(handlers::create_request),
        )
        .route(
            "/:request_id",
            get(handlers::get_request).delete(handlers::delete_request),
        )
        .route("/:request_id/decision", post(handlers::decide_request))
        .route("/:request_id/receive", post(handlers::receive_delivery))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Lot aggregation routes (protected)
fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots).post(handlers::create_lot))
        .route(
            "/:lot_id",
            get(handlers::get_lot).delete(handlers::delete_lot),
        )
        .route("/:lot_id/requests", post(handlers::add_to_lot))
        .route(
            "/requests/:request_id",
            axum::routing::delete(handlers::remove_from_lot),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Purchase order routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders))
        .route("/quote", post(handlers::generate_quote))
        .route("/issue", post(handlers::issue_order))
        .route(
            "/:order_id",
            get(handlers::get_order).delete(handlers::cancel_order),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Material catalog and receiving routes (protected)
fn material_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_materials).post(handlers::create_material),
        )
        .route("/:material_id", get(handlers::get_material))
        .route(
            "/:material_id/movements",
            get(handlers::get_material_movements),
        )
        .route("/:material_id/manual-entry", post(handlers::manual_entry))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock ledger routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/movements", get(handlers::list_movements))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Internal warehouse request routes (protected)
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::warehouse::list_requests).post(handlers::warehouse::create_request),
        )
        .route("/:request_id", get(handlers::warehouse::get_request))
        .route(
            "/:request_id/approve",
            post(handlers::warehouse::approve_request),
        )
        .route(
            "/:request_id/complete",
            post(handlers::warehouse::complete_return),
        )
        .route(
            "/:request_id/reject",
            post(handlers::warehouse::reject_request),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Supplier catalog routes (protected)
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
