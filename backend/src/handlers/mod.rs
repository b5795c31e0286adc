//! HTTP request handlers

pub mod health;
pub mod lot;
pub mod material;
pub mod order;
pub mod purchase_request;
pub mod stock;
pub mod supplier;
pub mod warehouse;

pub use health::health_check;
pub use lot::{add_to_lot, create_lot, delete_lot, get_lot, list_lots, remove_from_lot};
pub use material::{create_material, get_material, list_materials};
pub use order::{cancel_order, generate_quote, get_order, issue_order, list_orders};
pub use purchase_request::{
    create_request, decide_request, delete_request, get_request, list_requests, receive_delivery,
};
pub use stock::{get_material_movements, list_movements, manual_entry};
pub use supplier::{create_supplier, list_suppliers};
