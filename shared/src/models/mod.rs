//! Domain models for the Obra Operations Platform

mod material;
mod purchase_lot;
mod purchase_order;
mod purchase_request;
mod stock_movement;
mod supplier;
mod warehouse_request;

pub use material::*;
pub use purchase_lot::*;
pub use purchase_order::*;
pub use purchase_request::*;
pub use stock_movement::*;
pub use supplier::*;
pub use warehouse_request::*;
