//! Business logic services

pub mod lot;
pub mod material;
pub mod order;
pub mod purchase_request;
pub mod receiving;
pub mod stock;
pub mod supplier;
pub mod warehouse;

pub use lot::LotService;
pub use material::MaterialService;
pub use order::OrderService;
pub use purchase_request::PurchaseRequestService;
pub use receiving::ReceivingService;
pub use stock::StockService;
pub use supplier::SupplierService;
pub use warehouse::WarehouseService;
