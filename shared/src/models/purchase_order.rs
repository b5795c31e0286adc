//! Purchase order models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchase order against a lot
///
/// Either a non-binding quote request (`generated`) or a binding issued
/// order (`issued`, carrying the official order number).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub company_id: Uuid,
    pub lot_id: Uuid,
    pub supplier_id: Uuid,
    /// Denormalized line items, aggregated by material name
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    /// Set only for issued orders (e.g., "OC-001")
    pub official_order_number: Option<String>,
    /// Member requests at the time the order was created
    pub request_ids: Vec<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One consolidated line of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub material_name: String,
    pub unit: String,
    pub quantity: Decimal,
    /// Null on quote requests, set on issued orders
    pub unit_price: Option<Decimal>,
}

/// Lifecycle status of a purchase order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Quote request sent to the supplier, not binding
    Generated,
    /// Binding order with an official order number
    Issued,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Generated => "generated",
            OrderStatus::Issued => "issued",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generated" => Some(OrderStatus::Generated),
            "issued" => Some(OrderStatus::Issued),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
