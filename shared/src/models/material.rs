//! Warehouse material models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A material tracked in the warehouse
///
/// `stock` is the current quantity on hand. It is never assigned directly
/// by a caller; every change goes through the stock ledger transaction so
/// the sum of all movements always equals the current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    /// Unit of measure (e.g., "kg", "bolsa", "m3")
    pub unit: String,
    pub category: String,
    pub stock: Decimal,
    pub preferred_supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
