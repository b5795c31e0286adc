//! Stock ledger models
//!
//! A `StockMovement` is the immutable audit record of a stock change.
//! Rows are created once and never updated or deleted; the running sum of
//! `quantity_change` per material, starting from its `initial` entry,
//! equals the material's current stock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in the stock ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub company_id: Uuid,
    pub material_id: Uuid,
    /// Denormalized so the audit trail survives material renames
    pub material_name: String,
    /// Signed delta applied to the material's stock
    pub quantity_change: Decimal,
    /// Stock snapshot after applying the change, for replay-free audit
    pub resulting_stock: Decimal,
    pub movement_type: MovementType,
    pub justification: String,
    pub actor_id: Uuid,
    pub related_request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Why a stock quantity changed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// First entry for a material, written at creation time
    Initial,
    /// Manual adjustment by a warehouse operator
    ManualEntry,
    /// Stock leaving the warehouse against an approved material request
    RequestDelivery,
    /// Excess material returning to stock
    ReturnReentry,
    /// Goods received against a purchase request
    Receiving,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Initial => "initial",
            MovementType::ManualEntry => "manual_entry",
            MovementType::RequestDelivery => "request_delivery",
            MovementType::ReturnReentry => "return_reentry",
            MovementType::Receiving => "receiving",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(MovementType::Initial),
            "manual_entry" => Some(MovementType::ManualEntry),
            "request_delivery" => Some(MovementType::RequestDelivery),
            "return_reentry" => Some(MovementType::ReturnReentry),
            "receiving" => Some(MovementType::Receiving),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
