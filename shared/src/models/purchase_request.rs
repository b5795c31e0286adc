//! Purchase request models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single line-item request for a quantity of a named material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub material_name: String,
    pub quantity: Decimal,
    /// The historical quantity before the first edit. Set once, the first
    /// time `quantity` deviates from its submitted value, and never
    /// overwritten afterwards.
    pub original_quantity: Option<Decimal>,
    pub unit: String,
    pub category: String,
    pub justification: String,
    /// Work area that raised the request (e.g., "Estructura", "Obra gruesa")
    pub area: String,
    pub requester_id: Uuid,
    pub status: PurchaseRequestStatus,
    /// Set only while the request belongs to a lot (batched or ordered)
    pub lot_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub approver_id: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    /// Parent request when this row was forked by a partial receipt
    pub derived_from: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a purchase request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseRequestStatus {
    Pending,
    Approved,
    Rejected,
    Batched,
    Ordered,
    Received,
}

impl PurchaseRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseRequestStatus::Pending => "pending",
            PurchaseRequestStatus::Approved => "approved",
            PurchaseRequestStatus::Rejected => "rejected",
            PurchaseRequestStatus::Batched => "batched",
            PurchaseRequestStatus::Ordered => "ordered",
            PurchaseRequestStatus::Received => "received",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PurchaseRequestStatus::Pending),
            "approved" => Some(PurchaseRequestStatus::Approved),
            "rejected" => Some(PurchaseRequestStatus::Rejected),
            "batched" => Some(PurchaseRequestStatus::Batched),
            "ordered" => Some(PurchaseRequestStatus::Ordered),
            "received" => Some(PurchaseRequestStatus::Received),
            _ => None,
        }
    }
}

impl std::fmt::Display for PurchaseRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision taken on a pending request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestDecision {
    Approved,
    Rejected,
}

impl RequestDecision {
    pub fn as_status(&self) -> PurchaseRequestStatus {
        match self {
            RequestDecision::Approved => PurchaseRequestStatus::Approved,
            RequestDecision::Rejected => PurchaseRequestStatus::Rejected,
        }
    }
}
