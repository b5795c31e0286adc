//! Internal warehouse movement models
//!
//! Material requests (stock leaving the warehouse to a work area) and
//! return requests (excess material re-entering stock). No external
//! supplier is involved; both follow the same ledger contract as
//! receiving.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An internal warehouse request with one or more line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub kind: WarehouseRequestKind,
    pub status: WarehouseRequestStatus,
    pub requester_id: Uuid,
    pub area: String,
    pub notes: Option<String>,
    pub items: Vec<WarehouseRequestItem>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One material line of a warehouse request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseRequestItem {
    pub material_id: Uuid,
    pub quantity: Decimal,
}

/// Direction of the internal movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseRequestKind {
    /// Stock is handed out to a work area (negative ledger entries)
    MaterialIssue,
    /// Excess material comes back to stock (positive ledger entries)
    MaterialReturn,
}

impl WarehouseRequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseRequestKind::MaterialIssue => "material_issue",
            WarehouseRequestKind::MaterialReturn => "material_return",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "material_issue" => Some(WarehouseRequestKind::MaterialIssue),
            "material_return" => Some(WarehouseRequestKind::MaterialReturn),
            _ => None,
        }
    }
}

/// Lifecycle status of a warehouse request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseRequestStatus {
    Pending,
    /// Material issue approved and delivered; ledger entries written
    Approved,
    /// Return completed and re-entered into stock; ledger entries written
    Completed,
    Rejected,
}

impl WarehouseRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseRequestStatus::Pending => "pending",
            WarehouseRequestStatus::Approved => "approved",
            WarehouseRequestStatus::Completed => "completed",
            WarehouseRequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WarehouseRequestStatus::Pending),
            "approved" => Some(WarehouseRequestStatus::Approved),
            "completed" => Some(WarehouseRequestStatus::Completed),
            "rejected" => Some(WarehouseRequestStatus::Rejected),
            _ => None,
        }
    }
}
