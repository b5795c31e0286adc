//! Purchase lot models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A staging batch of approved requests destined for one supplier
///
/// A lot is not a commitment: any member request may be pulled back out
/// until an order is issued against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLot {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub status: LotStatus,
    /// Null until a supplier quote is attached
    pub supplier_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of a purchase lot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Open,
    Ordered,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Open => "open",
            LotStatus::Ordered => "ordered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(LotStatus::Open),
            "ordered" => Some(LotStatus::Ordered),
            _ => None,
        }
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
