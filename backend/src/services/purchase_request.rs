//! Purchase request lifecycle service
//!
//! A request moves forward through pending → approved → batched → ordered
//! → received; rejection is terminal and only lot or order cancellation
//! moves it backwards. The one historical field with special handling is
//! `original_quantity`: it captures the quantity as first submitted, the
//! first time an edit deviates from it, and is never overwritten.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{PurchaseRequest, PurchaseRequestStatus, RequestDecision};
use shared::validation::{validate_positive_quantity, validate_required_text};

use crate::error::{AppError, AppResult};

/// Columns selected for every purchase request read
pub(crate) const REQUEST_COLUMNS: &str = "id, company_id, material_name, quantity, \
     original_quantity, unit, category, justification, area, requester_id, status, \
     lot_id, purchase_order_id, notes, approver_id, approved_at, received_at, \
     derived_from, created_at, updated_at";

/// Row mapping for purchase requests, shared across services
#[derive(Debug, FromRow)]
pub(crate) struct PurchaseRequestRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub material_name: String,
    pub quantity: Decimal,
    pub original_quantity: Option<Decimal>,
    pub unit: String,
    pub category: String,
    pub justification: String,
    pub area: String,
    pub requester_id: Uuid,
    pub status: String,
    pub lot_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub approver_id: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub derived_from: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseRequestRow {
    pub(crate) fn parsed_status(&self) -> AppResult<PurchaseRequestStatus> {
        PurchaseRequestStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(format!("unknown request status '{}'", self.status)))
    }

    pub(crate) fn into_model(self) -> AppResult<PurchaseRequest> {
        let status = self.parsed_status()?;
        Ok(PurchaseRequest {
            id: self.id,
            company_id: self.company_id,
            material_name: self.material_name,
            quantity: self.quantity,
            original_quantity: self.original_quantity,
            unit: self.unit,
            category: self.category,
            justification: self.justification,
            area: self.area,
            requester_id: self.requester_id,
            status,
            lot_id: self.lot_id,
            purchase_order_id: self.purchase_order_id,
            notes: self.notes,
            approver_id: self.approver_id,
            approved_at: self.approved_at,
            received_at: self.received_at,
            derived_from: self.derived_from,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Load a request row under lock inside an open transaction
pub(crate) async fn lock_request(
    tx: &mut Transaction<'static, Postgres>,
    company_id: Uuid,
    request_id: Uuid,
) -> AppResult<PurchaseRequestRow> {
    sqlx::query_as::<_, PurchaseRequestRow>(&format!(
        "SELECT {} FROM purchase_requests WHERE id = $1 AND company_id = $2 FOR UPDATE",
        REQUEST_COLUMNS
    ))
    .bind(request_id)
    .bind(company_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Purchase request".to_string()))
}

/// Input for creating a purchase request
#[derive(Debug, Deserialize)]
pub struct CreateRequestInput {
    pub material_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub category: String,
    pub justification: String,
    pub area: String,
    pub notes: Option<String>,
}

/// Edits that may accompany an approval decision
#[derive(Debug, Default, Deserialize)]
pub struct RequestEdits {
    pub quantity: Option<Decimal>,
    pub notes: Option<String>,
}

/// Input for deciding a pending request
#[derive(Debug, Deserialize)]
pub struct DecideRequestInput {
    pub decision: RequestDecision,
    #[serde(default)]
    pub edits: Option<RequestEdits>,
}

/// Purchase request lifecycle service
#[derive(Clone)]
pub struct PurchaseRequestService {
    db: PgPool,
}

impl PurchaseRequestService {
    /// Create a new PurchaseRequestService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a purchase request in `pending` status
    pub async fn create_request(
        &self,
        company_id: Uuid,
        requester_id: Uuid,
        input: CreateRequestInput,
    ) -> AppResult<PurchaseRequest> {
        if validate_positive_quantity(input.quantity).is_err() {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be greater than zero".to_string(),
                message_es: "La cantidad debe ser mayor que cero".to_string(),
            });
        }

        for (field, value) in [
            ("material_name", &input.material_name),
            ("unit", &input.unit),
            ("category", &input.category),
            ("justification", &input.justification),
            ("area", &input.area),
        ] {
            if validate_required_text(value).is_err() {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: format!("Field '{}' cannot be blank", field),
                    message_es: format!("El campo '{}' no puede estar vacío", field),
                });
            }
        }

        let row = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
            r#"
            INSERT INTO purchase_requests (
                company_id, material_name, quantity, unit, category,
                justification, area, requester_id, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(company_id)
        .bind(input.material_name.trim())
        .bind(input.quantity)
        .bind(input.unit.trim())
        .bind(input.category.trim())
        .bind(input.justification.trim())
        .bind(input.area.trim())
        .bind(requester_id)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(request_id = %row.id, material = %row.material_name, "purchase request created");

        row.into_model()
    }

    /// Approve or reject a pending request, optionally applying edits
    ///
    /// If the edit changes the quantity and `original_quantity` is still
    /// unset, the pre-edit quantity is preserved there first.
    pub async fn decide_request(
        &self,
        company_id: Uuid,
        approver_id: Uuid,
        request_id: Uuid,
        input: DecideRequestInput,
    ) -> AppResult<PurchaseRequest> {
        if let Some(edits) = &input.edits {
            if let Some(quantity) = edits.quantity {
                if validate_positive_quantity(quantity).is_err() {
                    return Err(AppError::Validation {
                        field: "quantity".to_string(),
                        message: "Edited quantity must be greater than zero".to_string(),
                        message_es: "La cantidad editada debe ser mayor que cero".to_string(),
                    });
                }
            }
        }

        let mut tx = self.db.begin().await?;

        let row = lock_request(&mut tx, company_id, request_id).await?;
        if row.parsed_status()? != PurchaseRequestStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "request {} is '{}', only pending requests can be decided",
                request_id, row.status
            )));
        }

        let edits = input.edits.unwrap_or_default();
        let new_quantity = edits.quantity.unwrap_or(row.quantity);
        let original_quantity = if new_quantity != row.quantity {
            row.original_quantity.or(Some(row.quantity))
        } else {
            row.original_quantity
        };
        let notes = edits.notes.or(row.notes);
        let status = input.decision.as_status();

        let updated = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
            r#"
            UPDATE purchase_requests
            SET status = $1, quantity = $2, original_quantity = $3, notes = $4,
                approver_id = $5, approved_at = NOW(), updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(status.as_str())
        .bind(new_quantity)
        .bind(original_quantity)
        .bind(&notes)
        .bind(approver_id)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(request_id = %request_id, decision = %status, "purchase request decided");

        updated.into_model()
    }

    /// Hard-delete a request (administrative override)
    ///
    /// Allowed in any state before `received`.
    pub async fn delete_request(&self, company_id: Uuid, request_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let row = lock_request(&mut tx, company_id, request_id).await?;
        if row.parsed_status()? == PurchaseRequestStatus::Received {
            return Err(AppError::InvalidStateTransition(format!(
                "request {} is already received and part of the audit trail",
                request_id
            )));
        }

        sqlx::query("DELETE FROM purchase_requests WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(request_id = %request_id, "purchase request deleted");

        Ok(())
    }

    /// Get a request by ID
    pub async fn get_request(
        &self,
        company_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<PurchaseRequest> {
        let row = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
            "SELECT {} FROM purchase_requests WHERE id = $1 AND company_id = $2",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase request".to_string()))?;

        row.into_model()
    }

    /// List requests for a company, optionally filtered by status
    pub async fn list_requests(
        &self,
        company_id: Uuid,
        status: Option<PurchaseRequestStatus>,
    ) -> AppResult<Vec<PurchaseRequest>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, PurchaseRequestRow>(&format!(
                    "SELECT {} FROM purchase_requests WHERE company_id = $1 AND status = $2 \
                     ORDER BY created_at DESC",
                    REQUEST_COLUMNS
                ))
                .bind(company_id)
                .bind(status.as_str())
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, PurchaseRequestRow>(&format!(
                    "SELECT {} FROM purchase_requests WHERE company_id = $1 \
                     ORDER BY created_at DESC",
                    REQUEST_COLUMNS
                ))
                .bind(company_id)
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter().map(PurchaseRequestRow::into_model).collect()
    }
}
