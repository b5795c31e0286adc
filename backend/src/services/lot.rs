//! Lot aggregation service
//!
//! A lot is a staging area for approved requests headed to one supplier.
//! Membership is reversible until an order is issued against the lot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{LotStatus, PurchaseLot, PurchaseRequest, PurchaseRequestStatus};
use shared::validation::validate_required_text;

use crate::error::{AppError, AppResult};
use crate::services::purchase_request::{lock_request, PurchaseRequestRow, REQUEST_COLUMNS};

/// Columns selected for every lot read
pub(crate) const LOT_COLUMNS: &str =
    "id, company_id, name, status, supplier_id, created_by, created_at";

/// Row mapping for purchase lots, shared with the order service
#[derive(Debug, FromRow)]
pub(crate) struct LotRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub status: String,
    pub supplier_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl LotRow {
    pub(crate) fn parsed_status(&self) -> AppResult<LotStatus> {
        LotStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(format!("unknown lot status '{}'", self.status)))
    }

    pub(crate) fn into_model(self) -> AppResult<PurchaseLot> {
        let status = self.parsed_status()?;
        Ok(PurchaseLot {
            id: self.id,
            company_id: self.company_id,
            name: self.name,
            status,
            supplier_id: self.supplier_id,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

/// Input for creating a lot
#[derive(Debug, Deserialize)]
pub struct CreateLotInput {
    pub name: String,
}

/// Input for adding a request to a lot
#[derive(Debug, Deserialize)]
pub struct AddToLotInput {
    pub request_id: Uuid,
    pub lot_name: Option<String>,
}

/// A lot together with its member requests
#[derive(Debug, Serialize)]
pub struct LotWithRequests {
    #[serde(flatten)]
    pub lot: PurchaseLot,
    pub requests: Vec<PurchaseRequest>,
}

/// Lot aggregation service
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

impl LotService {
    /// Create a new LotService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an open lot
    pub async fn create_lot(
        &self,
        company_id: Uuid,
        created_by: Uuid,
        input: CreateLotInput,
    ) -> AppResult<PurchaseLot> {
        if validate_required_text(&input.name).is_err() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Lot name cannot be blank".to_string(),
                message_es: "El nombre del lote no puede estar vacío".to_string(),
            });
        }

        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            INSERT INTO purchase_lots (company_id, name, status, created_by)
            VALUES ($1, $2, 'open', $3)
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(company_id)
        .bind(input.name.trim())
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    /// Add an approved request to a lot, creating the lot on the fly if it
    /// does not exist yet (idempotent upsert)
    ///
    /// The caller may pass a fresh `lot_id`; manual and on-the-fly lot
    /// creation share one code path.
    pub async fn add_to_lot(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        lot_id: Uuid,
        input: AddToLotInput,
    ) -> AppResult<PurchaseRequest> {
        let mut tx = self.db.begin().await?;

        let request = lock_request(&mut tx, company_id, input.request_id).await?;
        if request.parsed_status()? != PurchaseRequestStatus::Approved {
            return Err(AppError::InvalidStateTransition(format!(
                "request {} is '{}', only approved requests can be batched",
                input.request_id, request.status
            )));
        }

        let lot_name = input
            .lot_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Lote {}", &lot_id.simple().to_string()[..8]));

        sqlx::query(
            r#"
            INSERT INTO purchase_lots (id, company_id, name, status, created_by)
            VALUES ($1, $2, $3, 'open', $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(lot_id)
        .bind(company_id)
        .bind(&lot_name)
        .bind(actor_id)
        .execute(&mut *tx)
        .await?;

        // The id may belong to another company's lot; the upsert will have
        // conflicted without inserting, so verify scope and state.
        let lot = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM purchase_lots WHERE id = $1 AND company_id = $2 FOR UPDATE",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        if lot.parsed_status()? != LotStatus::Open {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} is already ordered and cannot accept requests",
                lot.id
            )));
        }

        let updated = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
            r#"
            UPDATE purchase_requests
            SET status = 'batched', lot_id = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(lot_id)
        .bind(input.request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(request_id = %input.request_id, lot_id = %lot_id, "request batched into lot");

        updated.into_model()
    }

    /// Pull a batched request back out of its lot
    pub async fn remove_from_lot(
        &self,
        company_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<PurchaseRequest> {
        let mut tx = self.db.begin().await?;

        let request = lock_request(&mut tx, company_id, request_id).await?;
        if request.parsed_status()? != PurchaseRequestStatus::Batched {
            return Err(AppError::InvalidStateTransition(format!(
                "request {} is '{}', only batched requests can leave a lot",
                request_id, request.status
            )));
        }

        let updated = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
            r#"
            UPDATE purchase_requests
            SET status = 'approved', lot_id = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        updated.into_model()
    }

    /// Delete a lot, reverting every member request to `approved`
    ///
    /// All member reverts and the lot deletion commit together; a partial
    /// revert is never visible.
    pub async fn delete_lot(&self, company_id: Uuid, lot_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let lot = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM purchase_lots WHERE id = $1 AND company_id = $2 FOR UPDATE",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        if lot.parsed_status()? != LotStatus::Open {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} has an issued order; cancel the order first",
                lot_id
            )));
        }

        let open_orders = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchase_orders WHERE lot_id = $1",
        )
        .bind(lot_id)
        .fetch_one(&mut *tx)
        .await?;

        if open_orders > 0 {
            return Err(AppError::PreconditionFailed(format!(
                "lot {} has {} order(s); cancel them before deleting the lot",
                lot_id, open_orders
            )));
        }

        let reverted = sqlx::query(
            r#"
            UPDATE purchase_requests
            SET status = 'approved', lot_id = NULL, updated_at = NOW()
            WHERE lot_id = $1 AND company_id = $2
            "#,
        )
        .bind(lot_id)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM purchase_lots WHERE id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            lot_id = %lot_id,
            reverted = reverted.rows_affected(),
            "lot deleted, member requests reverted to approved"
        );

        Ok(())
    }

    /// List lots for a company
    pub async fn list_lots(&self, company_id: Uuid) -> AppResult<Vec<PurchaseLot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM purchase_lots WHERE company_id = $1 ORDER BY created_at DESC",
            LOT_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(LotRow::into_model).collect()
    }

    /// Get a lot with its member requests
    pub async fn get_lot_with_requests(
        &self,
        company_id: Uuid,
        lot_id: Uuid,
    ) -> AppResult<LotWithRequests> {
        let lot = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM purchase_lots WHERE id = $1 AND company_id = $2",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        let requests = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
            "SELECT {} FROM purchase_requests WHERE lot_id = $1 ORDER BY created_at ASC",
            REQUEST_COLUMNS
        ))
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(LotWithRequests {
            lot: lot.into_model()?,
            requests: requests
                .into_iter()
                .map(PurchaseRequestRow::into_model)
                .collect::<AppResult<Vec<_>>>()?,
        })
    }
}
