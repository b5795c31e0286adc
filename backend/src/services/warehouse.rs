//! Warehouse request service
//!
//! Site crews ask the warehouse for material issues and hand material
//! back through return requests. Approving an issue and completing a
//! return are the only two paths here that touch stock, and both go
//! through the ledger primitive one item at a time inside a single
//! transaction, so a request with an unfillable line changes nothing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{
    MovementType, StockMovement, WarehouseRequest, WarehouseRequestItem, WarehouseRequestKind,
    WarehouseRequestStatus,
};
use shared::validation::{validate_positive_quantity, validate_required_text};

use crate::error::{AppError, AppResult};
use crate::services::stock::{
    apply_movement, begin_serializable, with_serializable_retry, MovementSpec,
    DEFAULT_MAX_TX_RETRIES,
};

const WAREHOUSE_COLUMNS: &str = "id, company_id, kind, area, status, requester_id, notes, \
     decided_by, decided_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct WarehouseRequestRow {
    id: Uuid,
    company_id: Uuid,
    kind: String,
    area: String,
    status: String,
    requester_id: Uuid,
    notes: Option<String>,
    decided_by: Option<Uuid>,
    decided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct WarehouseItemRow {
    material_id: Uuid,
    quantity: Decimal,
}

impl WarehouseRequestRow {
    fn into_model(self, items: Vec<WarehouseRequestItem>) -> AppResult<WarehouseRequest> {
        let kind = WarehouseRequestKind::parse(&self.kind).ok_or_else(|| {
            AppError::Internal(format!("unknown warehouse request kind '{}'", self.kind))
        })?;
        let status = WarehouseRequestStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("unknown warehouse request status '{}'", self.status))
        })?;
        Ok(WarehouseRequest {
            id: self.id,
            company_id: self.company_id,
            kind,
            area: self.area,
            status,
            notes: self.notes,
            items,
            requester_id: self.requester_id,
            decided_by: self.decided_by,
            decided_at: self.decided_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// One line of a warehouse request
#[derive(Debug, Deserialize)]
pub struct WarehouseItemInput {
    pub material_id: Uuid,
    pub quantity: Decimal,
}

/// Input for creating a warehouse request
#[derive(Debug, Deserialize)]
pub struct CreateWarehouseRequestInput {
    pub kind: WarehouseRequestKind,
    pub area: String,
    pub notes: Option<String>,
    pub items: Vec<WarehouseItemInput>,
}

/// A decided warehouse request together with the ledger entries it wrote
#[derive(Debug, Serialize)]
pub struct WarehouseDecisionOutcome {
    pub request: WarehouseRequest,
    pub movements: Vec<StockMovement>,
}

/// Warehouse request service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
    max_retries: u32,
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            max_retries: DEFAULT_MAX_TX_RETRIES,
        }
    }

    pub fn with_max_retries(db: PgPool, max_retries: u32) -> Self {
        Self { db, max_retries }
    }

    /// Create a warehouse request in `pending` status
    pub async fn create_request(
        &self,
        company_id: Uuid,
        requester_id: Uuid,
        input: CreateWarehouseRequestInput,
    ) -> AppResult<WarehouseRequest> {
        if validate_required_text(&input.area).is_err() {
            return Err(AppError::Validation {
                field: "area".to_string(),
                message: "Area cannot be blank".to_string(),
                message_es: "El área no puede estar vacía".to_string(),
            });
        }
        if input.items.is_empty() {
            return Err(AppError::ValidationError(
                "at least one item is required".to_string(),
            ));
        }
        for item in &input.items {
            if validate_positive_quantity(item.quantity).is_err() {
                return Err(AppError::Validation {
                    field: "items.quantity".to_string(),
                    message: "Item quantity must be greater than zero".to_string(),
                    message_es: "La cantidad del artículo debe ser mayor que cero".to_string(),
                });
            }
        }

        let mut tx = self.db.begin().await?;

        // Every line must reference a material in this company's catalog.
        for item in &input.items {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1 AND company_id = $2)",
            )
            .bind(item.material_id)
            .bind(company_id)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Material".to_string()));
            }
        }

        let row = sqlx::query_as::<_, WarehouseRequestRow>(&format!(
            r#"
            INSERT INTO warehouse_requests (company_id, kind, area, status, requester_id, notes)
            VALUES ($1, $2, $3, 'pending', $4, $5)
            RETURNING {}
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(company_id)
        .bind(input.kind.as_str())
        .bind(input.area.trim())
        .bind(requester_id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            sqlx::query(
                "INSERT INTO warehouse_request_items (request_id, material_id, quantity) \
                 VALUES ($1, $2, $3)",
            )
            .bind(row.id)
            .bind(item.material_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
            items.push(WarehouseRequestItem {
                material_id: item.material_id,
                quantity: item.quantity,
            });
        }

        tx.commit().await?;

        tracing::info!(request_id = %row.id, kind = %input.kind.as_str(), "warehouse request created");

        row.into_model(items)
    }

    /// Approve a pending material issue, deducting stock per item
    pub async fn approve_material_request(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<WarehouseDecisionOutcome> {
        with_serializable_retry(self.max_retries, || {
            self.decide_with_movements(
                company_id,
                actor_id,
                request_id,
                WarehouseRequestKind::MaterialIssue,
                WarehouseRequestStatus::Approved,
            )
        })
        .await
    }

    /// Complete a pending material return, re-entering stock per item
    pub async fn complete_return_request(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<WarehouseDecisionOutcome> {
        with_serializable_retry(self.max_retries, || {
            self.decide_with_movements(
                company_id,
                actor_id,
                request_id,
                WarehouseRequestKind::MaterialReturn,
                WarehouseRequestStatus::Completed,
            )
        })
        .await
    }

    async fn decide_with_movements(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        request_id: Uuid,
        expected_kind: WarehouseRequestKind,
        target_status: WarehouseRequestStatus,
    ) -> AppResult<WarehouseDecisionOutcome> {
        let mut tx = begin_serializable(&self.db).await?;

        let (row, item_rows) = Self::lock_pending(&mut tx, company_id, request_id).await?;

        if row.kind != expected_kind.as_str() {
            return Err(AppError::InvalidStateTransition(format!(
                "warehouse request {} is a {} request",
                request_id, row.kind
            )));
        }

        let sign = match expected_kind {
            WarehouseRequestKind::MaterialIssue => Decimal::NEGATIVE_ONE,
            WarehouseRequestKind::MaterialReturn => Decimal::ONE,
        };
        let movement_type = match expected_kind {
            WarehouseRequestKind::MaterialIssue => MovementType::RequestDelivery,
            WarehouseRequestKind::MaterialReturn => MovementType::ReturnReentry,
        };
        let justification = match expected_kind {
            WarehouseRequestKind::MaterialIssue => {
                format!("Material issued to area '{}'", row.area)
            }
            WarehouseRequestKind::MaterialReturn => {
                format!("Material returned from area '{}'", row.area)
            }
        };

        let mut movements = Vec::with_capacity(item_rows.len());
        for item in &item_rows {
            let movement = apply_movement(
                &mut tx,
                company_id,
                MovementSpec {
                    material_id: item.material_id,
                    quantity_change: sign * item.quantity,
                    movement_type,
                    justification: &justification,
                    actor_id,
                    related_request_id: Some(request_id),
                },
            )
            .await?;
            movements.push(movement);
        }

        let updated = sqlx::query_as::<_, WarehouseRequestRow>(&format!(
            r#"
            UPDATE warehouse_requests
            SET status = $1, decided_by = $2, decided_at = NOW(), updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(target_status.as_str())
        .bind(actor_id)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %request_id,
            status = %target_status.as_str(),
            items = movements.len(),
            "warehouse request decided"
        );

        let items = item_rows
            .into_iter()
            .map(|i| WarehouseRequestItem {
                material_id: i.material_id,
                quantity: i.quantity,
            })
            .collect();

        Ok(WarehouseDecisionOutcome {
            request: updated.into_model(items)?,
            movements,
        })
    }

    /// Reject a pending warehouse request; stock is untouched
    pub async fn reject_request(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<WarehouseRequest> {
        let mut tx = self.db.begin().await?;

        let (_, item_rows) = Self::lock_pending(&mut tx, company_id, request_id).await?;

        let updated = sqlx::query_as::<_, WarehouseRequestRow>(&format!(
            r#"
            UPDATE warehouse_requests
            SET status = 'rejected', decided_by = $1, decided_at = NOW(), updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(actor_id)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let items = item_rows
            .into_iter()
            .map(|i| WarehouseRequestItem {
                material_id: i.material_id,
                quantity: i.quantity,
            })
            .collect();

        updated.into_model(items)
    }

    async fn lock_pending(
        tx: &mut Transaction<'static, Postgres>,
        company_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<(WarehouseRequestRow, Vec<WarehouseItemRow>)> {
        let row = sqlx::query_as::<_, WarehouseRequestRow>(&format!(
            "SELECT {} FROM warehouse_requests WHERE id = $1 AND company_id = $2 FOR UPDATE",
            WAREHOUSE_COLUMNS
        ))
        .bind(request_id)
        .bind(company_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse request".to_string()))?;

        if row.status != WarehouseRequestStatus::Pending.as_str() {
            return Err(AppError::InvalidStateTransition(format!(
                "warehouse request {} is '{}', only pending requests can be decided",
                request_id, row.status
            )));
        }

        let items = sqlx::query_as::<_, WarehouseItemRow>(
            "SELECT material_id, quantity FROM warehouse_request_items WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok((row, items))
    }

    /// List warehouse requests for a company, newest first
    pub async fn list_requests(&self, company_id: Uuid) -> AppResult<Vec<WarehouseRequest>> {
        let rows = sqlx::query_as::<_, WarehouseRequestRow>(&format!(
            "SELECT {} FROM warehouse_requests WHERE company_id = $1 ORDER BY created_at DESC",
            WAREHOUSE_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            let items = sqlx::query_as::<_, WarehouseItemRow>(
                "SELECT material_id, quantity FROM warehouse_request_items WHERE request_id = $1",
            )
            .bind(row.id)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(|i| WarehouseRequestItem {
                material_id: i.material_id,
                quantity: i.quantity,
            })
            .collect();
            requests.push(row.into_model(items)?);
        }

        Ok(requests)
    }

    /// Get one warehouse request with its items
    pub async fn get_request(
        &self,
        company_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<WarehouseRequest> {
        let row = sqlx::query_as::<_, WarehouseRequestRow>(&format!(
            "SELECT {} FROM warehouse_requests WHERE id = $1 AND company_id = $2",
            WAREHOUSE_COLUMNS
        ))
        .bind(request_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse request".to_string()))?;

        let items = sqlx::query_as::<_, WarehouseItemRow>(
            "SELECT material_id, quantity FROM warehouse_request_items WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|i| WarehouseRequestItem {
            material_id: i.material_id,
            quantity: i.quantity,
        })
        .collect();

        row.into_model(items)
    }
}
