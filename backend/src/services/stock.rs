//! Stock ledger service
//!
//! Home of the one transaction primitive every stock mutation goes
//! through: `apply_movement` re-reads the material row under lock inside
//! the caller's transaction, rejects changes that would drive stock
//! negative, and writes the material update and the ledger entry in the
//! same unit of work. No code path updates one without the other.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{MovementType, StockMovement};
use shared::types::Pagination;

use crate::error::{AppError, AppResult};

/// Retry budget for serializable stock transactions
pub const DEFAULT_MAX_TX_RETRIES: u32 = 3;

/// Begin a transaction at SERIALIZABLE isolation
///
/// Concurrent stock mutations rely on the storage engine's isolation, not
/// on in-process locks; a conflicting commit surfaces as SQLSTATE 40001
/// and the whole operation is retried from the top.
pub(crate) async fn begin_serializable(
    db: &PgPool,
) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// Run a stock mutation with a bounded retry on serialization failures
///
/// Every attempt must open its own transaction; state read before the
/// transaction began is never trusted across attempts.
pub(crate) async fn with_serializable_retry<T, F, Fut>(
    max_retries: u32,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_serialization_failure() => {
                if attempt >= max_retries {
                    return Err(AppError::Concurrency(format!(
                        "transaction aborted after {} retries",
                        max_retries
                    )));
                }
                attempt += 1;
                tracing::warn!(attempt, "serialization failure, retrying stock transaction");
            }
            other => return other,
        }
    }
}

/// Specification of a single ledger movement
#[derive(Debug, Clone)]
pub(crate) struct MovementSpec<'a> {
    pub material_id: Uuid,
    pub quantity_change: Decimal,
    pub movement_type: MovementType,
    pub justification: &'a str,
    pub actor_id: Uuid,
    pub related_request_id: Option<Uuid>,
}

/// Apply one ledger movement inside an open transaction
///
/// Locks the material row, checks sufficiency, updates the stock and
/// appends the immutable ledger entry. The caller owns the commit.
pub(crate) async fn apply_movement(
    tx: &mut Transaction<'static, Postgres>,
    company_id: Uuid,
    spec: MovementSpec<'_>,
) -> AppResult<StockMovement> {
    // Re-read current stock under lock; values read before the
    // transaction began are not trusted.
    let material = sqlx::query_as::<_, (String, Decimal)>(
        "SELECT name, stock FROM materials WHERE id = $1 AND company_id = $2 FOR UPDATE",
    )
    .bind(spec.material_id)
    .bind(company_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

    let (material_name, stock) = material;
    let resulting_stock = stock + spec.quantity_change;

    if resulting_stock < Decimal::ZERO {
        return Err(AppError::InsufficientStock(format!(
            "material '{}' has {} on hand, cannot remove {}",
            material_name, stock, -spec.quantity_change
        )));
    }

    sqlx::query("UPDATE materials SET stock = $1, updated_at = NOW() WHERE id = $2")
        .bind(resulting_stock)
        .bind(spec.material_id)
        .execute(&mut **tx)
        .await?;

    let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        r#"
        INSERT INTO stock_movements (
            company_id, material_id, material_name, quantity_change, resulting_stock,
            movement_type, justification, actor_id, related_request_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, created_at
        "#,
    )
    .bind(company_id)
    .bind(spec.material_id)
    .bind(&material_name)
    .bind(spec.quantity_change)
    .bind(resulting_stock)
    .bind(spec.movement_type.as_str())
    .bind(spec.justification)
    .bind(spec.actor_id)
    .bind(spec.related_request_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(StockMovement {
        id,
        company_id,
        material_id: spec.material_id,
        material_name,
        quantity_change: spec.quantity_change,
        resulting_stock,
        movement_type: spec.movement_type,
        justification: spec.justification.to_string(),
        actor_id: spec.actor_id,
        related_request_id: spec.related_request_id,
        created_at,
    })
}

/// Row for ledger queries joined with the actor's display name
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    company_id: Uuid,
    material_id: Uuid,
    material_name: String,
    quantity_change: Decimal,
    resulting_stock: Decimal,
    movement_type: String,
    justification: String,
    actor_id: Uuid,
    related_request_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    actor_name: Option<String>,
}

impl MovementRow {
    fn into_model(self) -> AppResult<MovementWithActor> {
        let movement_type = MovementType::parse(&self.movement_type).ok_or_else(|| {
            AppError::Internal(format!("unknown movement type '{}'", self.movement_type))
        })?;
        Ok(MovementWithActor {
            movement: StockMovement {
                id: self.id,
                company_id: self.company_id,
                material_id: self.material_id,
                material_name: self.material_name,
                quantity_change: self.quantity_change,
                resulting_stock: self.resulting_stock,
                movement_type,
                justification: self.justification,
                actor_id: self.actor_id,
                related_request_id: self.related_request_id,
                created_at: self.created_at,
            },
            actor_name: self.actor_name,
        })
    }
}

/// Ledger entry with the actor's display name resolved for audit views
#[derive(Debug, Serialize)]
pub struct MovementWithActor {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub actor_name: Option<String>,
}

/// Input for a manual stock adjustment
#[derive(Debug, Deserialize)]
pub struct ManualEntryInput {
    pub quantity_change: Decimal,
    pub justification: String,
}

/// Stock ledger service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
    max_retries: u32,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            max_retries: DEFAULT_MAX_TX_RETRIES,
        }
    }

    pub fn with_max_retries(db: PgPool, max_retries: u32) -> Self {
        Self { db, max_retries }
    }

    /// Record a manual stock adjustment by a warehouse operator
    pub async fn manual_entry(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        material_id: Uuid,
        input: ManualEntryInput,
    ) -> AppResult<StockMovement> {
        if input.quantity_change.is_zero() {
            return Err(AppError::Validation {
                field: "quantity_change".to_string(),
                message: "Adjustment cannot be zero".to_string(),
                message_es: "El ajuste no puede ser cero".to_string(),
            });
        }
        if input.justification.trim().is_empty() {
            return Err(AppError::Validation {
                field: "justification".to_string(),
                message: "Justification is required".to_string(),
                message_es: "La justificación es obligatoria".to_string(),
            });
        }

        with_serializable_retry(self.max_retries, || {
            self.try_manual_entry(company_id, actor_id, material_id, &input)
        })
        .await
    }

    async fn try_manual_entry(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        material_id: Uuid,
        input: &ManualEntryInput,
    ) -> AppResult<StockMovement> {
        let mut tx = begin_serializable(&self.db).await?;

        let movement = apply_movement(
            &mut tx,
            company_id,
            MovementSpec {
                material_id,
                quantity_change: input.quantity_change,
                movement_type: MovementType::ManualEntry,
                justification: input.justification.trim(),
                actor_id,
                related_request_id: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            material_id = %material_id,
            change = %movement.quantity_change,
            resulting = %movement.resulting_stock,
            "manual stock entry recorded"
        );

        Ok(movement)
    }

    /// List ledger entries for one material, newest first
    pub async fn get_material_movements(
        &self,
        company_id: Uuid,
        material_id: Uuid,
    ) -> AppResult<Vec<MovementWithActor>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1 AND company_id = $2)",
        )
        .bind(material_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Material".to_string()));
        }

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT sm.id, sm.company_id, sm.material_id, sm.material_name,
                   sm.quantity_change, sm.resulting_stock, sm.movement_type,
                   sm.justification, sm.actor_id, sm.related_request_id, sm.created_at,
                   u.display_name AS actor_name
            FROM stock_movements sm
            LEFT JOIN users u ON u.id = sm.actor_id
            WHERE sm.material_id = $1 AND sm.company_id = $2
            ORDER BY sm.created_at DESC
            "#,
        )
        .bind(material_id)
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MovementRow::into_model).collect()
    }

    /// List ledger entries for a company, newest first, paginated
    pub async fn list_movements(
        &self,
        company_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<Vec<MovementWithActor>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT sm.id, sm.company_id, sm.material_id, sm.material_name,
                   sm.quantity_change, sm.resulting_stock, sm.movement_type,
                   sm.justification, sm.actor_id, sm.related_request_id, sm.created_at,
                   u.display_name AS actor_name
            FROM stock_movements sm
            LEFT JOIN users u ON u.id = sm.actor_id
            WHERE sm.company_id = $1
            ORDER BY sm.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(company_id)
        .bind(i64::from(pagination.per_page))
        .bind(i64::from(pagination.offset()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MovementRow::into_model).collect()
    }
}
