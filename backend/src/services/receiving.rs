//! Receiving service
//!
//! Closes the procurement loop: an ordered request is marked received and
//! the delivered quantity lands in the stock ledger, atomically. A short
//! delivery splits the request so the received portion is ledgered while
//! the shortfall re-enters the approved pool for re-purchase.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::allocation::{plan_receipt, ReceiptPlan};
use shared::models::{Material, MovementType, PurchaseRequest, StockMovement};
use shared::validation::validate_positive_quantity;

use crate::error::{AppError, AppResult};
use crate::services::material::{MaterialRow, MATERIAL_COLUMNS};
use crate::services::purchase_request::{lock_request, PurchaseRequestRow, REQUEST_COLUMNS};
use crate::services::stock::{
    apply_movement, begin_serializable, with_serializable_retry, MovementSpec,
    DEFAULT_MAX_TX_RETRIES,
};

/// Input for receiving a delivery against an ordered request
#[derive(Debug, Deserialize)]
pub struct ReceiveInput {
    pub received_quantity: Decimal,
    /// Warehouse material the delivery lands on. When absent the material
    /// is resolved by name, creating a catalog entry if none matches.
    pub target_material_id: Option<Uuid>,
}

/// Everything a receipt changed, returned to the caller in one piece
#[derive(Debug, Serialize)]
pub struct ReceiveOutcome {
    pub received_request: PurchaseRequest,
    /// Present only when the delivery fell short and the shortfall was
    /// split off into this re-approved request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remainder_request: Option<PurchaseRequest>,
    pub movement: StockMovement,
    pub material: Material,
    pub material_created: bool,
}

/// Receiving service
#[derive(Clone)]
pub struct ReceivingService {
    db: PgPool,
    max_retries: u32,
}

impl ReceivingService {
    /// Create a new ReceivingService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            max_retries: DEFAULT_MAX_TX_RETRIES,
        }
    }

    pub fn with_max_retries(db: PgPool, max_retries: u32) -> Self {
        Self { db, max_retries }
    }

    /// Receive a delivery against an ordered request
    ///
    /// The request update, any split, the material stock update and the
    /// ledger entry commit together or not at all.
    pub async fn receive(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        request_id: Uuid,
        input: ReceiveInput,
    ) -> AppResult<ReceiveOutcome> {
        if validate_positive_quantity(input.received_quantity).is_err() {
            return Err(AppError::Validation {
                field: "received_quantity".to_string(),
                message: "Received quantity must be greater than zero".to_string(),
                message_es: "La cantidad recibida debe ser mayor que cero".to_string(),
            });
        }

        with_serializable_retry(self.max_retries, || {
            self.try_receive(company_id, actor_id, request_id, &input)
        })
        .await
    }

    async fn try_receive(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        request_id: Uuid,
        input: &ReceiveInput,
    ) -> AppResult<ReceiveOutcome> {
        let mut tx = begin_serializable(&self.db).await?;

        let request = lock_request(&mut tx, company_id, request_id).await?;
        if request.status != "ordered" {
            return Err(AppError::InvalidStateTransition(format!(
                "request {} is '{}', only ordered requests can be received",
                request_id, request.status
            )));
        }

        let (material, material_created) = Self::resolve_material(
            &mut tx,
            company_id,
            input.target_material_id,
            &request,
        )
        .await?;

        let plan = plan_receipt(request.quantity, input.received_quantity);

        let (received_row, remainder_row, ledger_request_id) = match plan {
            ReceiptPlan::Full { final_quantity } => {
                // A received request leaves its lot and order behind;
                // lot_id is only ever set while batched or ordered.
                let updated = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
                    r#"
                    UPDATE purchase_requests
                    SET status = 'received',
                        original_quantity = CASE
                            WHEN quantity <> $1 THEN COALESCE(original_quantity, quantity)
                            ELSE original_quantity
                        END,
                        quantity = $1,
                        lot_id = NULL,
                        purchase_order_id = NULL,
                        received_at = NOW(),
                        updated_at = NOW()
                    WHERE id = $2
                    RETURNING {}
                    "#,
                    REQUEST_COLUMNS
                ))
                .bind(final_quantity)
                .bind(request.id)
                .fetch_one(&mut *tx)
                .await?;

                let request_id = updated.id;
                (updated, None, request_id)
            }
            ReceiptPlan::Partial {
                received,
                remainder,
            } => {
                // The sibling carries the received portion with no lot or
                // order reference (those belong to {batched, ordered}
                // rows only); `derived_from` keeps the paper trail back
                // to the ordered request. The original keeps the
                // shortfall and re-enters the approved pool.
                let sibling = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
                    r#"
                    INSERT INTO purchase_requests (
                        company_id, material_name, quantity, original_quantity, unit,
                        category, justification, area, requester_id, status, notes,
                        approver_id, approved_at, received_at, derived_from
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'received', $10,
                            $11, $12, NOW(), $13)
                    RETURNING {}
                    "#,
                    REQUEST_COLUMNS
                ))
                .bind(company_id)
                .bind(&request.material_name)
                .bind(received)
                .bind(request.quantity)
                .bind(&request.unit)
                .bind(&request.category)
                .bind(&request.justification)
                .bind(&request.area)
                .bind(request.requester_id)
                .bind(&request.notes)
                .bind(request.approver_id)
                .bind(request.approved_at)
                .bind(request.id)
                .fetch_one(&mut *tx)
                .await?;

                let original = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
                    r#"
                    UPDATE purchase_requests
                    SET status = 'approved',
                        quantity = $1,
                        original_quantity = COALESCE(original_quantity, quantity),
                        lot_id = NULL,
                        purchase_order_id = NULL,
                        updated_at = NOW()
                    WHERE id = $2
                    RETURNING {}
                    "#,
                    REQUEST_COLUMNS
                ))
                .bind(remainder)
                .bind(request.id)
                .fetch_one(&mut *tx)
                .await?;

                let sibling_id = sibling.id;
                (sibling, Some(original), sibling_id)
            }
        };

        let justification = format!("Delivery received for purchase request {}", request_id);
        let movement = apply_movement(
            &mut tx,
            company_id,
            MovementSpec {
                material_id: material.id,
                quantity_change: input.received_quantity,
                movement_type: MovementType::Receiving,
                justification: &justification,
                actor_id,
                related_request_id: Some(ledger_request_id),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %request_id,
            material_id = %material.id,
            received = %input.received_quantity,
            partial = remainder_row.is_some(),
            "delivery received"
        );

        let material = Material {
            stock: movement.resulting_stock,
            ..material
        };

        Ok(ReceiveOutcome {
            received_request: received_row.into_model()?,
            remainder_request: remainder_row
                .map(PurchaseRequestRow::into_model)
                .transpose()?,
            movement,
            material,
            material_created,
        })
    }

    /// Find the warehouse material a delivery lands on
    ///
    /// Resolution order: explicit id, then a case-insensitive name match,
    /// then a fresh catalog entry seeded from the request's fields.
    async fn resolve_material(
        tx: &mut Transaction<'static, Postgres>,
        company_id: Uuid,
        target_material_id: Option<Uuid>,
        request: &PurchaseRequestRow,
    ) -> AppResult<(Material, bool)> {
        if let Some(material_id) = target_material_id {
            let row = sqlx::query_as::<_, MaterialRow>(&format!(
                "SELECT {} FROM materials WHERE id = $1 AND company_id = $2",
                MATERIAL_COLUMNS
            ))
            .bind(material_id)
            .bind(company_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Material".to_string()))?;
            return Ok((row.into_model(), false));
        }

        let by_name = sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {} FROM materials WHERE company_id = $1 AND LOWER(name) = LOWER($2)",
            MATERIAL_COLUMNS
        ))
        .bind(company_id)
        .bind(&request.material_name)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(row) = by_name {
            return Ok((row.into_model(), false));
        }

        let created = sqlx::query_as::<_, MaterialRow>(&format!(
            r#"
            INSERT INTO materials (company_id, name, unit, category, stock)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(company_id)
        .bind(&request.material_name)
        .bind(&request.unit)
        .bind(&request.category)
        .fetch_one(&mut **tx)
        .await?;

        tracing::info!(
            material = %request.material_name,
            "material created on first receipt"
        );

        Ok((created.into_model(), true))
    }
}
