//! Purchase order service
//!
//! Converts a lot into a supplier-facing document: first a non-binding
//! quote request, then a binding issued order carrying the official order
//! number and negotiated prices. Cancellation reverts every member
//! request back into its lot in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::allocation::{aggregate_order_items, distribute_quantity, RequestLine};
use shared::models::{LotStatus, OrderItem, OrderStatus, PurchaseOrder};
use shared::validation::{validate_order_number, validate_priced_item};

use crate::error::{AppError, AppResult};
use crate::services::lot::{LotRow, LOT_COLUMNS};
use crate::services::purchase_request::{PurchaseRequestRow, REQUEST_COLUMNS};
use crate::services::supplier::SupplierService;

/// Columns selected for every order read
const ORDER_COLUMNS: &str = "id, company_id, lot_id, supplier_id, items, total_amount, \
     status, official_order_number, request_ids, created_by, created_at";

/// Row mapping for purchase orders
#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    company_id: Uuid,
    lot_id: Uuid,
    supplier_id: Uuid,
    items: serde_json::Value,
    total_amount: Decimal,
    status: String,
    official_order_number: Option<String>,
    request_ids: Vec<Uuid>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn parsed_status(&self) -> AppResult<OrderStatus> {
        OrderStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(format!("unknown order status '{}'", self.status)))
    }

    fn into_model(self) -> AppResult<PurchaseOrder> {
        let status = self.parsed_status()?;
        let items: Vec<OrderItem> = serde_json::from_value(self.items)
            .map_err(|e| AppError::Internal(format!("malformed order items: {}", e)))?;
        Ok(PurchaseOrder {
            id: self.id,
            company_id: self.company_id,
            lot_id: self.lot_id,
            supplier_id: self.supplier_id,
            items,
            total_amount: self.total_amount,
            status,
            official_order_number: self.official_order_number,
            request_ids: self.request_ids,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

/// Input for generating a quote request against a lot
#[derive(Debug, Deserialize)]
pub struct GenerateQuoteInput {
    pub lot_id: Uuid,
    pub supplier_id: Uuid,
}

/// One priced line of an issued order
#[derive(Debug, Clone, Deserialize)]
pub struct PricedItemInput {
    pub material_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Input for issuing a binding order against a lot
#[derive(Debug, Deserialize)]
pub struct IssueOrderInput {
    pub lot_id: Uuid,
    pub official_order_number: String,
    pub priced_items: Vec<PricedItemInput>,
}

/// Purchase order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn lock_lot(
        tx: &mut Transaction<'static, Postgres>,
        company_id: Uuid,
        lot_id: Uuid,
    ) -> AppResult<LotRow> {
        sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM purchase_lots WHERE id = $1 AND company_id = $2 FOR UPDATE",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(company_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))
    }

    async fn lock_lot_members(
        tx: &mut Transaction<'static, Postgres>,
        company_id: Uuid,
        lot_id: Uuid,
    ) -> AppResult<Vec<PurchaseRequestRow>> {
        let members = sqlx::query_as::<_, PurchaseRequestRow>(&format!(
            "SELECT {} FROM purchase_requests \
             WHERE lot_id = $1 AND company_id = $2 AND status IN ('batched', 'ordered') \
             ORDER BY created_at ASC FOR UPDATE",
            REQUEST_COLUMNS
        ))
        .bind(lot_id)
        .bind(company_id)
        .fetch_all(&mut **tx)
        .await?;

        if members.is_empty() {
            return Err(AppError::PreconditionFailed(format!(
                "lot {} has no member requests to order",
                lot_id
            )));
        }
        Ok(members)
    }

    /// Generate a non-binding quote request for a lot's member requests
    ///
    /// Requests sharing a material name are consolidated into one line.
    /// Members move to `ordered` and the supplier is attached to the lot.
    pub async fn generate_quote(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        input: GenerateQuoteInput,
    ) -> AppResult<PurchaseOrder> {
        SupplierService::new(self.db.clone())
            .ensure_exists(company_id, input.supplier_id)
            .await?;

        let mut tx = self.db.begin().await?;

        let lot = Self::lock_lot(&mut tx, company_id, input.lot_id).await?;
        if lot.parsed_status()? != LotStatus::Open {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} is already ordered",
                input.lot_id
            )));
        }

        let members = Self::lock_lot_members(&mut tx, company_id, input.lot_id).await?;

        let lines: Vec<RequestLine> = members
            .iter()
            .map(|m| RequestLine {
                material_name: m.material_name.clone(),
                unit: m.unit.clone(),
                quantity: m.quantity,
            })
            .collect();
        let items = aggregate_order_items(&lines);
        let request_ids: Vec<Uuid> = members.iter().map(|m| m.id).collect();

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO purchase_orders (
                company_id, lot_id, supplier_id, items, total_amount, status,
                request_ids, created_by
            )
            VALUES ($1, $2, $3, $4, 0, 'generated', $5, $6)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(company_id)
        .bind(input.lot_id)
        .bind(input.supplier_id)
        .bind(serde_json::to_value(&items).map_err(|e| AppError::Internal(e.to_string()))?)
        .bind(&request_ids)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE purchase_requests SET status = 'ordered', updated_at = NOW() \
             WHERE id = ANY($1)",
        )
        .bind(&request_ids)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE purchase_lots SET supplier_id = $1 WHERE id = $2")
            .bind(input.supplier_id)
            .bind(input.lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            lot_id = %input.lot_id,
            supplier_id = %input.supplier_id,
            requests = request_ids.len(),
            "quote request generated"
        );

        order.into_model()
    }

    /// Issue a binding purchase order against a priced lot
    ///
    /// Requires the lot to already have a supplier (attached by the quote
    /// step). Finalized quantities from the priced lines are written back
    /// to the member requests; a line covering several requests is split
    /// proportionally so the sum matches the priced quantity exactly.
    pub async fn issue_order(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        input: IssueOrderInput,
    ) -> AppResult<PurchaseOrder> {
        if let Err(msg) = validate_order_number(input.official_order_number.trim()) {
            return Err(AppError::Validation {
                field: "official_order_number".to_string(),
                message: msg.to_string(),
                message_es: "Número de orden no válido".to_string(),
            });
        }
        if input.priced_items.is_empty() {
            return Err(AppError::ValidationError(
                "at least one priced item is required".to_string(),
            ));
        }
        for (idx, item) in input.priced_items.iter().enumerate() {
            if let Err(msg) = validate_priced_item(item.quantity, item.unit_price) {
                return Err(AppError::Validation {
                    field: format!("priced_items.{}", item.material_name),
                    message: msg.to_string(),
                    message_es: "Línea de precios no válida".to_string(),
                });
            }
            if input.priced_items[..idx]
                .iter()
                .any(|other| other.material_name == item.material_name)
            {
                return Err(AppError::ValidationError(format!(
                    "duplicate priced line for '{}'",
                    item.material_name
                )));
            }
        }

        let mut tx = self.db.begin().await?;

        let lot = Self::lock_lot(&mut tx, company_id, input.lot_id).await?;
        let supplier_id = lot.supplier_id.ok_or_else(|| {
            AppError::PreconditionFailed(format!(
                "lot {} has no supplier; generate a quote request first",
                input.lot_id
            ))
        })?;
        if lot.parsed_status()? != LotStatus::Open {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} already has an issued order",
                input.lot_id
            )));
        }

        let members = Self::lock_lot_members(&mut tx, company_id, input.lot_id).await?;

        // Every member must be covered by exactly one priced line.
        let mut items: Vec<OrderItem> = Vec::with_capacity(input.priced_items.len());
        let mut finalized: Vec<(Uuid, Decimal)> = Vec::with_capacity(members.len());
        let mut total_amount = Decimal::ZERO;

        for priced in &input.priced_items {
            let group: Vec<&PurchaseRequestRow> = members
                .iter()
                .filter(|m| m.material_name == priced.material_name)
                .collect();
            if group.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "priced item '{}' does not match any request in the lot",
                    priced.material_name
                )));
            }

            let current: Vec<Decimal> = group.iter().map(|m| m.quantity).collect();
            let distributed = distribute_quantity(&current, priced.quantity);
            for (member, quantity) in group.iter().zip(distributed) {
                // A priced quantity too small to give every member a
                // positive share cannot be stored; reject it up front
                // rather than aborting on the quantity constraint.
                if quantity <= Decimal::ZERO {
                    return Err(AppError::ValidationError(format!(
                        "priced quantity {} for '{}' is too small to distribute across {} requests",
                        priced.quantity,
                        priced.material_name,
                        group.len()
                    )));
                }
                finalized.push((member.id, quantity));
            }

            items.push(OrderItem {
                material_name: priced.material_name.clone(),
                unit: group[0].unit.clone(),
                quantity: priced.quantity,
                unit_price: Some(priced.unit_price),
            });
            total_amount += priced.quantity * priced.unit_price;
        }

        if finalized.len() != members.len() {
            let unpriced: Vec<String> = members
                .iter()
                .filter(|m| {
                    !input
                        .priced_items
                        .iter()
                        .any(|p| p.material_name == m.material_name)
                })
                .map(|m| m.material_name.clone())
                .collect();
            return Err(AppError::ValidationError(format!(
                "lot members without a priced line: {}",
                unpriced.join(", ")
            )));
        }

        let official_order_number = input.official_order_number.trim().to_string();
        let request_ids: Vec<Uuid> = members.iter().map(|m| m.id).collect();

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO purchase_orders (
                company_id, lot_id, supplier_id, items, total_amount, status,
                official_order_number, request_ids, created_by
            )
            VALUES ($1, $2, $3, $4, $5, 'issued', $6, $7, $8)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(company_id)
        .bind(input.lot_id)
        .bind(supplier_id)
        .bind(serde_json::to_value(&items).map_err(|e| AppError::Internal(e.to_string()))?)
        .bind(total_amount)
        .bind(&official_order_number)
        .bind(&request_ids)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        for (request_id, quantity) in &finalized {
            // The negotiated quantity may differ from what was requested;
            // the first deviation is preserved in original_quantity.
            sqlx::query(
                r#"
                UPDATE purchase_requests
                SET status = 'ordered',
                    purchase_order_id = $1,
                    original_quantity = CASE
                        WHEN quantity <> $2 THEN COALESCE(original_quantity, quantity)
                        ELSE original_quantity
                    END,
                    quantity = $2,
                    updated_at = NOW()
                WHERE id = $3
                "#,
            )
            .bind(order.id)
            .bind(quantity)
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE purchase_lots SET status = 'ordered' WHERE id = $1")
            .bind(input.lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            lot_id = %input.lot_id,
            order_number = %official_order_number,
            total = %total_amount,
            "purchase order issued"
        );

        order.into_model()
    }

    /// Cancel an order, reverting all member requests into their lot
    ///
    /// Either every referenced request reverts to `batched` and the order
    /// row disappears, or nothing happens. The lot returns to `open` and
    /// keeps its supplier link.
    pub async fn cancel_order(&self, company_id: Uuid, order_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1 AND company_id = $2 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        // A quote row kept as history after issuance no longer owns the
        // lot's members; reverting them through it would contradict the
        // still-binding issued order.
        if order.parsed_status()? == OrderStatus::Generated {
            let issued = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM purchase_orders WHERE lot_id = $1 AND status = 'issued'",
            )
            .bind(order.lot_id)
            .fetch_one(&mut *tx)
            .await?;

            if issued > 0 {
                return Err(AppError::PreconditionFailed(format!(
                    "order {} is a superseded quote; cancel the issued order for lot {} instead",
                    order_id, order.lot_id
                )));
            }
        }

        // Requests already received stay received; the physical goods are
        // in the warehouse and ledgered.
        sqlx::query(
            r#"
            UPDATE purchase_requests
            SET status = 'batched', purchase_order_id = NULL, updated_at = NOW()
            WHERE id = ANY($1) AND company_id = $2 AND status = 'ordered'
            "#,
        )
        .bind(&order.request_ids)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE purchase_lots SET status = 'open' WHERE id = $1")
            .bind(order.lot_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, lot_id = %order.lot_id, "purchase order cancelled");

        Ok(())
    }

    /// Get an order by ID
    pub async fn get_order(&self, company_id: Uuid, order_id: Uuid) -> AppResult<PurchaseOrder> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1 AND company_id = $2",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        row.into_model()
    }

    /// List orders for a company, newest first
    pub async fn list_orders(&self, company_id: Uuid) -> AppResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM purchase_orders WHERE company_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(OrderRow::into_model).collect()
    }
}
