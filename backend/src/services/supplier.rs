//! Supplier catalog service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::Supplier;
use shared::validation::validate_required_text;

use crate::error::{AppError, AppResult};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    contact: Option<String>,
    created_at: DateTime<Utc>,
}

impl SupplierRow {
    fn into_model(self) -> Supplier {
        Supplier {
            id: self.id,
            company_id: self.company_id,
            name: self.name,
            contact: self.contact,
            created_at: self.created_at,
        }
    }
}

/// Input for creating a supplier
#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub contact: Option<String>,
}

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a supplier
    pub async fn create_supplier(
        &self,
        company_id: Uuid,
        input: CreateSupplierInput,
    ) -> AppResult<Supplier> {
        if validate_required_text(&input.name).is_err() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Supplier name cannot be blank".to_string(),
                message_es: "El nombre del proveedor no puede estar vacío".to_string(),
            });
        }

        let row = sqlx::query_as::<_, SupplierRow>(
            r#"
            INSERT INTO suppliers (company_id, name, contact)
            VALUES ($1, $2, $3)
            RETURNING id, company_id, name, contact, created_at
            "#,
        )
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.contact)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into_model())
    }

    /// List all suppliers for a company
    pub async fn list_suppliers(&self, company_id: Uuid) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, company_id, name, contact, created_at FROM suppliers WHERE company_id = $1 ORDER BY name ASC",
        )
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SupplierRow::into_model).collect())
    }

    /// Check that a supplier exists within the company scope
    pub async fn ensure_exists(&self, company_id: Uuid, supplier_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1 AND company_id = $2)",
        )
        .bind(supplier_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        Ok(())
    }
}
