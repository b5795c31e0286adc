//! Material catalog service
//!
//! Materials carry the current quantity on hand. Creation may seed stock,
//! which is written through the ledger primitive as an `initial` entry so
//! the audit trail starts at the material's first unit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{Material, MovementType};
use shared::validation::validate_required_text;

use crate::error::{AppError, AppResult};
use crate::services::stock::{apply_movement, MovementSpec};

/// Material service for the warehouse catalog
#[derive(Clone)]
pub struct MaterialService {
    db: PgPool,
}

/// Row mapping for materials
#[derive(Debug, FromRow)]
pub(crate) struct MaterialRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub stock: Decimal,
    pub preferred_supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaterialRow {
    pub(crate) fn into_model(self) -> Material {
        Material {
            id: self.id,
            company_id: self.company_id,
            name: self.name,
            unit: self.unit,
            category: self.category,
            stock: self.stock,
            preferred_supplier_id: self.preferred_supplier_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub(crate) const MATERIAL_COLUMNS: &str =
    "id, company_id, name, unit, category, stock, preferred_supplier_id, created_at, updated_at";

/// Input for creating a material
#[derive(Debug, Deserialize)]
pub struct CreateMaterialInput {
    pub name: String,
    pub unit: String,
    pub category: String,
    pub preferred_supplier_id: Option<Uuid>,
    /// Starting quantity on hand; ledgered as an `initial` movement
    pub initial_stock: Option<Decimal>,
}

impl MaterialService {
    /// Create a new MaterialService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a material, optionally seeding its stock
    pub async fn create_material(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        input: CreateMaterialInput,
    ) -> AppResult<Material> {
        for (field, value) in [
            ("name", &input.name),
            ("unit", &input.unit),
            ("category", &input.category),
        ] {
            if validate_required_text(value).is_err() {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: format!("Material {} cannot be blank", field),
                    message_es: format!("El campo {} no puede estar vacío", field),
                });
            }
        }

        if let Some(initial) = input.initial_stock {
            if initial < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "initial_stock".to_string(),
                    message: "Initial stock cannot be negative".to_string(),
                    message_es: "El stock inicial no puede ser negativo".to_string(),
                });
            }
        }

        let name = input.name.trim().to_string();

        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM materials WHERE company_id = $1 AND LOWER(name) = LOWER($2)",
        )
        .bind(company_id)
        .bind(&name)
        .fetch_one(&self.db)
        .await?;

        if duplicate > 0 {
            return Err(AppError::Conflict {
                resource: "material".to_string(),
                message: "Material with this name already exists".to_string(),
                message_es: "Ya existe un material con este nombre".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, MaterialRow>(&format!(
            r#"
            INSERT INTO materials (company_id, name, unit, category, stock, preferred_supplier_id)
            VALUES ($1, $2, $3, $4, 0, $5)
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(company_id)
        .bind(&name)
        .bind(input.unit.trim())
        .bind(input.category.trim())
        .bind(input.preferred_supplier_id)
        .fetch_one(&mut *tx)
        .await?;

        let material_id = row.id;

        if let Some(initial) = input.initial_stock {
            if initial > Decimal::ZERO {
                apply_movement(
                    &mut tx,
                    company_id,
                    MovementSpec {
                        material_id,
                        quantity_change: initial,
                        movement_type: MovementType::Initial,
                        justification: "Initial stock at material creation",
                        actor_id,
                        related_request_id: None,
                    },
                )
                .await?;
            }
        }

        tx.commit().await?;

        // Re-read so the returned stock reflects the seeded quantity
        self.get_material(company_id, material_id).await
    }

    /// Get a material by ID
    pub async fn get_material(&self, company_id: Uuid, material_id: Uuid) -> AppResult<Material> {
        let row = sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {} FROM materials WHERE id = $1 AND company_id = $2",
            MATERIAL_COLUMNS
        ))
        .bind(material_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        Ok(row.into_model())
    }

    /// List all materials for a company
    pub async fn list_materials(&self, company_id: Uuid) -> AppResult<Vec<Material>> {
        let rows = sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {} FROM materials WHERE company_id = $1 ORDER BY name ASC",
            MATERIAL_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(MaterialRow::into_model).collect())
    }
}
