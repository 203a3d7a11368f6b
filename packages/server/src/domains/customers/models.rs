use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "geocoding_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GeocodingStatus {
    Pending,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "equipment_condition", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCondition {
    Excellent,
    Good,
    Fair,
    Poor,
    Unknown,
}

/// Customer - SQL persistence layer
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocoding_status: GeocodingStatus,
    pub geocoding_attempts: i32,
    pub no_show_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub async fn find_by_id(id: Uuid, company_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM customers WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM customers WHERE company_id = $1 AND is_active = TRUE ORDER BY name",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO customers (
                id, company_id, name, phone, email, address, city, state, zip
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(&self.name)
        .bind(&self.phone)
        .bind(&self.email)
        .bind(&self.address)
        .bind(&self.city)
        .bind(&self.state)
        .bind(&self.zip)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Update contact fields that do not touch the address.
    pub async fn update_contact(
        id: Uuid,
        company_id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE customers SET
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email)
             WHERE id = $1 AND company_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(company_id)
        .bind(name)
        .bind(phone)
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Change the service address. The same statement clears coordinates and
    /// resets geocoding so a stale lat/lng is never visible with the new
    /// address.
    pub async fn update_address(
        id: Uuid,
        company_id: Uuid,
        address: &str,
        city: Option<&str>,
        state: Option<&str>,
        zip: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE customers SET
                address = $3,
                city = COALESCE($4, city),
                state = COALESCE($5, state),
                zip = COALESCE($6, zip),
                latitude = NULL,
                longitude = NULL,
                geocoding_status = 'pending',
                geocoding_attempts = 0
             WHERE id = $1 AND company_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(company_id)
        .bind(address)
        .bind(city)
        .bind(state)
        .bind(zip)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn increment_no_show(id: Uuid, company_id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE customers SET no_show_count = no_show_count + 1
             WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(company_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Additional service address for one customer.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct CustomerLocation {
    pub id: Uuid,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub label: Option<String>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocoding_status: GeocodingStatus,
    pub geocoding_attempts: i32,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

impl CustomerLocation {
    pub async fn list_for_customer(customer_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM customer_locations WHERE customer_id = $1 ORDER BY created_at",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Insert a location. When `is_primary` is requested, existing primaries
    /// for the customer are demoted in the same transaction, keeping at most
    /// one primary at rest.
    pub async fn insert(&self, pool: &PgPool) -> Result<Self, AppError> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        if self.is_primary {
            sqlx::query(
                "UPDATE customer_locations SET is_primary = FALSE
                 WHERE customer_id = $1 AND is_primary = TRUE",
            )
            .bind(self.customer_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        }

        let inserted = sqlx::query_as::<_, Self>(
            "INSERT INTO customer_locations (
                id, company_id, customer_id, label, address, city, state, zip, is_primary
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.customer_id)
        .bind(&self.label)
        .bind(&self.address)
        .bind(&self.city)
        .bind(&self.state)
        .bind(&self.zip)
        .bind(self.is_primary)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(inserted)
    }

    /// Promote a location to primary, demoting any current primary.
    pub async fn set_primary(
        id: Uuid,
        customer_id: Uuid,
        pool: &PgPool,
    ) -> Result<Option<Self>, AppError> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        sqlx::query(
            "UPDATE customer_locations SET is_primary = FALSE
             WHERE customer_id = $1 AND is_primary = TRUE",
        )
        .bind(customer_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, Self>(
            "UPDATE customer_locations SET is_primary = TRUE
             WHERE id = $1 AND customer_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }
}

/// Installed hardware at a customer site.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Equipment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub location_id: Option<Uuid>,
    pub name: String,
    pub equipment_type: Option<String>,
    pub install_date: Option<NaiveDate>,
    pub condition: EquipmentCondition,
    pub refrigerant_type: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Equipment {
    pub async fn list_for_customer(customer_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM equipment
             WHERE customer_id = $1 AND is_active = TRUE
             ORDER BY created_at",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO equipment (
                id, company_id, customer_id, location_id, name, equipment_type,
                install_date, condition, refrigerant_type
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.customer_id)
        .bind(self.location_id)
        .bind(&self.name)
        .bind(&self.equipment_type)
        .bind(self.install_date)
        .bind(self.condition)
        .bind(&self.refrigerant_type)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
