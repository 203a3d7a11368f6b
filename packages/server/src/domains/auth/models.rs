use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::Role;

/// User account - SQL persistence layer
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (id, company_id, email, password_hash, name, phone, role, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(&self.email)
        .bind(&self.password_hash)
        .bind(&self.name)
        .bind(&self.phone)
        .bind(self.role)
        .bind(self.is_active)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Users of a company holding any of the given roles with a phone on
    /// file. Used by escalation steps to resolve notification targets.
    pub async fn find_notifiable_by_roles(
        company_id: Uuid,
        roles: &[String],
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM users
             WHERE company_id = $1
               AND role::text = ANY($2)
               AND phone IS NOT NULL
               AND is_active = TRUE
               AND deleted_at IS NULL",
        )
        .bind(company_id)
        .bind(roles)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

/// Email verification record required before self-serve registration.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct EmailVerification {
    pub id: Uuid,
    pub email: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EmailVerification {
    pub async fn find_verified(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM email_verifications
             WHERE email = $1 AND verified_at IS NOT NULL
             ORDER BY verified_at DESC
             LIMIT 1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}
