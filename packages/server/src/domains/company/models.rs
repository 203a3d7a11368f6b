use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::AppError;

/// Company - tenant root
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub timezone: String,
    pub industry: Option<String>,
    pub sms_number: Option<String>,
    pub settings: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Company owning an inbound SMS destination number.
    pub async fn find_by_sms_number(number: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM companies WHERE sms_number = $1")
            .bind(number)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        name: &str,
        timezone: &str,
        industry: Option<&str>,
    ) -> Result<Self, AppError> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO companies (id, name, timezone, industry)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(timezone)
        .bind(industry)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)
    }

    /// The company's IANA timezone, falling back to UTC when the stored
    /// value no longer parses.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}
