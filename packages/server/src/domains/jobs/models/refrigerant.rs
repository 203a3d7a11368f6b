use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::AppError;

/// EPA 608 refrigerant ledger entry. Append-only; corrections reference the
/// original row instead of editing it.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RefrigerantLog {
    pub id: Uuid,
    pub company_id: Uuid,
    pub job_id: Uuid,
    pub equipment_id: Option<Uuid>,
    pub technician_id: Uuid,
    pub refrigerant_type: String,
    pub added_oz: Decimal,
    pub recovered_oz: Decimal,
    pub corrects_log_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RefrigerantLog {
    pub async fn append(&self, pool: &PgPool) -> Result<Self, AppError> {
        // A correction must point at an entry on the same job.
        if let Some(corrects) = self.corrects_log_id {
            let original = sqlx::query_as::<_, Self>(
                "SELECT * FROM refrigerant_logs WHERE id = $1 AND job_id = $2",
            )
            .bind(corrects)
            .bind(self.job_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

            if original.is_none() {
                return Err(AppError::validation_field(
                    "correctsLogId",
                    "must reference an entry on the same job",
                ));
            }
        }

        sqlx::query_as::<_, Self>(
            "INSERT INTO refrigerant_logs (
                id, company_id, job_id, equipment_id, technician_id,
                refrigerant_type, added_oz, recovered_oz, corrects_log_id, notes
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.job_id)
        .bind(self.equipment_id)
        .bind(self.technician_id)
        .bind(&self.refrigerant_type)
        .bind(self.added_oz)
        .bind(self.recovered_oz)
        .bind(self.corrects_log_id)
        .bind(&self.notes)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_for_job(job_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM refrigerant_logs WHERE job_id = $1 ORDER BY created_at",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
