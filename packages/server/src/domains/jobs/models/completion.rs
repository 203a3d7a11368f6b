use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Denormalized close-out record, one row per completed job.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct JobCompletion {
    pub job_id: Uuid,
    pub company_id: Uuid,
    pub drive_time_minutes: Option<i32>,
    pub wrench_time_minutes: Option<i32>,
    pub on_site_minutes: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub first_time_fix: Option<bool>,
    pub callback_required: Option<bool>,
    pub customer_rating: Option<i32>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Close-out fields supplied by the tech or dispatcher.
#[derive(Debug, Default, Clone)]
pub struct CloseoutFields {
    pub duration_minutes: Option<i32>,
    pub first_time_fix: Option<bool>,
    pub callback_required: Option<bool>,
    pub customer_rating: Option<i32>,
    pub notes: Option<String>,
}

impl JobCompletion {
    pub async fn find_by_job(job_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM job_completions WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Upsert the close-out fields. Supplied values win; fields the caller
    /// left out keep whatever the ledger has already written.
    pub async fn upsert_closeout_in_tx(
        job_id: Uuid,
        company_id: Uuid,
        fields: &CloseoutFields,
        completed_at: DateTime<Utc>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO job_completions (
                job_id, company_id, duration_minutes, first_time_fix,
                callback_required, customer_rating, notes, completed_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (job_id) DO UPDATE SET
                duration_minutes =
                    COALESCE(EXCLUDED.duration_minutes, job_completions.duration_minutes),
                first_time_fix =
                    COALESCE(EXCLUDED.first_time_fix, job_completions.first_time_fix),
                callback_required =
                    COALESCE(EXCLUDED.callback_required, job_completions.callback_required),
                customer_rating =
                    COALESCE(EXCLUDED.customer_rating, job_completions.customer_rating),
                notes = COALESCE(EXCLUDED.notes, job_completions.notes),
                completed_at = COALESCE(job_completions.completed_at, EXCLUDED.completed_at)
             RETURNING *",
        )
        .bind(job_id)
        .bind(company_id)
        .bind(fields.duration_minutes)
        .bind(fields.first_time_fix)
        .bind(fields.callback_required)
        .bind(fields.customer_rating)
        .bind(&fields.notes)
        .bind(completed_at)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }
}
