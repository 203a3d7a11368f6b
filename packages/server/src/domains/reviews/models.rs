use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::customers::models::Customer;
use crate::domains::jobs::models::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewChannel {
    Sms,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Sent,
    Failed,
}

/// Hours to wait after close-out before asking for a review.
const REVIEW_DELAY_HOURS: i64 = 24;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ReviewRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub job_id: Uuid,
    pub customer_id: Uuid,
    pub channel: ReviewChannel,
    pub status: ReviewStatus,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReviewRequest {
    /// Queue a review request for a completed job. Channel preference: SMS
    /// when the customer has a phone, otherwise email; neither contact means
    /// no request. Re-scheduling the same job is a no-op.
    pub async fn schedule_for_job(
        job: &Job,
        customer: &Customer,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let channel = if customer.phone.is_some() {
            ReviewChannel::Sms
        } else if customer.email.is_some() {
            ReviewChannel::Email
        } else {
            return Ok(None);
        };

        let existing = sqlx::query_as::<_, Self>(
            "SELECT * FROM review_requests WHERE job_id = $1 LIMIT 1",
        )
        .bind(job.id)
        .fetch_optional(pool)
        .await?;
        if existing.is_some() {
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<_, Self>(
            "INSERT INTO review_requests (
                id, company_id, job_id, customer_id, channel, scheduled_for
             )
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(job.company_id)
        .bind(job.id)
        .bind(customer.id)
        .bind(channel)
        .bind(Utc::now() + Duration::hours(REVIEW_DELAY_HOURS))
        .fetch_one(pool)
        .await?;

        Ok(Some(inserted))
    }

    /// Due pending requests, claimed with a skip-lock so concurrent
    /// dispatchers never double-send.
    pub async fn claim_due(
        limit: i64,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM review_requests
             WHERE status = 'pending' AND scheduled_for <= NOW()
             ORDER BY scheduled_for
             LIMIT $1
             FOR UPDATE SKIP LOCKED",
        )
        .bind(limit)
        .fetch_all(&mut **tx)
        .await
        .map_err(Into::into)
    }

    /// Conditional status flip keyed on the pending state.
    pub async fn mark_in_tx(
        id: Uuid,
        status: ReviewStatus,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE review_requests
             SET status = $2, sent_at = CASE WHEN $2 = 'sent'::review_status THEN NOW() ELSE sent_at END
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(status)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_pending(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM review_requests
             WHERE company_id = $1 AND status = 'pending'
             ORDER BY scheduled_for",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
