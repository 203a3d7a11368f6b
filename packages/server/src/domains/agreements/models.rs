use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "agreement_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Active,
    Expired,
    Cancelled,
}

/// Membership / maintenance agreement.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct MembershipAgreement {
    pub id: Uuid,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub plan_name: String,
    pub starts_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub visits_allowed: i32,
    pub visits_used: i32,
    pub auto_renew: bool,
    pub status: AgreementStatus,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MembershipAgreement {
    pub async fn list(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM membership_agreements WHERE company_id = $1 ORDER BY expires_on",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO membership_agreements (
                id, company_id, customer_id, plan_name, starts_on, expires_on,
                visits_allowed, auto_renew
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.customer_id)
        .bind(&self.plan_name)
        .bind(self.starts_on)
        .bind(self.expires_on)
        .bind(self.visits_allowed)
        .bind(self.auto_renew)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Active agreements expiring within the reminder window that have not
    /// been reminded yet.
    pub async fn find_expiring_unreminded(days: i32, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM membership_agreements
             WHERE status = 'active'
               AND reminder_sent_at IS NULL
               AND expires_on <= CURRENT_DATE + make_interval(days => $1)::interval",
        )
        .bind(days)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_reminded(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE membership_agreements SET reminder_sent_at = NOW()
             WHERE id = $1 AND reminder_sent_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Active agreements whose term has lapsed.
    pub async fn find_lapsed_active(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM membership_agreements
             WHERE status = 'active' AND expires_on < CURRENT_DATE",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Flip an active agreement to expired. Returns false when another tick
    /// got there first, making the renewal pass idempotent.
    pub async fn mark_expired_in_tx(id: Uuid, conn: &mut PgConnection) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE membership_agreements SET status = 'expired'
             WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Create the successor agreement for an auto-renewal: same plan and
    /// allowance, term shifted by the original term length, visits reset.
    pub async fn insert_renewal_in_tx(&self, conn: &mut PgConnection) -> Result<Self> {
        let term_days = (self.expires_on - self.starts_on).num_days().max(1);
        let new_start = self.expires_on;
        let new_end = self.expires_on + chrono::Duration::days(term_days);

        sqlx::query_as::<_, Self>(
            "INSERT INTO membership_agreements (
                id, company_id, customer_id, plan_name, starts_on, expires_on,
                visits_allowed, auto_renew
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(self.company_id)
        .bind(self.customer_id)
        .bind(&self.plan_name)
        .bind(new_start)
        .bind(new_end)
        .bind(self.visits_allowed)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }
}

/// Pending billing work created by an auto-renewal. Picked up by the billing
/// collaborator; never processed here.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RenewalBillingTrigger {
    pub id: Uuid,
    pub company_id: Uuid,
    pub agreement_id: Uuid,
    pub status: String,
    pub amount: Option<rust_decimal::Decimal>,
    pub created_at: DateTime<Utc>,
}

impl RenewalBillingTrigger {
    pub async fn insert_in_tx(
        company_id: Uuid,
        agreement_id: Uuid,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO renewal_billing_triggers (id, company_id, agreement_id)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(company_id)
        .bind(agreement_id)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }

    pub async fn list(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM renewal_billing_triggers
             WHERE company_id = $1
             ORDER BY created_at DESC",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
