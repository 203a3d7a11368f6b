use anyhow::Result;
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::jobs::status::JobPriority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recurrence_frequency", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl RecurrenceFrequency {
    /// Advance a run time by one recurrence interval.
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Weekly => from + chrono::Duration::days(7),
            Self::Monthly => from.checked_add_months(Months::new(1)).unwrap_or(from),
            Self::Quarterly => from.checked_add_months(Months::new(3)).unwrap_or(from),
            Self::Annual => from.checked_add_months(Months::new(12)).unwrap_or(from),
        }
    }
}

/// Template for jobs materialized on a recurring cadence.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecurringJobSchedule {
    pub id: Uuid,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub job_type: String,
    pub description: Option<String>,
    pub priority: JobPriority,
    pub required_skills: Vec<String>,
    pub estimated_duration_minutes: Option<i32>,
    pub frequency: RecurrenceFrequency,
    pub advance_days: i32,
    pub next_run_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl RecurringJobSchedule {
    /// Schedules whose next run, minus their advance window, has arrived.
    pub async fn find_due(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM recurring_job_schedules
             WHERE is_active = TRUE
               AND next_run_at - make_interval(days => advance_days) <= NOW()
             ORDER BY next_run_at",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM recurring_job_schedules WHERE company_id = $1 ORDER BY next_run_at",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO recurring_job_schedules (
                id, company_id, customer_id, job_type, description, priority,
                required_skills, estimated_duration_minutes, frequency,
                advance_days, next_run_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.customer_id)
        .bind(&self.job_type)
        .bind(&self.description)
        .bind(self.priority)
        .bind(&self.required_skills)
        .bind(self.estimated_duration_minutes)
        .bind(self.frequency)
        .bind(self.advance_days)
        .bind(self.next_run_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Push `next_run_at` forward one interval, keyed on the value we read
    /// so a concurrent tick cannot double-advance.
    pub async fn advance_next_run(&self, pool: &PgPool) -> Result<bool> {
        let next = self.frequency.advance(self.next_run_at);
        let result = sqlx::query(
            "UPDATE recurring_job_schedules
             SET next_run_at = $2
             WHERE id = $1 AND next_run_at = $3",
        )
        .bind(self.id)
        .bind(next)
        .bind(self.next_run_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_weekly_advance() {
        let from = Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap();
        let next = RecurrenceFrequency::Weekly.advance(from);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_monthly_advance_handles_short_months() {
        let from = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
        let next = RecurrenceFrequency::Monthly.advance(from);
        // January 31 + 1 month clamps to the end of February.
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_quarterly_and_annual_advance() {
        let from = Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap();
        assert_eq!(
            RecurrenceFrequency::Quarterly.advance(from),
            Utc.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap()
        );
        assert_eq!(
            RecurrenceFrequency::Annual.advance(from),
            Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap()
        );
    }
}
