//! Time-tracking ledger: six single-timestamp events per job and the drive,
//! wrench, and on-site minute derivations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::common::AppError;

/// One row per job. Timestamps are weakly monotonic in field order.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct JobTimeTracking {
    pub job_id: Uuid,
    pub company_id: Uuid,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub departed_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub work_started_at: Option<DateTime<Utc>>,
    pub work_ended_at: Option<DateTime<Utc>>,
    pub departed_job_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// The six recordable events, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    Dispatched,
    Departed,
    Arrived,
    WorkStarted,
    WorkEnded,
    DepartedJob,
}

impl TrackingEvent {
    /// Parse the URL path segment used by the PATCH routes.
    pub fn from_path(s: &str) -> Option<Self> {
        match s {
            "dispatched" => Some(Self::Dispatched),
            "departed" => Some(Self::Departed),
            "arrived" => Some(Self::Arrived),
            "work-started" => Some(Self::WorkStarted),
            "work-ended" => Some(Self::WorkEnded),
            "departed-job" => Some(Self::DepartedJob),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Dispatched => "dispatched_at",
            Self::Departed => "departed_at",
            Self::Arrived => "arrived_at",
            Self::WorkStarted => "work_started_at",
            Self::WorkEnded => "work_ended_at",
            Self::DepartedJob => "departed_job_at",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Dispatched => 0,
            Self::Departed => 1,
            Self::Arrived => 2,
            Self::WorkStarted => 3,
            Self::WorkEnded => 4,
            Self::DepartedJob => 5,
        }
    }

    /// Whether recording this event should resync derived minutes onto the
    /// completion row.
    fn triggers_derivation(&self) -> bool {
        matches!(self, Self::WorkEnded | Self::DepartedJob)
    }
}

/// Derived minute metrics. A metric is `None` until both of its endpoints
/// are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedMinutes {
    pub drive: Option<i32>,
    pub wrench: Option<i32>,
    pub on_site: Option<i32>,
}

/// Whole minutes between two timestamps, clamped at zero so rows written
/// before monotonicity enforcement cannot go negative.
fn minutes_between(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<i32> {
    let (from, to) = (from?, to?);
    Some(((to - from).num_seconds().max(0) / 60) as i32)
}

impl JobTimeTracking {
    fn fields_in_order(&self) -> [Option<DateTime<Utc>>; 6] {
        [
            self.dispatched_at,
            self.departed_at,
            self.arrived_at,
            self.work_started_at,
            self.work_ended_at,
            self.departed_job_at,
        ]
    }

    pub fn derived(&self) -> DerivedMinutes {
        DerivedMinutes {
            drive: minutes_between(self.departed_at, self.arrived_at),
            wrench: minutes_between(self.work_started_at, self.work_ended_at),
            on_site: minutes_between(self.arrived_at, self.departed_job_at),
        }
    }

    /// Reject a write that would break monotonicity: an event may not be
    /// recorded while any later-ordered field is already set. Re-recording
    /// the same event is allowed and simply moves it to now.
    fn check_order(&self, event: TrackingEvent) -> Result<(), AppError> {
        let fields = self.fields_in_order();
        for (i, field) in fields.iter().enumerate() {
            if i > event.index() && field.is_some() {
                return Err(AppError::conflict(format!(
                    "cannot record {} after a later event has been recorded",
                    event.column()
                )));
            }
        }
        Ok(())
    }

    pub async fn find_by_job(job_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM job_time_tracking WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Ensure the job has a tracking row, creating an empty one on first use.
    pub async fn ensure_in_tx(
        job_id: Uuid,
        company_id: Uuid,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO job_time_tracking (job_id, company_id)
             VALUES ($1, $2)
             ON CONFLICT (job_id) DO UPDATE SET updated_at = job_time_tracking.updated_at
             RETURNING *",
        )
        .bind(job_id)
        .bind(company_id)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }

    /// Record one event at `now()`, enforcing field order, and resync the
    /// completion row when a derivation endpoint landed.
    pub async fn record(
        job_id: Uuid,
        company_id: Uuid,
        event: TrackingEvent,
        pool: &PgPool,
    ) -> Result<Self, AppError> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        let row = sqlx::query_as::<_, Self>(
            "SELECT * FROM job_time_tracking WHERE job_id = $1 FOR UPDATE",
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let row = match row {
            Some(row) => row,
            None => Self::ensure_in_tx(job_id, company_id, &mut tx).await?,
        };

        row.check_order(event)?;

        // Column names come from a closed enum, never from input.
        let sql = format!(
            "UPDATE job_time_tracking SET {} = NOW(), updated_at = NOW()
             WHERE job_id = $1
             RETURNING *",
            event.column()
        );
        let updated = sqlx::query_as::<_, Self>(&sql)
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        if event.triggers_derivation() {
            updated.sync_completion_in_tx(&mut tx).await?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    /// Upsert derived minutes onto the completion row. COALESCE keeps any
    /// value already present; a derivation never nulls out a completion
    /// field.
    pub async fn sync_completion_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), AppError> {
        let derived = self.derived();
        if derived.drive.is_none() && derived.wrench.is_none() && derived.on_site.is_none() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO job_completions (
                job_id, company_id, drive_time_minutes, wrench_time_minutes, on_site_minutes
             )
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (job_id) DO UPDATE SET
                drive_time_minutes =
                    COALESCE(job_completions.drive_time_minutes, EXCLUDED.drive_time_minutes),
                wrench_time_minutes =
                    COALESCE(job_completions.wrench_time_minutes, EXCLUDED.wrench_time_minutes),
                on_site_minutes =
                    COALESCE(job_completions.on_site_minutes, EXCLUDED.on_site_minutes)",
        )
        .bind(self.job_id)
        .bind(self.company_id)
        .bind(derived.drive)
        .bind(derived.wrench)
        .bind(derived.on_site)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn blank(job_id: Uuid) -> JobTimeTracking {
        JobTimeTracking {
            job_id,
            company_id: Uuid::new_v4(),
            dispatched_at: None,
            departed_at: None,
            arrived_at: None,
            work_started_at: None,
            work_ended_at: None,
            departed_job_at: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_path_parsing() {
        assert_eq!(
            TrackingEvent::from_path("work-started"),
            Some(TrackingEvent::WorkStarted)
        );
        assert_eq!(
            TrackingEvent::from_path("departed-job"),
            Some(TrackingEvent::DepartedJob)
        );
        assert_eq!(TrackingEvent::from_path("teleported"), None);
    }

    #[test]
    fn test_derived_minutes_need_both_endpoints() {
        let mut row = blank(Uuid::new_v4());
        let t0 = Utc::now();

        row.departed_at = Some(t0);
        assert_eq!(row.derived().drive, None);

        row.arrived_at = Some(t0 + Duration::minutes(23));
        assert_eq!(row.derived().drive, Some(23));
        assert_eq!(row.derived().wrench, None);
        assert_eq!(row.derived().on_site, None);
    }

    #[test]
    fn test_derived_minutes_floor() {
        let mut row = blank(Uuid::new_v4());
        let t0 = Utc::now();
        row.work_started_at = Some(t0);
        row.work_ended_at = Some(t0 + Duration::seconds(119));
        assert_eq!(row.derived().wrench, Some(1));
    }

    #[test]
    fn test_derived_minutes_clamp_at_zero() {
        // Historical out-of-order data must not yield negative minutes.
        let mut row = blank(Uuid::new_v4());
        let t0 = Utc::now();
        row.departed_at = Some(t0);
        row.arrived_at = Some(t0 - Duration::minutes(10));
        assert_eq!(row.derived().drive, Some(0));
    }

    #[test]
    fn test_out_of_order_write_rejected() {
        let mut row = blank(Uuid::new_v4());
        row.arrived_at = Some(Utc::now());

        // Departed cannot be recorded once arrived is set.
        let err = row.check_order(TrackingEvent::Departed).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_re_recording_latest_event_is_allowed() {
        let mut row = blank(Uuid::new_v4());
        row.dispatched_at = Some(Utc::now());
        row.departed_at = Some(Utc::now());

        // Re-setting the most recent field is idempotent-safe.
        assert!(row.check_order(TrackingEvent::Departed).is_ok());
        // And the next event in order is fine.
        assert!(row.check_order(TrackingEvent::Arrived).is_ok());
    }
}
