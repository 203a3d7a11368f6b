//! Recurring-schedule materializer: turns due schedules into unassigned
//! jobs and advances their next run.

use anyhow::Result;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::domains::customers::models::{Customer, GeocodingStatus};
use crate::domains::jobs::models::Job;
use crate::domains::jobs::status::JobStatus;
use crate::domains::schedules::RecurringJobSchedule;

#[derive(Debug, Default, Clone, Copy)]
pub struct MaterializerStats {
    pub created: usize,
    pub errors: usize,
}

/// One pass: at most one job per due schedule per tick. The schedule's
/// `next_run_at` is advanced with a compare-and-set first, so a concurrent
/// tick claiming the same schedule creates nothing.
pub async fn materialize_due_schedules(pool: &PgPool) -> Result<MaterializerStats> {
    let mut stats = MaterializerStats::default();

    for schedule in RecurringJobSchedule::find_due(pool).await? {
        match materialize_one(&schedule, pool).await {
            Ok(true) => stats.created += 1,
            Ok(false) => {}
            Err(e) => {
                stats.errors += 1;
                error!(schedule_id = %schedule.id, error = %e, "failed to materialize schedule");
            }
        }
    }

    if stats.created > 0 || stats.errors > 0 {
        info!(created = stats.created, errors = stats.errors, "recurring materializer pass complete");
    }
    Ok(stats)
}

async fn materialize_one(schedule: &RecurringJobSchedule, pool: &PgPool) -> Result<bool> {
    // Claim by advancing next_run_at; losing the race means another tick
    // already created this occurrence.
    if !schedule.advance_next_run(pool).await? {
        return Ok(false);
    }

    let address = Customer::find_by_id(schedule.customer_id, schedule.company_id, pool)
        .await?
        .and_then(|customer| customer.address);

    let job = Job {
        id: Uuid::now_v7(),
        company_id: schedule.company_id,
        customer_id: Some(schedule.customer_id),
        location_id: None,
        description: schedule.description.clone(),
        job_type: schedule.job_type.clone(),
        priority: schedule.priority,
        status: JobStatus::Unassigned,
        assigned_tech_id: None,
        address,
        latitude: None,
        longitude: None,
        geocoding_status: GeocodingStatus::Pending,
        geocoding_attempts: 0,
        scheduled_time: Some(schedule.next_run_at),
        started_at: None,
        completed_at: None,
        required_skills: schedule.required_skills.clone(),
        estimated_duration_minutes: schedule.estimated_duration_minutes,
        actual_duration_minutes: None,
        duration_variance_minutes: None,
        created_at: schedule.next_run_at,
        updated_at: schedule.next_run_at,
    };
    job.insert(pool).await?;

    Ok(true)
}
