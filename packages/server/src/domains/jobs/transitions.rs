//! Job lifecycle transitions and their tied side-effects.
//!
//! Each operation re-reads the job under a row lock, checks the transition
//! table, and applies every side-effect (tech counters, tracking row,
//! completion record, audit trail) inside one transaction, so observers see
//! the transition as atomic. Illegal transitions are Conflicts.

use chrono::Utc;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::common::AppError;
use crate::domains::employees::Employee;
use crate::domains::jobs::models::{
    AuditLog, CloseoutFields, Job, JobAssignmentLog, JobCompletion, JobReassignmentHistory,
    JobTimeTracking,
};
use crate::domains::jobs::status::JobStatus;

/// Context recorded alongside an assignment.
#[derive(Debug, Default, Clone)]
pub struct AssignmentMeta {
    pub score: Option<f64>,
    pub drive_time_minutes: Option<f64>,
    pub is_manual_override: bool,
    pub reason: Option<String>,
    pub assigned_by: Option<Uuid>,
}

async fn load_job_locked(
    job_id: Uuid,
    company_id: Uuid,
    conn: &mut PgConnection,
) -> Result<Job, AppError> {
    Job::find_for_update(job_id, company_id, conn)
        .await?
        .ok_or(AppError::NotFound("Job"))
}

async fn load_tech_locked(
    tech_id: Uuid,
    company_id: Uuid,
    conn: &mut PgConnection,
) -> Result<Employee, AppError> {
    sqlx::query_as::<_, Employee>(
        "SELECT * FROM employees WHERE id = $1 AND company_id = $2 FOR UPDATE",
    )
    .bind(tech_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await
    .map_err(AppError::Database)?
    .ok_or(AppError::NotFound("Technician"))
}

fn require_transition(from: JobStatus, to: JobStatus) -> Result<(), AppError> {
    if JobStatus::can_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::conflict(format!(
            "illegal status transition: {:?} -> {:?}",
            from, to
        )))
    }
}

/// Increment a tech's active-job counter and point them at the job.
async fn occupy_tech(tech_id: Uuid, job_id: Uuid, conn: &mut PgConnection) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE employees SET
            current_jobs_count = current_jobs_count + 1,
            current_job_id = $2
         WHERE id = $1",
    )
    .bind(tech_id)
    .bind(job_id)
    .execute(conn)
    .await
    .map_err(AppError::Database)?;
    Ok(())
}

/// Decrement a tech's counter (clamped at zero) and clear the job pointer.
async fn release_tech(
    tech_id: Uuid,
    job_id: Uuid,
    completed: bool,
    conn: &mut PgConnection,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE employees SET
            current_jobs_count = GREATEST(0, current_jobs_count - 1),
            current_job_id = CASE WHEN current_job_id = $2 THEN NULL ELSE current_job_id END,
            last_job_completed_at = CASE WHEN $3 THEN NOW() ELSE last_job_completed_at END
         WHERE id = $1",
    )
    .bind(tech_id)
    .bind(job_id)
    .bind(completed)
    .execute(conn)
    .await
    .map_err(AppError::Database)?;
    Ok(())
}

/// `unassigned -> assigned`: set the tech, bump their counter, create the
/// time-tracking row with `dispatched_at = now`, and log the assignment.
pub async fn assign_in_tx(
    conn: &mut PgConnection,
    job_id: Uuid,
    company_id: Uuid,
    tech_id: Uuid,
    meta: &AssignmentMeta,
) -> Result<Job, AppError> {
    let job = load_job_locked(job_id, company_id, conn).await?;
    require_transition(job.status, JobStatus::Assigned)?;
    if job.status != JobStatus::Unassigned {
        return Err(AppError::conflict("job is already assigned"));
    }

    let tech = load_tech_locked(tech_id, company_id, conn).await?;
    let cap = tech.max_concurrent_jobs.unwrap_or(1);
    if tech.current_jobs_count >= cap && !meta.is_manual_override {
        return Err(AppError::conflict(format!(
            "technician {} is at capacity ({}/{})",
            tech.name, tech.current_jobs_count, cap
        )));
    }

    let updated = sqlx::query_as::<_, Job>(
        "UPDATE jobs SET status = 'assigned', assigned_tech_id = $3, updated_at = NOW()
         WHERE id = $1 AND company_id = $2
         RETURNING *",
    )
    .bind(job_id)
    .bind(company_id)
    .bind(tech_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    occupy_tech(tech_id, job_id, conn).await?;

    sqlx::query(
        "INSERT INTO job_time_tracking (job_id, company_id, dispatched_at)
         VALUES ($1, $2, NOW())
         ON CONFLICT (job_id) DO NOTHING",
    )
    .bind(job_id)
    .bind(company_id)
    .execute(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    JobAssignmentLog::append_in_tx(
        company_id,
        job_id,
        tech_id,
        meta.score,
        meta.drive_time_minutes,
        meta.is_manual_override,
        meta.reason.as_deref(),
        meta.assigned_by,
        conn,
    )
    .await?;

    AuditLog::append_in_tx(
        company_id,
        meta.assigned_by,
        "job",
        job_id,
        "assigned",
        json!({ "techId": tech_id, "score": meta.score, "manualOverride": meta.is_manual_override }),
        conn,
    )
    .await?;

    info!(job_id = %job_id, tech_id = %tech_id, "job assigned");
    Ok(updated)
}

pub async fn assign(
    pool: &PgPool,
    job_id: Uuid,
    company_id: Uuid,
    tech_id: Uuid,
    meta: &AssignmentMeta,
) -> Result<Job, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Database)?;
    let job = assign_in_tx(&mut tx, job_id, company_id, tech_id, meta).await?;
    tx.commit().await.map_err(AppError::Database)?;
    Ok(job)
}

/// `assigned -> in_progress`: stamp `started_at`.
pub async fn start(pool: &PgPool, job_id: Uuid, company_id: Uuid) -> Result<Job, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Database)?;

    let job = load_job_locked(job_id, company_id, &mut tx).await?;
    require_transition(job.status, JobStatus::InProgress)?;

    let updated = sqlx::query_as::<_, Job>(
        "UPDATE jobs SET status = 'in_progress', started_at = NOW(), updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(job_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::Database)?;

    AuditLog::append_in_tx(
        company_id,
        None,
        "job",
        job_id,
        "started",
        json!({}),
        &mut tx,
    )
    .await?;

    tx.commit().await.map_err(AppError::Database)?;
    Ok(updated)
}

/// `in_progress -> completed`: stamp `completed_at`, release the tech,
/// derive durations, and upsert the completion record.
pub async fn complete(
    pool: &PgPool,
    job_id: Uuid,
    company_id: Uuid,
    closeout: &CloseoutFields,
    actor: Option<Uuid>,
) -> Result<Job, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Database)?;

    let job = load_job_locked(job_id, company_id, &mut tx).await?;
    require_transition(job.status, JobStatus::Completed)?;

    let now = Utc::now();
    let actual = closeout.duration_minutes.or_else(|| {
        job.started_at
            .map(|started| ((now - started).num_seconds().max(0) / 60) as i32)
    });
    let variance = match (actual, job.estimated_duration_minutes) {
        (Some(actual), Some(estimated)) => Some(actual - estimated),
        _ => None,
    };

    let updated = sqlx::query_as::<_, Job>(
        "UPDATE jobs SET
            status = 'completed',
            completed_at = $2,
            actual_duration_minutes = $3,
            duration_variance_minutes = $4,
            updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(job_id)
    .bind(now)
    .bind(actual)
    .bind(variance)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::Database)?;

    if let Some(tech_id) = job.assigned_tech_id {
        release_tech(tech_id, job_id, true, &mut tx).await?;
    }

    let mut fields = closeout.clone();
    fields.duration_minutes = actual;
    JobCompletion::upsert_closeout_in_tx(job_id, company_id, &fields, now, &mut tx).await?;

    // Late-arriving tracking data still syncs through the ledger; seed what
    // is already known.
    if let Some(tracking) = sqlx::query_as::<_, JobTimeTracking>(
        "SELECT * FROM job_time_tracking WHERE job_id = $1",
    )
    .bind(job_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::Database)?
    {
        tracking.sync_completion_in_tx(&mut tx).await?;
    }

    AuditLog::append_in_tx(
        company_id,
        actor,
        "job",
        job_id,
        "completed",
        json!({ "actualDurationMinutes": actual, "varianceMinutes": variance }),
        &mut tx,
    )
    .await?;

    tx.commit().await.map_err(AppError::Database)?;
    Ok(updated)
}

/// `any -> cancelled`: release the tech when one was working the job, but
/// write no completion record.
pub async fn cancel(
    pool: &PgPool,
    job_id: Uuid,
    company_id: Uuid,
    actor: Option<Uuid>,
) -> Result<Job, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Database)?;

    let job = load_job_locked(job_id, company_id, &mut tx).await?;
    require_transition(job.status, JobStatus::Cancelled)?;

    let updated = sqlx::query_as::<_, Job>(
        "UPDATE jobs SET status = 'cancelled', updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(job_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::Database)?;

    if matches!(job.status, JobStatus::Assigned | JobStatus::InProgress) {
        if let Some(tech_id) = job.assigned_tech_id {
            release_tech(tech_id, job_id, false, &mut tx).await?;
        }
    }

    AuditLog::append_in_tx(
        company_id,
        actor,
        "job",
        job_id,
        "cancelled",
        json!({ "previousStatus": job.status }),
        &mut tx,
    )
    .await?;

    tx.commit().await.map_err(AppError::Database)?;
    Ok(updated)
}

/// `assigned -> assigned`: swap techs, adjust both counters, and append the
/// reassignment history entry with the human-supplied reason.
pub async fn reassign(
    pool: &PgPool,
    job_id: Uuid,
    company_id: Uuid,
    new_tech_id: Uuid,
    reason: &str,
    actor: Option<Uuid>,
) -> Result<Job, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Database)?;

    let job = load_job_locked(job_id, company_id, &mut tx).await?;
    if job.status != JobStatus::Assigned {
        return Err(AppError::conflict(
            "only assigned jobs can be reassigned".to_string(),
        ));
    }

    let previous = job.assigned_tech_id;
    if previous == Some(new_tech_id) {
        return Err(AppError::conflict(
            "job is already assigned to that technician".to_string(),
        ));
    }

    let tech = load_tech_locked(new_tech_id, company_id, &mut tx).await?;
    let cap = tech.max_concurrent_jobs.unwrap_or(1);
    if tech.current_jobs_count >= cap {
        return Err(AppError::conflict(format!(
            "technician {} is at capacity ({}/{})",
            tech.name, tech.current_jobs_count, cap
        )));
    }

    let updated = sqlx::query_as::<_, Job>(
        "UPDATE jobs SET assigned_tech_id = $2, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(job_id)
    .bind(new_tech_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::Database)?;

    if let Some(previous_id) = previous {
        release_tech(previous_id, job_id, false, &mut tx).await?;
    }
    occupy_tech(new_tech_id, job_id, &mut tx).await?;

    JobReassignmentHistory::append_in_tx(
        company_id,
        job_id,
        previous,
        new_tech_id,
        reason,
        actor,
        &mut tx,
    )
    .await?;

    AuditLog::append_in_tx(
        company_id,
        actor,
        "job",
        job_id,
        "reassigned",
        json!({ "previousTechId": previous, "newTechId": new_tech_id, "reason": reason }),
        &mut tx,
    )
    .await?;

    tx.commit().await.map_err(AppError::Database)?;

    info!(job_id = %job_id, new_tech_id = %new_tech_id, "job reassigned");
    Ok(updated)
}
