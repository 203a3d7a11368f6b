//! Batch dispatcher: assigns a set of unassigned jobs to techs under global
//! constraints.
//!
//! Decisions are serialized within one call; every acceptance shrinks the
//! capacity visible to the next job. The decision loop itself does not write;
//! `dispatch_and_persist` wraps the accepted pairs in a single transaction
//! that drives the normal assignment transition per pair.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::common::AppError;
use crate::domains::dispatch::scorer;
use crate::domains::employees::Employee;
use crate::domains::jobs::models::Job;
use crate::domains::jobs::status::JobPriority;
use crate::domains::jobs::transitions::{self, AssignmentMeta};
use crate::kernel::ServerDeps;

/// Minimum acceptable top score; below this the job stays unassigned.
pub const MIN_ACCEPT_SCORE: f64 = 20.0;

/// Capacity assumed for techs with no configured maximum.
const DEFAULT_CAPACITY: i32 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAssignment {
    pub job_id: Uuid,
    pub tech_id: Uuid,
    pub score: f64,
    pub drive_time_minutes: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUnassigned {
    pub job_id: Uuid,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total_jobs: usize,
    pub assigned: usize,
    pub unassigned: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDispatchResult {
    pub assignments: Vec<BatchAssignment>,
    pub unassigned: Vec<BatchUnassigned>,
    pub stats: BatchStats,
}

/// Decide assignments for the requested jobs without persisting anything.
pub async fn batch_dispatch(
    deps: &ServerDeps,
    job_ids: &[Uuid],
    company_id: Uuid,
) -> Result<BatchDispatchResult, AppError> {
    let started = Instant::now();

    let mut assignments = Vec::new();
    let mut unassigned = Vec::new();

    let mut jobs = Job::find_unassigned_in(job_ids, company_id, &deps.db_pool).await?;
    let found: HashSet<Uuid> = jobs.iter().map(|j| j.id).collect();
    for id in job_ids {
        if !found.contains(id) {
            unassigned.push(BatchUnassigned {
                job_id: *id,
                reason: "not found or already assigned",
            });
        }
    }

    let pool = Employee::find_eligible(company_id, &deps.db_pool).await?;
    if pool.is_empty() {
        for job in &jobs {
            unassigned.push(BatchUnassigned {
                job_id: job.id,
                reason: "no available technicians",
            });
        }
        return Ok(finish(assignments, unassigned, job_ids.len(), started));
    }

    // Remaining capacity per tech, consumed as the loop accepts assignments.
    let mut capacity: HashMap<Uuid, i32> = pool
        .iter()
        .map(|tech| {
            let max = tech.max_concurrent_jobs.unwrap_or(DEFAULT_CAPACITY);
            (tech.id, max - tech.current_jobs_count)
        })
        .collect();

    // Highest priority first; emergency outranks everything.
    jobs.sort_by_key(|job| job.priority.rank());

    for job in &jobs {
        let available: Vec<Employee> = pool
            .iter()
            .filter(|tech| {
                capacity.get(&tech.id).copied().unwrap_or(0) > 0 && tech.location().is_some()
            })
            .cloned()
            .collect();

        if available.is_empty() {
            unassigned.push(BatchUnassigned {
                job_id: job.id,
                reason: "no technicians with capacity",
            });
            continue;
        }

        let is_emergency = job.priority == JobPriority::Emergency;
        let candidates = scorer::score(deps.routing.as_ref(), job, &available, is_emergency).await;

        let Some(top) = candidates.first() else {
            unassigned.push(BatchUnassigned {
                job_id: job.id,
                reason: "no suitable technician found",
            });
            continue;
        };

        if top.score < MIN_ACCEPT_SCORE {
            unassigned.push(BatchUnassigned {
                job_id: job.id,
                reason: "no suitable technician found",
            });
            continue;
        }

        if let Some(remaining) = capacity.get_mut(&top.employee_id) {
            *remaining -= 1;
        }
        assignments.push(BatchAssignment {
            job_id: job.id,
            tech_id: top.employee_id,
            score: top.score,
            drive_time_minutes: top.drive_time_minutes,
        });
    }

    Ok(finish(assignments, unassigned, job_ids.len(), started))
}

fn finish(
    assignments: Vec<BatchAssignment>,
    unassigned: Vec<BatchUnassigned>,
    total_jobs: usize,
    started: Instant,
) -> BatchDispatchResult {
    let stats = BatchStats {
        total_jobs,
        assigned: assignments.len(),
        unassigned: unassigned.len(),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    BatchDispatchResult {
        assignments,
        unassigned,
        stats,
    }
}

/// Decide and persist: each accepted pair runs the assignment transition,
/// all inside one transaction. A pair that fails to persist (raced away,
/// capacity change) is moved to the unassigned list rather than failing the
/// batch.
pub async fn dispatch_and_persist(
    deps: &ServerDeps,
    job_ids: &[Uuid],
    company_id: Uuid,
    actor: Option<Uuid>,
) -> Result<BatchDispatchResult, AppError> {
    let mut result = batch_dispatch(deps, job_ids, company_id).await?;

    let mut tx = deps.db_pool.begin().await.map_err(AppError::Database)?;
    let mut persisted = Vec::with_capacity(result.assignments.len());

    for assignment in result.assignments.drain(..) {
        let meta = AssignmentMeta {
            score: Some(assignment.score),
            drive_time_minutes: Some(assignment.drive_time_minutes),
            is_manual_override: false,
            reason: None,
            assigned_by: actor,
        };
        match transitions::assign_in_tx(
            &mut tx,
            assignment.job_id,
            company_id,
            assignment.tech_id,
            &meta,
        )
        .await
        {
            Ok(_) => persisted.push(assignment),
            Err(AppError::Conflict(_)) | Err(AppError::NotFound(_)) => {
                result.unassigned.push(BatchUnassigned {
                    job_id: assignment.job_id,
                    reason: "not found or already assigned",
                });
            }
            Err(other) => return Err(other),
        }
    }

    tx.commit().await.map_err(AppError::Database)?;

    result.stats.assigned = persisted.len();
    result.stats.unassigned = result.unassigned.len();
    result.assignments = persisted;
    Ok(result)
}
