use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::dispatch::batch::{self, BatchDispatchResult, MIN_ACCEPT_SCORE};
use crate::domains::dispatch::scorer::{self, Candidate};
use crate::domains::employees::Employee;
use crate::domains::jobs::status::{JobPriority, JobStatus};
use crate::domains::jobs::transitions::{self, AssignmentMeta};
use crate::server::app::AppState;
use crate::server::routes::jobs::{load_job_scoped, JobDto};

/// Number of runner-up candidates echoed back to the dispatcher UI.
const CANDIDATES_SHOWN: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchInput {
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub assigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub candidates: Vec<Candidate>,
}

/// Score the eligible pool for one job and assign the winner.
pub async fn dispatch_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<DispatchInput>,
) -> Result<Json<DispatchResponse>, AppError> {
    let job = load_job_scoped(&state, &user, job_id, input.company_id).await?;
    if job.status != JobStatus::Unassigned {
        return Err(AppError::conflict("job is already assigned"));
    }

    let pool = Employee::find_eligible(job.company_id, &state.deps.db_pool).await?;
    let is_emergency = job.priority == JobPriority::Emergency;
    let candidates =
        scorer::score(state.deps.routing.as_ref(), &job, &pool, is_emergency).await;

    let Some(top) = candidates.first().filter(|c| c.score >= MIN_ACCEPT_SCORE) else {
        return Ok(Json(DispatchResponse {
            assigned: false,
            job: None,
            reason: Some("no suitable technician found"),
            candidates: candidates.into_iter().take(CANDIDATES_SHOWN).collect(),
        }));
    };

    let meta = AssignmentMeta {
        score: Some(top.score),
        drive_time_minutes: Some(top.drive_time_minutes),
        is_manual_override: false,
        reason: None,
        assigned_by: Some(user.user_id.into_uuid()),
    };
    let updated = transitions::assign(
        &state.deps.db_pool,
        job.id,
        job.company_id,
        top.employee_id,
        &meta,
    )
    .await?;

    Ok(Json(DispatchResponse {
        assigned: true,
        job: Some(updated.into()),
        reason: None,
        candidates: candidates.into_iter().take(CANDIDATES_SHOWN).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideInput {
    pub company_id: Option<CompanyId>,
    pub tech_id: Uuid,
    pub reason: Option<String>,
}

/// Manual override: a human picks the tech, capacity limits do not apply,
/// and the assignment log records the override.
pub async fn dispatch_override(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<OverrideInput>,
) -> Result<Json<JobDto>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();

    let meta = AssignmentMeta {
        score: None,
        drive_time_minutes: None,
        is_manual_override: true,
        reason: input.reason,
        assigned_by: Some(user.user_id.into_uuid()),
    };
    let job =
        transitions::assign(&state.deps.db_pool, job_id, company, input.tech_id, &meta).await?;
    Ok(Json(job.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignInput {
    pub company_id: Option<CompanyId>,
    pub tech_id: Uuid,
    pub reason: String,
}

pub async fn reassign_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<ReassignInput>,
) -> Result<Json<JobDto>, AppError> {
    if input.reason.trim().is_empty() {
        return Err(AppError::validation_field("reason", "must not be empty"));
    }

    let company = user.effective_company(input.company_id)?.into_uuid();
    let job = transitions::reassign(
        &state.deps.db_pool,
        job_id,
        company,
        input.tech_id,
        &input.reason,
        Some(user.user_id.into_uuid()),
    )
    .await?;
    Ok(Json(job.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDispatchInput {
    pub company_id: Option<CompanyId>,
    pub job_ids: Vec<Uuid>,
}

pub async fn batch_dispatch(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<BatchDispatchInput>,
) -> Result<Json<BatchDispatchResult>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();
    let result = batch::dispatch_and_persist(
        &state.deps,
        &input.job_ids,
        company,
        Some(user.user_id.into_uuid()),
    )
    .await?;
    Ok(Json(result))
}
