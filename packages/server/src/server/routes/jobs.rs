use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::customers::models::GeocodingStatus;
use crate::domains::jobs::close::{self, CloseJobInput};
use crate::domains::jobs::models::{CloseoutFields, Job, JobFilters};
use crate::domains::jobs::status::{JobPriority, JobStatus};
use crate::domains::jobs::transitions::{self, AssignmentMeta};
use crate::server::app::AppState;

/// Wire representation of a job.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
    pub id: Uuid,
    pub company_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub description: Option<String>,
    pub job_type: String,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub assigned_tech_id: Option<Uuid>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocoding_status: GeocodingStatus,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub required_skills: Vec<String>,
    pub estimated_duration_minutes: Option<i32>,
    pub actual_duration_minutes: Option<i32>,
    pub duration_variance_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobDto {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            company_id: job.company_id,
            customer_id: job.customer_id,
            location_id: job.location_id,
            description: job.description,
            job_type: job.job_type,
            priority: job.priority,
            status: job.status,
            assigned_tech_id: job.assigned_tech_id,
            address: job.address,
            latitude: job.latitude,
            longitude: job.longitude,
            geocoding_status: job.geocoding_status,
            scheduled_time: job.scheduled_time,
            started_at: job.started_at,
            completed_at: job.completed_at,
            required_skills: job.required_skills,
            estimated_duration_minutes: job.estimated_duration_minutes,
            actual_duration_minutes: job.actual_duration_minutes,
            duration_variance_minutes: job.duration_variance_minutes,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Query string shared by scoped reads; platform operators name the company.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    pub company_id: Option<CompanyId>,
}

/// Load a job under the caller's tenant view. A row in another company is
/// indistinguishable from a missing one.
pub(crate) async fn load_job_scoped(
    state: &AppState,
    user: &AuthUser,
    job_id: Uuid,
    requested_company: Option<CompanyId>,
) -> Result<Job, AppError> {
    let company = user.effective_company(requested_company)?;
    Job::find_by_id(job_id, company.into_uuid(), &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Job"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobInput {
    pub company_id: Option<CompanyId>,
    pub customer_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub priority: Option<JobPriority>,
    pub address: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub required_skills: Option<Vec<String>>,
    pub estimated_duration_minutes: Option<i32>,
}

pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateJobInput>,
) -> Result<(StatusCode, Json<JobDto>), AppError> {
    let company = user.effective_company(input.company_id)?;

    let job = Job {
        id: Uuid::now_v7(),
        company_id: company.into_uuid(),
        customer_id: input.customer_id,
        location_id: input.location_id,
        description: input.description,
        job_type: input.job_type.unwrap_or_else(|| "service".to_string()),
        priority: input.priority.unwrap_or(JobPriority::Medium),
        status: JobStatus::Unassigned,
        assigned_tech_id: None,
        address: input.address,
        latitude: None,
        longitude: None,
        geocoding_status: GeocodingStatus::Pending,
        geocoding_attempts: 0,
        scheduled_time: input.scheduled_time,
        started_at: None,
        completed_at: None,
        required_skills: input.required_skills.unwrap_or_default(),
        estimated_duration_minutes: input.estimated_duration_minutes,
        actual_duration_minutes: None,
        duration_variance_minutes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let created = job.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    pub company_id: Option<CompanyId>,
    pub status: Option<JobStatus>,
    pub priority: Option<JobPriority>,
    pub assigned_tech_id: Option<Uuid>,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobDto>>, AppError> {
    let company = user.effective_company(query.company_id)?;
    let filters = JobFilters {
        status: query.status,
        priority: query.priority,
        assigned_tech_id: query.assigned_tech_id,
    };
    let jobs = Job::list(company.into_uuid(), &filters, &state.deps.db_pool).await?;
    Ok(Json(jobs.into_iter().map(Into::into).collect()))
}

pub async fn get_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<JobDto>, AppError> {
    let job = load_job_scoped(&state, &user, job_id, scope.company_id).await?;
    Ok(Json(job.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchJobInput {
    pub company_id: Option<CompanyId>,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub priority: Option<JobPriority>,
    pub address: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub required_skills: Option<Vec<String>>,
    pub estimated_duration_minutes: Option<i32>,
}

/// Partial update. An address change goes through the single-statement path
/// that also invalidates coordinates and resets geocoding.
pub async fn patch_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<PatchJobInput>,
) -> Result<Json<JobDto>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();
    let pool = &state.deps.db_pool;

    let mut job = Job::update_details(
        job_id,
        company,
        input.description.as_deref(),
        input.job_type.as_deref(),
        input.priority,
        input.scheduled_time,
        input.required_skills.as_deref(),
        input.estimated_duration_minutes,
        pool,
    )
    .await?
    .ok_or(AppError::NotFound("Job"))?;

    if let Some(address) = &input.address {
        job = Job::update_address(job_id, company, address, pool)
            .await?
            .ok_or(AppError::NotFound("Job"))?;
    }

    Ok(Json(job.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeInput {
    pub company_id: Option<CompanyId>,
    pub status: JobStatus,
    pub tech_id: Option<Uuid>,
    pub reason: Option<String>,
    pub actual_duration_minutes: Option<i32>,
}

/// Direct state-machine transition. Side-effects follow the transition
/// table; illegal moves are 409s.
pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<StatusChangeInput>,
) -> Result<Json<JobDto>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();
    let pool = &state.deps.db_pool;
    let actor = Some(user.user_id.into_uuid());

    let job = match input.status {
        JobStatus::Assigned => {
            let tech_id = input
                .tech_id
                .ok_or_else(|| AppError::validation_field("techId", "required to assign"))?;
            let meta = AssignmentMeta {
                reason: input.reason.clone(),
                assigned_by: actor,
                ..Default::default()
            };
            transitions::assign(pool, job_id, company, tech_id, &meta).await?
        }
        JobStatus::InProgress => transitions::start(pool, job_id, company).await?,
        JobStatus::Completed => {
            let fields = CloseoutFields {
                duration_minutes: input.actual_duration_minutes,
                ..Default::default()
            };
            transitions::complete(pool, job_id, company, &fields, actor).await?
        }
        JobStatus::Cancelled => transitions::cancel(pool, job_id, company, actor).await?,
        JobStatus::Unassigned => {
            return Err(AppError::conflict(
                "jobs cannot be moved back to unassigned".to_string(),
            ))
        }
    };

    Ok(Json(job.into()))
}

/// Terminal close-out: completion record, derived durations, review
/// scheduling, optional payment intent.
pub async fn close_job_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<CloseJobInputWithScope>,
) -> Result<Json<JobDto>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();
    let job = close::close_job(
        &state.deps,
        job_id,
        company,
        input.body,
        Some(user.user_id.into_uuid()),
    )
    .await?;
    Ok(Json(job.into()))
}

/// Close-out body plus the platform-only company override.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseJobInputWithScope {
    pub company_id: Option<CompanyId>,
    #[serde(flatten)]
    pub body: CloseJobInput,
}
