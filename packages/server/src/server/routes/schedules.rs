use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::customers::models::Customer;
use crate::domains::jobs::status::JobPriority;
use crate::domains::schedules::{RecurrenceFrequency, RecurringJobSchedule};
use crate::server::app::AppState;
use crate::server::routes::jobs::ScopeQuery;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleInput {
    pub company_id: Option<CompanyId>,
    pub customer_id: Uuid,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub priority: Option<JobPriority>,
    pub required_skills: Option<Vec<String>>,
    pub estimated_duration_minutes: Option<i32>,
    pub frequency: RecurrenceFrequency,
    pub advance_days: Option<i32>,
    pub next_run_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub job_type: String,
    pub priority: JobPriority,
    pub frequency: RecurrenceFrequency,
    pub advance_days: i32,
    pub next_run_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<RecurringJobSchedule> for ScheduleDto {
    fn from(s: RecurringJobSchedule) -> Self {
        Self {
            id: s.id,
            customer_id: s.customer_id,
            job_type: s.job_type,
            priority: s.priority,
            frequency: s.frequency,
            advance_days: s.advance_days,
            next_run_at: s.next_run_at,
            is_active: s.is_active,
        }
    }
}

pub async fn create_schedule(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateScheduleInput>,
) -> Result<(StatusCode, Json<ScheduleDto>), AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();

    Customer::find_by_id(input.customer_id, company, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    if input.advance_days.unwrap_or(0) < 0 {
        return Err(AppError::validation_field("advanceDays", "must be non-negative"));
    }

    let schedule = RecurringJobSchedule {
        id: Uuid::now_v7(),
        company_id: company,
        customer_id: input.customer_id,
        job_type: input.job_type.unwrap_or_else(|| "maintenance".to_string()),
        description: input.description,
        priority: input.priority.unwrap_or(JobPriority::Medium),
        required_skills: input.required_skills.unwrap_or_default(),
        estimated_duration_minutes: input.estimated_duration_minutes,
        frequency: input.frequency,
        advance_days: input.advance_days.unwrap_or(0),
        next_run_at: input.next_run_at,
        is_active: true,
        created_at: Utc::now(),
    };
    let created = schedule.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<ScheduleDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let schedules = RecurringJobSchedule::list(company, &state.deps.db_pool).await?;
    Ok(Json(schedules.into_iter().map(Into::into).collect()))
}
