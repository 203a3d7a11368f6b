use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::employees::Employee;
use crate::server::app::AppState;
use crate::server::routes::jobs::ScopeQuery;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub id: Uuid,
    pub name: String,
    pub skills: Vec<String>,
    pub skill_levels: HashMap<String, i32>,
    pub is_active: bool,
    pub is_available: bool,
    pub current_job_id: Option<Uuid>,
    pub current_jobs_count: i32,
    pub max_concurrent_jobs: Option<i32>,
    pub rating: Option<f64>,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
}

impl From<Employee> for EmployeeDto {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            name: e.name,
            skills: e.skills,
            skill_levels: e.skill_levels.0,
            is_active: e.is_active,
            is_available: e.is_available,
            current_job_id: e.current_job_id,
            current_jobs_count: e.current_jobs_count,
            max_concurrent_jobs: e.max_concurrent_jobs,
            rating: e.rating,
            current_latitude: e.current_latitude,
            current_longitude: e.current_longitude,
            location_updated_at: e.location_updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeInput {
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub skills: Option<Vec<String>>,
    pub skill_levels: Option<HashMap<String, i32>>,
    pub max_concurrent_jobs: Option<i32>,
    pub rating: Option<f64>,
    pub home_address: Option<String>,
    pub user_id: Option<Uuid>,
}

pub async fn create_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateEmployeeInput>,
) -> Result<(StatusCode, Json<EmployeeDto>), AppError> {
    user.require_admin()?;
    let company = user.effective_company(input.company_id)?.into_uuid();

    if input.name.trim().is_empty() {
        return Err(AppError::validation_field("name", "must not be empty"));
    }
    if let Some(rating) = input.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(AppError::validation_field("rating", "must be between 0 and 5"));
        }
    }

    let employee = Employee {
        id: Uuid::now_v7(),
        company_id: company,
        user_id: input.user_id,
        name: input.name,
        skills: input.skills.unwrap_or_default(),
        skill_levels: SqlJson(input.skill_levels.unwrap_or_default()),
        is_active: true,
        is_available: true,
        current_job_id: None,
        current_jobs_count: 0,
        max_concurrent_jobs: input.max_concurrent_jobs.or(Some(1)),
        rating: input.rating,
        home_address: input.home_address,
        current_latitude: None,
        current_longitude: None,
        location_updated_at: None,
        last_job_completed_at: None,
        created_at: Utc::now(),
    };
    let created = employee.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_employees(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<EmployeeDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let employees = Employee::list(company, &state.deps.db_pool).await?;
    Ok(Json(employees.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchEmployeeInput {
    pub company_id: Option<CompanyId>,
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_available: Option<bool>,
    pub max_concurrent_jobs: Option<i32>,
    pub rating: Option<f64>,
}

pub async fn patch_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(employee_id): Path<Uuid>,
    Json(input): Json<PatchEmployeeInput>,
) -> Result<Json<EmployeeDto>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();

    let employee = Employee::update_profile(
        employee_id,
        company,
        input.name.as_deref(),
        input.skills.as_deref(),
        input.is_active,
        input.is_available,
        input.max_concurrent_jobs,
        input.rating,
        &state.deps.db_pool,
    )
    .await?
    .ok_or(AppError::NotFound("Employee"))?;
    Ok(Json(employee.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPingInput {
    pub company_id: Option<CompanyId>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Location ping from the tech's device; feeds the dispatch freshness
/// filter.
pub async fn update_location(
    State(state): State<AppState>,
    user: AuthUser,
    Path(employee_id): Path<Uuid>,
    Json(input): Json<LocationPingInput>,
) -> Result<Json<EmployeeDto>, AppError> {
    if !(-90.0..=90.0).contains(&input.latitude) || !(-180.0..=180.0).contains(&input.longitude) {
        return Err(AppError::validation("coordinates out of range"));
    }

    let company = user.effective_company(input.company_id)?.into_uuid();
    let employee = Employee::update_location(
        employee_id,
        company,
        input.latitude,
        input.longitude,
        &state.deps.db_pool,
    )
    .await?
    .ok_or(AppError::NotFound("Employee"))?;
    Ok(Json(employee.into()))
}
