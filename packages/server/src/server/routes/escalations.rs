use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::escalations::engine::{self, TriggerResult};
use crate::domains::escalations::models::{
    EscalationEvent, EscalationPolicy, EscalationStep, NotificationEntry,
};
use crate::server::app::AppState;
use crate::server::routes::jobs::load_job_scoped;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateInput {
    pub company_id: Option<CompanyId>,
}

/// Start an escalation for a job.
pub async fn trigger(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<EscalateInput>,
) -> Result<Json<TriggerResult>, AppError> {
    // Resolve the scope through the job so a cross-tenant id masks as 404.
    let job = load_job_scoped(&state, &user, job_id, input.company_id).await?;
    let result = engine::trigger_escalation(&state.deps, job.id, job.company_id).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveInput {
    pub company_id: Option<CompanyId>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationEventDto {
    pub id: Uuid,
    pub policy_id: Uuid,
    pub job_id: Uuid,
    pub current_step: i32,
    pub triggered_at: DateTime<Utc>,
    pub notification_log: Vec<NotificationEntry>,
    pub timed_out: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub resolution_notes: Option<String>,
}

impl From<EscalationEvent> for EscalationEventDto {
    fn from(event: EscalationEvent) -> Self {
        Self {
            id: event.id,
            policy_id: event.policy_id,
            job_id: event.job_id,
            current_step: event.current_step,
            triggered_at: event.triggered_at,
            notification_log: event.notification_log.0,
            timed_out: event.timed_out,
            resolved_at: event.resolved_at,
            resolved_by: event.resolved_by,
            resolution_notes: event.resolution_notes,
        }
    }
}

pub async fn resolve(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(input): Json<ResolveInput>,
) -> Result<Json<EscalationEventDto>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();
    let event = engine::resolve_escalation(
        &state.deps,
        event_id,
        company,
        user.user_id.into_uuid(),
        input.notes.as_deref(),
    )
    .await?;
    Ok(Json(event.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyInput {
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub trigger_keywords: Option<Vec<String>>,
    pub trigger_priorities: Option<Vec<String>>,
    pub steps: Vec<EscalationStep>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDto {
    pub id: Uuid,
    pub name: String,
    pub trigger_keywords: Option<Vec<String>>,
    pub trigger_priorities: Option<Vec<String>>,
    pub steps: Vec<EscalationStep>,
    pub is_active: bool,
}

impl From<EscalationPolicy> for PolicyDto {
    fn from(policy: EscalationPolicy) -> Self {
        Self {
            id: policy.id,
            name: policy.name,
            trigger_keywords: policy.trigger_keywords,
            trigger_priorities: policy.trigger_priorities,
            steps: policy.steps.0,
            is_active: policy.is_active,
        }
    }
}

pub async fn create_policy(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreatePolicyInput>,
) -> Result<(StatusCode, Json<PolicyDto>), AppError> {
    user.require_admin()?;
    let company = user.effective_company(input.company_id)?.into_uuid();

    if input.steps.is_empty() {
        return Err(AppError::validation_field("steps", "must contain at least one step"));
    }

    let policy = EscalationPolicy {
        id: Uuid::now_v7(),
        company_id: company,
        name: input.name,
        trigger_keywords: input.trigger_keywords,
        trigger_priorities: input.trigger_priorities,
        steps: SqlJson(input.steps),
        is_active: true,
        created_at: Utc::now(),
    };
    let created = policy.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_policies(
    State(state): State<AppState>,
    user: AuthUser,
    axum::extract::Query(scope): axum::extract::Query<super::jobs::ScopeQuery>,
) -> Result<Json<Vec<PolicyDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let policies = EscalationPolicy::list_active(company, &state.deps.db_pool).await?;
    Ok(Json(policies.into_iter().map(Into::into).collect()))
}
