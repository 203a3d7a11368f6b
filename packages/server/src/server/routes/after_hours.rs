use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::company::after_hours::{
    self, parse_minutes_of_day, AfterHoursEvaluation, AfterHoursRule, RoutingStrategy,
};
use crate::domains::company::models::Company;
use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub company_id: Option<CompanyId>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterHoursStatus {
    #[serde(flatten)]
    pub evaluation: AfterHoursEvaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_call_tech_id: Option<Uuid>,
}

/// Evaluate the caller's after-hours window at the current moment, including
/// the on-call pick when the strategy wants one.
pub async fn status(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<AfterHoursStatus>, AppError> {
    let company_id = user.effective_company(query.company_id)?.into_uuid();
    let company = Company::find_by_id(company_id, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Company"))?;

    let evaluation =
        after_hours::evaluate(&company, query.branch_id, Utc::now(), &state.deps.db_pool).await?;

    let on_call_tech_id = if evaluation.routing_strategy == Some(RoutingStrategy::OnCallPool) {
        after_hours::pick_on_call_tech(&evaluation.on_call_employee_ids, &state.deps.db_pool)
            .await?
            .map(|tech| tech.id)
    } else {
        None
    };

    Ok(Json(AfterHoursStatus {
        evaluation,
        on_call_tech_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleInput {
    pub company_id: Option<CompanyId>,
    pub branch_id: Option<Uuid>,
    pub weekday_start: String,
    pub weekday_end: String,
    pub weekend_all_day: Option<bool>,
    pub routing_strategy: Option<RoutingStrategy>,
    pub on_call_employee_ids: Option<Vec<Uuid>>,
    pub surcharge_flat: Option<f64>,
    pub surcharge_percent: Option<f64>,
    pub auto_accept: Option<bool>,
    pub notify_manager: Option<bool>,
    pub manager_phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDto {
    pub id: Uuid,
    pub branch_id: Option<Uuid>,
    pub weekday_start: String,
    pub weekday_end: String,
    pub weekend_all_day: bool,
    pub routing_strategy: RoutingStrategy,
    pub on_call_employee_ids: Vec<Uuid>,
    pub auto_accept: bool,
    pub notify_manager: bool,
    pub manager_phone: Option<String>,
    pub is_active: bool,
}

impl From<AfterHoursRule> for RuleDto {
    fn from(rule: AfterHoursRule) -> Self {
        Self {
            id: rule.id,
            branch_id: rule.branch_id,
            weekday_start: rule.weekday_start,
            weekday_end: rule.weekday_end,
            weekend_all_day: rule.weekend_all_day,
            routing_strategy: rule.routing_strategy,
            on_call_employee_ids: rule.on_call_employee_ids,
            auto_accept: rule.auto_accept,
            notify_manager: rule.notify_manager,
            manager_phone: rule.manager_phone,
            is_active: rule.is_active,
        }
    }
}

pub async fn create_rule(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateRuleInput>,
) -> Result<(StatusCode, Json<RuleDto>), AppError> {
    user.require_admin()?;
    let company = user.effective_company(input.company_id)?.into_uuid();

    if parse_minutes_of_day(&input.weekday_start).is_none() {
        return Err(AppError::validation_field("weekdayStart", "must be HH:MM"));
    }
    if parse_minutes_of_day(&input.weekday_end).is_none() {
        return Err(AppError::validation_field("weekdayEnd", "must be HH:MM"));
    }

    let rule = AfterHoursRule {
        id: Uuid::now_v7(),
        company_id: company,
        branch_id: input.branch_id,
        weekday_start: input.weekday_start,
        weekday_end: input.weekday_end,
        weekend_all_day: input.weekend_all_day.unwrap_or(false),
        routing_strategy: input.routing_strategy.unwrap_or(RoutingStrategy::OnCallPool),
        on_call_employee_ids: input.on_call_employee_ids.unwrap_or_default(),
        surcharge_flat: input
            .surcharge_flat
            .and_then(Decimal::from_f64)
            .unwrap_or_default(),
        surcharge_percent: input
            .surcharge_percent
            .and_then(Decimal::from_f64)
            .unwrap_or_default(),
        auto_accept: input.auto_accept.unwrap_or(false),
        notify_manager: input.notify_manager.unwrap_or(false),
        manager_phone: input.manager_phone,
        is_active: true,
        created_at: Utc::now(),
    };
    let created = rule.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_rules(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<super::jobs::ScopeQuery>,
) -> Result<Json<Vec<RuleDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let rules = AfterHoursRule::list(company, &state.deps.db_pool).await?;
    Ok(Json(rules.into_iter().map(Into::into).collect()))
}
