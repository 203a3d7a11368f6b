use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::agreements::models::{
    AgreementStatus, MembershipAgreement, RenewalBillingTrigger,
};
use crate::domains::customers::models::Customer;
use crate::server::app::AppState;
use crate::server::routes::jobs::ScopeQuery;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgreementInput {
    pub company_id: Option<CompanyId>,
    pub customer_id: Uuid,
    pub plan_name: String,
    pub starts_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub visits_allowed: Option<i32>,
    pub auto_renew: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementDto {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub plan_name: String,
    pub starts_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub visits_allowed: i32,
    pub visits_used: i32,
    pub auto_renew: bool,
    pub status: AgreementStatus,
}

impl From<MembershipAgreement> for AgreementDto {
    fn from(a: MembershipAgreement) -> Self {
        Self {
            id: a.id,
            customer_id: a.customer_id,
            plan_name: a.plan_name,
            starts_on: a.starts_on,
            expires_on: a.expires_on,
            visits_allowed: a.visits_allowed,
            visits_used: a.visits_used,
            auto_renew: a.auto_renew,
            status: a.status,
        }
    }
}

pub async fn create_agreement(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateAgreementInput>,
) -> Result<(StatusCode, Json<AgreementDto>), AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();

    Customer::find_by_id(input.customer_id, company, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    if input.expires_on <= input.starts_on {
        return Err(AppError::validation_field("expiresOn", "must be after startsOn"));
    }

    let agreement = MembershipAgreement {
        id: Uuid::now_v7(),
        company_id: company,
        customer_id: input.customer_id,
        plan_name: input.plan_name,
        starts_on: input.starts_on,
        expires_on: input.expires_on,
        visits_allowed: input.visits_allowed.unwrap_or(2),
        visits_used: 0,
        auto_renew: input.auto_renew.unwrap_or(false),
        status: AgreementStatus::Active,
        reminder_sent_at: None,
        created_at: Utc::now(),
    };
    let created = agreement.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_agreements(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<AgreementDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let agreements = MembershipAgreement::list(company, &state.deps.db_pool).await?;
    Ok(Json(agreements.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingTriggerDto {
    pub id: Uuid,
    pub agreement_id: Uuid,
    pub status: String,
}

pub async fn list_billing_triggers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<BillingTriggerDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let triggers = RenewalBillingTrigger::list(company, &state.deps.db_pool).await?;
    Ok(Json(
        triggers
            .into_iter()
            .map(|t| BillingTriggerDto {
                id: t.id,
                agreement_id: t.agreement_id,
                status: t.status,
            })
            .collect(),
    ))
}
