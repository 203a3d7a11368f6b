use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::dispatch::eta::{self, EtaInfo};
use crate::server::app::AppState;
use crate::server::routes::jobs::load_job_scoped;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaTokenInput {
    pub company_id: Option<CompanyId>,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaTokenResponse {
    pub token: String,
}

/// Mint a short-lived public token for one job's ETA page.
pub async fn create_eta_token(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<EtaTokenInput>,
) -> Result<Json<EtaTokenResponse>, AppError> {
    let job = load_job_scoped(&state, &user, input.job_id, input.company_id).await?;

    let token = state
        .deps
        .jwt_service
        .create_eta_token(job.id, job.company_id)?;
    Ok(Json(EtaTokenResponse { token }))
}

/// Public ETA lookup. The token carries the job and company; an invalid or
/// expired token is indistinguishable from a missing job.
pub async fn eta_lookup(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<EtaInfo>, AppError> {
    let claims = state
        .deps
        .jwt_service
        .verify_eta_token(&token)
        .map_err(|_| AppError::NotFound("Job"))?;

    let info = eta::compute_eta(&state.deps, claims.job_id, claims.company_id).await?;
    Ok(Json(info))
}
