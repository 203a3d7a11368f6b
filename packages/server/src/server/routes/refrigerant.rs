use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::jobs::models::RefrigerantLog;
use crate::server::app::AppState;
use crate::server::routes::jobs::{load_job_scoped, ScopeQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendLogInput {
    pub company_id: Option<CompanyId>,
    pub equipment_id: Option<Uuid>,
    pub technician_id: Uuid,
    pub refrigerant_type: String,
    pub added_oz: Option<f64>,
    pub recovered_oz: Option<f64>,
    pub corrects_log_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefrigerantLogDto {
    pub id: Uuid,
    pub job_id: Uuid,
    pub equipment_id: Option<Uuid>,
    pub technician_id: Uuid,
    pub refrigerant_type: String,
    pub added_oz: f64,
    pub recovered_oz: f64,
    pub corrects_log_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RefrigerantLog> for RefrigerantLogDto {
    fn from(log: RefrigerantLog) -> Self {
        use rust_decimal::prelude::ToPrimitive;
        Self {
            id: log.id,
            job_id: log.job_id,
            equipment_id: log.equipment_id,
            technician_id: log.technician_id,
            refrigerant_type: log.refrigerant_type,
            added_oz: log.added_oz.to_f64().unwrap_or(0.0),
            recovered_oz: log.recovered_oz.to_f64().unwrap_or(0.0),
            corrects_log_id: log.corrects_log_id,
            notes: log.notes,
            created_at: log.created_at,
        }
    }
}

pub async fn append_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<AppendLogInput>,
) -> Result<(StatusCode, Json<RefrigerantLogDto>), AppError> {
    let job = load_job_scoped(&state, &user, job_id, input.company_id).await?;

    let to_decimal = |v: Option<f64>, field: &str| -> Result<Decimal, AppError> {
        match v {
            None => Ok(Decimal::ZERO),
            Some(v) if v >= 0.0 => Decimal::from_f64(v)
                .ok_or_else(|| AppError::validation_field(field, "not a representable amount")),
            Some(_) => Err(AppError::validation_field(field, "must be non-negative")),
        }
    };

    let log = RefrigerantLog {
        id: Uuid::now_v7(),
        company_id: job.company_id,
        job_id: job.id,
        equipment_id: input.equipment_id,
        technician_id: input.technician_id,
        refrigerant_type: input.refrigerant_type,
        added_oz: to_decimal(input.added_oz, "addedOz")?,
        recovered_oz: to_decimal(input.recovered_oz, "recoveredOz")?,
        corrects_log_id: input.corrects_log_id,
        notes: input.notes,
        created_at: Utc::now(),
    };
    let created = log.append(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<RefrigerantLogDto>>, AppError> {
    let job = load_job_scoped(&state, &user, job_id, scope.company_id).await?;
    let logs = RefrigerantLog::list_for_job(job.id, &state.deps.db_pool).await?;
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}
