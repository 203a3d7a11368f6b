use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::common::{AppError, AuthUser};
use crate::domains::jobs::models::{JobTimeTracking, TrackingEvent};
use crate::server::app::AppState;
use crate::server::routes::jobs::{load_job_scoped, ScopeQuery};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTrackingDto {
    pub job_id: Uuid,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub departed_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub work_started_at: Option<DateTime<Utc>>,
    pub work_ended_at: Option<DateTime<Utc>>,
    pub departed_job_at: Option<DateTime<Utc>>,
    pub drive_time_minutes: Option<i32>,
    pub wrench_time_minutes: Option<i32>,
    pub on_site_minutes: Option<i32>,
}

impl From<JobTimeTracking> for TimeTrackingDto {
    fn from(row: JobTimeTracking) -> Self {
        let derived = row.derived();
        Self {
            job_id: row.job_id,
            dispatched_at: row.dispatched_at,
            departed_at: row.departed_at,
            arrived_at: row.arrived_at,
            work_started_at: row.work_started_at,
            work_ended_at: row.work_ended_at,
            departed_job_at: row.departed_job_at,
            drive_time_minutes: derived.drive,
            wrench_time_minutes: derived.wrench,
            on_site_minutes: derived.on_site,
        }
    }
}

/// Record one time-tracking event. The path segment names the event
/// (`dispatched`, `departed`, `arrived`, `work-started`, `work-ended`,
/// `departed-job`); recording sets that field to now.
pub async fn record_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path((job_id, event)): Path<(Uuid, String)>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<TimeTrackingDto>, AppError> {
    let event = TrackingEvent::from_path(&event)
        .ok_or_else(|| AppError::validation_field("event", "unknown time-tracking event"))?;

    let job = load_job_scoped(&state, &user, job_id, scope.company_id).await?;

    let row = JobTimeTracking::record(job.id, job.company_id, event, &state.deps.db_pool).await?;
    Ok(Json(row.into()))
}

/// Read the tracking row with derived metrics.
pub async fn get_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<Uuid>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<TimeTrackingDto>, AppError> {
    let job = load_job_scoped(&state, &user, job_id, scope.company_id).await?;

    let row = JobTimeTracking::find_by_job(job.id, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Time tracking"))?;
    Ok(Json(row.into()))
}
