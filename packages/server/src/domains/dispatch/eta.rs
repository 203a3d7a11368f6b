//! Public ETA lookup: live drive-time from the assigned tech to the job.

use serde::Serialize;
use uuid::Uuid;

use crate::common::AppError;
use crate::domains::employees::Employee;
use crate::domains::jobs::models::Job;
use crate::domains::jobs::status::JobStatus;
use crate::kernel::ServerDeps;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaInfo {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// True when the figure is a straight-line estimate.
    pub estimated: bool,
}

/// Compute the ETA for a job from its assigned tech's last known position.
///
/// Terminal or unassigned jobs, missing tech locations, and ungeocoded sites
/// all yield a response with no ETA rather than an error.
pub async fn compute_eta(
    deps: &ServerDeps,
    job_id: Uuid,
    company_id: Uuid,
) -> Result<EtaInfo, AppError> {
    let job = Job::find_by_id(job_id, company_id, &deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Job"))?;

    let mut info = EtaInfo {
        job_id: job.id,
        status: job.status,
        tech_name: None,
        eta_minutes: None,
        distance_km: None,
        estimated: false,
    };

    if job.status.is_terminal() || job.status == JobStatus::Unassigned {
        return Ok(info);
    }

    let Some(tech_id) = job.assigned_tech_id else {
        return Ok(info);
    };
    let Some(tech) = Employee::find_by_id(tech_id, company_id, &deps.db_pool).await? else {
        return Ok(info);
    };
    info.tech_name = Some(tech.name.clone());

    let (Some(from), Some(to)) = (tech.location(), job.location()) else {
        return Ok(info);
    };

    let route = deps.routing.drive_time(from, to).await;
    info.eta_minutes = Some(route.duration_minutes().ceil() as i64);
    info.distance_km = Some(route.distance_meters / 1000.0);
    info.estimated = route.estimated;

    Ok(info)
}
