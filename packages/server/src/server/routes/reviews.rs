use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::common::{AppError, AuthUser};
use crate::domains::reviews::models::{ReviewChannel, ReviewRequest, ReviewStatus};
use crate::server::app::AppState;
use crate::server::routes::jobs::ScopeQuery;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestDto {
    pub id: Uuid,
    pub job_id: Uuid,
    pub customer_id: Uuid,
    pub channel: ReviewChannel,
    pub status: ReviewStatus,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<ReviewRequest> for ReviewRequestDto {
    fn from(r: ReviewRequest) -> Self {
        Self {
            id: r.id,
            job_id: r.job_id,
            customer_id: r.customer_id,
            channel: r.channel,
            status: r.status,
            scheduled_for: r.scheduled_for,
            sent_at: r.sent_at,
        }
    }
}

pub async fn list_pending(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<ReviewRequestDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let pending = ReviewRequest::list_pending(company, &state.deps.db_pool).await?;
    Ok(Json(pending.into_iter().map(Into::into).collect()))
}
