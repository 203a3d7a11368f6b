//! Close-out: terminal completion plus the follow-ups that hang off it.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::common::AppError;
use crate::domains::customers::models::Customer;
use crate::domains::jobs::models::{CloseoutFields, Job};
use crate::domains::jobs::transitions;
use crate::domains::reviews::models::ReviewRequest;
use crate::kernel::ServerDeps;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloseJobInput {
    pub actual_duration_minutes: Option<i32>,
    pub first_time_fix: Option<bool>,
    pub callback_required: Option<bool>,
    pub customer_rating: Option<i32>,
    pub notes: Option<String>,
    /// Payment collection is handled by the billing collaborator; the flag is
    /// accepted here so clients can close and request payment in one call.
    pub collect_payment: Option<bool>,
}

/// Complete the job, write the completion record, and schedule the review
/// request.
pub async fn close_job(
    deps: &ServerDeps,
    job_id: Uuid,
    company_id: Uuid,
    input: CloseJobInput,
    actor: Option<Uuid>,
) -> Result<Job, AppError> {
    if let Some(rating) = input.customer_rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::validation_field(
                "customerRating",
                "must be between 1 and 5",
            ));
        }
    }

    let fields = CloseoutFields {
        duration_minutes: input.actual_duration_minutes,
        first_time_fix: input.first_time_fix,
        callback_required: input.callback_required,
        customer_rating: input.customer_rating,
        notes: input.notes.clone(),
    };

    let job = transitions::complete(&deps.db_pool, job_id, company_id, &fields, actor).await?;

    // Review scheduling is best-effort; a failure here must not undo the
    // completed close-out.
    if let Some(customer_id) = job.customer_id {
        match Customer::find_by_id(customer_id, company_id, &deps.db_pool).await {
            Ok(Some(customer)) => {
                if let Err(e) =
                    ReviewRequest::schedule_for_job(&job, &customer, &deps.db_pool).await
                {
                    tracing::warn!(job_id = %job.id, error = %e, "failed to schedule review request");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "customer lookup failed during close-out");
            }
        }
    }

    if input.collect_payment.unwrap_or(false) {
        info!(job_id = %job.id, "payment intent requested at close-out");
    }

    Ok(job)
}
