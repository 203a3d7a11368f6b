//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Timer-driven work that is not a poll loop:
//! - escalation advancement (every minute)
//! - review-request dispatch (every five minutes)
//! - recurring-schedule materialization (nightly)
//! - membership renewal processing (nightly)
//!
//! Task bodies never let an error escape the tick; failures are logged and
//! the next firing retries from current database state.

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::escalations::engine::advance_escalations;
use crate::kernel::workers::recurring::materialize_due_schedules;
use crate::kernel::workers::renewals::process_renewals;
use crate::kernel::workers::reviews::dispatch_due_reviews;
use crate::kernel::ServerDeps;

/// Start all scheduled tasks
pub async fn start_scheduler(deps: Arc<ServerDeps>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Escalation advancement - every minute
    let escalation_deps = deps.clone();
    let escalation_job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let deps = escalation_deps.clone();
        Box::pin(async move {
            match advance_escalations(&deps).await {
                Ok(stats) if stats.advanced + stats.timed_out > 0 => {
                    tracing::info!(
                        advanced = stats.advanced,
                        timed_out = stats.timed_out,
                        "escalation advance tick"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Escalation advance task failed: {}", e),
            }
        })
    })?;
    scheduler.add(escalation_job).await?;

    // Review dispatch - every five minutes
    let review_deps = deps.clone();
    let review_job = Job::new_async("0 */5 * * * *", move |_uuid, _lock| {
        let deps = review_deps.clone();
        Box::pin(async move {
            if let Err(e) = dispatch_due_reviews(&deps).await {
                tracing::error!("Review dispatch task failed: {}", e);
            }
        })
    })?;
    scheduler.add(review_job).await?;

    // Recurring-job materialization - nightly at 02:15
    let recurring_deps = deps.clone();
    let recurring_job = Job::new_async("0 15 2 * * *", move |_uuid, _lock| {
        let deps = recurring_deps.clone();
        Box::pin(async move {
            if let Err(e) = materialize_due_schedules(&deps.db_pool).await {
                tracing::error!("Recurring materializer task failed: {}", e);
            }
        })
    })?;
    scheduler.add(recurring_job).await?;

    // Membership renewals - nightly at 02:45
    let renewal_deps = deps.clone();
    let renewal_job = Job::new_async("0 45 2 * * *", move |_uuid, _lock| {
        let deps = renewal_deps.clone();
        Box::pin(async move {
            if let Err(e) = process_renewals(&deps).await {
                tracing::error!("Renewal processor task failed: {}", e);
            }
        })
    })?;
    scheduler.add(renewal_job).await?;

    scheduler.start().await?;

    tracing::info!(
        "Scheduled tasks started (escalations every minute, reviews every 5 minutes, recurring + renewals nightly)"
    );
    Ok(scheduler)
}
