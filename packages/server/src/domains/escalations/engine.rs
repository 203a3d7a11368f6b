//! Escalation engine: trigger, timed advance, resolve.
//!
//! Triggering picks the first matching active policy and executes step zero
//! immediately. The advance tick walks every active event and executes the
//! next step once its delay has elapsed since the previous notification;
//! events past their last step time out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::AppError;
use crate::domains::auth::models::User;
use crate::domains::jobs::models::Job;
use crate::kernel::ServerDeps;

use super::models::{
    EscalationEvent, EscalationPolicy, EscalationStep, NotificationEntry, NotifyChannel,
};

/// Outcome of a trigger attempt. Every variant is a 200-level answer; the
/// caller reports `triggered` plus a reason.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResult {
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl TriggerResult {
    fn triggered(event_id: Uuid) -> Self {
        Self {
            triggered: true,
            event_id: Some(event_id),
            reason: None,
        }
    }

    fn skipped(reason: &'static str, event_id: Option<Uuid>) -> Self {
        Self {
            triggered: false,
            event_id,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStats {
    pub advanced: usize,
    pub timed_out: usize,
}

/// What the advance tick should do with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceDecision {
    TimeOut,
    Wait,
    Execute { next_index: usize },
}

/// Pure advance decision: time out past the last step, wait while the next
/// step's delay has not elapsed since the previous notification.
pub fn decide_advance(
    steps: &[EscalationStep],
    current_step: i32,
    last_sent_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AdvanceDecision {
    let next_index = (current_step + 1) as usize;
    let Some(next) = steps.get(next_index) else {
        return AdvanceDecision::TimeOut;
    };

    let elapsed_minutes = (now - last_sent_at).num_minutes();
    if elapsed_minutes < next.delay_minutes {
        AdvanceDecision::Wait
    } else {
        AdvanceDecision::Execute { next_index }
    }
}

/// Start an escalation for a job, if a policy matches and none is active.
pub async fn trigger_escalation(
    deps: &ServerDeps,
    job_id: Uuid,
    company_id: Uuid,
) -> Result<TriggerResult, AppError> {
    let Some(job) = Job::find_by_id(job_id, company_id, &deps.db_pool).await? else {
        return Ok(TriggerResult::skipped("job not found", None));
    };

    if job.status.is_terminal() {
        return Ok(TriggerResult::skipped("job already terminal", None));
    }

    if let Some(active) = EscalationEvent::find_active_for_job(job.id, &deps.db_pool).await? {
        return Ok(TriggerResult::skipped(
            "escalation already active",
            Some(active.id),
        ));
    }

    let policies = EscalationPolicy::list_active(company_id, &deps.db_pool).await?;
    let Some(policy) = policies.iter().find(|p| p.matches(&job)) else {
        return Ok(TriggerResult::skipped("no matching policy", None));
    };

    let Some(first_step) = policy.steps.first() else {
        return Ok(TriggerResult::skipped("no matching policy", None));
    };

    let now = Utc::now();
    let entry = execute_step(deps, &job, company_id, 0, first_step, now).await;

    let event = EscalationEvent {
        id: Uuid::now_v7(),
        company_id,
        policy_id: policy.id,
        job_id: job.id,
        current_step: 0,
        triggered_at: now,
        notification_log: Json(vec![entry]),
        timed_out: false,
        resolved_at: None,
        resolved_by: None,
        resolution_notes: None,
        created_at: now,
    };

    let mut tx = deps.db_pool.begin().await.map_err(AppError::Database)?;
    let inserted = event.insert_in_tx(&mut tx).await?;
    tx.commit().await.map_err(AppError::Database)?;

    info!(job_id = %job.id, event_id = %inserted.id, policy = %policy.name, "escalation triggered");
    Ok(TriggerResult::triggered(inserted.id))
}

/// Timer entry point: advance every active event whose next delay elapsed.
///
/// Per-event failures are logged and skipped; the tick always completes.
pub async fn advance_escalations(deps: &ServerDeps) -> Result<AdvanceStats, AppError> {
    let now = Utc::now();
    let mut stats = AdvanceStats::default();

    for event in EscalationEvent::find_all_active(&deps.db_pool).await? {
        match advance_one(deps, &event, now).await {
            Ok(Advanced::Stepped) => stats.advanced += 1,
            Ok(Advanced::TimedOut) => stats.timed_out += 1,
            Ok(Advanced::Waiting) => {}
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "failed to advance escalation");
            }
        }
    }

    Ok(stats)
}

enum Advanced {
    Stepped,
    TimedOut,
    Waiting,
}

async fn advance_one(
    deps: &ServerDeps,
    event: &EscalationEvent,
    now: DateTime<Utc>,
) -> Result<Advanced, AppError> {
    let policy = EscalationPolicy::find_by_id(event.policy_id, &deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("EscalationPolicy"))?;

    match decide_advance(&policy.steps, event.current_step, event.last_sent_at(), now) {
        AdvanceDecision::Wait => Ok(Advanced::Waiting),
        AdvanceDecision::TimeOut => {
            EscalationEvent::mark_timed_out(event.id, &deps.db_pool).await?;
            info!(event_id = %event.id, "escalation timed out");
            Ok(Advanced::TimedOut)
        }
        AdvanceDecision::Execute { next_index } => {
            let step = &policy.steps[next_index];
            let job = Job::find_by_id(event.job_id, event.company_id, &deps.db_pool)
                .await?
                .ok_or(AppError::NotFound("Job"))?;

            let entry =
                execute_step(deps, &job, event.company_id, next_index as i32, step, now).await;
            EscalationEvent::record_step(event.id, next_index as i32, &entry, &deps.db_pool)
                .await?;

            info!(event_id = %event.id, step = next_index, "escalation advanced");
            Ok(Advanced::Stepped)
        }
    }
}

/// Send one step's notifications and build its log entry. Transport failures
/// are logged, never propagated; the entry records the intended targets.
async fn execute_step(
    deps: &ServerDeps,
    job: &Job,
    company_id: Uuid,
    step_index: i32,
    step: &EscalationStep,
    now: DateTime<Utc>,
) -> NotificationEntry {
    if step.channel == NotifyChannel::Sms {
        match User::find_notifiable_by_roles(company_id, &step.notify, &deps.db_pool).await {
            Ok(users) => {
                let body = format!(
                    "Escalation (step {}): job {} [{}] needs attention",
                    step_index + 1,
                    job.id,
                    job.job_type,
                );
                for user in users {
                    if let Some(phone) = &user.phone {
                        if let Err(e) = deps.sms.send(phone, &body).await {
                            warn!(user_id = %user.id, error = %e, "escalation SMS failed");
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to resolve escalation targets"),
        }
    }

    NotificationEntry {
        step: step_index,
        sent_at: now,
        channel: step.channel,
        targets: step.notify.clone(),
    }
}

/// Unconditionally resolve an event. Resolving an already-terminal event
/// re-stamps the resolution fields and is otherwise a no-op.
pub async fn resolve_escalation(
    deps: &ServerDeps,
    event_id: Uuid,
    company_id: Uuid,
    resolved_by: Uuid,
    notes: Option<&str>,
) -> Result<EscalationEvent, AppError> {
    EscalationEvent::resolve(event_id, company_id, resolved_by, notes, &deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("EscalationEvent"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn steps(delays: &[i64]) -> Vec<EscalationStep> {
        delays
            .iter()
            .map(|d| EscalationStep {
                delay_minutes: *d,
                notify: vec!["admin".to_string()],
                channel: NotifyChannel::Sms,
            })
            .collect()
    }

    #[test]
    fn test_wait_while_delay_unelapsed() {
        let now = Utc::now();
        let decision = decide_advance(&steps(&[0, 15]), 0, now - Duration::minutes(2), now);
        assert_eq!(decision, AdvanceDecision::Wait);
    }

    #[test]
    fn test_execute_after_delay_elapsed() {
        let now = Utc::now();
        let decision = decide_advance(&steps(&[0, 15]), 0, now - Duration::minutes(20), now);
        assert_eq!(decision, AdvanceDecision::Execute { next_index: 1 });
    }

    #[test]
    fn test_time_out_past_last_step() {
        let now = Utc::now();
        let decision = decide_advance(&steps(&[0, 15]), 1, now - Duration::minutes(90), now);
        assert_eq!(decision, AdvanceDecision::TimeOut);
    }

    #[test]
    fn test_delay_boundary_is_inclusive() {
        // Exactly delayMinutes elapsed fires the step.
        let now = Utc::now();
        let decision = decide_advance(&steps(&[0, 15]), 0, now - Duration::minutes(15), now);
        assert_eq!(decision, AdvanceDecision::Execute { next_index: 1 });
    }
}
