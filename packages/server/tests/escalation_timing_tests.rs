//! Escalation advance timing against the pure decision function.

use chrono::{Duration, Utc};

use server_core::domains::escalations::engine::{decide_advance, AdvanceDecision};
use server_core::domains::escalations::models::{EscalationStep, NotifyChannel};

fn two_step_policy() -> Vec<EscalationStep> {
    vec![
        EscalationStep {
            delay_minutes: 0,
            notify: vec!["dispatcher".to_string()],
            channel: NotifyChannel::Sms,
        },
        EscalationStep {
            delay_minutes: 15,
            notify: vec!["admin".to_string()],
            channel: NotifyChannel::Sms,
        },
    ]
}

#[test]
fn does_not_advance_before_delay_elapses() {
    // Last notification two minutes ago, next step wants fifteen.
    let now = Utc::now();
    let decision = decide_advance(&two_step_policy(), 0, now - Duration::minutes(2), now);
    assert_eq!(decision, AdvanceDecision::Wait);
}

#[test]
fn advances_once_delay_has_elapsed() {
    let now = Utc::now();
    let decision = decide_advance(&two_step_policy(), 0, now - Duration::minutes(20), now);
    assert_eq!(decision, AdvanceDecision::Execute { next_index: 1 });
}

#[test]
fn times_out_when_no_steps_remain() {
    let now = Utc::now();
    let decision = decide_advance(&two_step_policy(), 1, now - Duration::hours(3), now);
    assert_eq!(decision, AdvanceDecision::TimeOut);
}

#[test]
fn single_step_policy_times_out_after_step_zero() {
    let steps = vec![EscalationStep {
        delay_minutes: 0,
        notify: vec!["admin".to_string()],
        channel: NotifyChannel::Email,
    }];
    let now = Utc::now();
    assert_eq!(
        decide_advance(&steps, 0, now - Duration::minutes(1), now),
        AdvanceDecision::TimeOut
    );
}
