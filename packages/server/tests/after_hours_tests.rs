//! After-hours window matching, including the midnight wrap and weekend
//! override boundary cases.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use server_core::domains::company::after_hours::{rule_matches, AfterHoursRule, RoutingStrategy};

fn standard_rule() -> AfterHoursRule {
    AfterHoursRule {
        id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        branch_id: None,
        weekday_start: "17:00".to_string(),
        weekday_end: "08:00".to_string(),
        weekend_all_day: true,
        routing_strategy: RoutingStrategy::OnCallPool,
        on_call_employee_ids: vec![],
        surcharge_flat: Decimal::new(7500, 2),
        surcharge_percent: Decimal::new(1000, 2),
        auto_accept: false,
        notify_manager: true,
        manager_phone: Some("+12145550100".to_string()),
        is_active: true,
        created_at: Utc::now(),
    }
}

fn weekday_of(year: i32, month: u32, day: u32) -> chrono::Weekday {
    NaiveDate::from_ymd_opt(year, month, day).unwrap().weekday()
}

#[test]
fn wednesday_evening_is_after_hours() {
    let rule = standard_rule();
    // 2025-03-05 is a Wednesday; 18:00 falls inside 17:00-08:00.
    assert!(rule_matches(&rule, weekday_of(2025, 3, 5), 18 * 60));
}

#[test]
fn wednesday_early_morning_is_after_hours() {
    let rule = standard_rule();
    // 02:00 is inside the wrapped half of the window.
    assert!(rule_matches(&rule, weekday_of(2025, 3, 5), 2 * 60));
}

#[test]
fn wednesday_mid_morning_is_business_hours() {
    let rule = standard_rule();
    assert!(!rule_matches(&rule, weekday_of(2025, 3, 5), 10 * 60));
}

#[test]
fn end_boundary_is_exclusive() {
    let rule = standard_rule();
    // Exactly 08:00 has left the window.
    assert!(!rule_matches(&rule, weekday_of(2025, 3, 5), 8 * 60));
}

#[test]
fn start_boundary_is_inclusive() {
    let rule = standard_rule();
    // Exactly 17:00 enters the window.
    assert!(rule_matches(&rule, weekday_of(2025, 3, 5), 17 * 60));
}

#[test]
fn saturday_noon_is_after_hours_with_weekend_flag() {
    let rule = standard_rule();
    // 2025-03-08 is a Saturday.
    assert!(rule_matches(&rule, weekday_of(2025, 3, 8), 12 * 60));
}

#[test]
fn saturday_noon_is_business_hours_without_weekend_flag() {
    let mut rule = standard_rule();
    rule.weekend_all_day = false;
    assert!(!rule_matches(&rule, weekday_of(2025, 3, 8), 12 * 60));
}

#[test]
fn non_wrapping_window_matches_between_start_and_end() {
    let mut rule = standard_rule();
    rule.weekday_start = "18:00".to_string();
    rule.weekday_end = "22:00".to_string();

    let wednesday = weekday_of(2025, 3, 5);
    assert!(!rule_matches(&rule, wednesday, 17 * 60 + 59));
    assert!(rule_matches(&rule, wednesday, 18 * 60));
    assert!(rule_matches(&rule, wednesday, 21 * 60 + 59));
    assert!(!rule_matches(&rule, wednesday, 22 * 60));
}
