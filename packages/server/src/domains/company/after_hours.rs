//! After-hours routing: decides whether a moment falls inside a company's
//! after-hours window and which intake strategy applies.
//!
//! Window semantics: start inclusive, end exclusive, minutes-of-day in the
//! company's local zone. A window with `start > end` wraps midnight
//! (17:00-08:00 covers evening and early morning). `weekend_all_day`
//! short-circuits Saturday and Sunday to after-hours.

use anyhow::Result;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::domains::company::models::Company;
use crate::domains::employees::models::Employee;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "routing_strategy", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    OnCallPool,
    VoicemailQueue,
    EmergencyOnly,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AfterHoursRule {
    pub id: Uuid,
    pub company_id: Uuid,
    pub branch_id: Option<Uuid>,
    /// HH:MM, may wrap past `weekday_end`
    pub weekday_start: String,
    pub weekday_end: String,
    pub weekend_all_day: bool,
    pub routing_strategy: RoutingStrategy,
    pub on_call_employee_ids: Vec<Uuid>,
    pub surcharge_flat: Decimal,
    pub surcharge_percent: Decimal,
    pub auto_accept: bool,
    pub notify_manager: bool,
    pub manager_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl AfterHoursRule {
    /// Active rules for a company, optionally narrowed to one branch.
    /// Branch-specific rules sort ahead of company-wide ones.
    pub async fn find_active(
        company_id: Uuid,
        branch_id: Option<Uuid>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM after_hours_rules
             WHERE company_id = $1
               AND is_active = TRUE
               AND ($2::uuid IS NULL OR branch_id = $2 OR branch_id IS NULL)
             ORDER BY branch_id IS NULL, created_at",
        )
        .bind(company_id)
        .bind(branch_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM after_hours_rules WHERE company_id = $1 ORDER BY created_at",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO after_hours_rules (
                id, company_id, branch_id, weekday_start, weekday_end,
                weekend_all_day, routing_strategy, on_call_employee_ids,
                surcharge_flat, surcharge_percent, auto_accept, notify_manager,
                manager_phone, is_active
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.branch_id)
        .bind(&self.weekday_start)
        .bind(&self.weekday_end)
        .bind(self.weekend_all_day)
        .bind(self.routing_strategy)
        .bind(&self.on_call_employee_ids)
        .bind(self.surcharge_flat)
        .bind(self.surcharge_percent)
        .bind(self.auto_accept)
        .bind(self.notify_manager)
        .bind(&self.manager_phone)
        .bind(self.is_active)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}

/// Outcome of evaluating the after-hours rules at one moment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterHoursEvaluation {
    pub is_after_hours: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_strategy: Option<RoutingStrategy>,
    pub on_call_employee_ids: Vec<Uuid>,
    pub surcharge_flat: f64,
    pub surcharge_percent: f64,
    pub auto_accept: bool,
    pub notify_manager: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_phone: Option<String>,
}

impl AfterHoursEvaluation {
    fn business_hours() -> Self {
        Self {
            is_after_hours: false,
            routing_strategy: None,
            on_call_employee_ids: Vec::new(),
            surcharge_flat: 0.0,
            surcharge_percent: 0.0,
            auto_accept: false,
            notify_manager: false,
            manager_phone: None,
        }
    }

    fn from_rule(rule: &AfterHoursRule) -> Self {
        Self {
            is_after_hours: true,
            routing_strategy: Some(rule.routing_strategy),
            on_call_employee_ids: rule.on_call_employee_ids.clone(),
            surcharge_flat: rule.surcharge_flat.to_f64().unwrap_or(0.0),
            surcharge_percent: rule.surcharge_percent.to_f64().unwrap_or(0.0),
            auto_accept: rule.auto_accept,
            notify_manager: rule.notify_manager,
            manager_phone: rule.manager_phone.clone(),
        }
    }
}

/// Parse an HH:MM string into minutes of day.
pub fn parse_minutes_of_day(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h >= 24 || m >= 60 {
        return None;
    }
    Some(h * 60 + m)
}

/// Start-inclusive, end-exclusive window test, wrapping midnight when
/// `start > end`.
pub fn window_contains(start: u32, end: u32, minute: u32) -> bool {
    if start <= end {
        start <= minute && minute < end
    } else {
        minute >= start || minute < end
    }
}

/// Whether one rule places the given local weekday/minute in after-hours.
pub fn rule_matches(rule: &AfterHoursRule, weekday: Weekday, minute_of_day: u32) -> bool {
    if matches!(weekday, Weekday::Sat | Weekday::Sun) && rule.weekend_all_day {
        return true;
    }

    let (Some(start), Some(end)) = (
        parse_minutes_of_day(&rule.weekday_start),
        parse_minutes_of_day(&rule.weekday_end),
    ) else {
        warn!(rule_id = %rule.id, "unparseable after-hours window, skipping rule");
        return false;
    };

    window_contains(start, end, minute_of_day)
}

/// Evaluate the company's after-hours rules at `at`.
///
/// The first matching rule wins; no active rules means business hours.
pub async fn evaluate(
    company: &Company,
    branch_id: Option<Uuid>,
    at: DateTime<Utc>,
    pool: &PgPool,
) -> Result<AfterHoursEvaluation> {
    let rules = AfterHoursRule::find_active(company.id, branch_id, pool).await?;
    if rules.is_empty() {
        return Ok(AfterHoursEvaluation::business_hours());
    }

    let tz: Tz = company.tz();
    let local = at.with_timezone(&tz);
    let minute_of_day = local.hour() * 60 + local.minute();
    let weekday = local.weekday();

    for rule in &rules {
        if rule_matches(rule, weekday, minute_of_day) {
            return Ok(AfterHoursEvaluation::from_rule(rule));
        }
    }

    Ok(AfterHoursEvaluation::business_hours())
}

/// First on-call tech (in rule order) who is active, available, and under
/// their concurrency cap. Empty input yields `None`.
pub async fn pick_on_call_tech(
    on_call_employee_ids: &[Uuid],
    pool: &PgPool,
) -> Result<Option<Employee>> {
    if on_call_employee_ids.is_empty() {
        return Ok(None);
    }

    let employees = Employee::find_by_ids(on_call_employee_ids, pool).await?;

    // Preserve the configured rotation order, not the query order.
    for id in on_call_employee_ids {
        let Some(employee) = employees.iter().find(|e| e.id == *id) else {
            continue;
        };
        if employee.is_active
            && employee.is_available
            && employee.current_jobs_count < employee.max_concurrent_jobs.unwrap_or(1)
        {
            return Ok(Some(employee.clone()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(start: &str, end: &str, weekend_all_day: bool) -> AfterHoursRule {
        AfterHoursRule {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            branch_id: None,
            weekday_start: start.to_string(),
            weekday_end: end.to_string(),
            weekend_all_day,
            routing_strategy: RoutingStrategy::OnCallPool,
            on_call_employee_ids: vec![],
            surcharge_flat: Decimal::new(5000, 2),
            surcharge_percent: Decimal::new(1500, 2),
            auto_accept: false,
            notify_manager: true,
            manager_phone: Some("+12145550100".to_string()),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_minutes_of_day() {
        assert_eq!(parse_minutes_of_day("17:00"), Some(1020));
        assert_eq!(parse_minutes_of_day("08:30"), Some(510));
        assert_eq!(parse_minutes_of_day("24:00"), None);
        assert_eq!(parse_minutes_of_day("banana"), None);
    }

    #[test]
    fn test_non_wrapping_window_boundaries() {
        // 17:00-23:00: start inclusive, end exclusive
        assert!(window_contains(1020, 1380, 1020));
        assert!(window_contains(1020, 1380, 1379));
        assert!(!window_contains(1020, 1380, 1380));
        assert!(!window_contains(1020, 1380, 1019));
    }

    #[test]
    fn test_midnight_wrapping_window() {
        let r = rule("17:00", "08:00", true);

        // Wednesday 18:00 -> inside
        assert!(rule_matches(&r, Weekday::Wed, 18 * 60));
        // Wednesday 02:00 -> inside (wrapped)
        assert!(rule_matches(&r, Weekday::Wed, 2 * 60));
        // Wednesday 10:00 -> outside
        assert!(!rule_matches(&r, Weekday::Wed, 10 * 60));
        // Exactly 08:00 -> outside (end exclusive)
        assert!(!rule_matches(&r, Weekday::Wed, 8 * 60));
        // Exactly 17:00 -> inside (start inclusive)
        assert!(rule_matches(&r, Weekday::Wed, 17 * 60));
    }

    #[test]
    fn test_weekend_override_requires_flag() {
        let with_flag = rule("17:00", "08:00", true);
        let without_flag = rule("17:00", "08:00", false);

        // Saturday noon
        assert!(rule_matches(&with_flag, Weekday::Sat, 12 * 60));
        assert!(!rule_matches(&without_flag, Weekday::Sat, 12 * 60));
    }

    #[test]
    fn test_unparseable_window_never_matches() {
        let r = rule("late", "early", false);
        assert!(!rule_matches(&r, Weekday::Mon, 0));
    }
}
