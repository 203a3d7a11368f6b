use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domains::jobs::models::Job;
use crate::domains::jobs::status::JobPriority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyChannel {
    Sms,
    Email,
}

/// One step of an escalation policy. Delay counts from the previous step's
/// notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationStep {
    pub delay_minutes: i64,
    /// Roles to notify (resolved to users of the company at send time).
    pub notify: Vec<String>,
    pub channel: NotifyChannel,
}

/// Entry appended to an event's notification log each time a step executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    pub step: i32,
    pub sent_at: DateTime<Utc>,
    pub channel: NotifyChannel,
    pub targets: Vec<String>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct EscalationPolicy {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub trigger_keywords: Option<Vec<String>>,
    pub trigger_priorities: Option<Vec<String>>,
    pub steps: Json<Vec<EscalationStep>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl EscalationPolicy {
    pub async fn list_active(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM escalation_policies
             WHERE company_id = $1 AND is_active = TRUE
             ORDER BY created_at",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM escalation_policies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO escalation_policies (
                id, company_id, name, trigger_keywords, trigger_priorities, steps, is_active
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(&self.name)
        .bind(&self.trigger_keywords)
        .bind(&self.trigger_priorities)
        .bind(&self.steps)
        .bind(self.is_active)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Whether this policy's trigger conditions match the job.
    ///
    /// Keywords match case-insensitively against the description; priorities
    /// match the job's priority. When both lists are present, both must
    /// match. No conditions at all is a catch-all.
    pub fn matches(&self, job: &Job) -> bool {
        let keywords = self
            .trigger_keywords
            .as_deref()
            .filter(|list| !list.is_empty());
        let priorities = self
            .trigger_priorities
            .as_deref()
            .filter(|list| !list.is_empty());

        let keyword_hit = keywords.map(|list| {
            let description = job
                .description
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();
            list.iter()
                .any(|kw| description.contains(&kw.to_lowercase()))
        });

        let priority_hit = priorities.map(|list| {
            list.iter()
                .filter_map(|p| JobPriority::parse(p))
                .any(|p| p == job.priority)
        });

        match (keyword_hit, priority_hit) {
            (Some(k), Some(p)) => k && p,
            (Some(k), None) => k,
            (None, Some(p)) => p,
            (None, None) => true,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct EscalationEvent {
    pub id: Uuid,
    pub company_id: Uuid,
    pub policy_id: Uuid,
    pub job_id: Uuid,
    pub current_step: i32,
    pub triggered_at: DateTime<Utc>,
    pub notification_log: Json<Vec<NotificationEntry>>,
    pub timed_out: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EscalationEvent {
    pub fn is_terminal(&self) -> bool {
        self.timed_out || self.resolved_at.is_some()
    }

    /// Most recent notification time, falling back to the trigger time for
    /// events that somehow have an empty log.
    pub fn last_sent_at(&self) -> DateTime<Utc> {
        self.notification_log
            .iter()
            .map(|entry| entry.sent_at)
            .max()
            .unwrap_or(self.triggered_at)
    }

    pub async fn find_active_for_job(job_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM escalation_events
             WHERE job_id = $1 AND resolved_at IS NULL AND NOT timed_out
             LIMIT 1",
        )
        .bind(job_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Every active event across all companies, for the advance tick.
    pub async fn find_all_active(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM escalation_events
             WHERE resolved_at IS NULL AND NOT timed_out
             ORDER BY triggered_at",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, company_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM escalation_events WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert_in_tx(&self, conn: &mut PgConnection) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO escalation_events (
                id, company_id, policy_id, job_id, current_step, triggered_at, notification_log
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.policy_id)
        .bind(self.job_id)
        .bind(self.current_step)
        .bind(self.triggered_at)
        .bind(&self.notification_log)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }

    /// Record a step execution: append the log entry and advance the cursor.
    pub async fn record_step(
        id: Uuid,
        step: i32,
        entry: &NotificationEntry,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE escalation_events
             SET current_step = $2,
                 notification_log = notification_log || $3::jsonb
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(step)
        .bind(Json(entry))
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_timed_out(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE escalation_events SET timed_out = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Unconditional resolve; resolving a terminal event is a no-op write.
    pub async fn resolve(
        id: Uuid,
        company_id: Uuid,
        resolved_by: Uuid,
        notes: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE escalation_events
             SET resolved_at = NOW(), resolved_by = $3, resolution_notes = $4
             WHERE id = $1 AND company_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(company_id)
        .bind(resolved_by)
        .bind(notes)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::customers::models::GeocodingStatus;
    use crate::domains::jobs::status::JobStatus;

    fn job(description: &str, priority: JobPriority) -> Job {
        Job {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            customer_id: None,
            location_id: None,
            description: Some(description.to_string()),
            job_type: "service".to_string(),
            priority,
            status: JobStatus::Unassigned,
            assigned_tech_id: None,
            address: None,
            latitude: None,
            longitude: None,
            geocoding_status: GeocodingStatus::Pending,
            geocoding_attempts: 0,
            scheduled_time: None,
            started_at: None,
            completed_at: None,
            required_skills: vec![],
            estimated_duration_minutes: None,
            actual_duration_minutes: None,
            duration_variance_minutes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn policy(keywords: Option<Vec<&str>>, priorities: Option<Vec<&str>>) -> EscalationPolicy {
        EscalationPolicy {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "test".to_string(),
            trigger_keywords: keywords.map(|k| k.into_iter().map(String::from).collect()),
            trigger_priorities: priorities.map(|p| p.into_iter().map(String::from).collect()),
            steps: Json(vec![]),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_conditions_match_everything() {
        let p = policy(None, None);
        assert!(p.matches(&job("routine filter swap", JobPriority::Low)));
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let p = policy(Some(vec!["No Heat"]), None);
        assert!(p.matches(&job("customer reports NO HEAT since morning", JobPriority::Medium)));
        assert!(!p.matches(&job("annual maintenance", JobPriority::Medium)));
    }

    #[test]
    fn test_priority_match() {
        let p = policy(None, Some(vec!["emergency", "high"]));
        assert!(p.matches(&job("anything", JobPriority::Emergency)));
        assert!(!p.matches(&job("anything", JobPriority::Low)));
    }

    #[test]
    fn test_both_conditions_must_match() {
        let p = policy(Some(vec!["leak"]), Some(vec!["emergency"]));
        assert!(p.matches(&job("refrigerant leak", JobPriority::Emergency)));
        assert!(!p.matches(&job("refrigerant leak", JobPriority::Low)));
        assert!(!p.matches(&job("fan noise", JobPriority::Emergency)));
    }

    #[test]
    fn test_empty_lists_are_catch_all() {
        let p = policy(Some(vec![]), Some(vec![]));
        assert!(p.matches(&job("whatever", JobPriority::Medium)));
    }

    #[test]
    fn test_last_sent_at_falls_back_to_trigger_time() {
        let triggered = Utc::now();
        let event = EscalationEvent {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            policy_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            current_step: 0,
            triggered_at: triggered,
            notification_log: Json(vec![]),
            timed_out: false,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            created_at: triggered,
        };
        assert_eq!(event.last_sent_at(), triggered);
    }
}
