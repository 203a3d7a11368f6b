use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Append-only record of who was chosen for a job and why.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct JobAssignmentLog {
    pub id: Uuid,
    pub company_id: Uuid,
    pub job_id: Uuid,
    pub employee_id: Uuid,
    pub score: Option<f64>,
    pub drive_time_minutes: Option<f64>,
    pub is_manual_override: bool,
    pub reason: Option<String>,
    pub assigned_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl JobAssignmentLog {
    #[allow(clippy::too_many_arguments)]
    pub async fn append_in_tx(
        company_id: Uuid,
        job_id: Uuid,
        employee_id: Uuid,
        score: Option<f64>,
        drive_time_minutes: Option<f64>,
        is_manual_override: bool,
        reason: Option<&str>,
        assigned_by: Option<Uuid>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO job_assignment_logs (
                id, company_id, job_id, employee_id, score, drive_time_minutes,
                is_manual_override, reason, assigned_by
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(company_id)
        .bind(job_id)
        .bind(employee_id)
        .bind(score)
        .bind(drive_time_minutes)
        .bind(is_manual_override)
        .bind(reason)
        .bind(assigned_by)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }

    pub async fn list_for_job(job_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM job_assignment_logs WHERE job_id = $1 ORDER BY created_at",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

/// Append-only record of reassignments with the human-supplied reason.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct JobReassignmentHistory {
    pub id: Uuid,
    pub company_id: Uuid,
    pub job_id: Uuid,
    pub previous_tech_id: Option<Uuid>,
    pub new_tech_id: Uuid,
    pub reason: String,
    pub reassigned_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl JobReassignmentHistory {
    pub async fn append_in_tx(
        company_id: Uuid,
        job_id: Uuid,
        previous_tech_id: Option<Uuid>,
        new_tech_id: Uuid,
        reason: &str,
        reassigned_by: Option<Uuid>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO job_reassignment_history (
                id, company_id, job_id, previous_tech_id, new_tech_id, reason, reassigned_by
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(company_id)
        .bind(job_id)
        .bind(previous_tech_id)
        .bind(new_tech_id)
        .bind(reason)
        .bind(reassigned_by)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }

    pub async fn list_for_job(job_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM job_reassignment_history WHERE job_id = $1 ORDER BY created_at",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

/// Append-only operational audit trail.
pub struct AuditLog;

impl AuditLog {
    pub async fn append_in_tx(
        company_id: Uuid,
        actor_user_id: Option<Uuid>,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
        detail: serde_json::Value,
        conn: &mut PgConnection,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_logs (
                id, company_id, actor_user_id, entity_type, entity_id, action, detail
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(company_id)
        .bind(actor_user_id)
        .bind(entity_type)
        .bind(entity_id)
        .bind(action)
        .bind(detail)
        .execute(conn)
        .await?;
        Ok(())
    }
}
