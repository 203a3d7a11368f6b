use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::common::LatLng;
use crate::domains::customers::models::GeocodingStatus;
use crate::domains::jobs::status::{JobPriority, JobStatus};

/// Job - unit of dispatchable work
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub description: Option<String>,
    pub job_type: String,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub assigned_tech_id: Option<Uuid>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocoding_status: GeocodingStatus,
    pub geocoding_attempts: i32,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub required_skills: Vec<String>,
    pub estimated_duration_minutes: Option<i32>,
    pub actual_duration_minutes: Option<i32>,
    pub duration_variance_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional filters for job listings.
#[derive(Debug, Default, Clone)]
pub struct JobFilters {
    pub status: Option<JobStatus>,
    pub priority: Option<JobPriority>,
    pub assigned_tech_id: Option<Uuid>,
}

impl Job {
    /// Site coordinates, when geocoding has resolved them.
    pub fn location(&self) -> Option<LatLng> {
        LatLng::from_parts(self.latitude, self.longitude)
    }

    pub async fn find_by_id(id: Uuid, company_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Scoped fetch with a row lock, for use inside transitions.
    pub async fn find_for_update(
        id: Uuid,
        company_id: Uuid,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM jobs WHERE id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(conn)
        .await
        .map_err(Into::into)
    }

    pub async fn list(company_id: Uuid, filters: &JobFilters, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM jobs
             WHERE company_id = $1
               AND ($2::job_status IS NULL OR status = $2)
               AND ($3::job_priority IS NULL OR priority = $3)
               AND ($4::uuid IS NULL OR assigned_tech_id = $4)
             ORDER BY created_at DESC
             LIMIT 200",
        )
        .bind(company_id)
        .bind(filters.status)
        .bind(filters.priority)
        .bind(filters.assigned_tech_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Unassigned jobs from an id set, for batch dispatch.
    pub async fn find_unassigned_in(
        ids: &[Uuid],
        company_id: Uuid,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM jobs
             WHERE company_id = $1 AND id = ANY($2) AND status = 'unassigned'",
        )
        .bind(company_id)
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO jobs (
                id, company_id, customer_id, location_id, description, job_type,
                priority, address, scheduled_time, required_skills,
                estimated_duration_minutes
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.customer_id)
        .bind(self.location_id)
        .bind(&self.description)
        .bind(&self.job_type)
        .bind(self.priority)
        .bind(&self.address)
        .bind(self.scheduled_time)
        .bind(&self.required_skills)
        .bind(self.estimated_duration_minutes)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Partial update of non-address fields.
    pub async fn update_details(
        id: Uuid,
        company_id: Uuid,
        description: Option<&str>,
        job_type: Option<&str>,
        priority: Option<JobPriority>,
        scheduled_time: Option<DateTime<Utc>>,
        required_skills: Option<&[String]>,
        estimated_duration_minutes: Option<i32>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE jobs SET
                description = COALESCE($3, description),
                job_type = COALESCE($4, job_type),
                priority = COALESCE($5, priority),
                scheduled_time = COALESCE($6, scheduled_time),
                required_skills = COALESCE($7, required_skills),
                estimated_duration_minutes = COALESCE($8, estimated_duration_minutes),
                updated_at = NOW()
             WHERE id = $1 AND company_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(company_id)
        .bind(description)
        .bind(job_type)
        .bind(priority)
        .bind(scheduled_time)
        .bind(required_skills)
        .bind(estimated_duration_minutes)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Change the job site address. One statement also clears coordinates and
    /// resets geocoding, so no stale lat/lng is ever visible alongside the
    /// new address.
    pub async fn update_address(
        id: Uuid,
        company_id: Uuid,
        address: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE jobs SET
                address = $3,
                latitude = NULL,
                longitude = NULL,
                geocoding_status = 'pending',
                geocoding_attempts = 0,
                updated_at = NOW()
             WHERE id = $1 AND company_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(company_id)
        .bind(address)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}
