use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::LatLng;

/// Employee - dispatchable worker
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Employee {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub skills: Vec<String>,
    pub skill_levels: Json<HashMap<String, i32>>,
    pub is_active: bool,
    pub is_available: bool,
    pub current_job_id: Option<Uuid>,
    pub current_jobs_count: i32,
    pub max_concurrent_jobs: Option<i32>,
    pub rating: Option<f64>,
    pub home_address: Option<String>,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub last_job_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    /// Last reported position, if any.
    pub fn location(&self) -> Option<LatLng> {
        LatLng::from_parts(self.current_latitude, self.current_longitude)
    }

    pub async fn find_by_id(id: Uuid, company_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM employees WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_ids(ids: &[Uuid], pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM employees WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM employees WHERE company_id = $1 ORDER BY created_at",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Pool of techs eligible for dispatch: active, available, under their
    /// concurrency cap, with a location report no older than ten minutes
    /// (techs who have never reported stay in; scoring drops them).
    pub async fn find_eligible(company_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM employees
             WHERE company_id = $1
               AND is_active = TRUE
               AND is_available = TRUE
               AND current_jobs_count < COALESCE(max_concurrent_jobs, 1)
               AND (location_updated_at IS NULL
                    OR location_updated_at >= NOW() - INTERVAL '10 minutes')
             ORDER BY created_at",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO employees (
                id, company_id, user_id, name, skills, skill_levels,
                is_active, is_available, max_concurrent_jobs, rating, home_address
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.user_id)
        .bind(&self.name)
        .bind(&self.skills)
        .bind(&self.skill_levels)
        .bind(self.is_active)
        .bind(self.is_available)
        .bind(self.max_concurrent_jobs)
        .bind(self.rating)
        .bind(&self.home_address)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Partial update of mutable profile fields.
    pub async fn update_profile(
        id: Uuid,
        company_id: Uuid,
        name: Option<&str>,
        skills: Option<&[String]>,
        is_active: Option<bool>,
        is_available: Option<bool>,
        max_concurrent_jobs: Option<i32>,
        rating: Option<f64>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE employees SET
                name = COALESCE($3, name),
                skills = COALESCE($4, skills),
                is_active = COALESCE($5, is_active),
                is_available = COALESCE($6, is_available),
                max_concurrent_jobs = COALESCE($7, max_concurrent_jobs),
                rating = COALESCE($8, rating)
             WHERE id = $1 AND company_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(company_id)
        .bind(name)
        .bind(skills)
        .bind(is_active)
        .bind(is_available)
        .bind(max_concurrent_jobs)
        .bind(rating)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Record a location ping from the tech's device.
    pub async fn update_location(
        id: Uuid,
        company_id: Uuid,
        latitude: f64,
        longitude: f64,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE employees SET
                current_latitude = $3,
                current_longitude = $4,
                location_updated_at = NOW()
             WHERE id = $1 AND company_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(company_id)
        .bind(latitude)
        .bind(longitude)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Bare employee for pure-logic tests.
    pub fn employee(name: &str) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            user_id: None,
            name: name.to_string(),
            skills: vec![],
            skill_levels: Json(HashMap::new()),
            is_active: true,
            is_available: true,
            current_job_id: None,
            current_jobs_count: 0,
            max_concurrent_jobs: Some(1),
            rating: None,
            home_address: None,
            current_latitude: None,
            current_longitude: None,
            location_updated_at: Some(Utc::now()),
            last_job_completed_at: None,
            created_at: Utc::now(),
        }
    }
}
