//! Dispatch scoring against a fixed-speed routing estimator.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use server_core::domains::customers::models::GeocodingStatus;
use server_core::domains::dispatch::scorer;
use server_core::domains::employees::Employee;
use server_core::domains::jobs::models::Job;
use server_core::domains::jobs::status::{JobPriority, JobStatus};
use server_core::kernel::routing::EstimatingRoutingClient;

fn job_at(latitude: Option<f64>, longitude: Option<f64>, priority: JobPriority) -> Job {
    Job {
        id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        customer_id: None,
        location_id: None,
        description: None,
        job_type: "service".to_string(),
        priority,
        status: JobStatus::Unassigned,
        assigned_tech_id: None,
        address: Some("500 Main St, Dallas, TX".to_string()),
        latitude,
        longitude,
        geocoding_status: GeocodingStatus::Complete,
        geocoding_attempts: 1,
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

fn tech_at(name: &str, latitude: Option<f64>, longitude: Option<f64>) -> Employee {
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
        max_concurrent_jobs: Some(3),
        rating: Some(5.0),
        home_address: None,
        current_latitude: latitude,
        current_longitude: longitude,
        location_updated_at: Some(Utc::now()),
        last_job_completed_at: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn emergency_candidate_at_job_site_scores_120() {
    // One tech standing on the job site: distance 60, availability 20,
    // skill 20, rating 10, workload 10. The emergency reshaping is not
    // clamped, so the total exceeds 100.
    let job = job_at(Some(32.7767), Some(-96.7970), JobPriority::Emergency);
    let tech = tech_at("ace", Some(32.7767), Some(-96.7970));

    let candidates = scorer::score(&EstimatingRoutingClient, &job, &[tech], true).await;

    assert_eq!(candidates.len(), 1);
    let top = &candidates[0];
    assert_eq!(top.breakdown.proximity, 60.0);
    assert_eq!(top.breakdown.availability, 20.0);
    assert_eq!(top.breakdown.skill, 20.0);
    assert_eq!(top.breakdown.rating, 10.0);
    assert_eq!(top.breakdown.workload, 10.0);
    assert_eq!(top.score, 120.0);
}

#[tokio::test]
async fn job_without_coordinates_yields_no_candidates() {
    let job = job_at(None, None, JobPriority::Medium);
    let tech = tech_at("ace", Some(32.7767), Some(-96.7970));

    let candidates = scorer::score(&EstimatingRoutingClient, &job, &[tech], false).await;
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn techs_without_coordinates_are_excluded() {
    let job = job_at(Some(32.7767), Some(-96.7970), JobPriority::Medium);
    let located = tech_at("located", Some(32.7800), Some(-96.8000));
    let unlocated = tech_at("unlocated", None, None);

    let candidates =
        scorer::score(&EstimatingRoutingClient, &job, &[unlocated, located], false).await;

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name, "located");
}

#[tokio::test]
async fn closer_tech_ranks_first() {
    let job = job_at(Some(32.7767), Some(-96.7970), JobPriority::Medium);
    let near = tech_at("near", Some(32.7770), Some(-96.7975));
    let far = tech_at("far", Some(33.2000), Some(-97.1000));

    let candidates = scorer::score(&EstimatingRoutingClient, &job, &[far, near], false).await;

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].name, "near");
    assert!(candidates[0].score > candidates[1].score);
}

#[tokio::test]
async fn drive_times_stay_index_aligned_with_techs() {
    let job = job_at(Some(32.7767), Some(-96.7970), JobPriority::Medium);
    let near = tech_at("near", Some(32.7770), Some(-96.7975));
    let far = tech_at("far", Some(33.2000), Some(-97.1000));

    let candidates = scorer::score(&EstimatingRoutingClient, &job, &[near, far], false).await;

    let near_candidate = candidates.iter().find(|c| c.name == "near").unwrap();
    let far_candidate = candidates.iter().find(|c| c.name == "far").unwrap();
    assert!(near_candidate.drive_time_minutes < far_candidate.drive_time_minutes);
}
