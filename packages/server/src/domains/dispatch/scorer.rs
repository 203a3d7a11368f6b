//! Candidate scoring for dispatch.
//!
//! Five signals, fixed weights: drive proximity (40, or 60 for emergencies),
//! availability (20), skill coverage (20), rating (10), workload (10). An
//! emergency widens the proximity weight without shrinking the others, so a
//! perfect emergency candidate can total 120.

use serde::Serialize;
use uuid::Uuid;

use crate::common::LatLng;
use crate::domains::employees::Employee;
use crate::domains::jobs::Job;
use crate::kernel::routing::{RouteInfo, RoutingClient};

const PROXIMITY_WEIGHT: f64 = 40.0;
const PROXIMITY_WEIGHT_EMERGENCY: f64 = 60.0;
const PROXIMITY_CUTOFF_MINUTES: f64 = 45.0;
const PROXIMITY_CUTOFF_MINUTES_EMERGENCY: f64 = 20.0;
const AVAILABILITY_WEIGHT: f64 = 20.0;
const SKILL_WEIGHT: f64 = 20.0;
const RATING_WEIGHT: f64 = 10.0;
const WORKLOAD_WEIGHT: f64 = 10.0;
const DEFAULT_RATING: f64 = 3.0;

/// Per-signal contributions for one candidate.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub proximity: f64,
    pub availability: f64,
    pub skill: f64,
    pub rating: f64,
    pub workload: f64,
}

/// A scored tech, ranked by descending total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub employee_id: Uuid,
    pub name: String,
    pub score: f64,
    pub drive_time_minutes: f64,
    pub breakdown: ScoreBreakdown,
    #[serde(skip)]
    pub rating: f64,
    #[serde(skip)]
    pub current_jobs_count: i32,
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Score one tech against one job.
pub fn score_tech(
    tech: &Employee,
    route: RouteInfo,
    required_skills: &[String],
    is_emergency: bool,
) -> Candidate {
    let (weight, cutoff) = if is_emergency {
        (PROXIMITY_WEIGHT_EMERGENCY, PROXIMITY_CUTOFF_MINUTES_EMERGENCY)
    } else {
        (PROXIMITY_WEIGHT, PROXIMITY_CUTOFF_MINUTES)
    };

    let minutes = finite_or_zero(route.duration_minutes());
    let proximity = finite_or_zero((1.0 - (minutes / cutoff).min(1.0)) * weight);

    let availability = if tech.is_available {
        AVAILABILITY_WEIGHT
    } else {
        0.0
    };

    let skill = if required_skills.is_empty() {
        SKILL_WEIGHT
    } else {
        let matched = required_skills
            .iter()
            .filter(|required| tech.skills.iter().any(|s| s.eq_ignore_ascii_case(required)))
            .count();
        finite_or_zero(matched as f64 / required_skills.len() as f64 * SKILL_WEIGHT)
    };

    let rating_value = tech.rating.unwrap_or(DEFAULT_RATING);
    let rating = finite_or_zero(rating_value / 5.0 * RATING_WEIGHT);

    let workload = (WORKLOAD_WEIGHT - tech.current_jobs_count as f64 * 2.0).max(0.0);

    let breakdown = ScoreBreakdown {
        proximity,
        availability,
        skill,
        rating,
        workload,
    };

    Candidate {
        employee_id: tech.id,
        name: tech.name.clone(),
        score: proximity + availability + skill + rating + workload,
        drive_time_minutes: minutes,
        breakdown,
        rating: rating_value,
        current_jobs_count: tech.current_jobs_count,
    }
}

/// Order candidates: descending total, then ascending drive time, then
/// descending rating, then ascending active-job count.
pub fn rank(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.drive_time_minutes.total_cmp(&b.drive_time_minutes))
            .then(b.rating.total_cmp(&a.rating))
            .then(a.current_jobs_count.cmp(&b.current_jobs_count))
    });
    candidates
}

/// Score a pool of eligible techs for one job.
///
/// Jobs without coordinates yield an empty list; techs without coordinates
/// are excluded. Drive times come from one batched matrix call.
pub async fn score(
    routing: &dyn RoutingClient,
    job: &Job,
    eligible_techs: &[Employee],
    is_emergency: bool,
) -> Vec<Candidate> {
    let Some(origin) = job.location() else {
        return Vec::new();
    };

    let located: Vec<(&Employee, LatLng)> = eligible_techs
        .iter()
        .filter_map(|tech| tech.location().map(|loc| (tech, loc)))
        .collect();
    if located.is_empty() {
        return Vec::new();
    }

    let destinations: Vec<LatLng> = located.iter().map(|(_, loc)| *loc).collect();
    let routes = routing.drive_time_matrix(origin, &destinations).await;

    let candidates = located
        .iter()
        .zip(routes)
        .map(|((tech, _), route)| score_tech(tech, route, &job.required_skills, is_emergency))
        .collect();

    rank(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::employees::models::test_support::employee;

    fn route(minutes: f64) -> RouteInfo {
        RouteInfo {
            duration_seconds: minutes * 60.0,
            distance_meters: minutes * 833.0,
            estimated: false,
        }
    }

    #[test]
    fn test_perfect_emergency_candidate_totals_120() {
        // Tech on top of the job site, available, rating 5, no workload.
        let mut tech = employee("ace");
        tech.rating = Some(5.0);

        let c = score_tech(&tech, route(0.0), &[], true);
        assert_eq!(c.breakdown.proximity, 60.0);
        assert_eq!(c.breakdown.availability, 20.0);
        assert_eq!(c.breakdown.skill, 20.0);
        assert_eq!(c.breakdown.rating, 10.0);
        assert_eq!(c.breakdown.workload, 10.0);
        assert_eq!(c.score, 120.0);
    }

    #[test]
    fn test_perfect_normal_candidate_totals_100() {
        let mut tech = employee("ace");
        tech.rating = Some(5.0);

        let c = score_tech(&tech, route(0.0), &[], false);
        assert_eq!(c.breakdown.proximity, 40.0);
        assert_eq!(c.score, 100.0);
    }

    #[test]
    fn test_proximity_zero_at_cutoff() {
        let tech = employee("far");
        let normal = score_tech(&tech, route(45.0), &[], false);
        assert_eq!(normal.breakdown.proximity, 0.0);

        let emergency = score_tech(&tech, route(20.0), &[], true);
        assert_eq!(emergency.breakdown.proximity, 0.0);

        // Beyond the cutoff clamps, never goes negative.
        let beyond = score_tech(&tech, route(300.0), &[], false);
        assert_eq!(beyond.breakdown.proximity, 0.0);
    }

    #[test]
    fn test_missing_rating_treated_as_three() {
        let tech = employee("unrated");
        let c = score_tech(&tech, route(0.0), &[], false);
        assert_eq!(c.breakdown.rating, 6.0);
    }

    #[test]
    fn test_skill_coverage_is_proportional() {
        let mut tech = employee("partial");
        tech.skills = vec!["brazing".to_string()];

        let required = vec!["brazing".to_string(), "controls".to_string()];
        let c = score_tech(&tech, route(0.0), &required, false);
        assert_eq!(c.breakdown.skill, 10.0);
    }

    #[test]
    fn test_skill_match_is_case_insensitive() {
        let mut tech = employee("caps");
        tech.skills = vec!["Brazing".to_string()];

        let required = vec!["brazing".to_string()];
        let c = score_tech(&tech, route(0.0), &required, false);
        assert_eq!(c.breakdown.skill, 20.0);
    }

    #[test]
    fn test_workload_penalty_floors_at_zero() {
        let mut tech = employee("busy");
        tech.current_jobs_count = 7;
        let c = score_tech(&tech, route(0.0), &[], false);
        assert_eq!(c.breakdown.workload, 0.0);
    }

    #[test]
    fn test_unavailable_tech_scores_zero_availability() {
        let mut tech = employee("off");
        tech.is_available = false;
        let c = score_tech(&tech, route(0.0), &[], false);
        assert_eq!(c.breakdown.availability, 0.0);
    }

    #[test]
    fn test_tie_break_by_drive_time_then_rating_then_workload() {
        let mut near = employee("near");
        near.rating = Some(4.0);
        let mut far = employee("far");
        far.rating = Some(4.0);

        // Same total is impossible with different drive times under one
        // weight, so craft equal totals via rating differences.
        let a = score_tech(&near, route(0.0), &[], false);
        let b = score_tech(&far, route(0.0), &[], false);
        assert_eq!(a.score, b.score);

        let mut b2 = b.clone();
        b2.drive_time_minutes = 5.0;
        let ranked = rank(vec![b2.clone(), a.clone()]);
        assert_eq!(ranked[0].name, "near");

        // Equal drive: higher rating first.
        let mut high = a.clone();
        high.rating = 5.0;
        let mut low = a.clone();
        low.rating = 2.0;
        let ranked = rank(vec![low.clone(), high.clone()]);
        assert_eq!(ranked[0].rating, 5.0);

        // Equal drive and rating: lighter workload first.
        let mut light = a.clone();
        light.current_jobs_count = 0;
        let mut heavy = a;
        heavy.current_jobs_count = 3;
        let ranked = rank(vec![heavy, light]);
        assert_eq!(ranked[0].current_jobs_count, 0);
    }
}
