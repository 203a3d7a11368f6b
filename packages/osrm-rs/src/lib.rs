//! Minimal OSRM HTTP client for drive-time lookups.
//!
//! Two operations: a single origin-destination route and a one-source
//! drive-time matrix. Both degrade to a great-circle estimate at an assumed
//! road speed when OSRM is unreachable or returns an unroutable cell, so
//! callers never have to handle a routing failure.

use std::time::Duration;

pub mod models;

use reqwest::Client;
use tracing::warn;

pub use crate::models::{Coordinates, RouteInfo};
use crate::models::{RouteResponse, TableResponse};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Assumed average road speed for great-circle estimates.
const FALLBACK_SPEED_KMH: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct OsrmOptions {
    /// Base URL without a trailing slash, e.g. `https://router.project-osrm.org`.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OsrmOptions {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmService {
    options: OsrmOptions,
    client: Client,
}

impl OsrmService {
    pub fn new(options: OsrmOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// Drive time and distance for one origin-destination pair.
    ///
    /// Never fails: any upstream problem produces a great-circle estimate.
    pub async fn drive_time(&self, from: Coordinates, to: Coordinates) -> RouteInfo {
        let url = format!(
            "{}/route/v1/driving/{};{}?overview=false",
            self.options.base_url,
            from.to_osrm(),
            to.to_osrm(),
        );

        match self.fetch_route(&url).await {
            Some(info) => info,
            None => estimate_route(from, to),
        }
    }

    /// Drive times from one origin to every destination, index-aligned with
    /// the input. Unroutable cells fall back per index.
    pub async fn drive_time_matrix(
        &self,
        origin: Coordinates,
        destinations: &[Coordinates],
    ) -> Vec<RouteInfo> {
        if destinations.is_empty() {
            return Vec::new();
        }

        let mut coords = String::from(origin.to_osrm());
        let mut dest_indexes = String::new();
        for (i, dest) in destinations.iter().enumerate() {
            coords.push(';');
            coords.push_str(&dest.to_osrm());
            if i > 0 {
                dest_indexes.push(';');
            }
            dest_indexes.push_str(&(i + 1).to_string());
        }

        let url = format!(
            "{}/table/v1/driving/{}?sources=0&destinations={}&annotations=duration,distance",
            self.options.base_url, coords, dest_indexes,
        );

        match self.fetch_table(&url, destinations.len()).await {
            Some(rows) => rows
                .into_iter()
                .zip(destinations)
                .map(|((duration, distance), dest)| {
                    route_from_cells(duration, distance, origin, *dest)
                })
                .collect(),
            None => destinations
                .iter()
                .map(|dest| estimate_route(origin, *dest))
                .collect(),
        }
    }

    async fn fetch_route(&self, url: &str) -> Option<RouteInfo> {
        let response = self
            .client
            .get(url)
            .timeout(self.options.timeout)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "OSRM route request failed"))
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "OSRM route returned non-success");
            return None;
        }

        let body: RouteResponse = response
            .json()
            .await
            .map_err(|e| warn!(error = %e, "failed to parse OSRM route response"))
            .ok()?;

        if body.code != "Ok" {
            warn!(code = %body.code, "OSRM route returned non-Ok code");
            return None;
        }

        body.routes.first().map(|route| RouteInfo {
            duration_seconds: route.duration,
            distance_meters: route.distance,
            estimated: false,
        })
    }

    /// Returns one `(duration, distance)` cell per destination, or `None` if
    /// the whole call failed.
    async fn fetch_table(
        &self,
        url: &str,
        expected: usize,
    ) -> Option<Vec<(Option<f64>, Option<f64>)>> {
        let response = self
            .client
            .get(url)
            .timeout(self.options.timeout)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "OSRM table request failed"))
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "OSRM table returned non-success");
            return None;
        }

        let body: TableResponse = response
            .json()
            .await
            .map_err(|e| warn!(error = %e, "failed to parse OSRM table response"))
            .ok()?;

        if body.code != "Ok" {
            warn!(code = %body.code, "OSRM table returned non-Ok code");
            return None;
        }

        let durations = body.durations.first()?;
        if durations.len() != expected {
            warn!(
                got = durations.len(),
                expected, "OSRM table row length mismatch"
            );
            return None;
        }
        // Distances are only present when requested via annotations; treat a
        // missing row as all-null rather than failing the call.
        let distances = body.distances.first().cloned().unwrap_or_default();

        Some(
            durations
                .iter()
                .enumerate()
                .map(|(i, duration)| (*duration, distances.get(i).copied().flatten()))
                .collect(),
        )
    }
}

/// Resolve one matrix cell, estimating whichever halves are null.
fn route_from_cells(
    duration: Option<f64>,
    distance: Option<f64>,
    from: Coordinates,
    to: Coordinates,
) -> RouteInfo {
    match (duration, distance) {
        (Some(duration_seconds), Some(distance_meters)) => RouteInfo {
            duration_seconds,
            distance_meters,
            estimated: false,
        },
        _ => estimate_route(from, to),
    }
}

/// Great-circle estimate at the assumed road speed.
pub fn estimate_route(from: Coordinates, to: Coordinates) -> RouteInfo {
    let distance_km = haversine_km(from, to);
    RouteInfo {
        duration_seconds: distance_km / FALLBACK_SPEED_KMH * 3600.0,
        distance_meters: distance_km * 1000.0,
        estimated: true,
    }
}

pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let dlat = (to.latitude - from.latitude).to_radians();
    let dlng = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (dlng / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dallas() -> Coordinates {
        Coordinates::new(32.7767, -96.7970)
    }

    fn fort_worth() -> Coordinates {
        Coordinates::new(32.7555, -97.3308)
    }

    #[test]
    fn test_haversine_known_distance() {
        // Dallas to Fort Worth is roughly 50 km
        let km = haversine_km(dallas(), fort_worth());
        assert!(km > 45.0 && km < 55.0, "got {km}");
    }

    #[test]
    fn test_estimate_uses_fallback_speed() {
        let info = estimate_route(dallas(), fort_worth());
        assert!(info.estimated);
        // 50 km/h means duration in hours equals distance in km / 50
        let hours = info.duration_seconds / 3600.0;
        let km = info.distance_meters / 1000.0;
        assert!((hours - km / 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_same_point_is_zero() {
        let info = estimate_route(dallas(), dallas());
        assert!(info.duration_seconds < 0.1);
        assert!(info.distance_meters < 100.0);
        assert!(info.duration_minutes() >= 0.0);
    }

    #[test]
    fn test_route_from_cells_prefers_real_data() {
        let info = route_from_cells(Some(1200.0), Some(18_000.0), dallas(), fort_worth());
        assert!(!info.estimated);
        assert_eq!(info.duration_seconds, 1200.0);
        assert_eq!(info.distance_meters, 18_000.0);
    }

    #[test]
    fn test_route_from_cells_null_duration_falls_back() {
        let info = route_from_cells(None, Some(18_000.0), dallas(), fort_worth());
        assert!(info.estimated);
        assert!(info.duration_seconds > 0.0);
    }

    #[test]
    fn test_coordinates_osrm_order_is_lng_lat() {
        let c = Coordinates::new(32.7767, -96.7970);
        assert_eq!(c.to_osrm(), "-96.797000,32.776700");
    }
}
