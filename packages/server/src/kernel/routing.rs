//! Routing client abstraction over OSRM.
//!
//! Scoring and ETA lookups only ever see [`RoutingClient`]; tests drive them
//! with a fixed-speed estimator instead of a live router.

use async_trait::async_trait;
use osrm::{estimate_route, OsrmOptions, OsrmService};

pub use osrm::RouteInfo;

use crate::common::LatLng;

#[async_trait]
pub trait RoutingClient: Send + Sync {
    /// Drive time and distance for one origin-destination pair.
    ///
    /// Infallible: upstream failures degrade to a great-circle estimate.
    async fn drive_time(&self, from: LatLng, to: LatLng) -> RouteInfo;

    /// Drive times from one origin to each destination, index-aligned with
    /// the input.
    async fn drive_time_matrix(&self, origin: LatLng, destinations: &[LatLng]) -> Vec<RouteInfo>;
}

/// Production client backed by an OSRM instance.
pub struct OsrmRoutingClient {
    service: OsrmService,
}

impl OsrmRoutingClient {
    pub fn new(base_url: Option<String>) -> Self {
        let mut options = OsrmOptions::default();
        if let Some(base_url) = base_url {
            options.base_url = base_url;
        }
        Self {
            service: OsrmService::new(options),
        }
    }
}

#[async_trait]
impl RoutingClient for OsrmRoutingClient {
    async fn drive_time(&self, from: LatLng, to: LatLng) -> RouteInfo {
        self.service.drive_time(from.into(), to.into()).await
    }

    async fn drive_time_matrix(&self, origin: LatLng, destinations: &[LatLng]) -> Vec<RouteInfo> {
        let dests: Vec<osrm::Coordinates> = destinations.iter().map(|d| (*d).into()).collect();
        self.service.drive_time_matrix(origin.into(), &dests).await
    }
}

/// Great-circle estimator used in tests and as a no-network fallback.
pub struct EstimatingRoutingClient;

#[async_trait]
impl RoutingClient for EstimatingRoutingClient {
    async fn drive_time(&self, from: LatLng, to: LatLng) -> RouteInfo {
        estimate_route(from.into(), to.into())
    }

    async fn drive_time_matrix(&self, origin: LatLng, destinations: &[LatLng]) -> Vec<RouteInfo> {
        destinations
            .iter()
            .map(|d| estimate_route(origin.into(), (*d).into()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_estimator_is_index_aligned() {
        let origin = LatLng::new(32.7767, -96.7970);
        let near = LatLng::new(32.7800, -96.8000);
        let far = LatLng::new(33.5000, -97.5000);

        let routes = EstimatingRoutingClient
            .drive_time_matrix(origin, &[near, far])
            .await;

        assert_eq!(routes.len(), 2);
        assert!(routes[0].duration_seconds < routes[1].duration_seconds);
    }

    #[tokio::test]
    async fn test_estimator_never_negative() {
        let origin = LatLng::new(32.7767, -96.7970);
        let route = EstimatingRoutingClient.drive_time(origin, origin).await;
        assert!(route.duration_seconds >= 0.0);
        assert!(route.distance_meters >= 0.0);
    }
}
