//! Routing client degradation: every lookup yields usable numbers.

use server_core::common::LatLng;
use server_core::kernel::routing::{EstimatingRoutingClient, RoutingClient};

#[tokio::test]
async fn estimate_is_never_null_and_never_negative() {
    let pairs = [
        (LatLng::new(32.7767, -96.7970), LatLng::new(32.7555, -97.3308)),
        (LatLng::new(32.7767, -96.7970), LatLng::new(32.7767, -96.7970)),
        (LatLng::new(-33.8688, 151.2093), LatLng::new(51.5074, -0.1278)),
    ];

    for (from, to) in pairs {
        let route = EstimatingRoutingClient.drive_time(from, to).await;
        assert!(route.duration_seconds >= 0.0);
        assert!(route.distance_meters >= 0.0);
        assert!(route.duration_minutes() >= 0.0);
        assert!(route.estimated);
    }
}

#[tokio::test]
async fn matrix_output_matches_destination_order() {
    let origin = LatLng::new(32.7767, -96.7970);
    let destinations = vec![
        LatLng::new(32.7800, -96.8000),
        LatLng::new(33.0000, -97.0000),
        LatLng::new(34.0000, -98.0000),
    ];

    let routes = EstimatingRoutingClient
        .drive_time_matrix(origin, &destinations)
        .await;

    assert_eq!(routes.len(), destinations.len());
    // Destinations get farther in input order, so durations must ascend.
    assert!(routes[0].duration_seconds < routes[1].duration_seconds);
    assert!(routes[1].duration_seconds < routes[2].duration_seconds);
}

#[tokio::test]
async fn empty_matrix_input_yields_empty_output() {
    let origin = LatLng::new(32.7767, -96.7970);
    let routes = EstimatingRoutingClient.drive_time_matrix(origin, &[]).await;
    assert!(routes.is_empty());
}
