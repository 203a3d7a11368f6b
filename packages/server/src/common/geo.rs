//! Coordinate helpers shared by scoring, dispatch, and the geocoding worker.

use osrm::Coordinates;

/// A resolved point on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build from nullable database columns.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

impl From<LatLng> for Coordinates {
    fn from(p: LatLng) -> Self {
        Coordinates::new(p.latitude, p.longitude)
    }
}

/// Distance between two points in kilometers (Haversine).
pub fn distance_km(a: LatLng, b: LatLng) -> f64 {
    osrm::haversine_km(a.into(), b.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_requires_both() {
        assert!(LatLng::from_parts(Some(32.0), None).is_none());
        assert!(LatLng::from_parts(None, Some(-96.0)).is_none());
        assert_eq!(
            LatLng::from_parts(Some(32.0), Some(-96.0)),
            Some(LatLng::new(32.0, -96.0))
        );
    }

    #[test]
    fn test_distance_dallas_fort_worth() {
        let dallas = LatLng::new(32.7767, -96.7970);
        let fort_worth = LatLng::new(32.7555, -97.3308);
        let km = distance_km(dallas, fort_worth);
        assert!(km > 45.0 && km < 55.0);
    }
}
