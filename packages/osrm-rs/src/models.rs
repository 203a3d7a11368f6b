use serde::Deserialize;

/// A lat/lng pair. OSRM URLs want `lng,lat` order; constructors here take
/// `lat, lng` to match the rest of the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Format as an OSRM path segment (`lng,lat`).
    pub(crate) fn to_osrm(&self) -> String {
        format!("{:.6},{:.6}", self.longitude, self.latitude)
    }
}

/// Drive time and distance for one origin-destination pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteInfo {
    pub duration_seconds: f64,
    pub distance_meters: f64,
    /// True when the value is a great-circle estimate rather than routed data.
    pub estimated: bool,
}

impl RouteInfo {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RouteResponse {
    pub code: String,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Route {
    pub duration: f64,
    pub distance: f64,
}

/// `/table` response. Unreachable cells come back as `null`, which is why the
/// matrices hold `Option<f64>`.
#[derive(Debug, Deserialize)]
pub(crate) struct TableResponse {
    pub code: String,
    #[serde(default)]
    pub durations: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    pub distances: Vec<Vec<Option<f64>>>,
}
