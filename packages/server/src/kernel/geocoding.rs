//! Address geocoding via Nominatim (OpenStreetMap).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::common::LatLng;

/// Nominatim API response for geocoding
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    lat: String,
    lon: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-form address to coordinates.
    ///
    /// `Ok(None)` means the provider answered but found nothing; `Err` means
    /// the provider could not be reached or returned garbage. Callers decide
    /// how each case affects the row's geocoding status.
    async fn geocode(&self, address: &str) -> Result<Option<LatLng>>;
}

pub struct NominatimGeocoder {
    base_url: String,
    user_agent: String,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    pub fn new(base_url: Option<String>, user_agent: String) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| "https://nominatim.openstreetmap.org".to_string()),
            user_agent,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<LatLng>> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(address.trim())
        );

        debug!("Geocoding address: {}", address);

        let response: Vec<NominatimResponse> = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| anyhow!("Geocoding API request failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse geocoding response: {}", e))?;

        let Some(result) = response.first() else {
            warn!(address = %address, "Address not found by geocoding API");
            return Ok(None);
        };

        let latitude: f64 = result
            .lat
            .parse()
            .map_err(|e| anyhow!("Invalid latitude in response: {}", e))?;
        let longitude: f64 = result
            .lon
            .parse()
            .map_err(|e| anyhow!("Invalid longitude in response: {}", e))?;

        debug!("Geocoded {} -> ({}, {})", address, latitude, longitude);

        Ok(Some(LatLng::new(latitude, longitude)))
    }
}
