//! Client for the Open-Meteo elevation API.
//!
//! One request carries up to 100 coordinates as comma-separated `latitude` and
//! `longitude` query parameters and answers with `{"elevation": [..]}` in the same
//! order. Coordinates without data (e.g. open sea) come back as `0`.

use crate::provider::error::ProviderError;
use crate::provider::EnrichmentProvider;
use bon::bon;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const OPEN_METEO_ELEVATION_URL: &str = "https://api.open-meteo.com/v1/elevation";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    elevation: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    reason: String,
}

/// Elevation lookups against Open-Meteo.
///
/// # Examples
///
/// ```no_run
/// # use eco_enrich::{EnrichmentProvider, OpenMeteoElevation, ProviderError};
/// # #[tokio::main]
/// # async fn main() -> Result<(), ProviderError> {
/// let provider = OpenMeteoElevation::builder().build()?;
/// let elevations = provider.fetch(&[52.52, 48.85], &[13.405, 2.35]).await?;
/// assert_eq!(elevations.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenMeteoElevation {
    client: Client,
    endpoint: String,
}

#[bon]
impl OpenMeteoElevation {
    /// Creates a client.
    ///
    /// * `.endpoint(String)`: Optional. Defaults to [`OPEN_METEO_ELEVATION_URL`].
    /// * `.timeout(Duration)`: Optional. Upper bound for one request, defaults to 5 seconds.
    #[builder]
    pub fn new(
        #[builder(into)] endpoint: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let endpoint = endpoint.unwrap_or_else(|| OPEN_METEO_ELEVATION_URL.to_string());
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| ProviderError::NetworkRequest(endpoint.clone(), e))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn join_coordinates(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl EnrichmentProvider for OpenMeteoElevation {
    async fn fetch(&self, latitudes: &[f64], longitudes: &[f64]) -> Result<Vec<f64>, ProviderError> {
        debug!(
            "Requesting {} elevations from {}",
            latitudes.len(),
            self.endpoint
        );
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("latitude", join_coordinates(latitudes)),
                ("longitude", join_coordinates(longitudes)),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|error| error.reason)
                .unwrap_or(body);
            warn!("HTTP error {} from {}: {}", status, self.endpoint, reason);
            return Err(ProviderError::from_status(&self.endpoint, status, reason));
        }

        let body: ElevationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParse(self.endpoint.clone(), e))?;
        if body.elevation.len() != latitudes.len() {
            return Err(ProviderError::LengthMismatch {
                expected: latitudes.len(),
                found: body.elevation.len(),
            });
        }
        Ok(body.elevation)
    }
}
