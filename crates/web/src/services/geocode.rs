//! Address geocoding.
//!
//! Resolves a postal address to coordinates via the Nominatim search API.
//! Geocoding is best-effort for the application: a failed lookup produces a
//! warning, never a dropped record.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use thiserror::Error;

use mycontacts_core::Coordinates;

/// Default Nominatim instance.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Request timeout for geocoding lookups.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur during a geocoding lookup.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (connection, timeout).
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned an error response.
    #[error("geocoding service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The service found no match for the address.
    #[error("address not found: {0}")]
    NoMatch(String),

    /// The response could not be interpreted.
    #[error("malformed geocoding response: {0}")]
    Parse(String),
}

/// Address-to-coordinates lookup.
pub trait Geocoder: Send + Sync {
    /// Resolve a postal address to coordinates.
    fn lookup(
        &self,
        street: &str,
        postal_code: &str,
        city: &str,
    ) -> impl Future<Output = Result<Coordinates, GeocodeError>> + Send;
}

/// Geocoder backed by the Nominatim search API.
#[derive(Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

/// One search result; Nominatim serializes coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl NominatimClient {
    /// Create a new client against the given Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, GeocodeError> {
        let mut headers = HeaderMap::new();
        // Nominatim's usage policy requires an identifying User-Agent.
        headers.insert("User-Agent", HeaderValue::from_static("mycontacts"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for NominatimClient {
    async fn lookup(
        &self,
        street: &str,
        postal_code: &str,
        city: &str,
    ) -> Result<Coordinates, GeocodeError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("street", street),
                ("postalcode", postal_code),
                ("city", city),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoMatch(format!("{street}, {postal_code} {city}")))?;

        let lat = place
            .lat
            .parse::<f64>()
            .map_err(|_| GeocodeError::Parse(format!("non-numeric latitude '{}'", place.lat)))?;
        let lon = place
            .lon
            .parse::<f64>()
            .map_err(|_| GeocodeError::Parse(format!("non-numeric longitude '{}'", place.lon)))?;

        Ok(Coordinates { lat, lon })
    }
}
