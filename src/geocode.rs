//! Address geocoding collaborator.
//!
//! The ledger only ever needs the coordinates of the best match for a free-text
//! address, so [`Geocoder`] exposes exactly that. [`MapboxGeocoder`] talks to
//! the Mapbox forward-geocoding endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GeocoderConfig;

/// A `[longitude, latitude]` pair, serialized as a two-element JSON array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates(pub f64, pub f64);

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder returned HTTP {0}")]
    Status(u16),

    #[error("geocoder request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no geocoding match for address '{0}'")]
    NoMatch(String),

    #[error("invalid geocoder base URL: {0}")]
    InvalidBaseUrl(String),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `address` to the coordinates of the first candidate match.
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

#[derive(Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Coordinates,
}

/// Mapbox `mapbox.places` forward geocoder
#[derive(Clone)]
pub struct MapboxGeocoder {
    client: reqwest::Client,
    base_url: reqwest::Url,
    access_token: String,
}

impl MapboxGeocoder {
    pub fn from_config(config: &GeocoderConfig) -> anyhow::Result<Self> {
        let base_url = reqwest::Url::parse(&config.base_url)
            .map_err(|e| GeocodeError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GeocodeError::InvalidBaseUrl(config.base_url.clone()).into());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
        })
    }

    /// `{base}/{address}.json?types=address&access_token=...`, address percent-encoded
    fn request_url(&self, address: &str) -> Result<reqwest::Url, GeocodeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GeocodeError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&format!("{}.json", address));
        url.query_pairs_mut()
            .append_pair("types", "address")
            .append_pair("access_token", &self.access_token);
        Ok(url)
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let url = self.request_url(address)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Geocoding '{}' failed with status {}", address, status);
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let places: PlacesResponse = response.json().await?;
        let coordinates = places
            .features
            .into_iter()
            .next()
            .map(|feature| feature.geometry.coordinates)
            .ok_or_else(|| GeocodeError::NoMatch(address.to_string()))?;

        tracing::debug!("Geocoded '{}' to {:?}", address, coordinates);
        Ok(coordinates)
    }
}
