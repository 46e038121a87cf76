//! Geocoding collaborator.
//!
//! [`Geocoder`] turns a free-text place description into a coordinate pair.
//! It is only called during an explicit refresh. [`NominatimGeocoder`] talks
//! to a Nominatim-compatible `/search` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use geolist_core::AppConfig;
use reqwest::Client;
use serde::Deserialize;

use crate::error::EnrichError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Rounds both coordinates to two decimal places.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            latitude: round2(self.latitude),
            longitude: round2(self.longitude),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best-effort lookup. `Ok(None)` means the service found nothing.
    async fn geocode(&self, query: &str) -> Result<Option<GeoPoint>, EnrichError>;
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// # Errors
    ///
    /// Returns [`EnrichError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// # Errors
    ///
    /// Returns [`EnrichError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, EnrichError> {
        Self::new(
            &config.geocoder_url,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeoPoint>, EnrichError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::GeocoderStatus {
                status: status.as_u16(),
                query: query.to_owned(),
            });
        }

        let hits: Vec<SearchHit> =
            response
                .json()
                .await
                .map_err(|e| EnrichError::GeocoderResponse {
                    query: query.to_owned(),
                    reason: e.to_string(),
                })?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let parse = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|e| EnrichError::GeocoderResponse {
                    query: query.to_owned(),
                    reason: format!("bad coordinate '{raw}': {e}"),
                })
        };
        let point = GeoPoint {
            latitude: parse(&hit.lat)?,
            longitude: parse(&hit.lon)?,
        };
        if !point.is_valid() {
            return Err(EnrichError::GeocoderResponse {
                query: query.to_owned(),
                reason: format!(
                    "coordinates out of range: {}, {}",
                    point.latitude, point.longitude
                ),
            });
        }
        Ok(Some(point))
    }
}
