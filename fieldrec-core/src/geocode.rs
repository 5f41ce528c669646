//! Reverse geocoding for location names.
//!
//! Lookups are a convenience for filling in the `location` field. Any
//! failure, including a timeout, yields an empty description; nothing here
//! is ever surfaced as an error.

use std::time::{Duration, Instant};

use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

/// Public Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Configuration for [`NominatimGeocoder`].
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Nominatim's usage policy requires an identifying agent.
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(2),
            user_agent: concat!("fieldrec/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
}

/// Reverse geocoder backed by a Nominatim `/reverse` endpoint.
pub struct NominatimGeocoder {
    client: Option<Client>,
    config: NominatimConfig,
}

impl NominatimGeocoder {
    /// Build a geocoder. A client that cannot be built leaves the geocoder
    /// permanently answering with empty descriptions.
    pub fn new(config: NominatimConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| warn!(error = %e, "Failed to create geocoding client"))
            .ok();
        Self { client, config }
    }

    /// Human-readable place name for a coordinate, or an empty string.
    pub async fn describe(&self, lat: f64, lon: f64) -> String {
        let Some(client) = &self.client else {
            return String::new();
        };
        let url = format!(
            "{}/reverse?format=jsonv2&lat={lat}&lon={lon}",
            self.config.base_url.trim_end_matches('/')
        );

        let result = retry_notify(
            self.build_backoff(),
            || {
                let url = &url;
                async move { self.lookup_once(client, url).await }
            },
            |err: String, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await;

        match result {
            Ok(name) => name,
            Err(e) => {
                debug!(error = %e, lat, lon, "Reverse geocoding gave up");
                String::new()
            }
        }
    }

    async fn lookup_once(
        &self,
        client: &Client,
        url: &str,
    ) -> std::result::Result<String, backoff::Error<String>> {
        let start = Instant::now();

        let response = client.get(url).send().await.map_err(|e| {
            let latency_ms = start.elapsed().as_millis() as u64;
            if is_transient_error(&e) {
                warn!(error = %e, latency_ms, "Transient error, will retry");
                backoff::Error::transient(e.to_string())
            } else {
                backoff::Error::permanent(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let err = format!("geocoder returned status: {status}");
            return if is_transient_status(status) {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let parsed: ReverseResponse = response
            .json()
            .await
            .map_err(|e| backoff::Error::permanent(format!("bad geocoder response: {e}")))?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            "Reverse geocoding completed"
        );
        Ok(parsed.display_name.unwrap_or_default())
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries.max(1)),
            ..Default::default()
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new(NominatimConfig::default())
    }
}

impl std::fmt::Debug for NominatimGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NominatimGeocoder")
            .field("base_url", &self.config.base_url)
            .field("ready", &self.client.is_some())
            .finish()
    }
}

fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_yields_empty_description() {
        let geocoder = NominatimGeocoder::new(NominatimConfig {
            // Discard port; nothing listens there
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
            max_retries: 1,
            initial_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(50),
            ..NominatimConfig::default()
        });

        assert_eq!(geocoder.describe(51.5, -0.12).await, "");
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_default_config() {
        let config = NominatimConfig::default();
        assert_eq!(config.base_url, DEFAULT_NOMINATIM_URL);
        assert!(config.user_agent.starts_with("fieldrec/"));
    }
}
