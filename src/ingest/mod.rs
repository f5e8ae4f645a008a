//! Weather API clients.
//!
//! One file per upstream source; `open_meteo` is the only source today.
//! `fixtures` (test only) holds representative API response payloads.

pub mod fixtures;
pub mod open_meteo;

use crate::model::WeatherSample;
use thiserror::Error;

/// Fetch-stage error taxonomy. The retry loop keys its policy off these
/// variants; the daemon only ever logs them.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Invalid static configuration (out-of-range coordinates). Raised at
    /// construction, before any network call, and never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Timeout or connection failure. Retried with linear backoff.
    #[error("network failure talking to weather API: {0}")]
    Network(String),

    /// Non-2xx HTTP status. 429 gets a fixed cooldown, ≥500 is retried,
    /// anything else fails the call immediately.
    #[error("weather API returned HTTP {0}")]
    Http(u16),

    /// Response body missing expected fields. Never retried — the payload
    /// will not improve on a second request.
    #[error("malformed weather API response: {0}")]
    MalformedResponse(String),

    /// Catch-all. Retried like a transient network failure.
    #[error("unexpected fetch failure: {0}")]
    Unexpected(String),
}

/// Source of weather snapshots; the seam the daemon is tested through.
pub trait WeatherSource {
    fn get_weather_data(&self) -> Result<WeatherSample, FetchError>;
}
