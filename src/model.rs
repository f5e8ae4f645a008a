//! Shared data types for the collection pipeline.
//!
//! A `WeatherSample` is what the fetcher produces, an `EnrichedSample` is
//! what the publisher ships, and a `CycleOutcome` is the transient result
//! of one fetch→enrich→publish cycle (logged, asserted on in tests, never
//! persisted).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Forecast sequences are truncated to this many hourly entries.
pub const FORECAST_HOURS: usize = 24;

// ---------------------------------------------------------------------------
// Raw sample
// ---------------------------------------------------------------------------

/// Fixed collection location. Coordinates are validated by the fetcher at
/// construction, so a sample with out-of-range values cannot be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions as reported by the weather API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub weather_code: i64,
    /// Defaults to 0 when the API omits it.
    pub precipitation: f64,
}

/// Hourly forecast series. Both sequences hold at most
/// [`FORECAST_HOURS`] entries; shorter responses are kept as-is, never padded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub next_24h_temperatures: Vec<f64>,
    pub precipitation_probabilities: Vec<f64>,
}

/// One weather snapshot for the configured location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub timestamp: DateTime<Utc>,
    pub location: Location,
    pub current: CurrentConditions,
    pub forecast: Forecast,
    /// Originating API, e.g. "open-meteo".
    pub source: String,
}

// ---------------------------------------------------------------------------
// Enriched sample
// ---------------------------------------------------------------------------

/// Summary statistics over the 24h forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub temp_min_24h: f64,
    pub temp_max_24h: f64,
    pub temp_avg_24h: f64,
    pub max_precipitation_prob: f64,
    pub avg_precipitation_prob: f64,
}

/// Condition tag derived from a first-match priority chain
/// (see `enrich::classify_condition`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Hot,
    Cold,
    Humid,
    Rainy,
    Pleasant,
}

/// A weather sample plus derived statistics and classification. This is the
/// record serialized onto the queue, one message per successful cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSample {
    #[serde(flatten)]
    pub sample: WeatherSample,
    pub analytics: Analytics,
    pub condition_classification: Condition,
}

// ---------------------------------------------------------------------------
// Cycle outcome
// ---------------------------------------------------------------------------

/// Stage at which a cycle failed, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Publish,
    None,
}

/// Result of one collection cycle. Lives only long enough to be logged.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub success: bool,
    pub failure_stage: FailureStage,
    pub error: Option<String>,
}

impl CycleOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            failure_stage: FailureStage::None,
            error: None,
        }
    }

    pub fn failed(stage: FailureStage, error: String) -> Self {
        Self {
            success: false,
            failure_stage: stage,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EnrichedSample {
        EnrichedSample {
            sample: WeatherSample {
                timestamp: "2026-08-30T12:00:00Z".parse().unwrap(),
                location: Location {
                    name: "Recife, Brazil".to_string(),
                    latitude: -8.0542,
                    longitude: -34.8813,
                },
                current: CurrentConditions {
                    temperature: 27.5,
                    humidity: 74.0,
                    wind_speed: 12.3,
                    weather_code: 2,
                    precipitation: 0.0,
                },
                forecast: Forecast {
                    next_24h_temperatures: vec![25.0, 26.5, 28.0],
                    precipitation_probabilities: vec![10.0, 35.0, 5.0],
                },
                source: "open-meteo".to_string(),
            },
            analytics: Analytics {
                temp_min_24h: 25.0,
                temp_max_24h: 28.0,
                temp_avg_24h: 26.5,
                max_precipitation_prob: 35.0,
                avg_precipitation_prob: 16.666,
            },
            condition_classification: Condition::Pleasant,
        }
    }

    #[test]
    fn test_enriched_sample_wire_format() {
        let value = serde_json::to_value(sample()).unwrap();

        // The sample fields are flattened next to analytics and the
        // classification key, matching the downstream consumer's contract.
        assert_eq!(value["location"]["name"], "Recife, Brazil");
        assert_eq!(value["current"]["temperature"], 27.5);
        assert_eq!(value["source"], "open-meteo");
        assert_eq!(value["analytics"]["temp_max_24h"], 28.0);
        assert_eq!(value["condition_classification"], "pleasant");
    }

    #[test]
    fn test_condition_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Condition::Hot).unwrap(), "\"hot\"");
        assert_eq!(
            serde_json::to_string(&Condition::Pleasant).unwrap(),
            "\"pleasant\""
        );
    }

    #[test]
    fn test_cycle_outcome_constructors() {
        let ok = CycleOutcome::success();
        assert!(ok.success);
        assert_eq!(ok.failure_stage, FailureStage::None);
        assert!(ok.error.is_none());

        let failed = CycleOutcome::failed(FailureStage::Fetch, "timed out".to_string());
        assert!(!failed.success);
        assert_eq!(failed.failure_stage, FailureStage::Fetch);
        assert_eq!(failed.error.as_deref(), Some("timed out"));
    }
}
