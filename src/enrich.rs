//! Derived statistics and condition classification.
//!
//! Pure arithmetic over one sample; no retries, no I/O. Enrichment is never
//! allowed to fail a cycle: an empty forecast series yields zeroed
//! statistics rather than an error.

use crate::model::{Analytics, Condition, EnrichedSample, WeatherSample};
use log::info;

/// Stateless enrichment stage: `WeatherSample → EnrichedSample`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Enricher;

impl Enricher {
    pub fn new() -> Self {
        Self
    }

    /// Computes 24h summary statistics and the condition tag.
    pub fn process(&self, sample: WeatherSample) -> EnrichedSample {
        let analytics = compute_analytics(&sample);
        let condition = classify_condition(&sample, &analytics);

        info!("Sample processed - condition: {:?}", condition);

        EnrichedSample {
            sample,
            analytics,
            condition_classification: condition,
        }
    }
}

fn compute_analytics(sample: &WeatherSample) -> Analytics {
    let temps = &sample.forecast.next_24h_temperatures;
    let probs = &sample.forecast.precipitation_probabilities;

    Analytics {
        temp_min_24h: fold_min(temps),
        temp_max_24h: fold_max(temps),
        temp_avg_24h: mean(temps),
        max_precipitation_prob: fold_max(probs),
        avg_precipitation_prob: mean(probs),
    }
}

/// First-match priority chain; the order is part of the contract.
fn classify_condition(sample: &WeatherSample, analytics: &Analytics) -> Condition {
    let current = &sample.current;

    if current.temperature > 30.0 {
        Condition::Hot
    } else if current.temperature < 10.0 {
        Condition::Cold
    } else if current.humidity > 80.0 {
        Condition::Humid
    } else if analytics.max_precipitation_prob > 70.0 {
        Condition::Rainy
    } else {
        Condition::Pleasant
    }
}

fn fold_min(values: &[f64]) -> f64 {
    finite_or_zero(values.iter().copied().fold(f64::INFINITY, f64::min))
}

fn fold_max(values: &[f64]) -> f64 {
    finite_or_zero(values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Maps the fold identity of an empty series (±inf) to 0.0 so an enriched
/// record is always encodable.
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
