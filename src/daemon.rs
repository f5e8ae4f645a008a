//! Collection daemon: the fetch→enrich→publish cycle and the loop that
//! drives it forever.
//!
//! One cycle runs strictly sequentially; failures are confined to the cycle
//! that produced them and the loop always waits the configured interval
//! before the next one. The shutdown flag is honored only between cycles —
//! an in-flight fetch or publish attempt always runs to completion.

use crate::enrich::Enricher;
use crate::ingest::WeatherSource;
use crate::messaging::MessagePublisher;
use crate::model::{CycleOutcome, FailureStage};
use log::{error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Granularity of the interruptible inter-cycle wait.
const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Wait applied after a cycle that escaped even the per-cycle guard.
const PANIC_BACKOFF: Duration = Duration::from_secs(300);

/// Daemon configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Spacing between the end of one cycle and the start of the next.
    pub collection_interval: Duration,
    pub location_name: String,
}

/// The collection loop. Owns the three pipeline stages; holds no state
/// across cycles beyond the immutable configuration.
pub struct Daemon<S: WeatherSource, P: MessagePublisher> {
    config: DaemonConfig,
    source: S,
    enricher: Enricher,
    publisher: P,
    shutdown: Arc<AtomicBool>,
}

impl<S: WeatherSource, P: MessagePublisher> Daemon<S, P> {
    pub fn new(
        config: DaemonConfig,
        source: S,
        enricher: Enricher,
        publisher: P,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            source,
            enricher,
            publisher,
            shutdown,
        }
    }

    /// Runs one fetch→enrich→publish cycle. A fetch failure short-circuits
    /// the cycle; the publisher is not called. Never panics by design;
    /// `run` adds a second guard anyway.
    pub fn run_cycle(&self) -> CycleOutcome {
        info!("Starting collection cycle");

        let sample = match self.source.get_weather_data() {
            Ok(sample) => sample,
            Err(err) => return CycleOutcome::failed(FailureStage::Fetch, err.to_string()),
        };

        let enriched = self.enricher.process(sample);

        if self.publisher.send_message(&enriched) {
            CycleOutcome::success()
        } else {
            CycleOutcome::failed(
                FailureStage::Publish,
                "publisher reported failure".to_string(),
            )
        }
    }

    /// Runs cycles until the shutdown flag is set. A single cycle's failure
    /// never ends the loop; a panic escaping the cycle is logged and
    /// followed by a fixed 300s wait instead of crashing the process.
    pub fn run(&self) {
        info!(
            "Starting weather collector for {} (interval {}s)",
            self.config.location_name,
            self.config.collection_interval.as_secs()
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            match panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle())) {
                Ok(outcome) => {
                    if outcome.success {
                        info!("Collection cycle completed");
                    } else {
                        error!(
                            "Collection cycle failed at {:?} stage: {}",
                            outcome.failure_stage,
                            outcome.error.as_deref().unwrap_or("unknown")
                        );
                    }
                    wait_interruptible(self.config.collection_interval, &self.shutdown);
                }
                Err(_) => {
                    error!("Collection cycle panicked; resuming after backoff");
                    wait_interruptible(PANIC_BACKOFF, &self.shutdown);
                }
            }
        }

        info!("Shutdown signal received, collector stopped");
    }
}

/// Sleeps for `duration` in small slices, returning early once `shutdown`
/// is set. This is the only place the flag is checked mid-wait; attempts
/// inside a cycle are never preempted.
pub fn wait_interruptible(duration: Duration, shutdown: &AtomicBool) {
    let mut remaining = duration;
    while !remaining.is_zero() {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let slice = remaining.min(WAIT_SLICE);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::FetchError;
    use crate::model::{
        CurrentConditions, EnrichedSample, Forecast, Location, WeatherSample,
    };
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn sample() -> WeatherSample {
        WeatherSample {
            // Fixed so the expected enrichment compares equal.
            timestamp: "2026-08-30T12:00:00Z".parse().unwrap(),
            location: Location {
                name: "Recife, Brazil".to_string(),
                latitude: -8.0542,
                longitude: -34.8813,
            },
            current: CurrentConditions {
                temperature: 27.0,
                humidity: 70.0,
                wind_speed: 10.0,
                weather_code: 1,
                precipitation: 0.0,
            },
            forecast: Forecast {
                next_24h_temperatures: vec![25.0, 26.0, 27.0],
                precipitation_probabilities: vec![10.0, 20.0, 30.0],
            },
            source: "open-meteo".to_string(),
        }
    }

    struct StubSource {
        fail: bool,
        calls: AtomicUsize,
    }

    impl WeatherSource for StubSource {
        fn get_weather_data(&self) -> Result<WeatherSample, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FetchError::Network("no route".to_string()))
            } else {
                Ok(sample())
            }
        }
    }

    struct StubPublisher {
        accept: bool,
        published: Mutex<Vec<EnrichedSample>>,
    }

    impl MessagePublisher for StubPublisher {
        fn send_message(&self, record: &EnrichedSample) -> bool {
            self.published.lock().unwrap().push(record.clone());
            self.accept
        }
    }

    fn daemon(
        fail_fetch: bool,
        accept_publish: bool,
        interval: Duration,
    ) -> Daemon<StubSource, StubPublisher> {
        Daemon::new(
            DaemonConfig {
                collection_interval: interval,
                location_name: "Recife, Brazil".to_string(),
            },
            StubSource {
                fail: fail_fetch,
                calls: AtomicUsize::new(0),
            },
            Enricher::new(),
            StubPublisher {
                accept: accept_publish,
                published: Mutex::new(Vec::new()),
            },
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn test_successful_cycle_publishes_enriched_sample() {
        let daemon = daemon(false, true, Duration::from_secs(300));

        let outcome = daemon.run_cycle();

        assert!(outcome.success);
        let published = daemon.publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        // The published record is the deterministic enrichment of the stub
        // sample.
        assert_eq!(published[0], Enricher::new().process(sample()));
    }

    #[test]
    fn test_fetch_failure_skips_publisher() {
        let daemon = daemon(true, true, Duration::from_secs(300));

        let outcome = daemon.run_cycle();

        assert!(!outcome.success);
        assert_eq!(outcome.failure_stage, FailureStage::Fetch);
        assert!(daemon.publisher.published.lock().unwrap().is_empty());
    }

    #[test]
    fn test_publish_failure_reported_as_publish_stage() {
        let daemon = daemon(false, false, Duration::from_secs(300));

        let outcome = daemon.run_cycle();

        assert!(!outcome.success);
        assert_eq!(outcome.failure_stage, FailureStage::Publish);
    }

    #[test]
    fn test_wait_interruptible_returns_early_on_shutdown() {
        let flag = AtomicBool::new(true);
        let start = Instant::now();
        wait_interruptible(Duration::from_secs(10), &flag);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_interruptible_sleeps_full_duration() {
        let flag = AtomicBool::new(false);
        let start = Instant::now();
        wait_interruptible(Duration::from_millis(120), &flag);
        assert!(start.elapsed() >= Duration::from_millis(120));
    }
}
