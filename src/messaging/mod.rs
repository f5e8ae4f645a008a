//! Message publishing to the durable broker queue.
//!
//! `QueuePublisher` owns the per-attempt connection lifecycle:
//!
//! ```text
//! Idle → Connecting → QueueCheck → {QueueReady | QueueMissing → Redeclaring → QueueReady}
//!      → Publishing → Done
//! ```
//!
//! Every attempt opens a fresh connection; nothing is reused across attempts
//! or cycles, and whatever was opened is closed on every exit path (close
//! failures are logged, never propagated). `send_message` swallows all
//! failures and reports a plain bool to the caller.

pub mod amqp;

use crate::model::EnrichedSample;
use crate::retry::RetryPolicy;
use log::{error, info, warn};
use std::thread;
use thiserror::Error;

/// Broker-side failure taxonomy. Drives the per-attempt retry decision.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not reach the broker or the connection dropped. Retried with
    /// exponential backoff.
    #[error("broker connection failure: {0}")]
    Connection(String),

    /// The channel reached an unusable state. Retried with the fixed base
    /// delay.
    #[error("broker channel failure: {0}")]
    ChannelState(String),

    /// Passive queue check answered "not found". Handled inside the same
    /// attempt by redeclaring the queue as durable.
    #[error("queue not found: {0}")]
    QueueMissing(String),

    /// Record not encodable. Never retried — the payload is structurally
    /// broken and will not improve.
    #[error("message not encodable: {0}")]
    Serialization(String),

    /// Catch-all. Retried with the fixed base delay.
    #[error("unexpected broker failure: {0}")]
    Other(String),
}

/// Publishing seam the daemon is tested through.
pub trait MessagePublisher {
    /// `true` iff the record was durably accepted by the broker.
    fn send_message(&self, record: &EnrichedSample) -> bool;
}

/// One live broker connection, owned by exactly one publish attempt.
pub trait BrokerConnection {
    /// Passively checks that the queue exists (does not create it).
    fn queue_check(&mut self, queue: &str) -> Result<(), BrokerError>;

    /// Declares the queue as durable (survives broker restart).
    fn declare_durable(&mut self, queue: &str) -> Result<(), BrokerError>;

    /// Publishes with persistent delivery mode and a JSON content type.
    fn publish(&mut self, queue: &str, body: &[u8]) -> Result<(), BrokerError>;

    fn close(self: Box<Self>) -> Result<(), BrokerError>;
}

/// Opens broker connections; implemented by `amqp::AmqpConnector` in
/// production and by scripted fakes in tests.
pub trait BrokerConnector {
    fn connect(&self) -> Result<Box<dyn BrokerConnection>, BrokerError>;
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serializes a record to compact JSON, rejecting non-finite numbers up
/// front (serde_json would silently render them as null).
pub fn encode_message(record: &EnrichedSample) -> Result<Vec<u8>, BrokerError> {
    if let Some(field) = first_non_finite(record) {
        return Err(BrokerError::Serialization(format!(
            "non-finite number in field {}",
            field
        )));
    }
    serde_json::to_vec(record).map_err(|e| BrokerError::Serialization(e.to_string()))
}

fn first_non_finite(record: &EnrichedSample) -> Option<&'static str> {
    let current = &record.sample.current;
    let analytics = &record.analytics;
    let finite = |v: f64| v.is_finite();

    if !finite(current.temperature) {
        return Some("current.temperature");
    }
    if !finite(current.humidity) {
        return Some("current.humidity");
    }
    if !finite(current.wind_speed) {
        return Some("current.wind_speed");
    }
    if !finite(current.precipitation) {
        return Some("current.precipitation");
    }
    if !record
        .sample
        .forecast
        .next_24h_temperatures
        .iter()
        .all(|v| finite(*v))
    {
        return Some("forecast.next_24h_temperatures");
    }
    if !record
        .sample
        .forecast
        .precipitation_probabilities
        .iter()
        .all(|v| finite(*v))
    {
        return Some("forecast.precipitation_probabilities");
    }
    if !finite(analytics.temp_min_24h)
        || !finite(analytics.temp_max_24h)
        || !finite(analytics.temp_avg_24h)
    {
        return Some("analytics.temperature");
    }
    if !finite(analytics.max_precipitation_prob) || !finite(analytics.avg_precipitation_prob) {
        return Some("analytics.precipitation");
    }
    None
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Queue publisher with its own bounded retry policy, independent of the
/// fetch stage's.
pub struct QueuePublisher<C: BrokerConnector> {
    connector: C,
    queue_name: String,
    retry: RetryPolicy,
}

impl<C: BrokerConnector> QueuePublisher<C> {
    pub fn new(connector: C, queue_name: String, retry: RetryPolicy) -> Self {
        Self {
            connector,
            queue_name,
            retry,
        }
    }

    /// One publish attempt: fresh connection, passive queue check (with the
    /// redeclare-on-not-found path on a second fresh connection), publish,
    /// close. A redeclare failure burns the same attempt budget as any
    /// other failure in the attempt.
    fn try_publish(&self, body: &[u8]) -> Result<(), BrokerError> {
        let mut connection = self.connector.connect()?;

        match connection.queue_check(&self.queue_name) {
            Ok(()) => {
                let outcome = connection.publish(&self.queue_name, body);
                close_quietly(connection);
                outcome
            }
            Err(BrokerError::QueueMissing(_)) => {
                // The broker closed the channel on the failed passive check;
                // discard the whole connection and redeclare on a fresh one.
                close_quietly(connection);
                let mut connection = self.connector.connect()?;
                let outcome = connection
                    .declare_durable(&self.queue_name)
                    .and_then(|()| connection.publish(&self.queue_name, body));
                close_quietly(connection);
                outcome
            }
            Err(err) => {
                close_quietly(connection);
                Err(err)
            }
        }
    }
}

impl<C: BrokerConnector> MessagePublisher for QueuePublisher<C> {
    fn send_message(&self, record: &EnrichedSample) -> bool {
        let body = match encode_message(record) {
            Ok(body) => body,
            Err(err) => {
                error!("Failed to serialize record, not retrying: {}", err);
                return false;
            }
        };

        for attempt in 0..self.retry.max_attempts {
            match self.try_publish(&body) {
                Ok(()) => {
                    info!("Record published to queue {}", self.queue_name);
                    return true;
                }
                Err(err) => {
                    error!("Publish attempt {} failed: {}", attempt + 1, err);
                    if self.retry.is_last_attempt(attempt) {
                        error!("Publish retry budget exhausted for queue {}", self.queue_name);
                        return false;
                    }
                    let delay = match err {
                        BrokerError::Connection(_) => self.retry.delay_after(attempt),
                        // Channel-state and unknown failures wait the plain
                        // base delay.
                        _ => self.retry.base_delay,
                    };
                    thread::sleep(delay);
                }
            }
        }

        false
    }
}

fn close_quietly(connection: Box<dyn BrokerConnection>) {
    if let Err(err) = connection.close() {
        warn!("Failed to close broker connection: {}", err);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
