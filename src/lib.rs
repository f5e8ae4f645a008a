//! wxcollect_service: periodic weather collection and queue publishing.
//!
//! # Module structure
//!
//! ```text
//! wxcollect_service
//! ├── model      — shared data types (WeatherSample, EnrichedSample, CycleOutcome, …)
//! ├── config     — environment-based configuration (resolved once at startup)
//! ├── retry      — bounded retry policies (linear fetch, exponential publish)
//! ├── ingest
//! │   ├── open_meteo — Open-Meteo API: URL construction, parsing, retry loop
//! │   └── fixtures (test only) — representative API response payloads
//! ├── enrich     — 24h analytics + condition classification
//! ├── messaging
//! │   ├── mod    — publisher state machine over the broker seam
//! │   └── amqp   — amiquip-backed RabbitMQ connector
//! ├── daemon     — collection loop (cycle isolation, interval wait, shutdown)
//! └── endpoint   — health-check HTTP responder
//! ```

pub mod config;
pub mod daemon;
pub mod endpoint;
pub mod enrich;
pub mod ingest;
pub mod messaging;
pub mod model;
pub mod retry;
