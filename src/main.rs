//! Weather Data Collector - Main Daemon
//!
//! A long-running service that periodically:
//! 1. Fetches current + 24h forecast weather from the Open-Meteo API
//! 2. Derives summary statistics and a condition classification
//! 3. Publishes the enriched record to a durable RabbitMQ queue
//!
//! A health endpoint runs on a background thread for liveness probes;
//! Ctrl+C stops the loop cleanly after the current cycle completes.
//!
//! Environment:
//!   RABBITMQ_HOST/PORT/USER/PASS, RABBITMQ_QUEUE - broker settings
//!   LOCATION_NAME, LATITUDE, LONGITUDE, TIMEZONE  - collection location
//!   COLLECTION_INTERVAL - seconds between cycles (default 300)
//!   WEATHER_API_URL     - forecast API base URL
//!   PORT                - health endpoint port (default 8080)

use log::{error, warn};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use wxcollect_service::config::Config;
use wxcollect_service::daemon::{Daemon, DaemonConfig};
use wxcollect_service::endpoint;
use wxcollect_service::enrich::Enricher;
use wxcollect_service::ingest::open_meteo::OpenMeteoFetcher;
use wxcollect_service::messaging::QueuePublisher;
use wxcollect_service::messaging::amqp::AmqpConnector;
use wxcollect_service::retry::{Backoff, RetryPolicy};

fn main() {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    dotenv::dotenv().ok();
    let config = Config::from_env();

    // Two independent policies: linear backoff for the fetch stage,
    // exponential for the publish stage.
    let fetch_retry = RetryPolicy::new(3, Duration::from_secs(5), Backoff::Linear);
    let publish_retry = RetryPolicy::new(3, Duration::from_secs(5), Backoff::Exponential);

    let fetcher = match OpenMeteoFetcher::new(&config, fetch_retry) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Invalid collector configuration: {}", e);
            process::exit(1);
        }
    };

    let publisher = QueuePublisher::new(
        AmqpConnector::new(config.amqp_url()),
        config.queue_name.clone(),
        publish_retry,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    }

    // Liveness probe responder; shares nothing with the collection loop.
    let health_port = config.health_port;
    thread::spawn(move || {
        if let Err(e) = endpoint::start_health_server(health_port) {
            error!("Health endpoint error: {}", e);
        }
    });

    let daemon = Daemon::new(
        DaemonConfig {
            collection_interval: config.collection_interval,
            location_name: config.location_name.clone(),
        },
        fetcher,
        Enricher::new(),
        publisher,
        shutdown,
    );

    daemon.run();
}
