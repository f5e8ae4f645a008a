//! Service configuration resolved once at startup.
//!
//! All settings come from environment variables (with `.env` support via
//! dotenv) and carry the defaults of the original deployment. The loader is
//! driven by a lookup function instead of reading `std::env` directly, so
//! tests can feed it a plain map without mutating process-global state.

use std::env;
use std::time::Duration;

/// Resolved service configuration. Immutable after startup; components
/// receive what they need at construction rather than reading the
/// environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    pub rabbitmq_host: String,
    pub rabbitmq_port: String,
    pub rabbitmq_user: String,
    pub rabbitmq_pass: String,
    pub queue_name: String,

    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,

    /// Wall-clock spacing between the end of one cycle and the start of
    /// the next.
    pub collection_interval: Duration,

    pub weather_api_url: String,
    pub health_port: u16,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Panics
    /// Panics if a numeric variable is set but unparsable. This is
    /// intentional — the service cannot operate on a malformed deployment
    /// environment, and failing at startup is clearer than failing on the
    /// first cycle.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            rabbitmq_host: lookup("RABBITMQ_HOST").unwrap_or_else(|| "localhost".to_string()),
            rabbitmq_port: lookup("RABBITMQ_PORT").unwrap_or_else(|| "5672".to_string()),
            rabbitmq_user: lookup("RABBITMQ_USER").unwrap_or_else(|| "guest".to_string()),
            rabbitmq_pass: lookup("RABBITMQ_PASS").unwrap_or_else(|| "guest".to_string()),
            queue_name: lookup("RABBITMQ_QUEUE").unwrap_or_else(|| "weather_data".to_string()),

            location_name: lookup("LOCATION_NAME").unwrap_or_else(|| "Recife, Brazil".to_string()),
            latitude: parse_var(&lookup, "LATITUDE", -8.0542),
            longitude: parse_var(&lookup, "LONGITUDE", -34.8813),
            timezone: lookup("TIMEZONE").unwrap_or_else(|| "America/Sao_Paulo".to_string()),

            collection_interval: Duration::from_secs(parse_var(
                &lookup,
                "COLLECTION_INTERVAL",
                300u64,
            )),

            weather_api_url: lookup("WEATHER_API_URL")
                .unwrap_or_else(|| "https://api.open-meteo.com/v1/forecast".to_string()),
            health_port: parse_var(&lookup, "PORT", 8080u16),
        }
    }

    /// AMQP broker URL assembled from the individual connection variables.
    pub fn amqp_url(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/",
            self.rabbitmq_user, self.rabbitmq_pass, self.rabbitmq_host, self.rabbitmq_port
        )
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("Failed to parse {}: {:?}", key, raw)),
        None => default,
    }
}
