//! Open-Meteo forecast API client: URL construction, JSON parsing, and the
//! bounded retry loop around one snapshot fetch.
//!
//! Retry policy (3 attempts by default):
//! - timeouts / connection failures — linear delay, retry
//! - HTTP 429 — fixed cooldown (60s), the attempt slot is still consumed
//! - HTTP ≥ 500 — linear delay, retry
//! - any other HTTP status or a malformed body — fail immediately
//! - anything else — linear delay, retry
//!
//! Coordinates are validated once at construction; a fetcher with invalid
//! coordinates cannot exist, so no request is ever issued for one.

use crate::config::Config;
use crate::ingest::{FetchError, WeatherSource};
use crate::model::{CurrentConditions, FORECAST_HOURS, Forecast, Location, WeatherSample};
use crate::retry::RetryPolicy;
use chrono::Utc;
use log::{error, info};
use serde::Deserialize;
use std::thread;
use std::time::Duration;

/// Fixed cooldown applied after an HTTP 429 before the next attempt.
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Per-request timeout on the HTTP client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code,precipitation";
const HOURLY_FIELDS: &str = "temperature_2m,precipitation_probability";

// ---------------------------------------------------------------------------
// Serde structures for the forecast response
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
    hourly: HourlyBlock,
}

#[derive(Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    weather_code: i64,
    /// Sometimes omitted by the API; defaults to 0 downstream.
    #[serde(default)]
    precipitation: Option<f64>,
}

#[derive(Deserialize)]
struct HourlyBlock {
    temperature_2m: Vec<f64>,
    precipitation_probability: Vec<f64>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds the forecast request URL: coordinates, the fixed current/hourly
/// field lists, an URL-encoded timezone, and a 1-day window.
pub fn build_forecast_url(base: &str, latitude: f64, longitude: f64, timezone: &str) -> String {
    format!(
        "{}?latitude={}&longitude={}&current={}&hourly={}&timezone={}&forecast_days=1",
        base,
        latitude,
        longitude,
        CURRENT_FIELDS,
        HOURLY_FIELDS,
        urlencoding::encode(timezone)
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a forecast response body into a `WeatherSample` stamped with the
/// current time. Forecast series are truncated to [`FORECAST_HOURS`]
/// entries; a missing `precipitation` field becomes 0.
///
/// # Errors
/// `FetchError::MalformedResponse` when expected fields are absent or of
/// the wrong shape.
pub fn parse_forecast_response(json: &str, location: Location) -> Result<WeatherSample, FetchError> {
    let response: ForecastResponse =
        serde_json::from_str(json).map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    let mut temperatures = response.hourly.temperature_2m;
    temperatures.truncate(FORECAST_HOURS);
    let mut probabilities = response.hourly.precipitation_probability;
    probabilities.truncate(FORECAST_HOURS);

    Ok(WeatherSample {
        timestamp: Utc::now(),
        location,
        current: CurrentConditions {
            temperature: response.current.temperature_2m,
            humidity: response.current.relative_humidity_2m,
            wind_speed: response.current.wind_speed_10m,
            weather_code: response.current.weather_code,
            precipitation: response.current.precipitation.unwrap_or(0.0),
        },
        forecast: Forecast {
            next_24h_temperatures: temperatures,
            precipitation_probabilities: probabilities,
        },
        source: "open-meteo".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Open-Meteo fetch stage. Owns its HTTP client and retry policy; both are
/// built once at startup and reused across all cycles.
pub struct OpenMeteoFetcher {
    location: Location,
    api_url: String,
    timezone: String,
    retry: RetryPolicy,
    rate_limit_cooldown: Duration,
    client: reqwest::blocking::Client,
}

impl OpenMeteoFetcher {
    /// Creates the fetcher, validating coordinates before anything else.
    ///
    /// # Errors
    /// `FetchError::Configuration` when latitude ∉ [-90, 90] or
    /// longitude ∉ [-180, 180]. No network call is made in that case.
    pub fn new(config: &Config, retry: RetryPolicy) -> Result<Self, FetchError> {
        if !(-90.0..=90.0).contains(&config.latitude) {
            return Err(FetchError::Configuration(format!(
                "invalid latitude: {}",
                config.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&config.longitude) {
            return Err(FetchError::Configuration(format!(
                "invalid longitude: {}",
                config.longitude
            )));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Unexpected(e.to_string()))?;

        Ok(Self {
            location: Location {
                name: config.location_name.clone(),
                latitude: config.latitude,
                longitude: config.longitude,
            },
            api_url: config.weather_api_url.clone(),
            timezone: config.timezone.clone(),
            retry,
            rate_limit_cooldown: RATE_LIMIT_COOLDOWN,
            client,
        })
    }

    /// One snapshot fetch under the bounded retry policy.
    pub fn get_weather_data(&self) -> Result<WeatherSample, FetchError> {
        for attempt in 0..self.retry.max_attempts {
            let err = match self.fetch_once() {
                Ok(sample) => {
                    info!(
                        "Weather data obtained for {}: {}°C",
                        self.location.name, sample.current.temperature
                    );
                    return Ok(sample);
                }
                Err(err) => err,
            };

            let last = self.retry.is_last_attempt(attempt);
            match &err {
                FetchError::Http(429) => {
                    // The cooldown replaces the linear delay entirely; the
                    // attempt slot is still consumed.
                    error!(
                        "Weather API rate limited (attempt {}), cooling down",
                        attempt + 1
                    );
                    thread::sleep(self.rate_limit_cooldown);
                    if last {
                        return Err(err);
                    }
                }
                FetchError::Http(status) if *status >= 500 => {
                    error!(
                        "Weather API server error {} (attempt {})",
                        status,
                        attempt + 1
                    );
                    if last {
                        return Err(err);
                    }
                    thread::sleep(self.retry.delay_after(attempt));
                }
                FetchError::Http(_) | FetchError::MalformedResponse(_) => {
                    error!("Fatal fetch failure, not retrying: {}", err);
                    return Err(err);
                }
                FetchError::Configuration(_) => return Err(err),
                FetchError::Network(_) | FetchError::Unexpected(_) => {
                    error!("Fetch attempt {} failed: {}", attempt + 1, err);
                    if last {
                        return Err(err);
                    }
                    thread::sleep(self.retry.delay_after(attempt));
                }
            }
        }

        Err(FetchError::Unexpected(
            "retry budget exhausted".to_string(),
        ))
    }

    fn fetch_once(&self) -> Result<WeatherSample, FetchError> {
        let url = build_forecast_url(
            &self.api_url,
            self.location.latitude,
            self.location.longitude,
            &self.timezone,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            return Err(FetchError::Http(status));
        }

        let body = response.text().map_err(classify_transport_error)?;
        parse_forecast_response(&body, self.location.clone())
    }
}

impl WeatherSource for OpenMeteoFetcher {
    fn get_weather_data(&self) -> Result<WeatherSample, FetchError> {
        OpenMeteoFetcher::get_weather_data(self)
    }
}

fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() {
        FetchError::Network(err.to_string())
    } else {
        FetchError::Unexpected(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures;
    use crate::retry::Backoff;
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use std::time::Instant;
    use tiny_http::{Response, Server};

    fn test_location() -> Location {
        Location {
            name: "Recife, Brazil".to_string(),
            latitude: -8.0542,
            longitude: -34.8813,
        }
    }

    fn config_with(latitude: f64, longitude: f64, api_url: &str) -> Config {
        let url = api_url.to_string();
        Config::from_lookup(move |key| match key {
            "LATITUDE" => Some(latitude.to_string()),
            "LONGITUDE" => Some(longitude.to_string()),
            "WEATHER_API_URL" => Some(url.clone()),
            _ => None,
        })
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(25), Backoff::Linear)
    }

    /// Serves the scripted (status, body) responses in order, then stops.
    /// Returns the bound port and a handle yielding the request count.
    fn spawn_stub_api(responses: Vec<(u16, String)>) -> (u16, JoinHandle<usize>) {
        let server = Server::http("127.0.0.1:0").expect("bind stub server");
        let port = server.server_addr().to_ip().unwrap().port();

        let handle = thread::spawn(move || {
            let mut served = 0;
            for (status, body) in responses {
                let request = match server.recv() {
                    Ok(request) => request,
                    Err(_) => break,
                };
                let response = Response::from_string(body).with_status_code(status);
                let _ = request.respond(response);
                served += 1;
            }
            served
        });

        (port, handle)
    }

    fn stub_fetcher(port: u16, policy: RetryPolicy, cooldown: Duration) -> OpenMeteoFetcher {
        let config = config_with(-8.0542, -34.8813, &format!("http://127.0.0.1:{}", port));
        let mut fetcher = OpenMeteoFetcher::new(&config, policy).unwrap();
        fetcher.rate_limit_cooldown = cooldown;
        fetcher
    }

    // -- construction -------------------------------------------------------

    #[test]
    fn test_invalid_latitude_rejected_at_construction() {
        let config = config_with(91.0, 0.0, "http://127.0.0.1:1");
        let result = OpenMeteoFetcher::new(&config, fast_policy());
        assert!(matches!(result, Err(FetchError::Configuration(_))));
    }

    #[test]
    fn test_invalid_longitude_rejected_at_construction() {
        let config = config_with(0.0, -180.5, "http://127.0.0.1:1");
        let result = OpenMeteoFetcher::new(&config, fast_policy());
        assert!(matches!(result, Err(FetchError::Configuration(_))));
    }

    #[test]
    fn test_boundary_coordinates_accepted() {
        assert!(OpenMeteoFetcher::new(&config_with(90.0, 180.0, "http://x"), fast_policy()).is_ok());
        assert!(OpenMeteoFetcher::new(&config_with(-90.0, -180.0, "http://x"), fast_policy()).is_ok());
    }

    // -- URL construction ---------------------------------------------------

    #[test]
    fn test_forecast_url_contents() {
        let url = build_forecast_url(
            "https://api.open-meteo.com/v1/forecast",
            -8.0542,
            -34.8813,
            "America/Sao_Paulo",
        );

        assert!(url.starts_with("https://api.open-meteo.com/v1/forecast?"));
        assert!(url.contains("latitude=-8.0542"));
        assert!(url.contains("longitude=-34.8813"));
        assert!(url.contains("current=temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code,precipitation"));
        assert!(url.contains("hourly=temperature_2m,precipitation_probability"));
        assert!(url.contains("timezone=America%2FSao_Paulo"));
        assert!(url.contains("forecast_days=1"));
    }

    // -- parsing ------------------------------------------------------------

    #[test]
    fn test_parse_maps_fields_and_truncates() {
        let sample =
            parse_forecast_response(fixtures::fixture_recife_json(), test_location()).unwrap();

        assert_eq!(sample.current.temperature, 27.4);
        assert_eq!(sample.current.humidity, 74.0);
        assert_eq!(sample.current.wind_speed, 14.8);
        assert_eq!(sample.current.weather_code, 2);
        assert_eq!(sample.current.precipitation, 0.3);
        assert_eq!(sample.location.name, "Recife, Brazil");
        assert_eq!(sample.source, "open-meteo");

        // Fixture carries 26 hourly entries; only the first 24 survive.
        assert_eq!(sample.forecast.next_24h_temperatures.len(), 24);
        assert_eq!(sample.forecast.precipitation_probabilities.len(), 24);
        assert_eq!(sample.forecast.next_24h_temperatures[0], 24.1);
        assert_eq!(sample.forecast.next_24h_temperatures[23], 24.3);
    }

    #[test]
    fn test_parse_defaults_missing_precipitation_to_zero() {
        let sample =
            parse_forecast_response(fixtures::fixture_no_precipitation_json(), test_location())
                .unwrap();
        assert_eq!(sample.current.precipitation, 0.0);
    }

    #[test]
    fn test_parse_short_series_kept_unpadded() {
        let sample =
            parse_forecast_response(fixtures::fixture_no_precipitation_json(), test_location())
                .unwrap();
        assert_eq!(sample.forecast.next_24h_temperatures.len(), 3);
    }

    #[test]
    fn test_parse_missing_hourly_is_malformed() {
        let result =
            parse_forecast_response(fixtures::fixture_missing_hourly_json(), test_location());
        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
    }

    // -- retry behavior -----------------------------------------------------

    #[test]
    fn test_connection_refused_retries_with_linear_delay() {
        // Bind then drop a listener so nothing answers on the port.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let fetcher = stub_fetcher(port, fast_policy(), Duration::from_millis(1));

        let start = Instant::now();
        let result = fetcher.get_weather_data();
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(FetchError::Network(_))));
        // Delays before attempts 2 and 3: base*1 + base*2 = 75ms.
        assert!(elapsed >= Duration::from_millis(75), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_server_error_then_success() {
        let (port, handle) = spawn_stub_api(vec![
            (500, String::new()),
            (200, fixtures::fixture_recife_json().to_string()),
        ]);
        let fetcher = stub_fetcher(port, fast_policy(), Duration::from_millis(1));

        let start = Instant::now();
        let result = fetcher.get_weather_data();
        let elapsed = start.elapsed();

        assert!(result.is_ok());
        assert_eq!(handle.join().unwrap(), 2);
        assert!(elapsed >= Duration::from_millis(25), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_rate_limit_cooldown_on_every_attempt() {
        let (port, handle) = spawn_stub_api(vec![
            (429, String::new()),
            (429, String::new()),
            (429, String::new()),
        ]);
        let cooldown = Duration::from_millis(30);
        let fetcher = stub_fetcher(port, fast_policy(), cooldown);

        let start = Instant::now();
        let result = fetcher.get_weather_data();
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(FetchError::Http(429))));
        assert_eq!(handle.join().unwrap(), 3, "exactly max_attempts tries");
        // One cooldown after each 429, no linear delay on top.
        assert!(elapsed >= Duration::from_millis(90), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_client_error_fails_immediately() {
        let (port, handle) = spawn_stub_api(vec![(404, String::new())]);
        let fetcher = stub_fetcher(port, fast_policy(), Duration::from_millis(1));

        let result = fetcher.get_weather_data();

        assert!(matches!(result, Err(FetchError::Http(404))));
        assert_eq!(handle.join().unwrap(), 1, "no additional attempts");
    }

    #[test]
    fn test_malformed_body_fails_immediately() {
        let (port, handle) = spawn_stub_api(vec![(200, "{}".to_string())]);
        let fetcher = stub_fetcher(port, fast_policy(), Duration::from_millis(1));

        let result = fetcher.get_weather_data();

        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
        assert_eq!(handle.join().unwrap(), 1);
    }
}
