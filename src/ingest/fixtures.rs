//! Test fixtures: representative JSON payloads from the Open-Meteo
//! forecast API.
//!
//! Structurally complete but trimmed to what the parser exercises. Shape of
//! a real response from:
//!   https://api.open-meteo.com/v1/forecast?latitude=...&longitude=...
//!     &current=temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code,precipitation
//!     &hourly=temperature_2m,precipitation_probability&forecast_days=1
//!
//! Open-Meteo response shape:
//!   .current.temperature_2m        — °C
//!   .current.relative_humidity_2m  — %
//!   .current.wind_speed_10m        — km/h
//!   .current.weather_code          — WMO code (integer)
//!   .current.precipitation         — mm, sometimes omitted
//!   .hourly.temperature_2m[]             — 24 entries for a 1-day window
//!   .hourly.precipitation_probability[]  — %, same length

/// Recife with 26 hourly entries — two more than the 24 the service keeps,
/// so truncation is observable.
#[cfg(test)]
pub(crate) fn fixture_recife_json() -> &'static str {
    r#"{
      "latitude": -8.0542,
      "longitude": -34.8813,
      "timezone": "America/Sao_Paulo",
      "current": {
        "time": "2026-08-30T09:00",
        "temperature_2m": 27.4,
        "relative_humidity_2m": 74,
        "wind_speed_10m": 14.8,
        "weather_code": 2,
        "precipitation": 0.3
      },
      "hourly": {
        "temperature_2m": [
          24.1, 23.8, 23.6, 23.5, 23.4, 23.6, 24.2, 25.3,
          26.4, 27.2, 27.9, 28.3, 28.6, 28.4, 28.0, 27.5,
          26.8, 26.1, 25.6, 25.2, 24.9, 24.7, 24.5, 24.3,
          24.2, 24.0
        ],
        "precipitation_probability": [
          10, 10, 15, 20, 20, 25, 30, 35,
          30, 25, 20, 15, 10, 10, 15, 20,
          35, 45, 40, 30, 25, 20, 15, 10,
          10, 5
        ]
      }
    }"#
}

/// Current block without the optional `precipitation` field — the parser
/// must default it to 0.
#[cfg(test)]
pub(crate) fn fixture_no_precipitation_json() -> &'static str {
    r#"{
      "current": {
        "time": "2026-08-30T09:00",
        "temperature_2m": 21.0,
        "relative_humidity_2m": 60,
        "wind_speed_10m": 9.5,
        "weather_code": 1
      },
      "hourly": {
        "temperature_2m": [20.0, 21.0, 22.0],
        "precipitation_probability": [5, 10, 15]
      }
    }"#
}

/// Response missing the `hourly` section entirely — simulates an upstream
/// contract change. Parser must fail with MalformedResponse, not panic.
#[cfg(test)]
pub(crate) fn fixture_missing_hourly_json() -> &'static str {
    r#"{
      "current": {
        "time": "2026-08-30T09:00",
        "temperature_2m": 27.4,
        "relative_humidity_2m": 74,
        "wind_speed_10m": 14.8,
        "weather_code": 2,
        "precipitation": 0.0
      }
    }"#
}
