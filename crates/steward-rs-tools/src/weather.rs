//! Current-weather lookup through the Open-Meteo geocoding and forecast APIs.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Number;
use std::fmt;
use std::time::Duration;
use steward_rs_config::WeatherConfig;

/// Failures of a weather lookup. `Display` is the text narrated to the model.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Failed to fetch location data. Status code: {0}")]
    GeocodingStatus(u16),
    #[error("Could not find location: {0}")]
    LocationNotFound(String),
    #[error("Failed to fetch weather data. Status code: {0}")]
    ForecastStatus(u16),
    #[error("Error fetching weather for {location}: {message}")]
    Request { location: String, message: String },
    /// The HTTP client could not be constructed.
    #[error("failed to build weather client: {0}")]
    Client(String),
}

/// Current conditions at a resolved location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub name: String,
    pub country: Option<String>,
    /// Degrees Celsius.
    pub temperature: Option<Number>,
    /// Kilometres per hour.
    pub wind_speed: Option<Number>,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Weather in {}", self.name)?;
        if let Some(country) = self.country.as_deref().filter(|c| !c.is_empty()) {
            write!(f, ", {country}")?;
        }
        write!(
            f,
            ": {}°C, Wind Speed: {} km/h",
            display_number(self.temperature.as_ref()),
            display_number(self.wind_speed.as_ref())
        )
    }
}

fn display_number(value: Option<&Number>) -> String {
    value
        .map(Number::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Source of current weather conditions.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_weather(&self, location: &str) -> Result<WeatherReport, WeatherError>;
}

/// Open-Meteo client: geocode the location, then fetch current conditions.
#[derive(Debug, Clone)]
pub struct OpenMeteoWeather {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoWeather {
    pub fn new(
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| WeatherError::Client(err.to_string()))?;
        Ok(Self {
            client,
            geocoding_url: geocoding_url.into(),
            forecast_url: forecast_url.into(),
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        info!(
            "weather provider configured (geocoding_url={}, timeout_secs={})",
            config.geocoding_url, config.timeout_secs
        );
        Self::new(
            config.geocoding_url.clone(),
            config.forecast_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn geocode(&self, location: &str) -> Result<GeoResult, WeatherError> {
        let response = self
            .client
            .get(&self.geocoding_url)
            .query(&[
                ("name", location),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|err| request_error(location, err))?;
        if response.status() != StatusCode::OK {
            return Err(WeatherError::GeocodingStatus(response.status().as_u16()));
        }
        let body: GeoResponse = response
            .json()
            .await
            .map_err(|err| request_error(location, err))?;
        body.results
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::LocationNotFound(location.to_string()))
    }

    async fn forecast(&self, location: &str, place: &GeoResult) -> Result<CurrentWeather, WeatherError> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|err| request_error(location, err))?;
        if response.status() != StatusCode::OK {
            return Err(WeatherError::ForecastStatus(response.status().as_u16()));
        }
        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|err| request_error(location, err))?;
        Ok(body.current_weather.unwrap_or_default())
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeather {
    async fn current_weather(&self, location: &str) -> Result<WeatherReport, WeatherError> {
        let place = self.geocode(location).await?;
        debug!(
            "geocoded location (name={}, latitude={}, longitude={})",
            place.name, place.latitude, place.longitude
        );
        let current = self.forecast(location, &place).await?;
        Ok(WeatherReport {
            name: place.name,
            country: place.country,
            temperature: current.temperature,
            wind_speed: current.windspeed,
        })
    }
}

fn request_error(location: &str, err: reqwest::Error) -> WeatherError {
    WeatherError::Request {
        location: location.to_string(),
        message: err.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Option<Vec<GeoResult>>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    latitude: f64,
    longitude: f64,
    name: String,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    temperature: Option<Number>,
    #[serde(default)]
    windspeed: Option<Number>,
}

#[cfg(test)]
mod tests {
    use super::{OpenMeteoWeather, WeatherError, WeatherProvider, WeatherReport};
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}")
    }

    async fn geocode(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        match params.get("name").map(String::as_str) {
            Some("Paris") => Json(json!({
                "results": [
                    { "latitude": 48.85, "longitude": 2.35, "name": "Paris", "country": "France" }
                ]
            })),
            _ => Json(json!({ "generationtime_ms": 0.5 })),
        }
    }

    async fn forecast(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(params.get("current_weather").map(String::as_str), Some("true"));
        Json(json!({
            "current_weather": { "temperature": 18.0, "windspeed": 11.5 }
        }))
    }

    fn client(base: &str, timeout: Duration) -> OpenMeteoWeather {
        OpenMeteoWeather::new(format!("{base}/search"), format!("{base}/forecast"), timeout)
            .expect("client")
    }

    #[tokio::test]
    async fn resolves_location_and_reports_current_weather() {
        let base = serve(
            Router::new()
                .route("/search", get(geocode))
                .route("/forecast", get(forecast)),
        )
        .await;
        let report = client(&base, Duration::from_secs(5))
            .current_weather("Paris")
            .await
            .expect("report");
        assert_eq!(
            report.to_string(),
            "Weather in Paris, France: 18.0°C, Wind Speed: 11.5 km/h"
        );
    }

    #[tokio::test]
    async fn unknown_location_is_reported() {
        let base = serve(
            Router::new()
                .route("/search", get(geocode))
                .route("/forecast", get(forecast)),
        )
        .await;
        let err = client(&base, Duration::from_secs(5))
            .current_weather("Atlantis")
            .await
            .expect_err("not found");
        assert_eq!(err.to_string(), "Could not find location: Atlantis");
    }

    #[tokio::test]
    async fn non_ok_status_is_reported() {
        let base = serve(Router::new().route(
            "/search",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;
        let err = client(&base, Duration::from_secs(5))
            .current_weather("Paris")
            .await
            .expect_err("status");
        assert_eq!(
            err.to_string(),
            "Failed to fetch location data. Status code: 503"
        );
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let base = serve(Router::new().route(
            "/search",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        ))
        .await;
        let err = client(&base, Duration::from_millis(200))
            .current_weather("Paris")
            .await
            .expect_err("timeout");
        assert!(matches!(err, WeatherError::Request { .. }));
        assert!(err.to_string().starts_with("Error fetching weather for Paris: "));
    }

    #[test]
    fn report_omits_missing_country() {
        let report = WeatherReport {
            name: "Reykjavik".to_string(),
            country: None,
            temperature: serde_json::Number::from_f64(-2.5),
            wind_speed: None,
        };
        assert_eq!(
            report.to_string(),
            "Weather in Reykjavik: -2.5°C, Wind Speed: unknown km/h"
        );
    }
}
