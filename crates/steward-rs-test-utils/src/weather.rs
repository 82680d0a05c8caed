use async_trait::async_trait;
use serde_json::Number;
use steward_rs_tools::{WeatherError, WeatherProvider, WeatherReport};

/// Weather provider that knows a single city.
#[derive(Debug, Clone)]
pub struct StubWeather {
    city: String,
    country: Option<String>,
    temperature: f64,
}

impl StubWeather {
    pub fn new(city: impl Into<String>, temperature: f64) -> Self {
        Self {
            city: city.into(),
            country: None,
            temperature,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

#[async_trait]
impl WeatherProvider for StubWeather {
    async fn current_weather(&self, location: &str) -> Result<WeatherReport, WeatherError> {
        if !location.eq_ignore_ascii_case(&self.city) {
            return Err(WeatherError::LocationNotFound(location.to_string()));
        }
        Ok(WeatherReport {
            name: self.city.clone(),
            country: self.country.clone(),
            temperature: Number::from_f64(self.temperature),
            wind_speed: Number::from_f64(5.0),
        })
    }
}
