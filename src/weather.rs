//! Today's weather, shown once an alarm is dismissed.

use std::{fmt, time::Duration};

use serde::Deserialize;

use crate::{
    config::Location,
    error::{ClockError, Result},
};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub condition: String,
    /// degrees celsius, rounded
    pub temperature: i32,
    pub recommendation: String,
}

impl Weather {
    /// What gets shown when the weather couldn't be looked up.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            condition: "Unknown".to_string(),
            temperature: 0,
            recommendation: "Have a wonderful day!".to_string(),
        }
    }

    #[must_use]
    pub fn from_code(code: u32, temperature: f64) -> Self {
        let (condition, recommendation) = describe(code);
        #[allow(clippy::cast_possible_truncation)]
        let temperature = temperature.round() as i32;
        Self {
            condition: condition.to_string(),
            temperature,
            recommendation: recommendation.to_string(),
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}°C - {}",
            self.condition, self.temperature, self.recommendation
        )
    }
}

/// Condition and recommendation for a WMO weather code.
#[must_use]
pub const fn describe(code: u32) -> (&'static str, &'static str) {
    match code {
        0 => ("Clear", "Perfect weather! Enjoy your day."),
        1..=3 => ("Partly Cloudy", "Nice day ahead!"),
        4..=49 => ("Foggy", "Drive carefully in the fog."),
        50..=69 => ("Rainy", "Don't forget your umbrella!"),
        70..=79 => ("Snowy", "Bundle up! Snow expected today."),
        80..=99 => ("Stormy", "Stay safe! Storms expected today."),
        _ => ("Unknown", "Have a great day!"),
    }
}

pub trait WeatherProvider {
    fn current(&self) -> Result<Weather>;
}

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    weather_code: u32,
}

/// Looks up the current weather with the free open-meteo API.
#[derive(Debug, Clone)]
pub struct OpenMeteo {
    location: Location,
    client: reqwest::blocking::Client,
}

impl OpenMeteo {
    pub fn new(location: Location) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| ClockError::Weather(format!("couldn't create http client: {e}")))?;
        Ok(Self { location, client })
    }
}

impl WeatherProvider for OpenMeteo {
    fn current(&self) -> Result<Weather> {
        let response = self
            .client
            .get(FORECAST_URL)
            .query(&[
                ("latitude", self.location.latitude.to_string()),
                ("longitude", self.location.longitude.to_string()),
                ("current", "temperature_2m,weather_code".to_string()),
                ("temperature_unit", "celsius".to_string()),
            ])
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| ClockError::Weather(e.to_string()))?;
        let forecast: ForecastResponse = response
            .json()
            .map_err(|e| ClockError::Weather(e.to_string()))?;
        Ok(Weather::from_code(
            forecast.current.weather_code,
            forecast.current.temperature_2m,
        ))
    }
}

/// Never fails, lookup errors and a missing location give [`Weather::unknown`].
pub fn weather_or_fallback(provider: Option<&dyn WeatherProvider>) -> Weather {
    let Some(provider) = provider else {
        return Weather::unknown();
    };
    provider.current().unwrap_or_else(|e| {
        log::warn!("{e}");
        Weather::unknown()
    })
}
