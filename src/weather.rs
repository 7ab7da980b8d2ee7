//! OpenWeatherMap current-weather client and its refresh task.

use std::time::Duration;

pub use glance_ui::{WeatherKind, WeatherReport};
use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::config::WeatherConfig;

/// Poll cadence for current weather.
pub const WEATHER_REFRESH: Duration = Duration::from_secs(30 * 60);

const ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather request failed")]
    Http(#[from] reqwest::Error),

    #[error("weather provider answered {status}")]
    Status { status: reqwest::StatusCode },

    /// The `weather` array in the response was empty.
    #[error("weather response carried no condition entry")]
    NoCondition,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: Readings,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    icon: String,
}

impl CurrentWeather {
    // Whole degrees on screen; truncation, not rounding.
    fn into_report(self) -> Result<WeatherReport, WeatherError> {
        let condition = self.weather.first().ok_or(WeatherError::NoCondition)?;
        Ok(WeatherReport {
            temp: self.main.temp as i16,
            temp_max: self.main.temp_max as i16,
            temp_min: self.main.temp_min as i16,
            humidity: self.main.humidity as u8,
            kind: WeatherKind::from_icon(&condition.icon),
        })
    }
}

pub struct WeatherClient {
    http: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn fetch(&self) -> Result<WeatherReport, WeatherError> {
        let response = self
            .http
            .get(ENDPOINT)
            .query(&[
                ("q", self.config.city.as_str()),
                ("units", self.config.units.as_str()),
                ("appid", self.config.api_key.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WeatherError::Status {
                status: response.status(),
            });
        }
        let current: CurrentWeather = response.json().await?;
        current.into_report()
    }
}

/// Fetches immediately, then every [`WEATHER_REFRESH`]. On failure the
/// previous report stays on screen and the miss is logged.
pub async fn weather_task(
    client: WeatherClient,
    clock: Clock,
    reports: watch::Sender<Option<WeatherReport>>,
) {
    let mut interval = tokio::time::interval(WEATHER_REFRESH);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        match client.fetch().await {
            Ok(report) => {
                debug!("weather: {report:?}");
                reports.send_replace(Some(report));
            }
            Err(err) => warn!("{} could not update weather data: {err}", clock.stamp()),
        }
    }
}
