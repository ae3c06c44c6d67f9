use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    model::{ForecastFeed, ForecastPoint},
    response::UNKNOWN,
};

use super::ForecastProvider;

pub const DEFAULT_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Client for OpenWeather's 5 day / 3 hour forecast endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key,
            base_url,
            http,
        })
    }

    async fn fetch_forecast(&self, city: &str) -> Result<ForecastFeed, ProviderError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OwForecastResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        if parsed.list.is_empty() {
            return Err(ProviderError::Empty);
        }

        let points = parsed
            .list
            .into_iter()
            .map(OwForecastEntry::into_point)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ForecastFeed {
            location: parsed.city.name,
            points,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl OwForecastEntry {
    fn into_point(self) -> Result<ForecastPoint, ProviderError> {
        let timestamp = NaiveDateTime::parse_from_str(&self.dt_txt, DT_TXT_FORMAT)
            .map_err(|e| ProviderError::Parse(format!("bad dt_txt '{}': {e}", self.dt_txt)))?;

        let description = self
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .unwrap_or_else(|| UNKNOWN.to_string());

        Ok(ForecastPoint {
            timestamp,
            description,
            temp_celsius: self.main.temp,
            wind_speed_mps: self.wind.speed,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    async fn forecast(&self, city: &str) -> Result<ForecastFeed, ProviderError> {
        tracing::info!(city, "fetching OpenWeather forecast");
        let feed = self.fetch_forecast(city).await;
        match &feed {
            Ok(feed) => tracing::debug!(
                location = %feed.location,
                points = feed.points.len(),
                "OpenWeather forecast received"
            ),
            Err(err) => tracing::warn!(city, error = %err, "OpenWeather forecast failed"),
        }
        feed
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
