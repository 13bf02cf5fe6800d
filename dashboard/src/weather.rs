use crate::errors::{Error, Result};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const SLOTS: usize = 8;

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// One 3-hour slot of the forecast chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSlot {
    pub time: String,
    pub temperature: f64,
    /// Probability of precipitation, 0..=100
    pub precipitation: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub slots: Vec<ForecastSlot>,
    /// True when the slots are the built-in placeholder rather than live data
    pub fallback: bool,
}

impl Forecast {
    pub fn fallback() -> Self {
        let slots = ["18:00", "21:00", "00:00", "03:00", "06:00", "09:00", "12:00", "18:00"]
            .iter()
            .map(|time| ForecastSlot {
                time: time.to_string(),
                temperature: 19.0,
                precipitation: 30,
            })
            .collect();
        Self {
            slots,
            fallback: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: ForecastMain,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastMain {
    temp: f64,
}

/// Client for a third-party 3-hourly forecast API at a fixed coordinate
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    /// Live forecast, or the placeholder if anything goes wrong
    pub async fn forecast<Tz: TimeZone>(&self, tz: &Tz) -> Forecast
    where
        Tz::Offset: Display,
    {
        match self.fetch(tz).await {
            Ok(forecast) => forecast,
            Err(e) => {
                warn!("Weather forecast unavailable, using fallback: {}", e);
                Forecast::fallback()
            }
        }
    }

    async fn fetch<Tz: TimeZone>(&self, tz: &Tz) -> Result<Forecast>
    where
        Tz::Offset: Display,
    {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Validation("no weather API key configured".to_string()))?;

        debug!(
            "Fetching forecast for {},{}",
            self.config.latitude, self.config.longitude
        );
        let response = self
            .http
            .get(&self.config.url)
            .query(&[
                ("lat", self.config.latitude.to_string()),
                ("lon", self.config.longitude.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: self.config.url.clone(),
            });
        }

        let body = response.text().await?;
        parse_forecast(&body, tz)
    }
}

fn parse_forecast<Tz: TimeZone>(body: &str, tz: &Tz) -> Result<Forecast>
where
    Tz::Offset: Display,
{
    let response: ForecastResponse = serde_json::from_str(body)?;
    let slots: Vec<ForecastSlot> = response
        .list
        .iter()
        .filter_map(|entry| {
            let at = Utc.timestamp_opt(entry.dt, 0).single()?.with_timezone(tz);
            Some(ForecastSlot {
                time: at.format("%H:%M").to_string(),
                temperature: entry.main.temp,
                precipitation: (entry.pop.clamp(0.0, 1.0) * 100.0).round() as u8,
            })
        })
        .take(SLOTS)
        .collect();

    if slots.is_empty() {
        return Err(Error::Validation("forecast contained no entries".to_string()));
    }

    Ok(Forecast {
        slots,
        fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forecast() {
        let body = r#"{
            "cod": "200",
            "list": [
                {"dt": 1750183200, "main": {"temp": 21.4, "humidity": 70}, "pop": 0.36},
                {"dt": 1750194000, "main": {"temp": 19.9}}
            ]
        }"#;

        let forecast = parse_forecast(body, &Utc).unwrap();
        assert!(!forecast.fallback);
        assert_eq!(forecast.slots.len(), 2);
        assert_eq!(forecast.slots[0].time, "18:00");
        assert_eq!(forecast.slots[0].precipitation, 36);
        assert_eq!(forecast.slots[1].time, "21:00");
        assert_eq!(forecast.slots[1].precipitation, 0);
    }

    #[test]
    fn test_empty_forecast_is_an_error() {
        assert!(parse_forecast(r#"{"list": []}"#, &Utc).is_err());
        assert!(parse_forecast("<html>", &Utc).is_err());
    }

    #[test]
    fn test_missing_key_uses_fallback() {
        tokio_test::block_on(async {
            let client = WeatherClient::new(
                WeatherConfig {
                    url: DEFAULT_FORECAST_URL.to_string(),
                    api_key: None,
                    latitude: 21.0285,
                    longitude: 105.8542,
                },
                Duration::from_secs(1),
            )
            .unwrap();

            let forecast = client.forecast(&Utc).await;
            assert_eq!(forecast, Forecast::fallback());
            assert_eq!(forecast.slots.len(), 8);
            assert!(forecast.slots.iter().all(|s| s.temperature == 19.0 && s.precipitation == 30));
        });
    }
}
