use crate::dashboard::{DashboardLayout, PollIntervals};
use crate::weather::{WeatherConfig, DEFAULT_FORECAST_URL};
use clap::Parser;
use std::time::Duration;

/// Headless plant dashboard: polls the plant API and serves display-ready views
#[derive(Debug, Clone, Parser)]
#[command(name = "plant-dashboard", version)]
pub struct Config {
    /// Base URL of the plant API
    #[arg(long, env = "PLANT_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Address the view/metrics server binds to
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    #[arg(long, env = "HTTP_TIMEOUT_MS", default_value_t = 5_000)]
    pub http_timeout_ms: u64,

    #[arg(long, env = "SENSOR_POLL_MS", default_value_t = 10_000)]
    pub sensor_poll_ms: u64,

    #[arg(long, env = "IMAGE_POLL_MS", default_value_t = 30_000)]
    pub image_poll_ms: u64,

    #[arg(long, env = "WATERING_POLL_MS", default_value_t = 30_000)]
    pub watering_poll_ms: u64,

    #[arg(long, env = "HISTORY_POLL_MS", default_value_t = 60_000)]
    pub history_poll_ms: u64,

    /// Recent watering events shown in the summary
    #[arg(long, env = "SUMMARY_LIMIT", default_value_t = 5)]
    pub summary_limit: u32,

    /// Images shown in the gallery strip
    #[arg(long, env = "GALLERY_LIMIT", default_value_t = 6)]
    pub gallery_limit: u32,

    #[arg(long, env = "WEATHER_URL", default_value = DEFAULT_FORECAST_URL)]
    pub weather_url: String,

    #[arg(long, env = "WEATHER_API_KEY")]
    pub weather_api_key: Option<String>,

    #[arg(long, env = "WEATHER_LAT", default_value_t = 21.0285, allow_hyphen_values = true)]
    pub weather_lat: f64,

    #[arg(long, env = "WEATHER_LON", default_value_t = 105.8542, allow_hyphen_values = true)]
    pub weather_lon: f64,

    #[arg(long, env = "WEATHER_POLL_MS", default_value_t = 1_800_000)]
    pub weather_poll_ms: u64,
}

impl Config {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn intervals(&self) -> PollIntervals {
        PollIntervals {
            sensors: Duration::from_millis(self.sensor_poll_ms),
            images: Duration::from_millis(self.image_poll_ms),
            watering: Duration::from_millis(self.watering_poll_ms),
            history: Duration::from_millis(self.history_poll_ms),
        }
    }

    pub fn layout(&self) -> DashboardLayout {
        DashboardLayout {
            summary_limit: self.summary_limit,
            gallery_limit: self.gallery_limit,
            ..DashboardLayout::default()
        }
    }

    pub fn weather(&self) -> WeatherConfig {
        WeatherConfig {
            url: self.weather_url.clone(),
            api_key: self.weather_api_key.clone(),
            latitude: self.weather_lat,
            longitude: self.weather_lon,
        }
    }

    /// Never shorter than a minute; the forecast is rate limited upstream
    pub fn weather_interval(&self) -> Duration {
        Duration::from_millis(self.weather_poll_ms.max(60_000))
    }
}
