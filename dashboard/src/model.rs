use serde::{Deserialize, Serialize};

/// Capacity of the reservoir, in millilitres. A display constant, never read from data.
pub const TANK_CAPACITY_ML: f64 = 1400.0;

/// Latest sampled state of the plant. Timestamps stay raw so a malformed
/// value reaches the formatter instead of failing the whole fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "_id")]
    pub id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
    pub light: f64,
    pub water_level: f64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
}

/// A captured leaf image and the classifier's verdict on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub image_url: String,
    pub prediction: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WateringMode {
    Auto,
    Manual,
    #[serde(other)]
    Unknown,
}

impl WateringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WateringMode::Auto => "auto",
            WateringMode::Manual => "manual",
            WateringMode::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WateringMode::Auto => "Auto",
            WateringMode::Manual => "Manual",
            WateringMode::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WateringEvent {
    #[serde(rename = "_id")]
    pub id: String,
    pub mode: WateringMode,
    pub timestamp: String,
    /// Seconds
    pub duration: u64,
}

/// Sampling intervals of the edge device, all in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub image_capture_interval: u32,
    pub temp_humidity_interval: u32,
    pub light_intensity_interval: u32,
    pub soil_moisture_interval: u32,
    pub water_level_interval: u32,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            image_capture_interval: 120,
            temp_humidity_interval: 15,
            light_intensity_interval: 15,
            soil_moisture_interval: 15,
            water_level_interval: 15,
        }
    }
}

/// Optional body the API sends back for commands and settings updates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
