use crate::api::ApiClient;
use crate::errors::{Error, Result};
use crate::model::{Ack, SettingsConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingField {
    ImageCapture,
    TempHumidity,
    LightIntensity,
    SoilMoisture,
    WaterLevel,
}

impl SettingField {
    pub const ALL: [SettingField; 5] = [
        SettingField::ImageCapture,
        SettingField::TempHumidity,
        SettingField::LightIntensity,
        SettingField::SoilMoisture,
        SettingField::WaterLevel,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingField::ImageCapture => "Image Capture Interval",
            SettingField::TempHumidity => "Temperature and Humidity Reading Interval",
            SettingField::LightIntensity => "Light Intensity Reading Interval",
            SettingField::SoilMoisture => "Soil Moisture Reading Interval",
            SettingField::WaterLevel => "Water Level Reading Interval",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SettingField::ImageCapture => "Set how often the system captures an image of the leaves.",
            SettingField::TempHumidity => "Set how often the system reads temperature and humidity data.",
            SettingField::LightIntensity => "Set how often the system reads light intensity data.",
            SettingField::SoilMoisture => "Set how often the system reads soil moisture data.",
            SettingField::WaterLevel => "Set how often the system reads water level data.",
        }
    }

    fn get(&self, config: &SettingsConfig) -> u32 {
        match self {
            SettingField::ImageCapture => config.image_capture_interval,
            SettingField::TempHumidity => config.temp_humidity_interval,
            SettingField::LightIntensity => config.light_intensity_interval,
            SettingField::SoilMoisture => config.soil_moisture_interval,
            SettingField::WaterLevel => config.water_level_interval,
        }
    }

    fn slot<'a>(&self, config: &'a mut SettingsConfig) -> &'a mut u32 {
        match self {
            SettingField::ImageCapture => &mut config.image_capture_interval,
            SettingField::TempHumidity => &mut config.temp_humidity_interval,
            SettingField::LightIntensity => &mut config.light_intensity_interval,
            SettingField::SoilMoisture => &mut config.soil_moisture_interval,
            SettingField::WaterLevel => &mut config.water_level_interval,
        }
    }
}

/// Local edit buffer for the settings panel. Inputs are kept as typed text
/// and only turned back into a `SettingsConfig` on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    inputs: [String; 5],
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self::from_config(&SettingsConfig::default())
    }
}

impl SettingsForm {
    pub fn from_config(config: &SettingsConfig) -> Self {
        Self {
            inputs: SettingField::ALL.map(|field| field.get(config).to_string()),
        }
    }

    pub fn set(&mut self, field: SettingField, input: impl Into<String>) {
        self.inputs[field as usize] = input.into();
    }

    pub fn input(&self, field: SettingField) -> &str {
        &self.inputs[field as usize]
    }

    /// Parses every input as a positive whole number of minutes
    pub fn to_config(&self) -> Result<SettingsConfig> {
        let mut config = SettingsConfig::default();
        for field in SettingField::ALL {
            let raw = self.input(field).trim();
            let minutes = raw.parse::<u32>().ok().filter(|m| *m > 0).ok_or_else(|| {
                Error::Validation(format!(
                    "{} must be a positive whole number of minutes, got {:?}",
                    field.label(),
                    raw
                ))
            })?;
            *field.slot(&mut config) = minutes;
        }
        Ok(config)
    }

    /// Fetches the current settings into a fresh form
    pub async fn load(client: &ApiClient) -> Result<Self> {
        Ok(Self::from_config(&client.settings().await?))
    }

    /// Validates and PUTs the whole settings object
    pub async fn save(&self, client: &ApiClient) -> Result<Ack> {
        let config = self.to_config()?;
        client.update_settings(&config).await
    }
}
