use crate::errors::{Error, Result};
use crate::model::{SensorReading, SettingsConfig, TANK_CAPACITY_ML};

const TEMP_MIN: f64 = -50.0;
const TEMP_MAX: f64 = 100.0;
const PERCENT_MIN: f64 = 0.0;
const PERCENT_MAX: f64 = 100.0;
const WATER_MIN: f64 = 0.0;

/// Lists every out-of-range field of a reading. An empty list means the reading is sane.
pub fn reading_anomalies(reading: &SensorReading) -> Vec<String> {
    let mut anomalies = Vec::new();

    if !(TEMP_MIN..=TEMP_MAX).contains(&reading.temperature) {
        anomalies.push(format!(
            "Temperature {} out of range [{}, {}]",
            reading.temperature, TEMP_MIN, TEMP_MAX
        ));
    }

    for (name, value) in [
        ("Humidity", reading.humidity),
        ("Soil moisture", reading.moisture),
        ("Light level", reading.light),
    ] {
        if !(PERCENT_MIN..=PERCENT_MAX).contains(&value) {
            anomalies.push(format!(
                "{} {} out of range [{}, {}]",
                name, value, PERCENT_MIN, PERCENT_MAX
            ));
        }
    }

    if !(WATER_MIN..=TANK_CAPACITY_ML).contains(&reading.water_level) {
        anomalies.push(format!(
            "Water level {} out of range [{}, {}]",
            reading.water_level, WATER_MIN, TANK_CAPACITY_ML
        ));
    }

    anomalies
}

/// Validates settings before they are sent back to the server
pub fn validate_settings(settings: &SettingsConfig) -> Result<()> {
    for (name, value) in [
        ("image_capture_interval", settings.image_capture_interval),
        ("temp_humidity_interval", settings.temp_humidity_interval),
        ("light_intensity_interval", settings.light_intensity_interval),
        ("soil_moisture_interval", settings.soil_moisture_interval),
        ("water_level_interval", settings.water_level_interval),
    ] {
        if value == 0 {
            return Err(Error::Validation(format!(
                "{} must be a positive number of minutes",
                name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> SensorReading {
        SensorReading {
            id: "r-1".to_string(),
            temperature: 25.0,
            humidity: 60.0,
            moisture: 45.0,
            light: 70.0,
            water_level: 700.0,
            timestamp: "2025-06-17T07:00:00Z".to_string(),
            image_url: None,
            prediction: None,
        }
    }

    #[test]
    fn test_valid_reading() {
        assert!(reading_anomalies(&reading()).is_empty());
    }

    #[test]
    fn test_invalid_temperature() {
        let mut r = reading();
        r.temperature = 150.0; // Out of range
        assert_eq!(reading_anomalies(&r).len(), 1);
    }

    #[test]
    fn test_invalid_percentages() {
        let mut r = reading();
        r.humidity = 101.0;
        r.light = -1.0;
        let anomalies = reading_anomalies(&r);
        assert_eq!(anomalies.len(), 2);
        assert!(anomalies[0].starts_with("Humidity"));
        assert!(anomalies[1].starts_with("Light level"));
    }

    #[test]
    fn test_water_level_above_tank() {
        let mut r = reading();
        r.water_level = 1500.0;
        assert!(reading_anomalies(&r)[0].starts_with("Water level"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = SettingsConfig {
            soil_moisture_interval: 0,
            ..SettingsConfig::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(Error::Validation(_))
        ));
        assert!(validate_settings(&SettingsConfig::default()).is_ok());
    }
}
