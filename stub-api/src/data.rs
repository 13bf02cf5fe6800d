use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const PREDICTIONS: [&str; 5] = [
    "Healthy",
    "Bacterial spot",
    "Early blight",
    "Late blight",
    "Spider mites",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "_id")]
    pub id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
    pub light: f64,
    pub water_level: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "_id")]
    pub id: String,
    pub image_url: String,
    pub prediction: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watering {
    #[serde(rename = "_id")]
    pub id: String,
    pub mode: String,
    pub timestamp: DateTime<Utc>,
    pub duration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub image_capture_interval: u32,
    pub temp_humidity_interval: u32,
    pub light_intensity_interval: u32,
    pub soil_moisture_interval: u32,
    pub water_level_interval: u32,
}

impl Default for Settings {
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

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn generate_reading(rng: &mut impl Rng, timestamp: DateTime<Utc>) -> Reading {
    let temperature = if rng.gen_bool(0.05) {
        rng.gen_range(-5.0..45.0) // 5% outliers
    } else {
        rng.gen_range(18.0..32.0) // Normal range
    };

    Reading {
        id: new_id(),
        temperature,
        humidity: rng.gen_range(35.0..85.0),
        moisture: rng.gen_range(20.0..80.0),
        light: rng.gen_range(0.0..100.0),
        water_level: rng.gen_range(0..=1400) as f64,
        timestamp,
    }
}

pub fn generate_image(rng: &mut impl Rng, timestamp: DateTime<Utc>) -> Image {
    let id = new_id();
    // Mostly healthy leaves
    let prediction = if rng.gen_bool(0.6) {
        PREDICTIONS[0]
    } else {
        PREDICTIONS[rng.gen_range(1..PREDICTIONS.len())]
    };

    Image {
        image_url: format!("https://images.example.invalid/leaves/{}.jpg", id),
        id,
        prediction: prediction.to_string(),
        timestamp,
    }
}

pub fn generate_watering(rng: &mut impl Rng, timestamp: DateTime<Utc>) -> Watering {
    Watering {
        id: new_id(),
        mode: if rng.gen_bool(0.7) { "auto" } else { "manual" }.to_string(),
        timestamp,
        duration: rng.gen_range(10..=120),
    }
}

/// Readings every 15 minutes, images every 2 hours and waterings twice a day, ending at `now`
pub fn history(
    rng: &mut impl Rng,
    now: DateTime<Utc>,
    days: i64,
) -> (Vec<Reading>, Vec<Image>, Vec<Watering>) {
    let start = now - Duration::days(days);

    let readings = (0..days * 24 * 4)
        .map(|i| generate_reading(rng, start + Duration::minutes(15 * (i + 1))))
        .collect();
    let images = (0..days * 12)
        .map(|i| generate_image(rng, start + Duration::hours(2 * (i + 1))))
        .collect();
    let watering = (0..days * 2)
        .map(|i| generate_watering(rng, start + Duration::hours(12 * (i + 1))))
        .collect();

    (readings, images, watering)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_values_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let r = generate_reading(&mut rng, Utc::now());
            assert!((0.0..=100.0).contains(&r.humidity));
            assert!((0.0..=100.0).contains(&r.moisture));
            assert!((0.0..=1400.0).contains(&r.water_level));
        }
    }

    #[test]
    fn test_history_sizes() {
        let mut rng = rand::thread_rng();
        let (readings, images, watering) = history(&mut rng, Utc::now(), 2);
        assert_eq!(readings.len(), 192);
        assert_eq!(images.len(), 24);
        assert_eq!(watering.len(), 4);
    }
}
