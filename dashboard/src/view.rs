use crate::health::{HealthStatus, StatusTone};
use crate::model::{ImageRecord, SensorReading, WateringEvent, WateringMode, TANK_CAPACITY_ML};
use crate::validate::reading_anomalies;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;
use std::fmt::Display;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Fill ratio of a radial gauge in percent, clamped to [0, 100]
pub fn gauge_ratio(value: f64, max: f64) -> f64 {
    if !(max > 0.0) || value.is_nan() {
        return 0.0;
    }
    if value >= max {
        return 100.0;
    }
    (value / max * 100.0).clamp(0.0, 100.0)
}

pub fn water_level_ratio(water_level_ml: f64) -> f64 {
    gauge_ratio(water_level_ml, TANK_CAPACITY_ML)
}

pub fn moisture_ratio(moisture_pct: f64) -> f64 {
    gauge_ratio(moisture_pct, 100.0)
}

/// Parses an ISO-8601 timestamp. Values without an offset are wall-clock time in `tz`.
pub fn parse_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(tz));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
}

/// `6/17/2025, 7:00:00 AM` in local time, or `raw` unchanged if it does not parse
pub fn format_timestamp(raw: &str) -> String {
    format_timestamp_in(raw, &Local)
}

pub fn format_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    match parse_timestamp_in(raw, tz) {
        Some(dt) => dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        None => raw.to_string(),
    }
}

/// `("07:00", "Jun 17")`, or `("--:--", "Invalid")` if `raw` does not parse
pub fn split_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> (String, String)
where
    Tz::Offset: Display,
{
    match parse_timestamp_in(raw, tz) {
        Some(dt) => (dt.format("%H:%M").to_string(), dt.format("%b %-d").to_string()),
        None => ("--:--".to_string(), "Invalid".to_string()),
    }
}

/// `45s`, `2min`, `1h 2min`. Partial minutes are dropped.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}min", secs / 60)
    } else {
        format!("{}h {}min", secs / 3600, (secs % 3600) / 60)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WateringStats {
    pub events: usize,
    pub auto: usize,
    pub manual: usize,
    pub total_duration_secs: u64,
    pub total_duration: String,
}

impl WateringStats {
    pub fn from_events(events: &[WateringEvent]) -> Self {
        let count = |mode: WateringMode| events.iter().filter(|e| e.mode == mode).count();
        let total = events.iter().map(|e| e.duration).fold(0u64, u64::saturating_add);
        Self {
            events: events.len(),
            auto: count(WateringMode::Auto),
            manual: count(WateringMode::Manual),
            total_duration_secs: total,
            total_duration: format_duration(total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WateringRow {
    pub id: String,
    pub mode: String,
    pub time: String,
    pub date: String,
    pub duration: String,
}

impl WateringRow {
    pub fn from_event<Tz: TimeZone>(event: &WateringEvent, tz: &Tz) -> Self
    where
        Tz::Offset: Display,
    {
        let (time, date) = split_timestamp_in(&event.timestamp, tz);
        Self {
            id: event.id.clone(),
            mode: event.mode.label().to_string(),
            time,
            date,
            duration: format_duration(event.duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorLine {
    pub label: &'static str,
    pub value: String,
}

/// The sensor card: formatted values, gauges and the health verdict carried on the reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorPanel {
    pub lines: Vec<SensorLine>,
    pub water_level_ratio: f64,
    pub moisture_ratio: f64,
    pub captured_at: Option<String>,
    pub health: HealthStatus,
    pub anomalies: Vec<String>,
}

impl SensorPanel {
    pub fn build<Tz: TimeZone>(reading: Option<&SensorReading>, tz: &Tz) -> Self
    where
        Tz::Offset: Display,
    {
        let value = |f: fn(&SensorReading) -> String, placeholder: &str| {
            reading.map(f).unwrap_or_else(|| placeholder.to_string())
        };

        let lines = vec![
            SensorLine {
                label: "Temperature",
                value: value(|r| format!("{:.1}°C", r.temperature), "--°C"),
            },
            SensorLine {
                label: "Humidity",
                value: value(|r| format!("{:.1}%", r.humidity), "--%"),
            },
            SensorLine {
                label: "Soil Moisture",
                value: value(|r| format!("{:.1}%", r.moisture), "--%"),
            },
            SensorLine {
                label: "Light Level",
                value: value(|r| format!("{:.1}%", r.light), "--%"),
            },
            SensorLine {
                label: "Water Level",
                value: value(|r| format!("{}ml", r.water_level), "--ml"),
            },
        ];

        Self {
            lines,
            water_level_ratio: reading.map_or(0.0, |r| water_level_ratio(r.water_level)),
            moisture_ratio: reading.map_or(0.0, |r| moisture_ratio(r.moisture)),
            captured_at: reading.map(|r| format_timestamp_in(&r.timestamp, tz)),
            health: HealthStatus::classify(reading.and_then(|r| r.prediction.as_deref())),
            anomalies: reading.map(reading_anomalies).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryItem {
    pub id: String,
    pub image_url: String,
    pub status: String,
    pub tone: StatusTone,
    pub captured_at: String,
}

impl GalleryItem {
    pub fn from_record<Tz: TimeZone>(record: &ImageRecord, tz: &Tz) -> Self
    where
        Tz::Offset: Display,
    {
        let health = HealthStatus::classify(Some(&record.prediction));
        Self {
            id: record.id.clone(),
            image_url: record.image_url.clone(),
            status: health.label().to_string(),
            tone: health.tone(),
            captured_at: format_timestamp_in(&record.timestamp, tz),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: String,
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
    pub light: f64,
}

/// Chart series from sensor history, oldest first. Points with unparsable timestamps are skipped.
pub fn chart_series<Tz: TimeZone>(history: &[SensorReading], tz: &Tz) -> Vec<ChartPoint>
where
    Tz::Offset: Display,
{
    let mut points: Vec<(DateTime<Tz>, &SensorReading)> = history
        .iter()
        .filter_map(|r| parse_timestamp_in(&r.timestamp, tz).map(|dt| (dt, r)))
        .collect();
    points.sort_by(|a, b| a.0.cmp(&b.0));

    points
        .into_iter()
        .map(|(dt, r)| ChartPoint {
            time: dt.format("%H:%M").to_string(),
            temperature: r.temperature,
            humidity: r.humidity,
            moisture: r.moisture,
            light: r.light,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn event(id: &str, mode: WateringMode, duration: u64) -> WateringEvent {
        WateringEvent {
            id: id.to_string(),
            mode,
            timestamp: "2025-06-17T07:00:00Z".to_string(),
            duration,
        }
    }

    #[test]
    fn test_gauge_clamps_at_max() {
        assert_eq!(gauge_ratio(1400.0, 1400.0), 100.0);
        assert_eq!(gauge_ratio(5000.0, 1400.0), 100.0);
        assert_eq!(water_level_ratio(1401.0), 100.0);
        assert_eq!(gauge_ratio(700.0, 1400.0), 50.0);
        assert_eq!(gauge_ratio(-10.0, 100.0), 0.0);
        assert_eq!(gauge_ratio(10.0, 0.0), 0.0);
        assert_eq!(gauge_ratio(f64::NAN, 100.0), 0.0);
    }

    #[test]
    fn test_unparsable_timestamp_is_echoed() {
        for raw in ["", "yesterday", "2025-13-45T99:00:00Z", "17/06/2025"] {
            assert_eq!(format_timestamp(raw), raw);
        }
        assert_eq!(
            split_timestamp_in("garbage", &Utc),
            ("--:--".to_string(), "Invalid".to_string())
        );
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(
            format_timestamp_in("2025-06-17T07:05:09Z", &Utc),
            "6/17/2025, 7:05:09 AM"
        );
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        assert_eq!(
            format_timestamp_in("2025-06-17T07:05:09Z", &tz),
            "6/17/2025, 2:05:09 PM"
        );
        // Naive values are taken as wall-clock time
        assert_eq!(
            split_timestamp_in("2025-06-17T19:30:00.123456", &tz),
            ("19:30".to_string(), "Jun 17".to_string())
        );
    }

    #[test]
    fn test_duration_labels() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(125), "2min");
        assert_eq!(format_duration(3725), "1h 2min");
        assert_eq!(format_duration(3600), "1h 0min");
        assert_eq!(format_duration(0), "0s");
    }

    #[test]
    fn test_watering_stats() {
        let events = vec![
            event("a", WateringMode::Auto, 20),
            event("b", WateringMode::Manual, 40),
            event("c", WateringMode::Auto, 65),
        ];
        let stats = WateringStats::from_events(&events);
        assert_eq!(stats.events, 3);
        assert_eq!(stats.auto, 2);
        assert_eq!(stats.manual, 1);
        assert_eq!(stats.total_duration_secs, 125);
        assert_eq!(stats.total_duration, "2min");

        assert_eq!(WateringStats::from_events(&[]).total_duration, "0s");
    }

    #[test]
    fn test_watering_total_saturates() {
        let events = vec![
            event("a", WateringMode::Auto, u64::MAX - 5),
            event("b", WateringMode::Manual, 60),
        ];
        let stats = WateringStats::from_events(&events);
        assert_eq!(stats.total_duration_secs, u64::MAX);
        assert!(stats.total_duration.ends_with("min"));
    }

    #[test]
    fn test_watering_row() {
        let row = WateringRow::from_event(&event("a", WateringMode::Manual, 45), &Utc);
        assert_eq!(row.mode, "Manual");
        assert_eq!(row.time, "07:00");
        assert_eq!(row.date, "Jun 17");
        assert_eq!(row.duration, "45s");
    }

    #[test]
    fn test_sensor_panel_placeholders() {
        let panel = SensorPanel::build(None, &Utc);
        let values: Vec<&str> = panel.lines.iter().map(|l| l.value.as_str()).collect();
        assert_eq!(values, vec!["--°C", "--%", "--%", "--%", "--ml"]);
        assert_eq!(panel.health, HealthStatus::Unknown);
        assert!(panel.captured_at.is_none());
    }

    #[test]
    fn test_sensor_panel_values() {
        let reading = SensorReading {
            id: "r".to_string(),
            temperature: 24.46,
            humidity: 61.0,
            moisture: 48.25,
            light: 70.0,
            water_level: 700.0,
            timestamp: "not a time".to_string(),
            image_url: None,
            prediction: Some("Early blight".to_string()),
        };
        let panel = SensorPanel::build(Some(&reading), &Utc);
        assert_eq!(panel.lines[0].value, "24.5°C");
        assert_eq!(panel.lines[4].value, "700ml");
        assert_eq!(panel.water_level_ratio, 50.0);
        assert_eq!(panel.captured_at.as_deref(), Some("not a time"));
        assert_eq!(panel.health.label(), "Early blight");
    }

    #[test]
    fn test_chart_series_sorted_and_skips_bad_points() {
        let reading = |ts: &str, t: f64| SensorReading {
            id: ts.to_string(),
            temperature: t,
            humidity: 50.0,
            moisture: 40.0,
            light: 10.0,
            water_level: 500.0,
            timestamp: ts.to_string(),
            image_url: None,
            prediction: None,
        };
        let history = vec![
            reading("2025-06-17T12:00:00Z", 28.0),
            reading("broken", 99.0),
            reading("2025-06-17T08:00:00Z", 22.0),
        ];
        let series = chart_series(&history, &Utc);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time, "08:00");
        assert_eq!(series[1].temperature, 28.0);
    }
}
