//! One parameterized dashboard. `DashboardLayout` decides which optional
//! sections are polled and rendered; everything else is shared.

use crate::api::{ApiClient, LATEST_READING_PATH};
use crate::errors::Result;
use crate::filter::{ListEndpoint, ListFilter};
use crate::health::{HealthStatus, StatusTone};
use crate::hub::PollHub;
use crate::model::{ImageRecord, SensorReading, WateringEvent};
use crate::polling::{DisplayState, Payload, PollingDataSource, Snapshot};
use crate::validate::reading_anomalies;
use crate::view::{chart_series, ChartPoint, GalleryItem, SensorPanel, WateringRow, WateringStats};
use crate::weather::{Forecast, WeatherClient};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardLayout {
    pub show_timestamp: bool,
    pub health: bool,
    pub watering_summary: bool,
    pub gallery: bool,
    pub chart: bool,
    pub weather: bool,
    pub summary_limit: u32,
    pub gallery_limit: u32,
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self {
            show_timestamp: true,
            health: true,
            watering_summary: true,
            gallery: true,
            chart: true,
            weather: true,
            summary_limit: 5,
            gallery_limit: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub sensors: Duration,
    pub images: Duration,
    pub watering: Duration,
    pub history: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            sensors: Duration::from_secs(10),
            images: Duration::from_secs(30),
            watering: Duration::from_secs(30),
            history: Duration::from_secs(60),
        }
    }
}

/// A rendered section: the derived value plus the fetch status it came from
#[derive(Debug, Clone, Serialize)]
pub struct Section<V> {
    pub state: DisplayState,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub data: Option<V>,
}

impl<V> Section<V> {
    fn from_snapshot<T: Payload>(snapshot: &Snapshot<T>, derive: impl FnOnce(&T) -> V) -> Self {
        Self {
            state: snapshot.display_state(),
            loading: snapshot.loading,
            error: snapshot.error.clone(),
            last_updated: snapshot.last_updated,
            data: snapshot.data.as_ref().map(derive),
        }
    }

    /// Section for a single on-demand fetch rather than a polled source
    pub fn from_fetch<T: Payload>(result: Result<T>, derive: impl FnOnce(&T) -> V) -> Self {
        match result {
            Ok(data) => Self {
                state: if data.is_empty_payload() {
                    DisplayState::Empty
                } else {
                    DisplayState::Ready
                },
                loading: false,
                error: None,
                last_updated: Some(Utc::now()),
                data: Some(derive(&data)),
            },
            Err(e) => Self {
                state: DisplayState::Failed,
                loading: false,
                error: Some(e.to_string()),
                last_updated: None,
                data: None,
            },
        }
    }
}

/// One page of a filtered list view
#[derive(Debug, Clone, Serialize)]
pub struct ListPage<V> {
    #[serde(flatten)]
    pub section: Section<V>,
    pub skip: u32,
    pub limit: u32,
    /// A full page came back, so the next page may have more
    pub has_more: bool,
    /// `skip` for "load more", when there may be more
    pub next_skip: Option<u32>,
    pub previous_skip: Option<u32>,
}

/// The disease-detection page: filtered images as gallery items
pub async fn gallery_page<Tz: TimeZone>(
    client: &ApiClient,
    filter: &ListFilter,
    tz: &Tz,
) -> ListPage<Vec<GalleryItem>>
where
    Tz::Offset: Display,
{
    let endpoint = ListEndpoint::Images;
    let result = client
        .get_json::<Vec<ImageRecord>>(endpoint.path(), &filter.to_query_in(endpoint, tz))
        .await;
    list_page(result, filter, |list| {
        list.iter().map(|r| GalleryItem::from_record(r, tz)).collect()
    })
}

/// The watering-history page: filtered events with stats over the page
pub async fn watering_page<Tz: TimeZone>(
    client: &ApiClient,
    filter: &ListFilter,
    tz: &Tz,
) -> ListPage<WateringSummary>
where
    Tz::Offset: Display,
{
    let endpoint = ListEndpoint::Watering;
    let result = client
        .get_json::<Vec<WateringEvent>>(endpoint.path(), &filter.to_query_in(endpoint, tz))
        .await;
    list_page(result, filter, |events| WateringSummary {
        stats: WateringStats::from_events(events),
        rows: events.iter().map(|e| WateringRow::from_event(e, tz)).collect(),
    })
}

fn list_page<T, V>(
    result: Result<Vec<T>>,
    filter: &ListFilter,
    derive: impl FnOnce(&Vec<T>) -> V,
) -> ListPage<V> {
    let has_more = matches!(&result, Ok(list) if filter.limit > 0 && list.len() == filter.limit as usize);
    let mut next = filter.clone();
    next.next_page();
    let mut previous = filter.clone();
    previous.previous_page();

    ListPage {
        section: Section::from_fetch(result, derive),
        skip: filter.skip,
        limit: filter.limit,
        has_more,
        next_skip: has_more.then_some(next.skip),
        previous_skip: (filter.skip > 0).then_some(previous.skip),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCard {
    pub status: HealthStatus,
    pub tone: StatusTone,
    pub recommendations: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct WateringSummary {
    pub stats: WateringStats,
    pub rows: Vec<WateringRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub sensors: Section<SensorPanel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watering: Option<Section<WateringSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Section<Vec<GalleryItem>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<Section<Vec<ChartPoint>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Forecast>,
}

pub struct Dashboard {
    layout: DashboardLayout,
    sensors: Arc<PollingDataSource<SensorReading>>,
    watering: Option<Arc<PollingDataSource<Vec<WateringEvent>>>>,
    gallery: Option<Arc<PollingDataSource<Vec<ImageRecord>>>>,
    history: Option<Arc<PollingDataSource<Vec<SensorReading>>>>,
    weather: Option<WeatherClient>,
    forecast: watch::Sender<Forecast>,
}

impl Dashboard {
    pub fn new(
        hub: &PollHub,
        layout: DashboardLayout,
        intervals: PollIntervals,
        weather: Option<WeatherClient>,
    ) -> Result<Self> {
        let sensors: Arc<PollingDataSource<SensorReading>> =
            hub.subscribe(LATEST_READING_PATH, Default::default(), intervals.sensors)?;
        tokio::spawn(log_anomalies(sensors.subscribe()));

        let watering = if layout.watering_summary {
            let endpoint = ListEndpoint::Watering;
            let filter = ListFilter::new(layout.summary_limit);
            Some(hub.subscribe(endpoint.path(), filter.to_query(endpoint), intervals.watering)?)
        } else {
            None
        };

        // The health card falls back to the newest image, so it needs the gallery feed too
        let gallery = if layout.gallery || layout.health {
            let endpoint = ListEndpoint::Images;
            let filter = ListFilter::new(layout.gallery_limit.max(1));
            Some(hub.subscribe(endpoint.path(), filter.to_query(endpoint), intervals.images)?)
        } else {
            None
        };

        let history = if layout.chart {
            let endpoint = ListEndpoint::SensorHistory;
            let filter = ListFilter::for_endpoint(endpoint);
            Some(hub.subscribe(endpoint.path(), filter.to_query(endpoint), intervals.history)?)
        } else {
            None
        };

        let (forecast, _) = watch::channel(Forecast::fallback());

        Ok(Self {
            layout,
            sensors,
            watering,
            gallery,
            history,
            weather: if layout.weather { weather } else { None },
            forecast,
        })
    }

    pub fn layout(&self) -> &DashboardLayout {
        &self.layout
    }

    pub fn sensors(&self) -> &Arc<PollingDataSource<SensorReading>> {
        &self.sensors
    }

    /// Manual refresh of every polled section, concurrently
    pub async fn refresh(&self) {
        let sensors = self.sensors.refresh();
        let watering = async {
            if let Some(source) = &self.watering {
                source.refresh().await;
            }
        };
        let gallery = async {
            if let Some(source) = &self.gallery {
                source.refresh().await;
            }
        };
        let history = async {
            if let Some(source) = &self.history {
                source.refresh().await;
            }
        };
        tokio::join!(sensors, watering, gallery, history);
    }

    /// Re-queries the forecast; failures keep the built-in placeholder
    pub async fn refresh_weather(&self) {
        let Some(client) = &self.weather else {
            return;
        };
        let forecast = client.forecast(&Local).await;
        if forecast.fallback {
            warn!("Showing placeholder weather forecast");
        }
        self.forecast.send_replace(forecast);
    }

    pub fn render(&self) -> DashboardView {
        self.render_in(&Local)
    }

    pub fn render_in<Tz: TimeZone>(&self, tz: &Tz) -> DashboardView
    where
        Tz::Offset: Display,
    {
        let layout = &self.layout;
        let reading = self.sensors.snapshot();
        let images = self.gallery.as_ref().map(|source| source.snapshot());

        let mut sensors = Section::from_snapshot(&reading, |r| SensorPanel::build(Some(r), tz));
        if sensors.data.is_none() {
            sensors.data = Some(SensorPanel::build(None, tz));
        }
        if !layout.show_timestamp {
            if let Some(panel) = sensors.data.as_mut() {
                panel.captured_at = None;
            }
        }

        let health = layout.health.then(|| {
            let newest_image = images
                .as_ref()
                .and_then(|s| s.data.as_ref())
                .and_then(|list| list.first())
                .map(|image| image.prediction.as_str());
            let prediction = reading
                .data
                .as_ref()
                .and_then(|r| r.prediction.as_deref())
                .or(newest_image);
            let status = HealthStatus::classify(prediction);
            HealthCard {
                tone: status.tone(),
                recommendations: status.recommendations(),
                status,
            }
        });

        let watering = self.watering.as_ref().map(|source| {
            Section::from_snapshot(&source.snapshot(), |events: &Vec<WateringEvent>| WateringSummary {
                stats: WateringStats::from_events(events),
                rows: events.iter().map(|e| WateringRow::from_event(e, tz)).collect(),
            })
        });

        let gallery = match (&images, layout.gallery) {
            (Some(snapshot), true) => Some(Section::from_snapshot(snapshot, |list: &Vec<ImageRecord>| {
                list.iter().map(|r| GalleryItem::from_record(r, tz)).collect()
            })),
            _ => None,
        };

        let chart = self.history.as_ref().map(|source| {
            Section::from_snapshot(&source.snapshot(), |history: &Vec<SensorReading>| {
                chart_series(history, tz)
            })
        });

        DashboardView {
            sensors,
            health,
            watering,
            gallery,
            chart,
            weather: layout.weather.then(|| self.forecast.borrow().clone()),
        }
    }
}

/// Logs out-of-range values once per new reading. Ends when the source is gone.
async fn log_anomalies(mut rx: watch::Receiver<Snapshot<SensorReading>>) {
    let mut last_id: Option<String> = None;
    while rx.changed().await.is_ok() {
        let anomalies = {
            let snapshot = rx.borrow_and_update();
            match &snapshot.data {
                Some(reading) if last_id.as_deref() != Some(reading.id.as_str()) => {
                    last_id = Some(reading.id.clone());
                    reading_anomalies(reading)
                }
                _ => continue,
            }
        };
        for anomaly in anomalies {
            warn!("Sensor anomaly: {}", anomaly);
        }
    }
}
