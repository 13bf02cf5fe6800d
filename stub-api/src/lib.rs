//! In-memory stand-in for the plant REST API. Serves the same routes and
//! query parameters as the real server so the dashboard can be run and
//! tested without the edge device or its database.

pub mod data;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use data::{Image, Reading, Settings, Watering};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Store {
    readings: Vec<Reading>,
    images: Vec<Image>,
    watering: Vec<Watering>,
    settings: Settings,
    commands: Vec<Value>,
}

/// Readings kept by default; older ones are dropped as new ones arrive
pub const MAX_READINGS: usize = 20_000;

/// Shared server state. Clones share the same store.
#[derive(Debug, Clone)]
pub struct StubState {
    store: Arc<RwLock<Store>>,
    offline: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
    delays: Arc<Mutex<VecDeque<Duration>>>,
    reading_cap: usize,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            store: Arc::default(),
            offline: Arc::default(),
            requests: Arc::default(),
            delays: Arc::default(),
            reading_cap: MAX_READINGS,
        }
    }
}

impl StubState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `cap` readings, newest first to survive
    pub fn with_reading_cap(mut self, cap: usize) -> Self {
        self.reading_cap = cap.max(1);
        trim_readings(&mut self.write().readings, self.reading_cap);
        self
    }

    /// Pre-filled with `days` of randomized history
    pub fn seeded(days: i64) -> Self {
        let state = Self::new();
        let (readings, images, watering) = data::history(&mut rand::thread_rng(), Utc::now(), days);
        {
            let mut store = state.write();
            store.readings = readings;
            store.images = images;
            store.watering = watering;
        }
        state
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_reading(&self, reading: Reading) {
        let mut store = self.write();
        store.readings.push(reading);
        trim_readings(&mut store.readings, self.reading_cap);
    }

    pub fn push_image(&self, image: Image) {
        self.write().images.push(image);
    }

    pub fn push_watering(&self, event: Watering) {
        self.write().watering.push(event);
    }

    pub fn settings(&self) -> Settings {
        self.read().settings
    }

    /// Command bodies received so far, oldest first
    pub fn commands(&self) -> Vec<Value> {
        self.read().commands.clone()
    }

    /// While offline every route answers 503
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Requests received on data and settings routes
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Delays the next response by `delay`. Queued delays apply in request order.
    pub fn delay_next(&self, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(delay);
    }

    fn admit(&self) -> Result<Duration, StatusCode> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        Ok(self
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Duration::ZERO))
    }
}

fn trim_readings(readings: &mut Vec<Reading>, cap: usize) {
    if readings.len() > cap {
        readings.sort_by_key(|r| r.timestamp);
        let excess = readings.len() - cap;
        readings.drain(..excess);
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<usize>,
    skip: Option<usize>,
    prediction: Option<String>,
    mode: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

impl ListQuery {
    fn in_range(&self, ts: DateTime<Utc>) -> bool {
        self.start_date.map_or(true, |start| ts >= start) && self.end_date.map_or(true, |end| ts <= end)
    }
}

pub fn create_router(state: StubState) -> Router {
    Router::new()
        .route("/api/data/sensors/latest", get(latest_reading))
        .route("/api/data/sensors", get(readings))
        .route("/api/data/images", get(images))
        .route("/api/data/watering", get(watering))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/commands/capture", post(capture))
        .route("/api/commands/water", post(water))
        .route("/api/commands/chirp", post(chirp))
        .with_state(state)
}

/// Newest first, then `skip`/`limit`
fn page<T: Clone>(items: Vec<&T>, ts: impl Fn(&T) -> DateTime<Utc>, query: &ListQuery, default_limit: usize, max_limit: usize) -> Vec<T> {
    let mut items = items;
    items.sort_by_key(|item| std::cmp::Reverse(ts(item)));
    items
        .into_iter()
        .skip(query.skip.unwrap_or(0))
        .take(query.limit.unwrap_or(default_limit).clamp(1, max_limit))
        .cloned()
        .collect()
}

async fn latest_reading(State(state): State<StubState>) -> Result<Json<Reading>, StatusCode> {
    let delay = state.admit()?;
    let latest = state
        .read()
        .readings
        .iter()
        .max_by_key(|r| r.timestamp)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    tokio::time::sleep(delay).await;
    Ok(Json(latest))
}

async fn readings(
    State(state): State<StubState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Reading>>, StatusCode> {
    let delay = state.admit()?;
    let list = {
        let store = state.read();
        let matching = store.readings.iter().filter(|r| query.in_range(r.timestamp)).collect();
        page(matching, |r: &Reading| r.timestamp, &query, 100, 1000)
    };
    tokio::time::sleep(delay).await;
    Ok(Json(list))
}

async fn images(
    State(state): State<StubState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Image>>, StatusCode> {
    let delay = state.admit()?;
    let list = {
        let store = state.read();
        let matching = store
            .images
            .iter()
            .filter(|i| query.prediction.as_ref().map_or(true, |p| &i.prediction == p))
            .filter(|i| query.in_range(i.timestamp))
            .collect();
        page(matching, |i: &Image| i.timestamp, &query, 20, 100)
    };
    tokio::time::sleep(delay).await;
    Ok(Json(list))
}

async fn watering(
    State(state): State<StubState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Watering>>, StatusCode> {
    let delay = state.admit()?;
    let list = {
        let store = state.read();
        let matching = store
            .watering
            .iter()
            .filter(|w| query.mode.as_ref().map_or(true, |m| &w.mode == m))
            .filter(|w| query.in_range(w.timestamp))
            .collect();
        page(matching, |w: &Watering| w.timestamp, &query, 50, 500)
    };
    tokio::time::sleep(delay).await;
    Ok(Json(list))
}

async fn get_settings(State(state): State<StubState>) -> Result<Json<Value>, StatusCode> {
    state.admit()?;
    let settings = state.settings();
    let mut body = serde_json::to_value(settings).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    body["_id"] = json!("settings");
    Ok(Json(body))
}

async fn put_settings(
    State(state): State<StubState>,
    Json(settings): Json<Settings>,
) -> Result<Json<Value>, StatusCode> {
    state.admit()?;
    state.write().settings = settings;
    info!("Settings updated: {:?}", settings);
    Ok(Json(json!({"success": true, "message": "Settings updated successfully"})))
}

#[derive(Debug, Deserialize)]
pub struct DurationBody {
    #[serde(default)]
    duration: Option<u64>,
}

fn record_command(state: &StubState, body: Value) -> Result<(), StatusCode> {
    if state.offline.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    debug!("Command received: {}", body);
    state.write().commands.push(body);
    Ok(())
}

async fn capture(State(state): State<StubState>, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    record_command(&state, body)?;
    let image = data::generate_image(&mut rand::thread_rng(), Utc::now());
    info!("Captured image {} ({})", image.id, image.prediction);
    state.push_image(image);
    Ok(Json(json!({"success": true, "message": "Capture command sent"})))
}

async fn water(State(state): State<StubState>, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    let duration = serde_json::from_value::<DurationBody>(body.clone())
        .ok()
        .and_then(|b| b.duration)
        .unwrap_or(5);
    record_command(&state, body)?;
    state.push_watering(Watering {
        id: uuid::Uuid::new_v4().simple().to_string(),
        mode: "manual".to_string(),
        timestamp: Utc::now(),
        duration,
    });
    Ok(Json(json!({"success": true, "message": format!("Water command sent: {}s", duration)})))
}

async fn chirp(State(state): State<StubState>, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    let duration = serde_json::from_value::<DurationBody>(body.clone())
        .ok()
        .and_then(|b| b.duration)
        .unwrap_or(3);
    record_command(&state, body)?;
    Ok(Json(json!({"success": true, "message": format!("Chirp command sent: {}s", duration)})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn query(limit: Option<usize>, skip: Option<usize>) -> ListQuery {
        ListQuery {
            limit,
            skip,
            prediction: None,
            mode: None,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_page_newest_first() {
        let now = Utc::now();
        let mut rng = rand::thread_rng();
        let events: Vec<Watering> = (0..5)
            .map(|i| data::generate_watering(&mut rng, now - ChronoDuration::hours(i)))
            .collect();

        let page1 = page(events.iter().collect(), |w: &Watering| w.timestamp, &query(Some(2), None), 50, 500);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].timestamp, now);

        let page3 = page(events.iter().collect(), |w: &Watering| w.timestamp, &query(Some(2), Some(4)), 50, 500);
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].timestamp, now - ChronoDuration::hours(4));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let now = Utc::now();
        let q = ListQuery {
            start_date: Some(now),
            end_date: Some(now),
            ..query(None, None)
        };
        assert!(q.in_range(now));
        assert!(!q.in_range(now + ChronoDuration::milliseconds(1)));
    }

    #[test]
    fn test_reading_history_is_capped() {
        let now = Utc::now();
        let mut rng = rand::thread_rng();
        let state = StubState::new().with_reading_cap(3);
        for i in 0..5 {
            state.push_reading(data::generate_reading(&mut rng, now + ChronoDuration::minutes(i)));
        }

        let kept: Vec<_> = state.read().readings.iter().map(|r| r.timestamp).collect();
        assert_eq!(
            kept,
            (2..5).map(|i| now + ChronoDuration::minutes(i)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_offline_rejects() {
        let state = StubState::new();
        state.set_offline(true);
        assert_eq!(state.admit(), Err(StatusCode::SERVICE_UNAVAILABLE));
        state.set_offline(false);
        assert_eq!(state.admit(), Ok(Duration::ZERO));
        assert_eq!(state.request_count(), 2);
    }

    #[test]
    fn test_latest_reading_is_newest() {
        let state = StubState::new();
        let missing = tokio_test::block_on(latest_reading(State(state.clone())));
        assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));

        let now = Utc::now();
        let mut rng = rand::thread_rng();
        state.push_reading(data::generate_reading(&mut rng, now - ChronoDuration::minutes(15)));
        state.push_reading(data::generate_reading(&mut rng, now));

        let Json(latest) = tokio_test::block_on(latest_reading(State(state))).unwrap();
        assert_eq!(latest.timestamp, now);
    }

    #[test]
    fn test_water_command_logs_manual_event() {
        let state = StubState::new();
        let body = json!({"command": "water", "duration": 7});
        tokio_test::block_on(water(State(state.clone()), Json(body.clone()))).unwrap();

        assert_eq!(state.commands(), vec![body]);
        let events = state.read().watering.clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].mode, "manual");
        assert_eq!(events[0].duration, 7);
    }
}
