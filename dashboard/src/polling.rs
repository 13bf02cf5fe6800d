//! Periodic fetch-and-store of one remote resource.
//!
//! Every fetch takes a sequence number. A response is applied only if no
//! newer fetch has been applied before it, so a slow early response can never
//! overwrite fresher data. In-flight requests are not cancelled; teardown
//! stops the timer only.

use crate::api::ApiClient;
use crate::errors::{Error, Result};
use crate::filter::QueryParams;
use crate::metrics::{
    ACTIVE_POLLERS, FETCHES_TOTAL, FETCH_FAILURES_TOTAL, FETCH_LATENCY_SECONDS,
    STALE_RESPONSES_TOTAL,
};
use crate::model::{SensorReading, SettingsConfig};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Payloads that can be "present but empty", which views show as "no data" rather than an error
pub trait Payload {
    fn is_empty_payload(&self) -> bool {
        false
    }
}

impl<T> Payload for Vec<T> {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl Payload for SensorReading {}
impl Payload for SettingsConfig {}

/// What a view should draw for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    Loading,
    /// Error banner; any earlier data is still shown beneath it.
    Failed,
    Empty,
    Ready,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip)]
    applied_seq: u64,
    #[serde(skip)]
    in_flight: usize,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            last_updated: None,
            applied_seq: 0,
            in_flight: 0,
        }
    }
}

impl<T: Payload> Snapshot<T> {
    pub fn display_state(&self) -> DisplayState {
        if self.error.is_some() {
            return DisplayState::Failed;
        }
        match &self.data {
            None => DisplayState::Loading,
            Some(data) if data.is_empty_payload() => DisplayState::Empty,
            Some(_) => DisplayState::Ready,
        }
    }
}

/// Result of a single fetch, as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Updated,
    Failed,
    /// A newer fetch had already been applied; this response was dropped.
    Superseded,
}

struct Shared<T> {
    client: ApiClient,
    endpoint: String,
    params: Mutex<QueryParams>,
    next_seq: AtomicU64,
    state: watch::Sender<Snapshot<T>>,
}

impl<T> Shared<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn current_params(&self) -> QueryParams {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn fetch(&self, params: QueryParams) -> FetchOutcome {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.in_flight += 1;
            s.loading = true;
        });

        FETCHES_TOTAL.inc();
        let start = Instant::now();
        let result = self.client.get_json::<T>(&self.endpoint, &params).await;
        FETCH_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            FETCH_FAILURES_TOTAL.inc();
            warn!("Failed to fetch {} (request #{}): {}", self.endpoint, seq, e);
        }

        let mut outcome = FetchOutcome::Updated;
        self.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.loading = s.in_flight > 0;

            if seq < s.applied_seq {
                outcome = FetchOutcome::Superseded;
                return;
            }
            s.applied_seq = seq;

            match result {
                Ok(data) => {
                    s.data = Some(data);
                    s.error = None;
                    s.last_updated = Some(Utc::now());
                }
                Err(e) => {
                    // Last good data stays in place
                    s.error = Some(user_message(&self.endpoint, &e));
                    outcome = FetchOutcome::Failed;
                }
            }
        });

        if outcome == FetchOutcome::Superseded {
            STALE_RESPONSES_TOTAL.inc();
            debug!("Dropped stale response #{} for {}", seq, self.endpoint);
        }
        outcome
    }
}

fn user_message(endpoint: &str, error: &Error) -> String {
    if error.is_connectivity() {
        format!("Failed to reach the server for {}: {}", endpoint, error)
    } else {
        format!("Failed to fetch {}: {}", endpoint, error)
    }
}

/// A local copy of a remote resource, refreshed on a fixed cadence
pub struct PollingDataSource<T> {
    shared: Arc<Shared<T>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
}

impl<T> PollingDataSource<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Fetches immediately, then every `period`. Must be called inside a Tokio runtime.
    pub fn start(
        client: ApiClient,
        endpoint: impl Into<String>,
        period: Duration,
        params: QueryParams,
    ) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::Validation("polling interval must be positive".to_string()));
        }

        let (state, _) = watch::channel(Snapshot::default());
        let shared = Arc::new(Shared {
            client,
            endpoint: endpoint.into(),
            params: Mutex::new(params),
            next_seq: AtomicU64::new(0),
            state,
        });

        info!(
            "Polling {} every {}ms",
            shared.endpoint,
            period.as_millis()
        );

        let ticker_shared = Arc::clone(&shared);
        let ticker = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick completes immediately
                ticker.tick().await;
                let shared = Arc::clone(&ticker_shared);
                tokio::spawn(async move {
                    let params = shared.current_params();
                    shared.fetch(params).await;
                });
            }
        });
        ACTIVE_POLLERS.inc();

        Ok(Self {
            shared,
            ticker: Mutex::new(Some(ticker)),
            interval: period,
        })
    }

    /// Single fetch with `params`, which become the parameters of later ticks and refreshes.
    ///
    /// Takes `&mut self`, so sources handed out by `PollHub` behind an `Arc`
    /// keep the parameters they were keyed by.
    pub async fn fetch(&mut self, params: QueryParams) -> FetchOutcome {
        *self
            .shared
            .params
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = params.clone();
        self.spawn_fetch(params).await
    }

    /// Out-of-band fetch with the last-used parameters
    pub async fn refresh(&self) -> FetchOutcome {
        let params = self.shared.current_params();
        self.spawn_fetch(params).await
    }

    /// The request runs in its own task so dropping the caller's future
    /// cannot leave the in-flight count raised.
    async fn spawn_fetch(&self, params: QueryParams) -> FetchOutcome {
        let shared = Arc::clone(&self.shared);
        match tokio::spawn(async move { shared.fetch(params).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Fetch task for {} ended abnormally: {}", self.shared.endpoint, e);
                FetchOutcome::Failed
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.shared.state.subscribe()
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    pub fn params(&self) -> QueryParams {
        self.shared.current_params()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stops the timer. Requests already sent still complete and update the snapshot.
    pub fn teardown(&self) {
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = ticker {
            handle.abort();
            ACTIVE_POLLERS.dec();
            info!("Stopped polling {}", self.shared.endpoint);
        }
    }
}

impl<T> Drop for PollingDataSource<T> {
    fn drop(&mut self) {
        let ticker = self
            .ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = ticker {
            handle.abort();
            ACTIVE_POLLERS.dec();
        }
    }
}
