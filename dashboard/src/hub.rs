//! Shares one polling data source between every view that asks for the same
//! endpoint and parameters, so two widgets showing the same resource cost a
//! single timer and a single request per tick.

use crate::api::ApiClient;
use crate::errors::Result;
use crate::filter::QueryParams;
use crate::polling::PollingDataSource;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PollKey {
    endpoint: String,
    params: QueryParams,
}

struct Entry {
    source: Box<dyn Any + Send + Sync>,
    alive: Box<dyn Fn() -> bool + Send + Sync>,
}

impl Entry {
    fn new<T>(source: &Arc<PollingDataSource<T>>) -> Self
    where
        T: Send + Sync + 'static,
    {
        let weak = Arc::downgrade(source);
        let probe = weak.clone();
        Self {
            source: Box::new(weak),
            alive: Box::new(move || probe.strong_count() > 0),
        }
    }

    fn upgrade<T>(&self) -> Option<Arc<PollingDataSource<T>>>
    where
        T: Send + Sync + 'static,
    {
        self.source
            .downcast_ref::<Weak<PollingDataSource<T>>>()
            .and_then(Weak::upgrade)
    }
}

/// Cache of live data sources keyed by endpoint and query.
///
/// Sources are held weakly: once the last handle is dropped the source tears
/// itself down and the next request for that key starts a fresh one. For a
/// shared key the interval of the first subscriber wins.
pub struct PollHub {
    client: ApiClient,
    sources: Mutex<HashMap<PollKey, Entry>>,
}

impl PollHub {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            sources: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn subscribe<T>(
        &self,
        endpoint: &str,
        params: QueryParams,
        period: Duration,
    ) -> Result<Arc<PollingDataSource<T>>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let key = PollKey {
            endpoint: endpoint.to_string(),
            params: params.clone(),
        };

        let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
        sources.retain(|_, entry| (entry.alive)());

        if let Some(source) = sources.get(&key).and_then(Entry::upgrade::<T>) {
            debug!("Sharing poller for {}?{}", endpoint, params);
            return Ok(source);
        }

        let source = Arc::new(PollingDataSource::start(
            self.client.clone(),
            endpoint,
            period,
            params,
        )?);
        sources.insert(key, Entry::new(&source));
        Ok(source)
    }

    /// Number of sources that still have at least one subscriber
    pub fn live_sources(&self) -> usize {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| (entry.alive)())
            .count()
    }
}
