//! Client core of the plant-monitoring dashboard: polling, filtering,
//! display derivations and one-shot commands against the plant API.

pub mod api;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod filter;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod model;
pub mod polling;
pub mod rest;
pub mod settings;
pub mod validate;
pub mod view;
pub mod weather;

pub use api::ApiClient;
pub use commands::{Command, CommandDispatcher};
pub use errors::{Error, Result};
pub use filter::{ListEndpoint, ListFilter, QueryParams};
pub use hub::PollHub;
pub use polling::{DisplayState, FetchOutcome, PollingDataSource, Snapshot};
