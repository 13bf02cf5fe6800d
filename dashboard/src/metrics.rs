use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref FETCHES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_fetches_total",
        "Total fetches issued against the plant API"
    ))
    .unwrap();
    pub static ref FETCH_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_fetch_failures_total",
        "Total fetches that failed (network error or non-2xx status)"
    ))
    .unwrap();
    pub static ref STALE_RESPONSES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_stale_responses_total",
        "Responses dropped because a newer fetch had already been applied"
    ))
    .unwrap();
    pub static ref FETCH_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "dashboard_fetch_latency_seconds",
            "Round-trip time of a single fetch"
        )
        .buckets(vec![
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0
        ])
    )
    .unwrap();
    pub static ref COMMANDS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_commands_total",
        "Total commands dispatched"
    ))
    .unwrap();
    pub static ref COMMAND_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_command_failures_total",
        "Total commands the API did not accept"
    ))
    .unwrap();
    pub static ref ACTIVE_POLLERS: Gauge = Gauge::with_opts(Opts::new(
        "dashboard_active_pollers",
        "Polling data sources with a live timer"
    ))
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(FETCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FETCH_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STALE_RESPONSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FETCH_LATENCY_SECONDS.clone()))?;
    REGISTRY.register(Box::new(COMMANDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMMAND_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACTIVE_POLLERS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> crate::errors::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| crate::errors::Error::Validation(format!("metrics are not UTF-8: {}", e)))
}
