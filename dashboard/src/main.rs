use clap::Parser;
use plant_dashboard::config::Config;
use plant_dashboard::dashboard::Dashboard;
use plant_dashboard::weather::WeatherClient;
use plant_dashboard::{metrics, rest, ApiClient, CommandDispatcher, PollHub};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting plant dashboard");
    info!("Plant API: {}", config.api_url);
    info!("HTTP server: {}", config.http_addr);
    if config.weather_api_key.is_none() {
        warn!("WEATHER_API_KEY not set, the forecast will show placeholder data");
    }

    metrics::init_metrics()?;

    let client = ApiClient::new(&config.api_url, config.http_timeout())?;
    let hub = PollHub::new(client.clone());
    let weather = WeatherClient::new(config.weather(), config.http_timeout())?;
    let dashboard = Arc::new(Dashboard::new(
        &hub,
        config.layout(),
        config.intervals(),
        Some(weather),
    )?);

    // Forecast changes slowly; refresh it on its own cadence
    let weather_dashboard = Arc::clone(&dashboard);
    let weather_interval = config.weather_interval();
    let weather_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(weather_interval);
        loop {
            ticker.tick().await;
            weather_dashboard.refresh_weather().await;
        }
    });

    let app = rest::create_router(Arc::clone(&dashboard), CommandDispatcher::new(client));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .map_err(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            e
        })?;

    info!("HTTP server listening on {}", config.http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    weather_handle.abort();
    info!("Live pollers at shutdown: {}", hub.live_sources());
    info!("Shutting down");
    Ok(())
}
