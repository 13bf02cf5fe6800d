use chrono::Utc;
use clap::Parser;
use plant_stub_api::{create_router, data, StubState, MAX_READINGS};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// In-memory plant API serving randomized sensor, image and watering data
#[derive(Debug, Parser)]
#[command(name = "plant-stub-api", version)]
struct Args {
    #[arg(long, env = "STUB_ADDR", default_value = "0.0.0.0:8000")]
    addr: String,

    /// Days of history generated at startup
    #[arg(long, env = "STUB_SEED_DAYS", default_value_t = 3)]
    seed_days: i64,

    /// How often a fresh reading is appended
    #[arg(long, env = "STUB_READING_MS", default_value_t = 10_000)]
    reading_ms: u64,

    /// Oldest readings are dropped beyond this many
    #[arg(long, env = "STUB_MAX_READINGS", default_value_t = MAX_READINGS)]
    max_readings: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting plant stub API");
    info!("Addr: {}, seed: {} days, new reading every {}ms", args.addr, args.seed_days, args.reading_ms);

    let state = StubState::seeded(args.seed_days.max(0)).with_reading_cap(args.max_readings);

    let generator = state.clone();
    let period = Duration::from_millis(args.reading_ms.max(100));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        let mut counter = 0u64;
        loop {
            ticker.tick().await;
            let reading = data::generate_reading(&mut rand::thread_rng(), Utc::now());
            generator.push_reading(reading);
            counter += 1;
            if counter % 100 == 0 {
                info!("Generated {} readings", counter);
            }
        }
    });

    let listener = match tokio::net::TcpListener::bind(&args.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", args.addr, e);
            return;
        }
    };
    info!("Listening on {}", args.addr);

    let app = create_router(state);
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
}
