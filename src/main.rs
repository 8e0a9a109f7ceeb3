mod aggregate;
mod api;
mod config;
mod database;
mod listing;
mod local_store;
mod models;
mod notifications;
mod preferences;
mod server;
mod session;
mod source;
mod status;

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use database::Database;
use local_store::LocalStore;
use notifications::delivery::Dispatcher;
use server::{build_router, AppState};
use source::{ClassroomDataSource, FixtureSource, LiveSource};

const REMINDER_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--init") {
        let path = Config::generate_default()?;
        println!("Generated config file at: {}", path.display());
        println!("Edit it if needed, then run semillero.");
        return Ok(());
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("semillero: dashboard backend for Google Classroom and Calendar");
        println!();
        println!("USAGE:");
        println!("  semillero           Start the HTTP server");
        println!("  semillero --mock    Serve deterministic demo data instead of Google");
        println!("  semillero --init    Generate a default config file");
        println!();
        println!("CONFIG:");
        println!("  File: ~/.config/semillero/config.toml");
        println!("  Env:  SEMILLERO_BIND, SEMILLERO_MOCK, SEMILLERO_DATA_DIR,");
        println!("        CLASSROOM_API_URL, CALENDAR_API_URL, DATABASE_URL,");
        println!("        SEMILLERO_DELIVERY_LATENCY_MS, SEMILLERO_LOG_JSON, RUST_LOG");
        return Ok(());
    }

    let mut config = Config::load().with_context(|| {
        "Failed to load configuration.\n\
         Run `semillero --init` to generate a config file,\n\
         or check the SEMILLERO_* environment variables."
    })?;
    if args.iter().any(|a| a == "--mock") {
        config.mock_mode = true;
    }

    init_tracing(config.log_json);

    let source: Arc<dyn ClassroomDataSource> = if config.mock_mode {
        info!("mock mode: serving fixture data");
        Arc::new(FixtureSource::new(Utc::now()))
    } else {
        Arc::new(
            LiveSource::new(&config.classroom_api_url, &config.calendar_api_url)
                .with_context(|| "Failed to build Google API clients")?,
        )
    };

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("Failed to create data directory {}", config.data_dir.display())
    })?;

    let state = AppState::new(
        source,
        LocalStore::new(&config.data_dir),
        Dispatcher::new(Duration::from_millis(config.delivery_latency_ms)),
        Database::new(config.database_url.clone()),
    );
    let hub = Arc::clone(&state.hub);
    hub.start_reminders(REMINDER_PERIOD);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        mock = config.mock_mode,
        data_dir = %config.data_dir.display(),
        "listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .with_context(|| "Server error")?;

    hub.stop_reminders();
    info!("shut down");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
