//! Application entry point for the `codemetal-stationflow` service.
//!
//! This binary orchestrates the full startup sequence for the weather
//! station API, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the reading sink (SQLite in WAL mode, or memory) and its schema
//! - Starting the MQTT producer when a broker is configured
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! See [`codemetal_stationflow::config::load_from_env`] for the full list;
//! logging is controlled by `RUST_LOG` / `STATION_LOG_LEVEL` and
//! `FORCE_COLOR`.
use std::{env, net::SocketAddr};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use codemetal_stationflow::{build_station, config, mqtt, routes};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let station = build_station(&cfg).await?;

    if let Some(settings) = cfg.mqtt.clone() {
        tokio::spawn(mqtt::run(station.clone(), settings));
    }

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(station);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.web_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Default directives when `RUST_LOG` is unset. The MQTT event loop and sqlx
/// statement logging are noisy at debug.
const DEFAULT_LOG_FILTER: &str = "sqlx::query=warn,rumqttc=info";

/// Install the fmt subscriber. `STATION_LOG_LEVEL` sets the base level
/// (default `info`) unless `RUST_LOG` is given; `FORCE_COLOR` overrides TTY
/// detection.
fn init_tracing() {
    // ---
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = env::var("STATION_LOG_LEVEL").unwrap_or_else(|_| "info".into());
        EnvFilter::new(format!("{level},{DEFAULT_LOG_FILTER}"))
    });

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1" | "true" | "yes") => true,
        Ok("0" | "false" | "no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
