mod basket;
mod bootstrap;
mod health;

use anyhow::Result;
use axum::Router;
use basketry_core::config::{AppConfig, LoadOptions};
use tracing::{error, info};

fn init_logging(config: &AppConfig) {
    use basketry_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    let routes = Router::new()
        .merge(health::router(app.state.clone()))
        .merge(basket::router(app.state));

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "basketry-server started"
    );

    if let Err(serve_error) =
        axum::serve(listener, routes).with_graceful_shutdown(wait_for_shutdown()).await
    {
        error!(
            event_name = "system.server.error",
            correlation_id = "shutdown",
            error = %serve_error,
            "basketry-server terminated unexpectedly"
        );
        return Err(serve_error.into());
    }

    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "basketry-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(signal_error) = tokio::signal::ctrl_c().await {
        error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %signal_error,
            "failed to listen for shutdown signal"
        );
    }
}
