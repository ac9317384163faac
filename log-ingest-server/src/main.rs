use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use log_ingest::config::Config;
use log_ingest::server::serve;

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

async fn shutdown() {
    let mut term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(term) => term,
        Err(err) => {
            tracing::error!("failed to register SIGTERM handler: {}", err);
            return std::future::pending().await;
        }
    };

    let mut interrupt = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
        Ok(interrupt) => interrupt,
        Err(err) => {
            tracing::error!("failed to register SIGINT handler: {}", err);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    tracing::info!("Starting up...");

    let config = Config::init_from_non_empty_env()?;

    let listener = TcpListener::bind(config.bind()).await?;

    serve(config, listener, shutdown()).await?;

    Ok(())
}
