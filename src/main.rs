use std::net::{Ipv4Addr, SocketAddr};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vanity::telemetry;

const DEFAULT_FILTER: &str = "vanity=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    // Export logs and traces when a collector is set.
    match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => {
            let logs = telemetry::setup_logging(&endpoint)
                .map_err(|err| eprintln!("cannot export logs: {err}"))
                .ok();
            registry.with(logs).init();

            match telemetry::setup_tracer(&endpoint) {
                Ok(provider) => {
                    opentelemetry::global::set_tracer_provider(provider);
                },
                Err(err) => tracing::warn!(error = %err, "traces are not exported"),
            }
        },
        Err(_) => registry.init(),
    }

    let state = match vanity::initialize_state().await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "cannot start server");
            std::process::exit(1);
        },
    };
    let port = state.config.port;

    let mut app = vanity::app(state);
    match telemetry::setup_metrics_recorder() {
        Ok(handle) => app = app.merge(telemetry::metrics_router(handle)),
        Err(err) => tracing::warn!(error = %err, "metrics are disabled"),
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
