//! PlateLens Server
//!
//! HTTP service for food-ingredient detection.
//!
//! Accepts a photographed plate as a multipart upload and returns every
//! ingredient label the classifier scores strictly above the detection
//! threshold. The classifier is loaded once at startup and shared across
//! all requests.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

mod config;
mod routes;
mod state;

use config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "platelens-server")]
#[command(about = "PlateLens ingredient detection service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// HuggingFace repo to load the classifier from
    #[arg(short, long)]
    repo: Option<String>,

    /// Local directory holding an exported checkpoint (takes precedence over --repo)
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    info!("Starting PlateLens server");

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!("Model source: {:?}", config.model.source);
    info!("Detection threshold: {}", config.model.threshold);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Load the classifier before accepting any traffic. Checkpoint download
    // and weight mapping can take a while, so keep it off the async runtime.
    info!("Initializing application state...");
    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let state =
        tokio::task::spawn_blocking(move || state::AppState::new(config, metrics_handle)).await??;
    info!("Application state initialized successfully");

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, stopping server...");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("platelens=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("platelens=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    // Initialize baseline metrics
    metrics::describe_counter!(
        "platelens_requests_total",
        "Total number of prediction requests received"
    );
    metrics::describe_counter!(
        "platelens_errors_total",
        "Total number of failed requests by kind"
    );
    metrics::describe_histogram!(
        "platelens_predict_latency_us",
        metrics::Unit::Microseconds,
        "End-to-end prediction latency in microseconds"
    );
    metrics::describe_histogram!(
        "platelens_detected_ingredients",
        "Number of ingredients detected per successful prediction"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
