use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelsplice_core::{
    create_event_system, load_config_or_default, validate_config, Concatenator,
    FfmpegConcatenator, LogFormat, MergeService, RemoteFetcher,
};
use reelsplice_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for the job event channel
const EVENT_BUFFER_SIZE: usize = 1000;

/// Job events kept for `GET /api/v1/events`
const EVENT_HISTORY_SIZE: usize = 200;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("REELSPLICE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration (a missing file means defaults plus environment)
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    init_tracing(config.logging.format);
    info!(version = VERSION, "Loaded configuration from {:?}", config_path);

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(config_hash = &config_hash[..16], "Configuration validated");
    info!(
        ffmpeg = %config.merge.ffmpeg_path.display(),
        temp_root = %config.merge.temp_root.display(),
        max_concurrent = config.merge.max_concurrent,
        timeout_secs = config.merge.timeout_secs,
        "Merge settings"
    );

    // Encoder
    let concatenator = Arc::new(FfmpegConcatenator::new(config.merge.clone()));
    match concatenator.validate().await {
        Ok(()) => info!("FFmpeg is available"),
        Err(e) => warn!("FFmpeg check failed, merges will fail until fixed: {}", e),
    }

    let fetcher =
        Arc::new(RemoteFetcher::new(&config.fetch).context("Failed to build HTTP client")?);

    // Job events
    let (event_handle, event_writer, recent_events) =
        create_event_system(EVENT_BUFFER_SIZE, EVENT_HISTORY_SIZE);
    let writer_handle = tokio::spawn(event_writer.run());

    let shutdown = CancellationToken::new();
    let merger = Arc::new(
        MergeService::new(config.merge.clone(), concatenator, fetcher)
            .with_events(event_handle)
            .with_cancellation(shutdown.clone()),
    );

    let state = Arc::new(AppState::new(config.clone(), merger, recent_events));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown; running merges are cancelled so
    // their encoders are killed and workspaces removed.
    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                shutdown_signal().await;
                info!("Shutdown requested, cancelling running merges");
                shutdown.cancel();
            }
        })
        .await
        .context("Server error")?;

    // The router (and with it the last event handle) is gone, so the
    // writer drains and exits.
    let _ = writer_handle.await;
    info!("Server stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
