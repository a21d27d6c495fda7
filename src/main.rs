// Scout assistant entry point.
//
// Startup sequence:
// 1. Initialize tracing (stdout)
// 2. Load config, copying defaults on first run
// 3. Build the GRID telemetry client from config
// 4. Assemble ScoutApp and the axum router
// 5. Serve until the process is stopped

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use scout_assistant::api;
use scout_assistant::app::ScoutApp;
use scout_assistant::config;
use scout_assistant::telemetry::grid::TelemetryClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Scout assistant starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: server {}:{}, GRID timeout {}s, {} retries",
        config.server.host, config.server.port, config.grid.timeout_secs, config.grid.max_retries
    );

    // 3. Build the telemetry client from config
    let telemetry = TelemetryClient::from_config(&config);
    let api_key_configured = telemetry.is_active();
    match &telemetry {
        TelemetryClient::Active(_) => info!("GRID client initialized (API key configured)"),
        TelemetryClient::Disabled => warn!(
            "GRID API key not configured; data endpoints will answer with MISSING_API_KEY"
        ),
    }

    // 4. Assemble application state and the router
    let state = api::AppState {
        app: Arc::new(ScoutApp::new(config.clone(), Arc::new(telemetry))),
        api_key_configured,
    };

    // 5. Serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, api::router(state))
        .await
        .context("server error")?;

    Ok(())
}

/// Initialize tracing to stdout, honoring `RUST_LOG` when set.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scout_assistant=info,warn")),
        )
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
