//! featuremeter gateway
//!
//! - Primary HTTP service: /health, /upload, feature endpoints
//! - Metrics exporter on its own port, started before the primary listener
//! - Graceful shutdown on Ctrl-C

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use featuremeter_core::error::{FeatureMeterError, Result};
use featuremeter_core::Registry;
use featuremeter_gateway::{app_state, config, obs, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.client_code().as_str(), "featuremeter-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var(config::CONFIG_ENV)
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_or_default(&path)?;
    let listen = cfg.server.listen_addr()?;

    let registry = Arc::new(Registry::new());
    let state = app_state::AppState::new(cfg, Arc::clone(&registry))?;

    let _exporter = if state.cfg().metrics.enabled {
        obs::exporter::start(registry, state.cfg().metrics.listen_addr()?).await
    } else {
        tracing::info!("metrics exporter disabled by config");
        None
    };

    let app = router::build_router(state);

    tracing::info!(%listen, "featuremeter-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| FeatureMeterError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FeatureMeterError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
