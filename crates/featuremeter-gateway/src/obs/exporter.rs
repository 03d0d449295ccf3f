//! Pull-based metrics endpoint on a dedicated port.
//!
//! - `GET /`        : Prometheus text format
//! - `GET /metrics` : same, for scrapers configured with the usual path
//!
//! A bind failure is not fatal: the process keeps serving requests without
//! an exporter and logs a warning.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use featuremeter_core::error::{FeatureMeterError, Result};
use featuremeter_core::metrics::render::CONTENT_TYPE;
use featuremeter_core::Registry;

/// Running exporter. Dropping the handle leaves the task running.
pub struct MetricsExporter {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MetricsExporter {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/", get(scrape))
        .route("/metrics", get(scrape))
        .with_state(registry)
}

async fn scrape(State(registry): State<Arc<Registry>>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        registry.render(),
    )
        .into_response()
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| FeatureMeterError::ExporterBindConflict { addr, source })
}

/// Serve `registry` on `listener` in a background task.
pub fn serve(registry: Arc<Registry>, listener: TcpListener) -> Result<MetricsExporter> {
    let local_addr = listener
        .local_addr()
        .map_err(|e| FeatureMeterError::Internal(format!("exporter local_addr: {e}")))?;
    let app = router(registry);
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics exporter stopped");
        }
    });
    tracing::info!(%local_addr, "metrics exporter listening");
    Ok(MetricsExporter { local_addr, task })
}

/// Bind and serve, degrading to `None` when the port is unavailable.
pub async fn start(registry: Arc<Registry>, addr: SocketAddr) -> Option<MetricsExporter> {
    let started = match bind(addr).await {
        Ok(listener) => serve(registry, listener),
        Err(e) => Err(e),
    };
    match started {
        Ok(exporter) => Some(exporter),
        Err(e) => {
            tracing::warn!(
                %addr,
                error = %e,
                code = e.client_code().as_str(),
                "METRICS EXPORTER DISABLED: continuing without a metrics endpoint"
            );
            None
        }
    }
}
