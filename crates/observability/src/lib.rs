//! # lastceo-observability
//!
//! Observability-Crate fuer LastCEO:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured JSON Logging via tracing-subscriber

pub mod health;
pub mod logging;
pub mod metrics;

pub use health::{HealthResponse, HealthState, HealthStatus, health_router};
pub use logging::logging_initialisieren;
pub use metrics::{GameMetrics, metrics_router};

use anyhow::Result;
use std::net::SocketAddr;

/// Startet den Observability-HTTP-Server (Metriken + Health)
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: GameMetrics,
    health: HealthState,
) -> Result<()> {
    use axum::Router;

    let app = Router::new()
        .merge(metrics_router(metriken))
        .merge(health_router(health));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app).await?;
    Ok(())
}
