//! Health-Check-Endpunkt fuer LastCEO
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, DB-Verbindungsstatus und
//! Anzahl laufender Sessions

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub db_connected: bool,
    pub sessions_active: usize,
}

/// Geteilter Zustand fuer den Health-Check-Handler
///
/// Der Server aktualisiert DB-Status und Session-Anzahl periodisch.
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    db_connected: Arc<AtomicBool>,
    sessions_active: Arc<AtomicUsize>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            db_connected: Arc::new(AtomicBool::new(true)),
            sessions_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn db_verbunden(&self) -> bool {
        self.db_connected.load(Ordering::Relaxed)
    }

    pub fn db_status_setzen(&self, verbunden: bool) {
        self.db_connected.store(verbunden, Ordering::Relaxed);
    }

    pub fn sessions_setzen(&self, anzahl: usize) {
        self.sessions_active.store(anzahl, Ordering::Relaxed);
    }

    /// Baut die aktuelle Antwort
    pub fn antwort(&self) -> HealthResponse {
        let db_connected = self.db_verbunden();
        HealthResponse {
            // Ohne Datenbank laeuft kein Spiel weiter, Verbindungen bleiben aber offen
            status: if db_connected {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            db_connected,
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();

    let http_status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_uptime_frisch() {
        let state = HealthState::neu();
        assert!(state.uptime_seconds() < 5);
    }

    #[test]
    fn health_state_db_status_umschalten() {
        let state = HealthState::neu();
        assert!(state.db_verbunden());
        state.db_status_setzen(false);
        assert!(!state.db_verbunden());
        assert_eq!(state.antwort().status, HealthStatus::Degraded);
        state.db_status_setzen(true);
        assert_eq!(state.antwort().status, HealthStatus::Healthy);
    }

    #[test]
    fn health_response_serialisierung() {
        let state = HealthState::neu();
        state.sessions_setzen(3);

        let json = serde_json::to_string(&state.antwort()).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"sessions_active\":3"));
        assert!(json.contains("\"db_connected\":true"));
    }

    #[test]
    fn health_response_deserialisierung() {
        let json = r#"{"status":"degraded","version":"0.1.0","uptime_seconds":100,"db_connected":false,"sessions_active":0}"#;
        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, HealthStatus::Degraded);
        assert_eq!(response.uptime_seconds, 100);
        assert!(!response.db_connected);
    }
}
