//! Prometheus-kompatible Metriken fuer LastCEO
//!
//! Registrierte Metriken:
//! - `lastceo_sessions_active` – Gauge: Laufende Session-Actors
//! - `lastceo_connections` – Gauge: Offene Client-Verbindungen
//! - `lastceo_stage_transitions_total` – Counter: Stufenwechsel (stage)
//! - `lastceo_eliminations_total` – Counter: Eliminierungen (stage)
//! - `lastceo_settlements_total` – Counter: Abgeschlossene Abrechnungen
//! - `lastceo_prize_distributed_total` – Counter: Ausgeschuettete Preisgelder
//! - `lastceo_rejected_messages_total` – Counter: Abgelehnte Client-Nachrichten (code)

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle LastCEO-Prometheus-Metriken
///
/// Clone teilt die Registry, Spiel- und Netzwerkschicht erhalten je eine Kopie.
#[derive(Clone)]
pub struct GameMetrics {
    pub registry: Arc<Registry>,

    // Sessions & Verbindungen
    pub sessions_active: IntGauge,
    pub connections: IntGauge,

    // Spielablauf
    pub stage_transitions_total: IntCounterVec,
    pub eliminations_total: IntCounterVec,
    pub settlements_total: IntCounter,
    pub prize_distributed_total: IntCounter,

    // Protokoll
    pub rejected_messages_total: IntCounterVec,
}

impl GameMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let sessions_active = IntGauge::with_opts(Opts::new(
            "lastceo_sessions_active",
            "Anzahl laufender Session-Actors",
        ))?;
        registry.register(Box::new(sessions_active.clone()))?;

        let connections = IntGauge::with_opts(Opts::new(
            "lastceo_connections",
            "Anzahl offener Client-Verbindungen",
        ))?;
        registry.register(Box::new(connections.clone()))?;

        let stage_transitions_total = IntCounterVec::new(
            Opts::new(
                "lastceo_stage_transitions_total",
                "Gesamtanzahl Stufenwechsel",
            ),
            &["stage"],
        )?;
        registry.register(Box::new(stage_transitions_total.clone()))?;

        let eliminations_total = IntCounterVec::new(
            Opts::new("lastceo_eliminations_total", "Gesamtanzahl Eliminierungen"),
            &["stage"],
        )?;
        registry.register(Box::new(eliminations_total.clone()))?;

        let settlements_total = IntCounter::with_opts(Opts::new(
            "lastceo_settlements_total",
            "Gesamtanzahl abgerechneter Sessions",
        ))?;
        registry.register(Box::new(settlements_total.clone()))?;

        let prize_distributed_total = IntCounter::with_opts(Opts::new(
            "lastceo_prize_distributed_total",
            "Summe aller ausgeschuetteten Preisgelder",
        ))?;
        registry.register(Box::new(prize_distributed_total.clone()))?;

        let rejected_messages_total = IntCounterVec::new(
            Opts::new(
                "lastceo_rejected_messages_total",
                "Gesamtanzahl abgelehnter Client-Nachrichten",
            ),
            &["code"],
        )?;
        registry.register(Box::new(rejected_messages_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions_active,
            connections,
            stage_transitions_total,
            eliminations_total,
            settlements_total,
            prize_distributed_total,
            rejected_messages_total,
        })
    }

    /// Zaehlt einen Stufenwechsel
    pub fn stufenwechsel(&self, stufe: &str) {
        self.stage_transitions_total.with_label_values(&[stufe]).inc();
    }

    /// Zaehlt eine Eliminierung
    pub fn eliminierung(&self, stufe: &str) {
        self.eliminations_total.with_label_values(&[stufe]).inc();
    }

    /// Zaehlt eine Abrechnung und den ausgeschuetteten Betrag
    pub fn abrechnung(&self, ausgeschuettet: i64) {
        self.settlements_total.inc();
        if ausgeschuettet > 0 {
            self.prize_distributed_total.inc_by(ausgeschuettet as u64);
        }
    }

    /// Zaehlt eine abgelehnte Client-Nachricht
    pub fn abgelehnt(&self, code: &str) {
        self.rejected_messages_total.with_label_values(&[code]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: GameMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<GameMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = GameMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn gauges_setzen() {
        let metriken = GameMetrics::neu().unwrap();
        metriken.connections.set(12);
        metriken.sessions_active.inc();
        assert_eq!(metriken.connections.get(), 12);
        assert_eq!(metriken.sessions_active.get(), 1);
    }

    #[test]
    fn eliminierungen_pro_stufe() {
        let metriken = GameMetrics::neu().unwrap();
        metriken.eliminierung("quiz");
        metriken.eliminierung("quiz");
        metriken.eliminierung("movement");
        assert_eq!(
            metriken.eliminations_total.with_label_values(&["quiz"]).get(),
            2
        );
        assert_eq!(
            metriken
                .eliminations_total
                .with_label_values(&["movement"])
                .get(),
            1
        );
    }

    #[test]
    fn abrechnung_summiert_preisgeld() {
        let metriken = GameMetrics::neu().unwrap();
        metriken.abrechnung(500);
        metriken.abrechnung(0);
        assert_eq!(metriken.settlements_total.get(), 2);
        assert_eq!(metriken.prize_distributed_total.get(), 500);
    }

    #[test]
    fn export_enthaelt_metriknamen() {
        let metriken = GameMetrics::neu().unwrap();
        metriken.stufenwechsel("lobby");
        metriken.abgelehnt("invalid_message");
        let text = metriken.exportieren().unwrap();
        assert!(text.contains("lastceo_sessions_active"));
        assert!(text.contains("lastceo_stage_transitions_total"));
        assert!(text.contains("lastceo_rejected_messages_total"));
    }
}
