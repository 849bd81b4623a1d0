//! lastceo-server – Bibliotheks-Root
//!
//! Verdrahtet Datenbank, Session-Manager, Signaling und Observability zu
//! einem lauffaehigen Server.

pub mod config;

use std::time::Duration;

use anyhow::{Context, Result};
use config::ServerConfig;
use lastceo_db::{seed, SqliteDb};
use lastceo_game::{ConnectionHub, SessionManager};
use lastceo_observability::{observability_server_starten, GameMetrics, HealthState};
use lastceo_signaling::{SignalingServer, SignalingState};
use tokio::sync::watch;

/// Intervall der Health-Aktualisierung
const HEALTH_INTERVALL: Duration = Duration::from_secs(10);

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbank oeffnen, Migrationen und Kataloge
    /// 2. Nicht beendete Sessions wiederherstellen, Vorrat auffuellen
    /// 3. Observability-Server starten
    /// 4. TCP-Listener starten
    /// 5. Auf Ctrl-C warten, dann geordnet herunterfahren
    pub async fn starten(self) -> Result<()> {
        let cfg = self.config;
        tracing::info!(
            server_name = %cfg.server.name,
            tcp = %cfg.tcp_bind_adresse(),
            "Server startet"
        );

        let db = SqliteDb::oeffnen(&cfg.datenbank_config())
            .await
            .with_context(|| format!("Datenbank '{}' nicht erreichbar", cfg.datenbank.url))?;
        seed::kataloge_befuellen(
            &db,
            cfg.spiel.regeln.shape_tolerance,
            cfg.spiel.regeln.shape_time_limit_secs,
        )
        .await
        .context("Kataloge konnten nicht befuellt werden")?;

        let metriken = GameMetrics::neu()?;
        let health = HealthState::neu();
        let manager = SessionManager::neu(
            db.clone(),
            ConnectionHub::neu(),
            cfg.spiel.regeln.clone(),
            metriken.clone(),
        );

        let wiederhergestellt = manager.wiederherstellen().await?;
        tracing::info!(anzahl = wiederhergestellt, "Sessions wiederhergestellt");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(vorrat_pflegen(
            manager.clone(),
            cfg.clone(),
            shutdown_rx.clone(),
        ));
        tokio::spawn(health_pflegen(
            db.clone(),
            manager.clone(),
            health.clone(),
            shutdown_rx.clone(),
        ));

        if cfg.observability.aktiviert {
            let adresse = cfg.observability_socket_adresse()?;
            let metriken = metriken.clone();
            let health = health.clone();
            tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, metriken, health).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });
        }

        let state = SignalingState::neu(cfg.signaling_config(), manager.clone(), db, metriken);
        let signaling = SignalingServer::neu(state, cfg.tcp_socket_adresse()?);
        let mut signaling_task = tokio::spawn(signaling.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::select! {
            ergebnis = tokio::signal::ctrl_c() => {
                ergebnis?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
                signaling_task.await??;
            }
            ergebnis = &mut signaling_task => {
                let _ = shutdown_tx.send(true);
                ergebnis?.context("TCP-Server abgebrochen")?;
            }
        }

        tracing::info!(sessions = manager.anzahl(), "Server beendet");
        Ok(())
    }
}

/// Haelt periodisch `open_sessions` beitretbare Sessions bereit
async fn vorrat_pflegen(
    manager: SessionManager<SqliteDb>,
    cfg: ServerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let spiel = cfg.spiel;
    let mut intervall = tokio::time::interval(Duration::from_secs(spiel.auffuellen_secs.max(1)));
    loop {
        tokio::select! {
            _ = intervall.tick() => {}
            _ = shutdown_rx.wait_for(|stopp| *stopp) => break,
        }
        match manager
            .offene_sicherstellen(spiel.open_sessions, spiel.max_participants, spiel.entry_fee)
            .await
        {
            Ok(0) => {}
            Ok(neu) => tracing::info!(neu, "Neue Sessions bereitgestellt"),
            Err(e) => tracing::error!(fehler = %e, "Sessions konnten nicht bereitgestellt werden"),
        }
    }
}

/// Aktualisiert DB-Status und Session-Anzahl fuer `/health`
async fn health_pflegen(
    db: SqliteDb,
    manager: SessionManager<SqliteDb>,
    health: HealthState,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut intervall = tokio::time::interval(HEALTH_INTERVALL);
    loop {
        tokio::select! {
            _ = intervall.tick() => {}
            _ = shutdown_rx.wait_for(|stopp| *stopp) => break,
        }
        let verbunden = db.ping().await;
        if !verbunden && health.db_verbunden() {
            tracing::warn!("Datenbank nicht erreichbar");
        }
        health.db_status_setzen(verbunden);
        health.sessions_setzen(manager.anzahl());
    }
}
