//! Gemeinsamer Zustand aller Verbindungs-Tasks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lastceo_db::GameRepository;
use lastceo_game::SessionManager;
use lastceo_observability::GameMetrics;
use lastceo_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::identity::IdentityProvider;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige TCP-Verbindungen
    pub max_verbindungen: usize,
    /// Verbindungen ohne eingehende Frames werden nach dieser Zeit getrennt
    pub verbindungs_timeout: Duration,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_verbindungen: 4096,
            verbindungs_timeout: Duration::from_secs(90),
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (Arc-geteilt)
pub struct SignalingState<R, I> {
    pub config: SignalingConfig,
    pub manager: SessionManager<R>,
    pub identitaet: I,
    pub metriken: GameMetrics,
    verbindungen: AtomicUsize,
    start_time: Instant,
}

impl<R: GameRepository, I: IdentityProvider> SignalingState<R, I> {
    pub fn neu(
        config: SignalingConfig,
        manager: SessionManager<R>,
        identitaet: I,
        metriken: GameMetrics,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            manager,
            identitaet,
            metriken,
            verbindungen: AtomicUsize::new(0),
            start_time: Instant::now(),
        })
    }

    /// Reserviert einen Verbindungsplatz; `false` wenn der Server voll ist
    pub(crate) fn verbindung_belegen(&self) -> bool {
        let vorher = self.verbindungen.fetch_add(1, Ordering::AcqRel);
        if vorher >= self.config.max_verbindungen {
            self.verbindungen.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        self.metriken.connections.inc();
        true
    }

    pub(crate) fn verbindung_freigeben(&self) {
        self.verbindungen.fetch_sub(1, Ordering::AcqRel);
        self.metriken.connections.dec();
    }

    /// Anzahl offener TCP-Verbindungen
    pub fn verbindungen(&self) -> usize {
        self.verbindungen.load(Ordering::Acquire)
    }

    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
