//! Connection-Hub – Verteilt Servernachrichten an die Verbindungen einer Session
//!
//! Jede Verbindung besitzt eine eigene, begrenzte Send-Queue. Der Session-Actor
//! schreibt nicht-blockierend hinein, eine volle oder geschlossene Queue
//! verwirft die Nachricht nur fuer diese eine Verbindung.
//!
//! ## Zustellung
//! - An alle Verbindungen einer Session: `senden`
//! - An alle Verbindungen eines Teilnehmers: `an_teilnehmer_senden`
//! - An genau eine Verbindung: `an_verbindung_senden`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use lastceo_core::types::SessionId;
use lastceo_protocol::ServerMessage;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Laufende Nummer einer Verbindung (prozessweit eindeutig)
pub type VerbindungsId = u64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
struct ClientSender {
    id: VerbindungsId,
    teilnehmer_nummer: u32,
    tx: mpsc::Sender<ServerMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    fn senden(&self, nachricht: ServerMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    verbindung = self.id,
                    teilnehmer = self.teilnehmer_nummer,
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    verbindung = self.id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionHub
// ---------------------------------------------------------------------------

/// Zentrale Verbindungsverwaltung fuer alle Sessions
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct ConnectionHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    /// Verbindungen je Session in Beitrittsreihenfolge
    sessions: DashMap<SessionId, Vec<ClientSender>>,
    naechste_id: AtomicU64,
}

impl ConnectionHub {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(HubInner {
                sessions: DashMap::new(),
                naechste_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registriert eine Verbindung und gibt den Empfaenger ihrer Queue zurueck
    pub fn verbinden(
        &self,
        session_id: SessionId,
        teilnehmer_nummer: u32,
    ) -> (VerbindungsId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let id = self.inner.naechste_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .sessions
            .entry(session_id)
            .or_default()
            .push(ClientSender {
                id,
                teilnehmer_nummer,
                tx,
            });
        tracing::debug!(%session_id, verbindung = id, teilnehmer = teilnehmer_nummer, "Verbindung registriert");
        (id, rx)
    }

    /// Entfernt eine Verbindung, der Session-Zustand bleibt unberuehrt
    pub fn trennen(&self, session_id: SessionId, id: VerbindungsId) -> bool {
        let Some(mut verbindungen) = self.inner.sessions.get_mut(&session_id) else {
            return false;
        };
        let vorher = verbindungen.len();
        verbindungen.retain(|c| c.id != id);
        let entfernt = verbindungen.len() < vorher;
        if entfernt {
            tracing::debug!(%session_id, verbindung = id, "Verbindung entfernt");
        }
        entfernt
    }

    /// Sendet an alle Verbindungen der Session
    ///
    /// Gibt die Anzahl erfolgreich eingereihter Nachrichten zurueck.
    pub fn senden(&self, session_id: SessionId, nachricht: ServerMessage) -> usize {
        self.senden_gefiltert(session_id, nachricht, |_| true)
    }

    /// Sendet an alle Verbindungen eines Teilnehmers
    pub fn an_teilnehmer_senden(
        &self,
        session_id: SessionId,
        teilnehmer_nummer: u32,
        nachricht: ServerMessage,
    ) -> usize {
        self.senden_gefiltert(session_id, nachricht, |c| {
            c.teilnehmer_nummer == teilnehmer_nummer
        })
    }

    /// Sendet an genau eine Verbindung
    pub fn an_verbindung_senden(
        &self,
        session_id: SessionId,
        id: VerbindungsId,
        nachricht: ServerMessage,
    ) -> bool {
        self.senden_gefiltert(session_id, nachricht, |c| c.id == id) > 0
    }

    fn senden_gefiltert(
        &self,
        session_id: SessionId,
        nachricht: ServerMessage,
        filter: impl Fn(&ClientSender) -> bool,
    ) -> usize {
        let Some(verbindungen) = self.inner.sessions.get(&session_id) else {
            return 0;
        };
        verbindungen
            .iter()
            .filter(|c| filter(c))
            .filter(|c| c.senden(nachricht.clone()))
            .count()
    }

    /// Anzahl Verbindungen einer Session
    pub fn verbindungen(&self, session_id: SessionId) -> usize {
        self.inner
            .sessions
            .get(&session_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Anzahl aller Verbindungen
    pub fn gesamt(&self) -> usize {
        self.inner.sessions.iter().map(|e| e.value().len()).sum()
    }

    /// Entfernt alle Verbindungen einer Session und schliesst deren Queues
    pub fn session_entfernen(&self, session_id: SessionId) -> usize {
        self.inner
            .sessions
            .remove(&session_id)
            .map(|(_, v)| v.len())
            .unwrap_or(0)
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
