//! Session-Manager – Registry aller laufenden Session-Actors
//!
//! Erstellt neue Sessions, stellt nicht beendete Sessions nach einem
//! Neustart wieder her und liefert Handles an die Netzwerkschicht. Actors tragen
//! sich nach Ablauf ihrer Aufbewahrungszeit selbst aus.

use std::sync::Arc;

use dashmap::DashMap;
use lastceo_core::types::SessionId;
use lastceo_db::models::NeueSession;
use lastceo_db::GameRepository;
use lastceo_observability::GameMetrics;
use lastceo_protocol::message::SessionSummary;
use tracing::info;

use crate::config::GameRules;
use crate::error::GameResult;
use crate::hub::ConnectionHub;
use crate::session::{session_starten, SessionHandle};

pub type SessionRegistry = Arc<DashMap<SessionId, SessionHandle>>;

#[derive(Clone)]
pub struct SessionManager<R> {
    repo: R,
    hub: ConnectionHub,
    regeln: Arc<GameRules>,
    metriken: GameMetrics,
    sessions: SessionRegistry,
}

impl<R: GameRepository> SessionManager<R> {
    pub fn neu(repo: R, hub: ConnectionHub, regeln: GameRules, metriken: GameMetrics) -> Self {
        Self {
            repo,
            hub,
            regeln: Arc::new(regeln),
            metriken,
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    pub fn regeln(&self) -> &GameRules {
        &self.regeln
    }

    /// Legt eine Session an und startet ihren Actor
    pub async fn session_erstellen(
        &self,
        max_participants: u32,
        entry_fee: i64,
    ) -> GameResult<SessionHandle> {
        let record = self
            .repo
            .create_session(NeueSession {
                max_participants,
                entry_fee,
            })
            .await?;
        info!(session_id = %record.id, max_participants, entry_fee, "Session erstellt");
        Ok(self.actor_starten(record, Vec::new()))
    }

    /// Startet Actors fuer alle nicht beendeten Sessions aus der Datenbank
    ///
    /// Beitretbare Sessions warten weiter auf Teilnehmer, unterbrochene
    /// Runden werden mit den noch Lebenden abgerechnet. Sessions die
    /// bereits laufen werden uebersprungen.
    pub async fn wiederherstellen(&self) -> GameResult<usize> {
        let mut gestartet = 0;
        for record in self.repo.list_unfinished_sessions().await? {
            if self.handle(record.id).is_some() {
                continue;
            }
            let teilnehmer = self.repo.list_participants(record.id).await?;
            info!(session_id = %record.id, status = %record.status, teilnehmer = teilnehmer.len(), "Session wiederhergestellt");
            self.actor_starten(record, teilnehmer);
            gestartet += 1;
        }
        Ok(gestartet)
    }

    fn actor_starten(
        &self,
        record: lastceo_db::models::SessionRecord,
        teilnehmer: Vec<lastceo_db::models::TeilnehmerRecord>,
    ) -> SessionHandle {
        session_starten(
            record,
            teilnehmer,
            self.repo.clone(),
            self.hub.clone(),
            Arc::clone(&self.regeln),
            self.metriken.clone(),
            Arc::clone(&self.sessions),
        )
    }

    /// Handle einer laufenden Session
    pub fn handle(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions
            .get(&id)
            .map(|h| h.value().clone())
            .filter(|h| !h.ist_beendet())
    }

    /// Anzahl laufender Session-Actors
    pub fn anzahl(&self) -> usize {
        self.sessions.len()
    }

    /// Uebersicht aller Sessions die noch Teilnehmer aufnehmen
    pub async fn offene_sessions(&self) -> Vec<SessionSummary> {
        let handles: Vec<SessionHandle> =
            self.sessions.iter().map(|e| e.value().clone()).collect();
        let mut offen = Vec::new();
        for handle in handles {
            // Beendete Actors antworten nicht mehr
            let Ok(zustand) = handle.zustand().await else {
                continue;
            };
            if zustand.status.ist_beitretbar()
                && (zustand.participants.len() as u32) < zustand.max_participants
            {
                offen.push(SessionSummary {
                    session_id: zustand.session_id,
                    status: zustand.status,
                    participants: zustand.participants.len() as u32,
                    max_participants: zustand.max_participants,
                    entry_fee: zustand.entry_fee,
                    prize_pool: zustand.prize_pool,
                });
            }
        }
        offen.sort_by_key(|s| s.session_id);
        offen
    }

    /// Sorgt dafuer, dass mindestens `anzahl` Sessions beitretbar sind
    ///
    /// Gibt die Anzahl neu erstellter Sessions zurueck.
    pub async fn offene_sicherstellen(
        &self,
        anzahl: usize,
        max_participants: u32,
        entry_fee: i64,
    ) -> GameResult<usize> {
        let vorhanden = self.offene_sessions().await.len();
        let fehlend = anzahl.saturating_sub(vorhanden);
        for _ in 0..fehlend {
            self.session_erstellen(max_participants, entry_fee).await?;
        }
        Ok(fehlend)
    }
}
