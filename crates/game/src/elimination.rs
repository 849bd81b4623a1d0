//! Eliminierung und gemeinsame Bewertungsregeln
//!
//! `eliminieren` schreibt zuerst bedingt in die Datenbank
//! (`WHERE is_alive = 1`) und aktualisiert erst danach den Speicher.
//! Ein bereits ausgeschiedener Teilnehmer bleibt unveraendert, ohne
//! Broadcast und ohne Zaehlung.
//!
//! Bewegungen bei STOP und Zeichnungen sind Entscheidungen: Protokoll und
//! Ausscheiden werden gemeinsam geschrieben. Scheitert das, bleibt die
//! Entscheidung vorgemerkt und wird per Timer nachgeholt, spaetestens aber
//! bevor die Stufe endet. Bis dahin ignoriert der Actor weitere
//! Spielereignisse des Teilnehmers.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use lastceo_core::types::StageId;
use lastceo_db::models::{BewegungRecord, VersuchRecord};
use lastceo_db::GameRepository;
use lastceo_protocol::message::PlayerEliminated;
use lastceo_protocol::ServerMessage;
use tracing::{debug, info, warn};

use crate::error::GameResult;
use crate::session::SessionActor;
use crate::stages::StageController;
use crate::timer::TimerArt;

/// Entscheidung, deren Schreibvorgang noch aussteht
#[derive(Debug, Clone)]
pub(crate) enum Ausstehend {
    Bewegung { nummer: u32, record: BewegungRecord },
    Zeichnung { nummer: u32, versuch: VersuchRecord },
}

impl Ausstehend {
    pub(crate) fn nummer(&self) -> u32 {
        match self {
            Ausstehend::Bewegung { nummer, .. } | Ausstehend::Zeichnung { nummer, .. } => *nummer,
        }
    }
}

pub(crate) type Vormerkungen = VecDeque<Ausstehend>;

/// Quiz-Punktzahl: 100 je richtiger Antwort minus Antwortzeit der richtigen
pub fn quiz_score(richtige: u32, zeit_richtig: f64) -> f64 {
    100.0 * richtige as f64 - zeit_richtig
}

/// Anzahl Ausscheidender nach dem Quiz: `max(1, n * prozent / 100)`, hoechstens `n`
pub fn quiz_elimination_count(lebend: usize, prozent: u32) -> usize {
    if lebend == 0 {
        return 0;
    }
    (lebend * prozent as usize / 100).max(1).min(lebend)
}

/// Die `anzahl` niedrigsten Punktzahlen
///
/// Bei Gleichstand scheidet die kleinere Teilnehmernummer zuerst aus.
pub fn lowest_scores(mut punkte: Vec<(u32, f64)>, anzahl: usize) -> Vec<u32> {
    punkte.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    punkte.into_iter().take(anzahl).map(|(n, _)| n).collect()
}

impl<R: GameRepository> SessionActor<R> {
    /// Eliminiert einen Teilnehmer; `false` wenn er bereits ausgeschieden war
    pub(crate) async fn eliminieren(&mut self, nummer: u32, stufe: StageId) -> GameResult<bool> {
        let Some(participant_id) = self.teilnehmer.get(&nummer).filter(|t| t.lebt).map(|t| t.id)
        else {
            return Ok(false);
        };
        let jetzt = Utc::now();

        if !self.repo.eliminate(participant_id, stufe, jetzt).await? {
            // Schreibvorgang eines frueheren Versuchs war schon erfolgreich
            debug!(session_id = %self.session_id, teilnehmer = nummer, "Eliminierung bereits gespeichert");
        }
        Ok(self.ausscheiden_anwenden(nummer, stufe, jetzt))
    }

    /// Uebernimmt ein gespeichertes Ausscheiden in den Speicher und meldet es
    fn ausscheiden_anwenden(&mut self, nummer: u32, stufe: StageId, zeitpunkt: DateTime<Utc>) -> bool {
        let Some(t) = self.teilnehmer.get_mut(&nummer).filter(|t| t.lebt) else {
            return false;
        };
        t.lebt = false;
        t.stufe = Some(stufe);
        t.ausgeschieden_um = Some(zeitpunkt);
        let nickname = t.nickname.clone();

        self.metriken.eliminierung(stufe.name());
        info!(session_id = %self.session_id, teilnehmer = nummer, stufe = stufe.name(), "Teilnehmer eliminiert");
        self.hub.senden(
            self.session_id,
            ServerMessage::PlayerEliminated(PlayerEliminated {
                participant_number: nummer,
                nickname,
                stage: stufe,
                eliminated_at: zeitpunkt,
            }),
        );
        true
    }

    // -----------------------------------------------------------------------
    // Vorgemerkte Entscheidungen
    // -----------------------------------------------------------------------

    /// Schreibt eine Entscheidung und wendet sie an
    ///
    /// Bei einem Persistenzfehler wird sie vorgemerkt und der Fehler
    /// weitergegeben.
    pub(crate) async fn entscheidung_speichern(&mut self, eintrag: Ausstehend) -> GameResult<()> {
        match self.ausstehend_schreiben(&eintrag).await {
            Ok(ausgeschieden) => {
                self.ausstehend_anwenden(&eintrag, ausgeschieden);
                Ok(())
            }
            Err(e) => {
                if e.ist_persistenz() {
                    warn!(
                        session_id = %self.session_id,
                        teilnehmer = eintrag.nummer(),
                        "Entscheidung nicht gespeichert, wird nachgeholt"
                    );
                    if self.ausstehend.is_empty() {
                        self.timers
                            .planen(self.regeln.persistence_retry(), TimerArt::Nachholen);
                    }
                    self.ausstehend.push_back(eintrag);
                }
                Err(e)
            }
        }
    }

    /// Schreibt alle vorgemerkten Entscheidungen in Reihenfolge
    ///
    /// Bricht beim ersten Fehler ab; der Rest bleibt vorgemerkt.
    pub(crate) async fn ausstehende_nachholen(&mut self) -> GameResult<()> {
        while let Some(eintrag) = self.ausstehend.front().cloned() {
            let ausgeschieden = self.ausstehend_schreiben(&eintrag).await?;
            self.ausstehend.pop_front();
            info!(session_id = %self.session_id, teilnehmer = eintrag.nummer(), "Entscheidung nachgeholt");
            self.ausstehend_anwenden(&eintrag, ausgeschieden);
        }
        Ok(())
    }

    pub(crate) fn hat_ausstehende(&self, nummer: u32) -> bool {
        self.ausstehend.iter().any(|a| a.nummer() == nummer)
    }

    /// `true` wenn der Teilnehmer mit dem Eintrag ausgeschieden ist
    async fn ausstehend_schreiben(&mut self, eintrag: &Ausstehend) -> GameResult<bool> {
        match eintrag {
            Ausstehend::Bewegung { record, .. } => {
                self.repo.record_movement(record).await?;
                Ok(record.eliminated)
            }
            Ausstehend::Zeichnung { nummer, versuch } => {
                let gespeichert = self.repo.record_attempt(versuch).await?;
                if !gespeichert.neu {
                    debug!(session_id = %self.session_id, teilnehmer = nummer, "Zeichnung bereits gespeichert");
                }
                Ok(!gespeichert.erfolgreich)
            }
        }
    }

    fn ausstehend_anwenden(&mut self, eintrag: &Ausstehend, ausgeschieden: bool) {
        let (nummer, stufe, zeitpunkt) = match eintrag {
            Ausstehend::Bewegung { nummer, record } => {
                (*nummer, StageId::Movement, record.recorded_at)
            }
            Ausstehend::Zeichnung { nummer, versuch } => {
                if let Some(StageController::Shape(stufe)) = &mut self.stufe {
                    stufe.abgabe_vermerken(*nummer);
                }
                (*nummer, StageId::Shape, versuch.attempted_at)
            }
        };
        if ausgeschieden {
            self.ausscheiden_anwenden(nummer, stufe, zeitpunkt);
        }
    }
}
