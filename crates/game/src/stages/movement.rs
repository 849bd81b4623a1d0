//! Bewegungsstufe ("Stop/Go")
//!
//! Eine gemeinsame Phase pro Session wechselt zwischen GO und STOP. Wer sich
//! bei STOP bewegt scheidet sofort aus; wer am Ende des Zeitbudgets die
//! Ziellinie nicht erreicht hat ebenfalls. Phasenwechsel sind Timer-Befehle
//! des Actors, ein Ereignis sieht deshalb immer genau eine Phase.

use std::time::Duration;

use chrono::Utc;
use lastceo_core::types::{PhaseState, Point, StageId};
use lastceo_db::models::BewegungRecord;
use lastceo_db::GameRepository;
use lastceo_protocol::message::{PhaseSignal, PlayerMoved};
use lastceo_protocol::ServerMessage;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, trace};

use crate::config::GameRules;
use crate::elimination::Ausstehend;
use crate::error::{GameError, GameResult};
use crate::session::SessionActor;
use crate::stages::{Fortschritt, StageController};
use crate::timer::TimerArt;

pub(crate) struct BewegungsStufe {
    pub(crate) phase: PhaseState,
    /// Verweildauer der aktuellen Phase in Sekunden
    verweildauer: f64,
    /// Summe aller abgeschlossenen Phasen in Sekunden
    verstrichen: f64,
    beendet: bool,
}

/// Zieht die Verweildauer einer Phase, begrenzt auf das Restbudget
fn verweildauer_ziehen(rng: &mut StdRng, regeln: &GameRules, phase: PhaseState, rest: f64) -> f64 {
    let (min, max) = match phase {
        PhaseState::Go => (regeln.go_min_secs, regeln.go_max_secs),
        PhaseState::Stop => (regeln.stop_min_secs, regeln.stop_max_secs),
    };
    let dauer = if max > min {
        rng.random_range(min..=max)
    } else {
        min
    };
    dauer.min(rest)
}

/// Begrenzt eine Position auf die Strecke
fn auf_strecke(p: Point, laenge: f64) -> Point {
    Point::new(p.x.clamp(0.0, laenge), p.y.clamp(0.0, laenge))
}

impl<R: GameRepository> SessionActor<R> {
    pub(crate) fn bewegung_starten(&mut self) -> Fortschritt {
        let dauer = verweildauer_ziehen(
            &mut self.rng,
            &self.regeln,
            PhaseState::Go,
            self.regeln.movement_total_secs,
        );
        self.stufe = Some(StageController::Movement(BewegungsStufe {
            phase: PhaseState::Go,
            verweildauer: dauer,
            verstrichen: 0.0,
            beendet: false,
        }));
        self.phase_senden(PhaseState::Go, dauer);
        Fortschritt::Laeuft
    }

    fn phase_senden(&mut self, phase: PhaseState, dauer: f64) {
        debug!(session_id = %self.session_id, ?phase, dauer, "Phasenwechsel");
        self.hub.senden(
            self.session_id,
            ServerMessage::PhaseSignal(PhaseSignal {
                state: phase,
                duration: dauer,
            }),
        );
        self.timers
            .planen(Duration::from_secs_f64(dauer), TimerArt::PhasenWechsel);
    }

    pub(crate) async fn phase_wechseln(&mut self) -> GameResult<()> {
        let gesamt = self.regeln.movement_total_secs;
        let Some(StageController::Movement(b)) = &mut self.stufe else {
            return Ok(());
        };

        if !b.beendet {
            b.verstrichen += b.verweildauer;
            let rest = gesamt - b.verstrichen;
            if rest > 1e-9 {
                let phase = b.phase.umschalten();
                let dauer = verweildauer_ziehen(&mut self.rng, &self.regeln, phase, rest);
                b.phase = phase;
                b.verweildauer = dauer;
                self.phase_senden(phase, dauer);
                return Ok(());
            }
            b.beendet = true;
        }
        self.bewegung_abschliessen().await
    }

    pub(crate) async fn bewegung(&mut self, nummer: u32, ziel: Point) -> GameResult<()> {
        if !ziel.ist_endlich() {
            return Err(GameError::UngueltigeEingabe(
                "Koordinaten muessen endlich sein".into(),
            ));
        }
        let phase = match &self.stufe {
            Some(StageController::Movement(b)) if !b.beendet => b.phase,
            _ => return Ok(()),
        };
        let Some(t) = self.teilnehmer.get(&nummer).filter(|t| t.lebt) else {
            trace!(session_id = %self.session_id, teilnehmer = nummer, "Bewegung eines Ausgeschiedenen ignoriert");
            return Ok(());
        };
        let (participant_id, von) = (t.id, t.position);
        let ziel = auf_strecke(ziel, self.regeln.track_length);
        let bei_stop = phase == PhaseState::Stop;

        let record = BewegungRecord {
            participant_id,
            from: von,
            to: ziel,
            during_stop: bei_stop,
            eliminated: bei_stop,
            recorded_at: Utc::now(),
        };

        if bei_stop {
            info!(session_id = %self.session_id, teilnehmer = nummer, "Bewegung bei STOP");
            self.entscheidung_speichern(Ausstehend::Bewegung { nummer, record })
                .await?;
            return self.abschluss_pruefen().await;
        }

        self.repo.record_movement(&record).await?;
        self.repo.update_position(participant_id, ziel).await?;
        if let Some(t) = self.teilnehmer.get_mut(&nummer) {
            t.position = ziel;
        }
        self.hub.senden(
            self.session_id,
            ServerMessage::PlayerMovement(PlayerMoved {
                participant_number: nummer,
                x: ziel.x,
                y: ziel.y,
            }),
        );
        Ok(())
    }

    /// Eliminiert alle Lebenden vor der Ziellinie und beendet die Stufe
    pub(crate) async fn bewegung_abschliessen(&mut self) -> GameResult<()> {
        if let Some(StageController::Movement(b)) = &mut self.stufe {
            b.beendet = true;
        }
        self.ausstehende_nachholen().await?;

        let schwelle = self.regeln.finish_threshold;
        let zurueck: Vec<u32> = self
            .teilnehmer
            .values()
            .filter(|t| t.lebt && t.position.x < schwelle)
            .map(|t| t.nummer)
            .collect();

        info!(
            session_id = %self.session_id,
            anzahl = zurueck.len(),
            "Bewegungsstufe beendet, Nachzuegler scheiden aus"
        );
        for nummer in zurueck {
            self.eliminieren(nummer, StageId::Movement).await?;
        }
        self.stufe_beenden().await
    }
}
