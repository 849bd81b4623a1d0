//! Zeichenstufe (optional)
//!
//! Jeder lebende Teilnehmer erhaelt eine zufaellige Zielform und genau
//! eine Abgabe. Die Bewertung ist der geometrische Vergleich aus
//! `crate::geometry`.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use lastceo_core::types::{Point, StageId};
use lastceo_db::models::{FormRecord, VersuchRecord};
use lastceo_db::GameRepository;
use lastceo_protocol::message::ShapeAssignment;
use lastceo_protocol::ServerMessage;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::elimination::Ausstehend;
use crate::error::GameResult;
use crate::geometry;
use crate::session::SessionActor;
use crate::stages::{Fortschritt, StageController};
use crate::timer::TimerArt;

struct Zuweisung {
    form: usize,
    frist: Instant,
    abgegeben: bool,
}

pub(crate) struct FormStufe {
    formen: Vec<FormRecord>,
    zuweisungen: BTreeMap<u32, Zuweisung>,
}

impl FormStufe {
    pub(crate) fn abgabe_vermerken(&mut self, nummer: u32) {
        if let Some(z) = self.zuweisungen.get_mut(&nummer) {
            z.abgegeben = true;
        }
    }
}

fn zeitlimit(form: &FormRecord) -> Duration {
    Duration::from_secs_f64(form.time_limit.max(0.0))
}

impl<R: GameRepository> SessionActor<R> {
    pub(crate) async fn formen_starten(&mut self) -> GameResult<Fortschritt> {
        let formen = self.repo.active_shapes().await?;
        let lebend = self.lebende_nummern();
        if formen.is_empty() || lebend.is_empty() {
            info!(session_id = %self.session_id, "Keine Formen oder Teilnehmer, Zeichenstufe entfaellt");
            return Ok(Fortschritt::Abgeschlossen);
        }

        let start = Instant::now();
        let mut zuweisungen = BTreeMap::new();
        let mut laengste = Duration::ZERO;
        for nummer in lebend {
            let index = self.rng.random_range(0..formen.len());
            let form = &formen[index];
            let limit = zeitlimit(form);
            laengste = laengste.max(limit);
            zuweisungen.insert(
                nummer,
                Zuweisung {
                    form: index,
                    frist: start + limit,
                    abgegeben: false,
                },
            );
            self.hub.an_teilnehmer_senden(
                self.session_id,
                nummer,
                ServerMessage::ShapeAssignment(ShapeAssignment {
                    shape_id: form.id,
                    shape_type: form.shape_type.clone(),
                    geometry: form.geometry.clone(),
                    tolerance: form.tolerance,
                    time_limit: form.time_limit,
                }),
            );
        }

        info!(session_id = %self.session_id, teilnehmer = zuweisungen.len(), "Formen zugewiesen");
        self.stufe = Some(StageController::Shape(FormStufe {
            formen,
            zuweisungen,
        }));
        self.timers.planen(laengste, TimerArt::StufenEnde);
        Ok(Fortschritt::Laeuft)
    }

    pub(crate) async fn zeichnung(
        &mut self,
        nummer: u32,
        shape_id: i64,
        punkte: &[Point],
        time_taken: f64,
    ) -> GameResult<()> {
        if !self.lebt(nummer) {
            return Ok(());
        }
        let Some(StageController::Shape(stufe)) = &self.stufe else {
            return Ok(());
        };
        let Some(zuweisung) = stufe.zuweisungen.get(&nummer) else {
            return Ok(());
        };
        let form = &stufe.formen[zuweisung.form];
        if zuweisung.abgegeben || form.id != shape_id {
            trace!(session_id = %self.session_id, teilnehmer = nummer, shape_id, "Zeichnung ignoriert");
            return Ok(());
        }
        if Instant::now() > zuweisung.frist {
            trace!(session_id = %self.session_id, teilnehmer = nummer, "Zeichnung nach Fristende ignoriert");
            return Ok(());
        }
        let Some(participant_id) = self.teilnehmer.get(&nummer).map(|t| t.id) else {
            return Ok(());
        };

        let bewertung = geometry::bewerten(
            &form.geometry,
            punkte,
            form.tolerance,
            self.regeln.shape_resample_points,
            self.regeln.max_drawing_points,
        );
        // Ungueltige Punkte lassen sich nicht als JSON speichern
        let gueltig = punkte.len() <= self.regeln.max_drawing_points
            && punkte.iter().all(Point::ist_endlich);
        let versuch = VersuchRecord {
            participant_id,
            session_id: self.session_id,
            shape_id,
            drawing_data: if gueltig { punkte.to_vec() } else { Vec::new() },
            accuracy_score: bewertung.genauigkeit,
            success: bewertung.erfolgreich,
            time_taken: if time_taken.is_finite() {
                time_taken.max(0.0)
            } else {
                form.time_limit
            },
            attempted_at: Utc::now(),
        };

        info!(
            session_id = %self.session_id,
            teilnehmer = nummer,
            genauigkeit = bewertung.genauigkeit,
            erfolgreich = bewertung.erfolgreich,
            "Zeichnung bewertet"
        );
        self.entscheidung_speichern(Ausstehend::Zeichnung { nummer, versuch })
            .await?;
        self.abschluss_pruefen().await
    }

    /// Lebende Teilnehmer mit Zuweisung aber ohne Abgabe
    pub(crate) fn offene_abgaben(&self) -> Vec<u32> {
        let Some(StageController::Shape(stufe)) = &self.stufe else {
            return Vec::new();
        };
        stufe
            .zuweisungen
            .iter()
            .filter(|(n, z)| !z.abgegeben && self.lebt(**n))
            .map(|(n, _)| *n)
            .collect()
    }

    /// Eliminiert alle ohne Abgabe und beendet die Stufe
    pub(crate) async fn formen_abschliessen(&mut self) -> GameResult<()> {
        self.ausstehende_nachholen().await?;
        self.versuche_abgleichen().await?;

        let offen = self.offene_abgaben();
        info!(session_id = %self.session_id, anzahl = offen.len(), "Zeichenfrist abgelaufen");
        for nummer in offen {
            self.eliminieren(nummer, StageId::Shape).await?;
        }
        self.stufe_beenden().await
    }

    /// Uebernimmt gespeicherte Versuche, die der Speicher nicht kennt
    async fn versuche_abgleichen(&mut self) -> GameResult<()> {
        let versuche = self.repo.list_attempts(self.session_id).await?;
        for versuch in versuche {
            let Some(nummer) = self
                .teilnehmer
                .values()
                .find(|t| t.id == versuch.participant_id)
                .map(|t| t.nummer)
            else {
                continue;
            };
            if let Some(StageController::Shape(stufe)) = &mut self.stufe {
                stufe.abgabe_vermerken(nummer);
            }
            if !versuch.success && self.eliminieren(nummer, StageId::Shape).await? {
                debug!(session_id = %self.session_id, teilnehmer = nummer, "Gespeicherter Fehlversuch uebernommen");
            }
        }
        Ok(())
    }
}
