//! Quiz-Stufe
//!
//! N zufaellige Fragen ohne Wiederholung. Pro Frage eine Antwort je
//! lebendem Teilnehmer; nach der letzten Frage scheiden die schwaechsten
//! Punktzahlen aus.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use lastceo_core::types::{AnswerOption, StageId};
use lastceo_db::models::{AntwortRecord, FrageRecord};
use lastceo_db::GameRepository;
use lastceo_protocol::message::{PlayerQuizResult, QuizAnswerReceived, QuizQuestion, QuizResults};
use lastceo_protocol::ServerMessage;
use rand::seq::SliceRandom;
use tracing::{debug, info, trace};

use crate::elimination::{lowest_scores, quiz_elimination_count, quiz_score};
use crate::error::GameResult;
use crate::session::SessionActor;
use crate::stages::{Fortschritt, StageController};
use crate::timer::TimerArt;

#[derive(Debug, Clone, Copy)]
struct Antwort {
    answer: AnswerOption,
    richtig: bool,
    zeit: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Punkte {
    richtige: u32,
    zeit_richtig: f64,
}

pub(crate) struct QuizStufe {
    fragen: Vec<FrageRecord>,
    /// Anzahl bereits gestellter Fragen
    gestellt: usize,
    offen: bool,
    antworten: BTreeMap<u32, Antwort>,
    punkte: HashMap<u32, Punkte>,
    /// Lebende Teilnehmer zu Beginn der Stufe
    start_lebend: Vec<u32>,
}

impl QuizStufe {
    fn aktuelle_frage(&self) -> Option<&FrageRecord> {
        self.gestellt.checked_sub(1).and_then(|i| self.fragen.get(i))
    }
}

/// Antwortzeit in `[0, limit]`, nicht-endliche Werte zaehlen als `limit`
fn zeit_begrenzen(zeit: f64, limit: f64) -> f64 {
    if zeit.is_finite() {
        zeit.clamp(0.0, limit)
    } else {
        limit
    }
}

impl<R: GameRepository> SessionActor<R> {
    pub(crate) async fn quiz_starten(&mut self) -> GameResult<Fortschritt> {
        let mut fragen = self.repo.active_questions().await?;
        fragen.shuffle(&mut self.rng);
        fragen.truncate(self.regeln.question_count);

        if fragen.is_empty() {
            info!(session_id = %self.session_id, "Keine aktiven Fragen, Quiz ohne Eliminierung");
            return Ok(Fortschritt::Abgeschlossen);
        }

        self.stufe = Some(StageController::Quiz(QuizStufe {
            fragen,
            gestellt: 0,
            offen: false,
            antworten: BTreeMap::new(),
            punkte: HashMap::new(),
            start_lebend: self.lebende_nummern(),
        }));
        self.frage_stellen(0);
        Ok(Fortschritt::Laeuft)
    }

    /// Stellt die Frage mit `index`, sofern sie die naechste ist
    pub(crate) fn frage_stellen(&mut self, index: usize) {
        let Some(StageController::Quiz(quiz)) = &mut self.stufe else {
            return;
        };
        if quiz.offen || index != quiz.gestellt || index >= quiz.fragen.len() {
            debug!(session_id = %self.session_id, index, "Frage bereits gestellt");
            return;
        }

        quiz.gestellt += 1;
        quiz.offen = true;
        quiz.antworten.clear();

        let frage = &quiz.fragen[index];
        let nachricht = ServerMessage::QuizQuestion(QuizQuestion {
            id: frage.id,
            question_number: quiz.gestellt as u32,
            total_questions: quiz.fragen.len() as u32,
            question: frage.question.clone(),
            options: AnswerOption::ALLE
                .into_iter()
                .zip(frage.options.iter().cloned())
                .collect(),
            time_limit: self.regeln.question_time_limit_secs,
        });
        debug!(session_id = %self.session_id, frage = frage.id, nummer = quiz.gestellt, "Frage gestellt");

        self.hub.senden(self.session_id, nachricht);
        self.timers
            .planen(self.regeln.question_time_limit(), TimerArt::FrageEnde { index });
    }

    pub(crate) async fn quiz_antwort(
        &mut self,
        nummer: u32,
        question_id: i64,
        answer: AnswerOption,
        time_taken: f64,
    ) -> GameResult<()> {
        if !self.lebt(nummer) {
            trace!(session_id = %self.session_id, teilnehmer = nummer, "Antwort eines Ausgeschiedenen ignoriert");
            return Ok(());
        }
        let Some(StageController::Quiz(quiz)) = &self.stufe else {
            return Ok(());
        };
        let Some(frage) = quiz.aktuelle_frage().filter(|f| quiz.offen && f.id == question_id) else {
            trace!(session_id = %self.session_id, teilnehmer = nummer, question_id, "Antwort fuer nicht offene Frage ignoriert");
            return Ok(());
        };
        if quiz.antworten.contains_key(&nummer) {
            trace!(session_id = %self.session_id, teilnehmer = nummer, "Doppelte Antwort ignoriert");
            return Ok(());
        }
        let Some(participant_id) = self.teilnehmer.get(&nummer).map(|t| t.id) else {
            return Ok(());
        };

        let antwort = Antwort {
            answer,
            richtig: answer == frage.correct_answer,
            zeit: zeit_begrenzen(time_taken, self.regeln.question_time_limit_secs),
        };
        let index = quiz.gestellt - 1;

        let gespeichert = self
            .repo
            .record_answer(&AntwortRecord {
                participant_id,
                question_id,
                answer,
                is_correct: antwort.richtig,
                time_taken: antwort.zeit,
                answered_at: Utc::now(),
            })
            .await?;
        if !gespeichert {
            trace!(session_id = %self.session_id, teilnehmer = nummer, "Antwort bereits gespeichert");
            return Ok(());
        }

        let lebend = self.lebende() as u32;
        let Some(StageController::Quiz(quiz)) = &mut self.stufe else {
            return Ok(());
        };
        quiz.antworten.insert(nummer, antwort);
        let beantwortet = quiz.antworten.len() as u32;

        self.hub.senden(
            self.session_id,
            ServerMessage::QuizAnswerReceived(QuizAnswerReceived {
                participant_number: nummer,
                question_id,
                answered: beantwortet,
                alive: lebend,
            }),
        );

        if beantwortet >= lebend {
            debug!(session_id = %self.session_id, question_id, "Alle haben geantwortet, Frage wird geschlossen");
            self.timers.neue_epoche();
            self.frage_schliessen(index);
        }
        Ok(())
    }

    /// Schliesst die offene Frage `index` und sendet die Aufloesung
    pub(crate) fn frage_schliessen(&mut self, index: usize) {
        let Some(StageController::Quiz(quiz)) = &mut self.stufe else {
            return;
        };
        if !quiz.offen || quiz.gestellt != index + 1 {
            return;
        }
        quiz.offen = false;

        let frage = &quiz.fragen[index];
        let mut statistik: BTreeMap<AnswerOption, u32> =
            AnswerOption::ALLE.into_iter().map(|o| (o, 0)).collect();
        let mut ergebnisse = Vec::with_capacity(quiz.antworten.len());

        for (&nummer, antwort) in &quiz.antworten {
            *statistik.entry(antwort.answer).or_default() += 1;
            if antwort.richtig {
                let p = quiz.punkte.entry(nummer).or_default();
                p.richtige += 1;
                p.zeit_richtig += antwort.zeit;
            }
            ergebnisse.push(PlayerQuizResult {
                participant_number: nummer,
                nickname: self
                    .teilnehmer
                    .get(&nummer)
                    .map(|t| t.nickname.clone())
                    .unwrap_or_default(),
                answer: antwort.answer,
                is_correct: antwort.richtig,
                time_taken: antwort.zeit,
            });
        }

        let nachricht = ServerMessage::QuizResults(QuizResults {
            question_id: frage.id,
            correct_answer: frage.correct_answer,
            answer_stats: statistik,
            player_results: ergebnisse,
        });
        let folge = if quiz.gestellt >= quiz.fragen.len() {
            TimerArt::StufenEnde
        } else {
            TimerArt::NaechsteFrage {
                index: quiz.gestellt,
            }
        };

        self.hub.senden(self.session_id, nachricht);
        self.timers.planen(self.regeln.reveal_pause(), folge);
    }

    /// Eliminiert die schwaechsten Punktzahlen und beendet die Stufe
    pub(crate) async fn quiz_abschliessen(&mut self) -> GameResult<()> {
        let Some(StageController::Quiz(quiz)) = &self.stufe else {
            return Ok(());
        };
        let punktzahlen: Vec<(u32, f64)> = quiz
            .start_lebend
            .iter()
            .map(|&n| {
                let p = quiz.punkte.get(&n).copied().unwrap_or_default();
                (n, quiz_score(p.richtige, p.zeit_richtig))
            })
            .collect();
        let anzahl =
            quiz_elimination_count(punktzahlen.len(), self.regeln.quiz_elimination_percent);
        let ausscheidend = lowest_scores(punktzahlen, anzahl);

        info!(
            session_id = %self.session_id,
            anzahl,
            teilnehmer = ?ausscheidend,
            "Quiz ausgewertet"
        );
        for nummer in ausscheidend {
            self.eliminieren(nummer, StageId::Quiz).await?;
        }
        self.stufe_beenden().await
    }
}
