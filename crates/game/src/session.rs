//! Session-Actor – Zustandsmaschine einer einzelnen Spielrunde
//!
//! Jede Session laeuft als eigener Task, der Befehle aus einer begrenzten
//! Queue strikt nacheinander abarbeitet: Verbindungen, Client-Ereignisse und
//! Timer. Schreibzugriffe auf die Datenbank werden abgewartet bevor der
//! In-Memory-Zustand geaendert wird, Broadcasts werden nur eingereiht.
//!
//! Ablauf: WAITING -> LOBBY -> QUIZ -> MOVEMENT -> [SHAPE] -> SETTLEMENT -> FINISHED

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lastceo_core::types::{
    AnswerOption, ParticipantId, Point, SessionId, SessionStatus, StageId, UserId,
};
use lastceo_db::models::{Einschreibung, SessionRecord, StufenWechsel, TeilnehmerRecord};
use lastceo_db::GameRepository;
use lastceo_observability::GameMetrics;
use lastceo_protocol::message::{
    ChatBroadcast, GameState, ParticipantView, ReadyStatus, StageTransition,
};
use lastceo_protocol::ServerMessage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::config::GameRules;
use crate::elimination::Vormerkungen;
use crate::error::{GameError, GameResult};
use crate::hub::{ConnectionHub, VerbindungsId};
use crate::manager::SessionRegistry;
use crate::stages::{Fortschritt, StageController};
use crate::timer::{TimerArt, Timers};

/// Groesse der Befehls-Queue pro Session
const BEFEHL_QUEUE_GROESSE: usize = 256;

/// Maximale Laenge einer Chatnachricht in Zeichen
pub const MAX_CHAT_LAENGE: usize = 500;

// ---------------------------------------------------------------------------
// Oeffentliche Typen
// ---------------------------------------------------------------------------

/// Spielrelevantes Ereignis eines verbundenen Teilnehmers
#[derive(Debug, Clone, PartialEq)]
pub enum Spielereignis {
    Chat(String),
    Bereit,
    QuizAntwort {
        question_id: i64,
        answer: AnswerOption,
        time_taken: f64,
    },
    Bewegung(Point),
    Zeichnung {
        shape_id: i64,
        punkte: Vec<Point>,
        time_taken: f64,
    },
}

/// Ergebnis eines erfolgreichen Verbindungsaufbaus
#[derive(Debug)]
pub struct Verbindung {
    pub verbindung_id: VerbindungsId,
    pub participant_id: ParticipantId,
    pub teilnehmer_nummer: u32,
    /// Spielstand zum Zeitpunkt des Beitritts (wurde auch in die Queue gelegt)
    pub zustand: GameState,
    pub empfaenger: mpsc::Receiver<ServerMessage>,
}

pub(crate) enum SessionCommand {
    Verbinden {
        user_id: UserId,
        antwort: oneshot::Sender<GameResult<Verbindung>>,
    },
    Trennen {
        verbindung_id: VerbindungsId,
    },
    Ereignis {
        user_id: UserId,
        ereignis: Spielereignis,
        antwort: oneshot::Sender<GameResult<()>>,
    },
    Zustand {
        antwort: oneshot::Sender<GameState>,
    },
    Timer {
        epoch: u64,
        art: TimerArt,
    },
}

/// Handle auf einen laufenden Session-Actor
///
/// Clone ist guenstig, alle Clones speisen dieselbe Befehls-Queue.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// `true` sobald der Actor beendet ist
    pub fn ist_beendet(&self) -> bool {
        self.tx.is_closed()
    }

    async fn anfragen<T>(
        &self,
        befehl: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> GameResult<T> {
        let (antwort, empfang) = oneshot::channel();
        self.tx
            .send(befehl(antwort))
            .await
            .map_err(|_| GameError::SessionNichtGefunden(self.session_id))?;
        empfang
            .await
            .map_err(|_| GameError::SessionNichtGefunden(self.session_id))
    }

    /// Verbindet einen Benutzer; schreibt ihn ein falls noetig
    pub async fn verbinden(&self, user_id: UserId) -> GameResult<Verbindung> {
        self.anfragen(|antwort| SessionCommand::Verbinden { user_id, antwort })
            .await?
    }

    /// Meldet eine Verbindung ab (best effort)
    pub async fn trennen(&self, verbindung_id: VerbindungsId) {
        let _ = self
            .tx
            .send(SessionCommand::Trennen { verbindung_id })
            .await;
    }

    /// Leitet ein Client-Ereignis an den Actor weiter
    pub async fn ereignis(&self, user_id: UserId, ereignis: Spielereignis) -> GameResult<()> {
        self.anfragen(|antwort| SessionCommand::Ereignis {
            user_id,
            ereignis,
            antwort,
        })
        .await?
    }

    /// Aktueller Spielstand (ohne Empfaengerbezug)
    pub async fn zustand(&self) -> GameResult<GameState> {
        self.anfragen(|antwort| SessionCommand::Zustand { antwort })
            .await
    }
}

// ---------------------------------------------------------------------------
// Teilnehmer im Speicher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct Teilnehmer {
    pub id: ParticipantId,
    pub user_id: UserId,
    pub nummer: u32,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub lebt: bool,
    pub stufe: Option<StageId>,
    pub ausgeschieden_um: Option<DateTime<Utc>>,
    pub position: Point,
    pub preis: i64,
    pub bereit: bool,
}

impl From<TeilnehmerRecord> for Teilnehmer {
    fn from(r: TeilnehmerRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            nummer: r.participant_number,
            nickname: r.nickname,
            avatar_url: r.avatar_url,
            lebt: r.is_alive,
            stufe: r.elimination_stage,
            ausgeschieden_um: r.eliminated_at,
            position: r.position,
            preis: r.final_prize,
            bereit: false,
        }
    }
}

impl Teilnehmer {
    fn ansicht(&self) -> ParticipantView {
        ParticipantView {
            participant_number: self.nummer,
            nickname: self.nickname.clone(),
            avatar_url: self.avatar_url.clone(),
            is_alive: self.lebt,
            elimination_stage: self.stufe,
            position: self.position,
        }
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

pub(crate) struct SessionActor<R> {
    pub(crate) repo: R,
    pub(crate) hub: ConnectionHub,
    pub(crate) regeln: Arc<GameRules>,
    pub(crate) metriken: GameMetrics,
    pub(crate) rng: StdRng,
    pub(crate) timers: Timers,

    pub(crate) session_id: SessionId,
    pub(crate) status: SessionStatus,
    pub(crate) max_participants: u32,
    pub(crate) entry_fee: i64,
    pub(crate) prize_pool: i64,
    pub(crate) stage_index: u32,
    pub(crate) stage_started_at: Option<DateTime<Utc>>,
    pub(crate) gestartet_um: Option<DateTime<Utc>>,

    /// Teilnehmer nach Teilnehmernummer
    pub(crate) teilnehmer: BTreeMap<u32, Teilnehmer>,
    pub(crate) stufe: Option<StageController>,
    /// Entscheidungen der laufenden Stufe, die noch geschrieben werden muessen
    pub(crate) ausstehend: Vormerkungen,
}

/// Startet den Actor einer Session und gibt sein Handle zurueck
pub(crate) fn session_starten<R: GameRepository>(
    record: SessionRecord,
    teilnehmer: Vec<TeilnehmerRecord>,
    repo: R,
    hub: ConnectionHub,
    regeln: Arc<GameRules>,
    metriken: GameMetrics,
    registry: SessionRegistry,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(BEFEHL_QUEUE_GROESSE);
    let rng = match regeln.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut actor = SessionActor {
        repo,
        hub,
        metriken,
        rng,
        timers: Timers::neu(tx.downgrade()),
        session_id: record.id,
        status: record.status,
        max_participants: record.max_participants,
        entry_fee: record.entry_fee,
        prize_pool: record.prize_pool,
        stage_index: record.stage_index,
        stage_started_at: record.stage_started_at,
        gestartet_um: record.started_at,
        teilnehmer: teilnehmer
            .into_iter()
            .map(|t| (t.participant_number, Teilnehmer::from(t)))
            .collect(),
        stufe: None,
        ausstehend: Vormerkungen::new(),
        regeln,
    };
    actor.unterbrochene_fortsetzen();

    let handle = SessionHandle {
        session_id: record.id,
        tx,
    };
    registry.insert(record.id, handle.clone());
    tokio::spawn(actor.ausfuehren(rx, registry));
    handle
}

impl<R: GameRepository> SessionActor<R> {
    async fn ausfuehren(mut self, mut rx: mpsc::Receiver<SessionCommand>, registry: SessionRegistry) {
        self.metriken.sessions_active.inc();
        info!(session_id = %self.session_id, status = %self.status, "Session-Actor gestartet");

        while let Some(befehl) = rx.recv().await {
            match befehl {
                SessionCommand::Verbinden { user_id, antwort } => {
                    let ergebnis = self.verbinden(user_id).await;
                    if let Err(e) = &ergebnis {
                        debug!(session_id = %self.session_id, %user_id, fehler = %e, "Verbindung abgelehnt");
                    }
                    let _ = antwort.send(ergebnis);
                }
                SessionCommand::Trennen { verbindung_id } => {
                    self.hub.trennen(self.session_id, verbindung_id);
                }
                SessionCommand::Ereignis {
                    user_id,
                    ereignis,
                    antwort,
                } => {
                    let ergebnis = self.ereignis_behandeln(user_id, ereignis).await;
                    if let Err(e) = &ergebnis {
                        warn!(session_id = %self.session_id, %user_id, fehler = %e, "Ereignis fehlgeschlagen");
                    }
                    let _ = antwort.send(ergebnis);
                }
                SessionCommand::Zustand { antwort } => {
                    let _ = antwort.send(self.zustand(None));
                }
                SessionCommand::Timer { epoch, art } => {
                    if !self.timers.ist_aktuell(epoch) {
                        debug!(session_id = %self.session_id, epoch, ?art, "Veralteter Timer ignoriert");
                        continue;
                    }
                    if art == TimerArt::Aufraeumen {
                        break;
                    }
                    let epoch_vorher = self.timers.epoch();
                    if let Err(e) = self.timer_behandeln(art).await {
                        error!(session_id = %self.session_id, ?art, fehler = %e, "Timer-Verarbeitung fehlgeschlagen");
                        // Nach einem Stufenwechsel gehoert der Timer zur alten Stufe
                        if e.ist_persistenz() && self.timers.ist_aktuell(epoch_vorher) {
                            self.timers.planen(self.regeln.persistence_retry(), art);
                        }
                    }
                }
            }
        }

        registry.remove(&self.session_id);
        let getrennt = self.hub.session_entfernen(self.session_id);
        self.metriken.sessions_active.dec();
        info!(session_id = %self.session_id, getrennt, "Session-Actor beendet");
    }

    // -----------------------------------------------------------------------
    // Verbindungen & Einschreibung
    // -----------------------------------------------------------------------

    async fn verbinden(&mut self, user_id: UserId) -> GameResult<Verbindung> {
        let nummer = match self.nummer_von(user_id) {
            Some(nummer) => nummer,
            None => self.einschreiben(user_id).await?,
        };
        let participant_id = self
            .teilnehmer
            .get(&nummer)
            .map(|t| t.id)
            .ok_or_else(|| GameError::intern("Teilnehmer nach Einschreibung nicht vorhanden"))?;

        let (verbindung_id, empfaenger) = self.hub.verbinden(self.session_id, nummer);
        let zustand = self.zustand(Some(nummer));
        self.hub.an_verbindung_senden(
            self.session_id,
            verbindung_id,
            ServerMessage::GameState(zustand.clone()),
        );

        Ok(Verbindung {
            verbindung_id,
            participant_id,
            teilnehmer_nummer: nummer,
            zustand,
            empfaenger,
        })
    }

    async fn einschreiben(&mut self, user_id: UserId) -> GameResult<u32> {
        if self.status.ist_beendet() {
            return Err(GameError::SessionBeendet);
        }
        if !self.status.ist_beitretbar() {
            return Err(GameError::BereitsGestartet);
        }
        if self.teilnehmer.len() as u32 >= self.max_participants {
            return Err(GameError::SessionVoll);
        }

        let einschreibung = self.repo.enroll(self.session_id, user_id).await?;
        let neu = matches!(einschreibung, Einschreibung::Neu(_));
        let record = match einschreibung {
            Einschreibung::Neu(t) | Einschreibung::Bestehend(t) => t,
        };
        let nummer = record.participant_number;
        if neu {
            self.prize_pool += self.entry_fee;
            info!(
                session_id = %self.session_id,
                teilnehmer = nummer,
                preispool = self.prize_pool,
                "Teilnehmer eingeschrieben"
            );
        }
        self.teilnehmer.insert(nummer, Teilnehmer::from(record));
        self.bereitschaft_senden();

        if self.status == SessionStatus::Waiting {
            self.uebergang(SessionStatus::Lobby).await?;
        }
        Ok(nummer)
    }

    // -----------------------------------------------------------------------
    // Ereignisse
    // -----------------------------------------------------------------------

    async fn ereignis_behandeln(
        &mut self,
        user_id: UserId,
        ereignis: Spielereignis,
    ) -> GameResult<()> {
        let nummer = self
            .nummer_von(user_id)
            .ok_or(GameError::NichtEingeschrieben)?;
        if self.status >= SessionStatus::Settlement {
            trace!(session_id = %self.session_id, teilnehmer = nummer, "Ereignis nach Spielende ignoriert");
            return Ok(());
        }
        if self.hat_ausstehende(nummer) && !matches!(ereignis, Spielereignis::Chat(_)) {
            trace!(session_id = %self.session_id, teilnehmer = nummer, "Entscheidung steht aus, Ereignis ignoriert");
            return Ok(());
        }

        match (ereignis, self.status) {
            (Spielereignis::Chat(text), _) => self.chat(nummer, &text).await,
            (Spielereignis::Bereit, SessionStatus::Waiting | SessionStatus::Lobby) => {
                self.bereit(nummer).await
            }
            (
                Spielereignis::QuizAntwort {
                    question_id,
                    answer,
                    time_taken,
                },
                SessionStatus::Quiz,
            ) => {
                self.quiz_antwort(nummer, question_id, answer, time_taken)
                    .await
            }
            (Spielereignis::Bewegung(ziel), SessionStatus::Movement) => {
                self.bewegung(nummer, ziel).await
            }
            (
                Spielereignis::Zeichnung {
                    shape_id,
                    punkte,
                    time_taken,
                },
                SessionStatus::Shape,
            ) => self.zeichnung(nummer, shape_id, &punkte, time_taken).await,
            (ereignis, status) => {
                trace!(
                    session_id = %self.session_id,
                    teilnehmer = nummer,
                    %status,
                    ?ereignis,
                    "Ereignis passt nicht zur Stufe"
                );
                Ok(())
            }
        }
    }

    async fn chat(&mut self, nummer: u32, text: &str) -> GameResult<()> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_CHAT_LAENGE {
            trace!(session_id = %self.session_id, teilnehmer = nummer, "Chatnachricht verworfen");
            return Ok(());
        }
        let Some(t) = self.teilnehmer.get(&nummer) else {
            return Err(GameError::NichtEingeschrieben);
        };

        let record = self
            .repo
            .save_message(self.session_id, Some(t.id), text)
            .await?;
        self.hub.senden(
            self.session_id,
            ServerMessage::ChatMessage(ChatBroadcast {
                participant_number: nummer,
                nickname: t.nickname.clone(),
                message: record.message,
                timestamp: record.created_at,
            }),
        );
        Ok(())
    }

    async fn bereit(&mut self, nummer: u32) -> GameResult<()> {
        if let Some(t) = self.teilnehmer.get_mut(&nummer) {
            t.bereit = true;
        }
        self.bereitschaft_senden();

        let bereit = self.teilnehmer.values().filter(|t| t.bereit).count();
        let alle_bereit = bereit == self.teilnehmer.len();
        if !alle_bereit || (self.teilnehmer.len() as u32) < self.regeln.min_participants {
            return Ok(());
        }

        info!(session_id = %self.session_id, teilnehmer = bereit, "Alle Teilnehmer bereit");
        if self.status == SessionStatus::Waiting {
            self.uebergang(SessionStatus::Lobby).await?;
        }
        self.uebergang(SessionStatus::Quiz).await
    }

    fn bereitschaft_senden(&self) {
        let bereit = self.teilnehmer.values().filter(|t| t.bereit).count() as u32;
        self.hub.senden(
            self.session_id,
            ServerMessage::ReadyStatus(ReadyStatus {
                ready: bereit,
                total: self.teilnehmer.len() as u32,
            }),
        );
    }

    // -----------------------------------------------------------------------
    // Timer
    // -----------------------------------------------------------------------

    async fn timer_behandeln(&mut self, art: TimerArt) -> GameResult<()> {
        match art {
            TimerArt::StufeStarten => match self.stufe_starten().await? {
                Fortschritt::Laeuft => Ok(()),
                Fortschritt::Abgeschlossen => self.stufe_beenden().await,
            },
            TimerArt::FrageEnde { index } => {
                self.frage_schliessen(index);
                Ok(())
            }
            TimerArt::NaechsteFrage { index } => {
                self.frage_stellen(index);
                Ok(())
            }
            TimerArt::PhasenWechsel => self.phase_wechseln().await,
            TimerArt::StufenEnde => match &self.stufe {
                Some(StageController::Quiz(_)) => self.quiz_abschliessen().await,
                Some(StageController::Movement(_)) => self.bewegung_abschliessen().await,
                Some(StageController::Shape(_)) => self.formen_abschliessen().await,
                None => Ok(()),
            },
            TimerArt::Nachholen => {
                self.ausstehende_nachholen().await?;
                self.abschluss_pruefen().await
            }
            TimerArt::Wiederaufnahme => {
                info!(session_id = %self.session_id, stufe = %self.status, lebend = self.lebende(), "Unterbrochene Runde wird abgerechnet");
                self.uebergang(SessionStatus::Settlement).await
            }
            TimerArt::Aufraeumen => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Zustandsmaschine
    // -----------------------------------------------------------------------

    /// Folgestatus nach Abschluss des aktuellen Status
    fn naechster_status(&self) -> SessionStatus {
        use SessionStatus::*;
        if self.status.stufe().is_some() && self.lebende() == 0 {
            return Settlement;
        }
        match self.status {
            Waiting => Lobby,
            Lobby => Quiz,
            Quiz => Movement,
            Movement if self.regeln.shape_stage_enabled => Shape,
            Movement | Shape => Settlement,
            Settlement | Finished => Finished,
        }
    }

    /// Beendet die laufende Stufe und wechselt in die naechste
    ///
    /// Vorgemerkte Entscheidungen werden vorher geschrieben, damit die
    /// Folgestufe und die Abrechnung den vollstaendigen Stand sehen.
    pub(crate) async fn stufe_beenden(&mut self) -> GameResult<()> {
        self.ausstehende_nachholen().await?;
        self.uebergang(self.naechster_status()).await
    }

    /// Beendet Bewegungs- oder Zeichenstufe, sobald nichts mehr offen ist
    pub(crate) async fn abschluss_pruefen(&mut self) -> GameResult<()> {
        let fertig = match &self.stufe {
            Some(StageController::Movement(_)) => self.lebende() == 0,
            Some(StageController::Shape(_)) => self.offene_abgaben().is_empty(),
            _ => false,
        };
        if fertig {
            self.stufe_beenden().await
        } else {
            Ok(())
        }
    }

    /// Plant nach einem Neustart die Fortsetzung einer laufenden Runde
    ///
    /// Stufen werden nicht mittendrin fortgesetzt: die Runde geht mit den
    /// noch Lebenden direkt in die Abrechnung. SETTLEMENT wird wiederholt.
    fn unterbrochene_fortsetzen(&mut self) {
        let art = match self.status {
            SessionStatus::Settlement => TimerArt::StufeStarten,
            s if s.stufe().is_some() => TimerArt::Wiederaufnahme,
            _ => return,
        };
        self.timers.planen(Duration::ZERO, art);
    }

    /// Wechselt vorwaerts in `ziel` und startet dessen Controller
    ///
    /// Stufen die sofort abgeschlossen sind (z.B. leerer Fragenkatalog)
    /// werden in derselben Schleife uebersprungen.
    async fn uebergang(&mut self, mut ziel: SessionStatus) -> GameResult<()> {
        loop {
            if ziel <= self.status {
                warn!(session_id = %self.session_id, von = %self.status, nach = %ziel, "Rueckwaertswechsel verweigert");
                return Ok(());
            }
            if ziel == SessionStatus::Finished {
                self.beenden();
                return Ok(());
            }

            let jetzt = Utc::now();
            let index = self.stage_index + 1;
            self.repo
                .record_stage(
                    self.session_id,
                    StufenWechsel {
                        status: ziel,
                        stage_index: index,
                        stage_started_at: jetzt,
                    },
                )
                .await?;

            self.timers.neue_epoche();
            self.status = ziel;
            self.stage_index = index;
            self.stage_started_at = Some(jetzt);
            self.stufe = None;
            if ziel == SessionStatus::Quiz && self.gestartet_um.is_none() {
                self.gestartet_um = Some(jetzt);
            }
            self.metriken.stufenwechsel(ziel.als_str());
            info!(session_id = %self.session_id, stufe = %ziel, index, "Stufenwechsel");
            self.stufenwechsel_senden(ziel);

            match self.stufe_starten().await {
                Ok(Fortschritt::Laeuft) => return Ok(()),
                Ok(Fortschritt::Abgeschlossen) => ziel = self.naechster_status(),
                Err(e) => {
                    if e.ist_persistenz() {
                        self.timers
                            .planen(self.regeln.persistence_retry(), TimerArt::StufeStarten);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Startet den Controller des aktuellen Status
    async fn stufe_starten(&mut self) -> GameResult<Fortschritt> {
        if self.stufe.is_some() {
            return Ok(Fortschritt::Laeuft);
        }
        match self.status {
            SessionStatus::Quiz => self.quiz_starten().await,
            SessionStatus::Movement => Ok(self.bewegung_starten()),
            SessionStatus::Shape => self.formen_starten().await,
            SessionStatus::Settlement => {
                self.abrechnen().await?;
                Ok(Fortschritt::Abgeschlossen)
            }
            SessionStatus::Waiting | SessionStatus::Lobby | SessionStatus::Finished => {
                Ok(Fortschritt::Laeuft)
            }
        }
    }

    /// FINISHED: Endstand wurde mit der Abrechnung geschrieben
    fn beenden(&mut self) {
        self.timers.neue_epoche();
        self.status = SessionStatus::Finished;
        self.stage_index += 1;
        self.stage_started_at = Some(Utc::now());
        self.stufe = None;
        self.metriken.stufenwechsel(SessionStatus::Finished.als_str());
        info!(session_id = %self.session_id, "Session beendet");
        self.stufenwechsel_senden(SessionStatus::Finished);
        self.timers
            .planen(self.regeln.finished_retention(), TimerArt::Aufraeumen);
    }

    fn stufenwechsel_senden(&self, stufe: SessionStatus) {
        let (dauer, anleitung) = match stufe {
            SessionStatus::Waiting => (None, "Warte auf Teilnehmer"),
            SessionStatus::Lobby => (None, "Sende ready_check sobald du bereit bist"),
            SessionStatus::Quiz => (
                None,
                "Beantworte die Fragen schnell und richtig, die schwaechsten 30 Prozent scheiden aus",
            ),
            SessionStatus::Movement => (
                Some(self.regeln.movement_total_secs),
                "Bewege dich nur bei GO, wer sich bei STOP bewegt scheidet aus",
            ),
            SessionStatus::Shape => (None, "Zeichne die zugewiesene Form nach"),
            SessionStatus::Settlement => (None, "Das Preisgeld wird verteilt"),
            SessionStatus::Finished => (None, "Spiel beendet"),
        };
        self.hub.senden(
            self.session_id,
            ServerMessage::StageTransition(StageTransition {
                stage: stufe,
                duration: dauer,
                instructions: anleitung.to_string(),
            }),
        );
    }

    // -----------------------------------------------------------------------
    // Hilfen
    // -----------------------------------------------------------------------

    fn nummer_von(&self, user_id: UserId) -> Option<u32> {
        self.teilnehmer
            .values()
            .find(|t| t.user_id == user_id)
            .map(|t| t.nummer)
    }

    pub(crate) fn lebende(&self) -> usize {
        self.teilnehmer.values().filter(|t| t.lebt).count()
    }

    pub(crate) fn lebende_nummern(&self) -> Vec<u32> {
        self.teilnehmer
            .values()
            .filter(|t| t.lebt)
            .map(|t| t.nummer)
            .collect()
    }

    pub(crate) fn lebt(&self, nummer: u32) -> bool {
        self.teilnehmer.get(&nummer).is_some_and(|t| t.lebt)
    }

    /// Spielstand, optional aus Sicht eines Teilnehmers
    fn zustand(&self, fuer: Option<u32>) -> GameState {
        GameState {
            session_id: self.session_id,
            status: self.status,
            stage_index: self.stage_index,
            stage_started_at: self.stage_started_at,
            entry_fee: self.entry_fee,
            prize_pool: self.prize_pool,
            max_participants: self.max_participants,
            you: fuer,
            participants: self.teilnehmer.values().map(Teilnehmer::ansicht).collect(),
            phase: match &self.stufe {
                Some(StageController::Movement(b)) => Some(b.phase),
                _ => None,
            },
            connections: self.hub.verbindungen(self.session_id),
        }
    }
}
