//! Datenbankmodelle fuer LastCEO
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank.
//! Sie sind vom In-Memory-Zustand der Session-Actors getrennt und dienen
//! als reine Datenuebertragungsobjekte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lastceo_core::types::{
    AnswerOption, ParticipantId, Point, SessionId, SessionStatus, StageId, UserId,
};

// ---------------------------------------------------------------------------
// Konten
// ---------------------------------------------------------------------------

/// Konto eines Spielers (Guthaben und Lebenszeit-Statistik)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KontoRecord {
    pub id: UserId,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub balance: i64,
    pub total_games_played: i64,
    pub total_games_won: i64,
    pub total_earnings: i64,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Anlegen eines Kontos
#[derive(Debug, Clone)]
pub struct NeuesKonto<'a> {
    pub nickname: &'a str,
    pub avatar_url: Option<&'a str>,
    pub access_token: Option<&'a str>,
    pub balance: i64,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub status: SessionStatus,
    pub max_participants: u32,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub stage_index: u32,
    pub stage_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub struct NeueSession {
    pub max_participants: u32,
    pub entry_fee: i64,
}

/// Persistierter Stufenwechsel
#[derive(Debug, Clone, Copy)]
pub struct StufenWechsel {
    pub status: SessionStatus,
    pub stage_index: u32,
    pub stage_started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Teilnehmer
// ---------------------------------------------------------------------------

/// Teilnehmer inklusive Profildaten des Kontos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeilnehmerRecord {
    pub id: ParticipantId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub participant_number: u32,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub is_alive: bool,
    pub elimination_stage: Option<StageId>,
    pub eliminated_at: Option<DateTime<Utc>>,
    pub position: Point,
    pub final_prize: i64,
    pub joined_at: DateTime<Utc>,
}

/// Ergebnis einer Einschreibung
#[derive(Debug, Clone, PartialEq)]
pub enum Einschreibung {
    /// Neuer Teilnehmer, Startgebuehr wurde abgebucht
    Neu(TeilnehmerRecord),
    /// Benutzer war bereits eingeschrieben, nichts wurde veraendert
    Bestehend(TeilnehmerRecord),
}

impl Einschreibung {
    pub fn teilnehmer(&self) -> &TeilnehmerRecord {
        match self {
            Self::Neu(t) | Self::Bestehend(t) => t,
        }
    }
}

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrageRecord {
    pub id: i64,
    pub question: String,
    /// Optionen in der Reihenfolge A, B, C, D
    pub options: [String; 4],
    pub correct_answer: AnswerOption,
    pub difficulty: i64,
    pub category: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NeueFrage<'a> {
    pub question: &'a str,
    pub options: [&'a str; 4],
    pub correct_answer: AnswerOption,
    pub difficulty: i64,
    pub category: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntwortRecord {
    pub participant_id: ParticipantId,
    pub question_id: i64,
    pub answer: AnswerOption,
    pub is_correct: bool,
    pub time_taken: f64,
    pub answered_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Bewegung
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BewegungRecord {
    pub participant_id: ParticipantId,
    pub from: Point,
    pub to: Point,
    pub during_stop: bool,
    pub eliminated: bool,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Formen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub id: i64,
    pub shape_type: String,
    /// Geschlossener Linienzug im Zeichenrahmen 0..100
    pub geometry: Vec<Point>,
    pub tolerance: f64,
    /// Sekunden
    pub time_limit: f64,
    pub difficulty: i64,
}

#[derive(Debug, Clone)]
pub struct NeueForm<'a> {
    pub shape_type: &'a str,
    pub geometry: &'a [Point],
    pub tolerance: f64,
    pub time_limit: f64,
    pub difficulty: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersuchRecord {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
    pub shape_id: i64,
    pub drawing_data: Vec<Point>,
    pub accuracy_score: f64,
    pub success: bool,
    pub time_taken: f64,
    pub attempted_at: DateTime<Utc>,
}

/// Ergebnis von `record_attempt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersuchGespeichert {
    /// `false` wenn bereits ein Versuch gespeichert war
    pub neu: bool,
    /// Erfolg des gespeicherten Versuchs (bei `neu == false` des frueheren)
    pub erfolgreich: bool,
}

// ---------------------------------------------------------------------------
// Abrechnung & Statistik
// ---------------------------------------------------------------------------

/// Gutschrift fuer einen Gewinner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Auszahlung {
    pub participant_id: ParticipantId,
    pub user_id: UserId,
    pub betrag: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatistikRecord {
    pub session_id: SessionId,
    pub total_participants: u32,
    pub quiz_eliminations: u32,
    pub movement_eliminations: u32,
    pub shape_eliminations: u32,
    pub winners: u32,
    pub total_distributed: i64,
    pub average_survival_secs: f64,
    pub created_at: DateTime<Utc>,
}

/// Alles, was beim Abschluss einer Session atomar geschrieben wird
#[derive(Debug, Clone)]
pub struct Abrechnung {
    pub session_id: SessionId,
    pub auszahlungen: Vec<Auszahlung>,
    pub statistik: StatistikRecord,
    pub finished_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: uuid::Uuid,
    pub session_id: SessionId,
    pub participant_id: Option<ParticipantId>,
    pub message: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}
