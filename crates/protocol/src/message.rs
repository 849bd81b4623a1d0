//! Spielnachrichten (Client <-> Server)
//!
//! Jede Nachricht ist ein Umschlag `{ "type": ..., "payload": {...} }`.
//! Der Typ-Tag bestimmt die Payload-Struktur, beide Richtungen sind
//! als getaggte Enums modelliert.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lastceo_core::types::{AnswerOption, PhaseState, Point, SessionId, SessionStatus, StageId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Fehler-Codes fuer `error`-Nachrichten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidMessage,
    NotFound,
    SessionFull,
    InsufficientBalance,
    AlreadyStarted,
    NotEnrolled,
    Unauthenticated,
    PersistenceUnavailable,
    Internal,
}

impl ErrorCode {
    /// Wire-Name, auch als Metrik-Label
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::InvalidMessage => "invalid_message",
            Self::NotFound => "not_found",
            Self::SessionFull => "session_full",
            Self::InsufficientBalance => "insufficient_balance",
            Self::AlreadyStarted => "already_started",
            Self::NotEnrolled => "not_enrolled",
            Self::Unauthenticated => "unauthenticated",
            Self::PersistenceUnavailable => "persistence_unavailable",
            Self::Internal => "internal",
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Erste Nachricht jeder Verbindung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub session_id: SessionId,
    /// Zugangstoken, wird vom Identity-Provider aufgeloest
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswerRequest {
    pub question_id: i64,
    pub answer: AnswerOption,
    /// Antwortzeit in Sekunden
    pub time_taken: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDrawingRequest {
    pub shape_id: i64,
    pub drawing_data: Vec<Point>,
    pub time_taken: f64,
}

/// Abfrage beitretbarer Sessions vor dem `connect` (leere Payload `{}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListSessions {}

/// Bereitschaftsmeldung in der Lobby (leere Payload `{}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadyCheck {}

/// Alle Nachrichten die ein Client senden kann
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    Connect(ConnectRequest),
    ListSessions(ListSessions),
    ChatMessage(ChatRequest),
    QuizAnswer(QuizAnswerRequest),
    PlayerMovement(MovementRequest),
    ShapeDrawing(ShapeDrawingRequest),
    ReadyCheck(ReadyCheck),
}

impl ClientMessage {
    /// Typ-Tag fuer Logs
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::ListSessions(_) => "list_sessions",
            Self::ChatMessage(_) => "chat_message",
            Self::QuizAnswer(_) => "quiz_answer",
            Self::PlayerMovement(_) => "player_movement",
            Self::ShapeDrawing(_) => "shape_drawing",
            Self::ReadyCheck(_) => "ready_check",
        }
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Sicht auf einen Teilnehmer im Spielstand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub participant_number: u32,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub is_alive: bool,
    pub elimination_stage: Option<StageId>,
    pub position: Point,
}

/// Vollstaendiger Spielstand, wird beim Verbinden gesendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub stage_index: u32,
    pub stage_started_at: Option<DateTime<Utc>>,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub max_participants: u32,
    /// Teilnehmernummer des Empfaengers
    pub you: Option<u32>,
    pub participants: Vec<ParticipantView>,
    /// Aktuelle Phase, nur in der Bewegungsstufe gesetzt
    pub phase: Option<PhaseState>,
    pub connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatBroadcast {
    pub participant_number: u32,
    pub nickname: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: SessionStatus,
    /// Geplante Dauer in Sekunden, sofern die Stufe eine feste Dauer hat
    pub duration: Option<f64>,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub question_number: u32,
    pub total_questions: u32,
    pub question: String,
    pub options: BTreeMap<AnswerOption, String>,
    /// Sekunden
    pub time_limit: f64,
}

/// Bestaetigung einer angenommenen Antwort (ohne Korrektheit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswerReceived {
    pub participant_number: u32,
    pub question_id: i64,
    pub answered: u32,
    pub alive: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerQuizResult {
    pub participant_number: u32,
    pub nickname: String,
    pub answer: AnswerOption,
    pub is_correct: bool,
    pub time_taken: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResults {
    pub question_id: i64,
    pub correct_answer: AnswerOption,
    pub answer_stats: BTreeMap<AnswerOption, u32>,
    pub player_results: Vec<PlayerQuizResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSignal {
    pub state: PhaseState,
    /// Verweildauer der Phase in Sekunden
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeAssignment {
    pub shape_id: i64,
    pub shape_type: String,
    pub geometry: Vec<Point>,
    pub tolerance: f64,
    /// Sekunden
    pub time_limit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub participant_number: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEliminated {
    pub participant_number: u32,
    pub nickname: String,
    pub stage: StageId,
    pub eliminated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub participant_number: u32,
    pub nickname: String,
    pub prize: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameFinished {
    pub winners: Vec<Winner>,
    pub total_prize_pool: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyStatus {
    pub ready: u32,
    pub total: u32,
}

/// Kurzinfo einer beitretbaren Session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub participants: u32,
    pub max_participants: u32,
    pub entry_fee: i64,
    pub prize_pool: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

/// Alle Nachrichten die der Server senden kann
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    GameState(GameState),
    ChatMessage(ChatBroadcast),
    StageTransition(StageTransition),
    QuizQuestion(QuizQuestion),
    QuizAnswerReceived(QuizAnswerReceived),
    QuizResults(QuizResults),
    PhaseSignal(PhaseSignal),
    ShapeAssignment(ShapeAssignment),
    PlayerMovement(PlayerMoved),
    PlayerEliminated(PlayerEliminated),
    GameFinished(GameFinished),
    ReadyStatus(ReadyStatus),
    SessionList(SessionList),
    Error(ErrorResponse),
}

impl ServerMessage {
    /// Erstellt eine Fehler-Nachricht
    pub fn fehler(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse {
            code,
            message: message.into(),
        })
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quiz_antwort_aus_umschlag() {
        let json = r#"{"type":"quiz_answer","payload":{"question_id":7,"answer":"B","time_taken":4.5}}"#;
        let msg = ClientMessage::from_json(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::QuizAnswer(QuizAnswerRequest {
                question_id: 7,
                answer: AnswerOption::B,
                time_taken: 4.5,
            })
        );
        assert_eq!(msg.typ(), "quiz_answer");
    }

    #[test]
    fn ready_check_mit_leerer_payload() {
        let msg = ClientMessage::from_json(r#"{"type":"ready_check","payload":{}}"#).unwrap();
        assert_eq!(msg, ClientMessage::ReadyCheck(ReadyCheck {}));
    }

    #[test]
    fn unbekannter_typ_wird_abgelehnt() {
        assert!(ClientMessage::from_json(r#"{"type":"teleport","payload":{}}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"quiz_answer","payload":{"answer":"E"}}"#).is_err());
    }

    #[test]
    fn zeichnung_mit_punkten() {
        let json = json!({
            "type": "shape_drawing",
            "payload": {
                "shape_id": 3,
                "drawing_data": [{"x": 1.0, "y": 2.0}, {"x": 3.0, "y": 4.0}],
                "time_taken": 12.0
            }
        });
        let msg: ClientMessage = serde_json::from_value(json).unwrap();
        match msg {
            ClientMessage::ShapeDrawing(z) => {
                assert_eq!(z.shape_id, 3);
                assert_eq!(z.drawing_data[1], Point::new(3.0, 4.0));
            }
            andere => panic!("Erwartet shape_drawing, erhalten {:?}", andere),
        }
    }

    #[test]
    fn server_umschlag_format() {
        let msg = ServerMessage::PhaseSignal(PhaseSignal {
            state: PhaseState::Stop,
            duration: 4.0,
        });
        let wert: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(wert["type"], "phase_signal");
        assert_eq!(wert["payload"]["state"], "stop");
        assert_eq!(wert["payload"]["duration"], 4.0);
    }

    #[test]
    fn quizfrage_optionen_als_objekt() {
        let mut options = BTreeMap::new();
        options.insert(AnswerOption::A, "Rot".to_string());
        options.insert(AnswerOption::B, "Blau".to_string());
        let msg = ServerMessage::QuizQuestion(QuizQuestion {
            id: 1,
            question_number: 1,
            total_questions: 6,
            question: "Welche Farbe?".into(),
            options,
            time_limit: 30.0,
        });
        let wert: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(wert["payload"]["options"]["A"], "Rot");
        assert_eq!(wert["payload"]["options"]["B"], "Blau");
    }

    #[test]
    fn eliminierung_mit_stufennummer() {
        let msg = ServerMessage::PlayerEliminated(PlayerEliminated {
            participant_number: 4,
            nickname: "ceo4".into(),
            stage: StageId::Movement,
            eliminated_at: Utc::now(),
        });
        let wert = serde_json::to_value(&msg).unwrap();
        assert_eq!(wert["type"], "player_eliminated");
        assert_eq!(wert["payload"]["stage"], 2);
        let zurueck: ServerMessage = serde_json::from_value(wert).unwrap();
        assert_eq!(zurueck, msg);
    }

    #[test]
    fn fehler_nachricht_code() {
        let msg = ServerMessage::fehler(ErrorCode::SessionFull, "Session ist voll");
        let wert = serde_json::to_value(&msg).unwrap();
        assert_eq!(wert["type"], "error");
        assert_eq!(wert["payload"]["code"], "session_full");
        assert_eq!(ErrorCode::SessionFull.als_str(), "session_full");
        assert_eq!(
            serde_json::to_value(ErrorCode::PersistenceUnavailable).unwrap(),
            ErrorCode::PersistenceUnavailable.als_str()
        );
    }

    #[test]
    fn sessionliste_vor_dem_connect() {
        let msg = ClientMessage::from_json(r#"{"type":"list_sessions","payload":{}}"#).unwrap();
        assert_eq!(msg.typ(), "list_sessions");

        let antwort = ServerMessage::SessionList(SessionList {
            sessions: vec![SessionSummary {
                session_id: SessionId::new(),
                status: SessionStatus::Lobby,
                participants: 3,
                max_participants: 80,
                entry_fee: 10_000,
                prize_pool: 30_000,
            }],
        });
        let wert = serde_json::to_value(&antwort).unwrap();
        assert_eq!(wert["type"], "session_list");
        assert_eq!(wert["payload"]["sessions"][0]["status"], "lobby");
    }
}
