//! Gemeinsame Identifikations- und Zustandstypen fuer LastCEO
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Session-, Benutzer- und Teilnehmer-IDs zur Compilezeit auszuschliessen.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LastCeoError;

// ---------------------------------------------------------------------------
// ID-Newtypes
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $praefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Erstellt eine neue zufaellige ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Gibt die innere UUID zurueck
            pub fn inner(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Eindeutige Session-ID (ein Spiel)
    SessionId,
    "session"
);
uuid_id!(
    /// Eindeutige Benutzer-ID (Konto, vom Identity-Provider aufgeloest)
    UserId,
    "user"
);
uuid_id!(
    /// Eindeutige Teilnehmer-ID (ein Benutzer in genau einer Session)
    ParticipantId,
    "participant"
);

// ---------------------------------------------------------------------------
// Session-Status
// ---------------------------------------------------------------------------

/// Zustand einer Session
///
/// Die Reihenfolge der Varianten entspricht dem Spielablauf. Uebergaenge
/// laufen ausschliesslich vorwaerts, deshalb ist `Ord` abgeleitet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Lobby,
    Quiz,
    Movement,
    Shape,
    Settlement,
    Finished,
}

impl SessionStatus {
    /// Persistierte Darstellung
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Lobby => "lobby",
            Self::Quiz => "quiz",
            Self::Movement => "movement",
            Self::Shape => "shape",
            Self::Settlement => "settlement",
            Self::Finished => "finished",
        }
    }

    /// Solange dieser Zustand gilt, duerfen neue Teilnehmer beitreten
    pub fn ist_beitretbar(&self) -> bool {
        matches!(self, Self::Waiting | Self::Lobby)
    }

    /// Endzustand erreicht
    pub fn ist_beendet(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Die Stufe, die in diesem Zustand gespielt wird
    pub fn stufe(&self) -> Option<StageId> {
        match self {
            Self::Quiz => Some(StageId::Quiz),
            Self::Movement => Some(StageId::Movement),
            Self::Shape => Some(StageId::Shape),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.als_str())
    }
}

impl FromStr for SessionStatus {
    type Err = LastCeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "lobby" => Ok(Self::Lobby),
            "quiz" => Ok(Self::Quiz),
            "movement" => Ok(Self::Movement),
            "shape" => Ok(Self::Shape),
            "settlement" => Ok(Self::Settlement),
            "finished" => Ok(Self::Finished),
            anderes => Err(LastCeoError::ungueltiger_wert("SessionStatus", anderes)),
        }
    }
}

// ---------------------------------------------------------------------------
// Stufen
// ---------------------------------------------------------------------------

/// Kennung einer Wettkampfstufe, wird als `elimination_stage` gespeichert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum StageId {
    Quiz = 1,
    Movement = 2,
    Shape = 3,
}

impl StageId {
    pub fn als_zahl(&self) -> i64 {
        *self as i64
    }

    /// Name fuer Logs und Metrik-Labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Movement => "movement",
            Self::Shape => "shape",
        }
    }
}

impl From<StageId> for i64 {
    fn from(stufe: StageId) -> Self {
        stufe.als_zahl()
    }
}

impl TryFrom<i64> for StageId {
    type Error = LastCeoError;

    fn try_from(wert: i64) -> Result<Self, Self::Error> {
        match wert {
            1 => Ok(Self::Quiz),
            2 => Ok(Self::Movement),
            3 => Ok(Self::Shape),
            anderes => Err(LastCeoError::ungueltiger_wert(
                "StageId",
                anderes.to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Antwortoptionen & Bewegungsphase
// ---------------------------------------------------------------------------

/// Antwortoption einer Quizfrage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub const ALLE: [AnswerOption; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn als_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl FromStr for AnswerOption {
    type Err = LastCeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            anderes => Err(LastCeoError::ungueltiger_wert("AnswerOption", anderes)),
        }
    }
}

/// Gemeinsame Phase der Bewegungsstufe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
    Go,
    Stop,
}

impl PhaseState {
    pub fn umschalten(self) -> Self {
        match self {
            Self::Go => Self::Stop,
            Self::Stop => Self::Go,
        }
    }
}

// ---------------------------------------------------------------------------
// Geometrie
// ---------------------------------------------------------------------------

/// Punkt in Spielfeld-Koordinaten (Bewegungsstrecke und Zeichenflaeche)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn abstand(&self, anderer: &Point) -> f64 {
        (self.x - anderer.x).hypot(self.y - anderer.y)
    }

    pub fn ist_endlich(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_eindeutig() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn participant_id_display() {
        let id = ParticipantId(Uuid::nil());
        assert!(id.to_string().starts_with("participant:"));
    }

    #[test]
    fn ids_sind_serde_transparent() {
        let uid = UserId::new();
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, format!("\"{}\"", uid.inner()));
        let uid2: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(uid, uid2);
    }

    #[test]
    fn status_reihenfolge_ist_spielablauf() {
        assert!(SessionStatus::Waiting < SessionStatus::Lobby);
        assert!(SessionStatus::Quiz < SessionStatus::Movement);
        assert!(SessionStatus::Shape < SessionStatus::Settlement);
        assert!(SessionStatus::Settlement < SessionStatus::Finished);
    }

    #[test]
    fn status_string_konvertierung() {
        for status in [
            SessionStatus::Waiting,
            SessionStatus::Lobby,
            SessionStatus::Quiz,
            SessionStatus::Movement,
            SessionStatus::Shape,
            SessionStatus::Settlement,
            SessionStatus::Finished,
        ] {
            assert_eq!(status.als_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("pause".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn nur_waiting_und_lobby_beitretbar() {
        assert!(SessionStatus::Waiting.ist_beitretbar());
        assert!(SessionStatus::Lobby.ist_beitretbar());
        assert!(!SessionStatus::Quiz.ist_beitretbar());
        assert!(!SessionStatus::Finished.ist_beitretbar());
    }

    #[test]
    fn stufen_nummern() {
        assert_eq!(StageId::Quiz.als_zahl(), 1);
        assert_eq!(StageId::Movement.als_zahl(), 2);
        assert_eq!(StageId::Shape.als_zahl(), 3);
        assert_eq!(StageId::try_from(2).unwrap(), StageId::Movement);
        assert!(StageId::try_from(4).is_err());
        assert_eq!(serde_json::to_string(&StageId::Shape).unwrap(), "3");
    }

    #[test]
    fn antwortoptionen_parsen() {
        assert_eq!("C".parse::<AnswerOption>().unwrap(), AnswerOption::C);
        assert!("E".parse::<AnswerOption>().is_err());
        assert_eq!(serde_json::to_string(&AnswerOption::B).unwrap(), "\"B\"");
    }

    #[test]
    fn phase_umschalten() {
        assert_eq!(PhaseState::Go.umschalten(), PhaseState::Stop);
        assert_eq!(serde_json::to_string(&PhaseState::Stop).unwrap(), "\"stop\"");
    }
}
