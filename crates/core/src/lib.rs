//! lastceo-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen LastCEO-Crates gemeinsam genutzt werden: ID-Newtypes, den
//! Session-Status, Stufen-Kennungen und den zentralen Fehler-Enum.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{LastCeoError, Result};
pub use types::{
    AnswerOption, ParticipantId, PhaseState, Point, SessionId, SessionStatus, StageId, UserId,
};
