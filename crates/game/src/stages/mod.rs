//! Stufen-Controller
//!
//! Jede Spielstufe haelt ihren eigenen Zustand im Session-Actor. Die
//! Ereignis- und Timer-Handler sind als `impl SessionActor` in den
//! Untermodulen implementiert, damit sie Teilnehmer, Hub und Repository
//! direkt nutzen koennen.

pub(crate) mod movement;
pub(crate) mod quiz;
pub(crate) mod shape;

use movement::BewegungsStufe;
use quiz::QuizStufe;
use shape::FormStufe;

pub(crate) enum StageController {
    Quiz(QuizStufe),
    Movement(BewegungsStufe),
    Shape(FormStufe),
}

/// Ergebnis eines Stufenstarts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fortschritt {
    /// Stufe laeuft, Abschluss kommt ueber Ereignis oder Timer
    Laeuft,
    /// Stufe ist sofort abgeschlossen
    Abgeschlossen,
}
