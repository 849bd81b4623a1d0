//! lastceo-game – Spiellogik von LastCEO
//!
//! Jede Session ist ein eigener Actor (`session`), der seine Stufen
//! (`stages`) nacheinander durchlaeuft. Der `ConnectionHub` verteilt die
//! Servernachrichten an die Verbindungen, der `SessionManager` haelt die
//! Registry aller laufenden Sessions.

pub mod config;
pub mod elimination;
pub mod error;
pub mod geometry;
pub mod hub;
pub mod manager;
pub mod session;
pub mod settlement;

mod stages;
mod timer;

pub use config::GameRules;
pub use error::{GameError, GameResult};
pub use hub::{ConnectionHub, VerbindungsId};
pub use manager::SessionManager;
pub use session::{SessionHandle, Spielereignis, Verbindung};
