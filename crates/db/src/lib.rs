//! lastceo-db – Persistenzschicht
//!
//! Repository-Traits fuer alle Spieldaten und ihre SQLite-Implementierung.
//! Die Session-Actors mutieren Session- und Teilnehmerfelder ausschliesslich
//! ueber diese Schnittstellen, Stufen-Protokolle werden nur angehaengt.

pub mod error;
pub mod models;
pub mod repository;
pub mod seed;
pub mod sqlite;

pub use error::DbError;
pub use repository::{
    AccountRepository, ChatRepository, DatabaseConfig, DbResult, GameRepository,
    MovementRepository, ParticipantRepository, QuizRepository, SessionRepository,
    SettlementRepository, ShapeRepository,
};
pub use sqlite::SqliteDb;
