//! Fehlertypen fuer das Datenbank-Crate

use thiserror::Error;

use lastceo_core::SessionStatus;

/// Datenbank-Fehlertypen
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Datensatz nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Eindeutigkeitsverletzung: {0}")]
    Eindeutigkeit(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Session nimmt keine Teilnehmer mehr auf (Status: {0})")]
    NichtBeitretbar(SessionStatus),

    #[error("Session voll: maximal {0} Teilnehmer")]
    SessionVoll(u32),

    #[error("Guthaben unzureichend: benoetigt={benoetigt}, vorhanden={vorhanden}")]
    GuthabenUnzureichend { benoetigt: i64, vorhanden: i64 },

    #[error("SQLx-Fehler: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration-Fehler: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Interner DB-Fehler: {0}")]
    Intern(String),
}

impl DbError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn es sich um einen Eindeutigkeitsfehler handelt
    pub fn ist_eindeutigkeit(&self) -> bool {
        matches!(self, Self::Eindeutigkeit(_))
            || matches!(self, Self::Sqlx(e) if ist_unique_verletzung(e))
    }

    /// Fachliche Ablehnung (kein Infrastrukturfehler)
    pub fn ist_ablehnung(&self) -> bool {
        matches!(
            self,
            Self::NichtBeitretbar(_) | Self::SessionVoll(_) | Self::GuthabenUnzureichend { .. }
        )
    }
}

pub(crate) fn ist_unique_verletzung(e: &sqlx::Error) -> bool {
    let msg = e.to_string();
    msg.contains("UNIQUE") || msg.contains("unique")
}
