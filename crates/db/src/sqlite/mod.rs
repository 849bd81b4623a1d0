//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod accounts;
pub mod chat;
pub mod movements;
pub mod participants;
pub mod pool;
pub mod quiz;
pub mod sessions;
pub mod settlement;
pub mod shapes;

pub use pool::SqliteDb;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::DbResult;

// ---------------------------------------------------------------------------
// Spalten-Helfer
// ---------------------------------------------------------------------------

pub(crate) fn uuid_spalte(row: &SqliteRow, spalte: &str) -> DbResult<Uuid> {
    let s: String = row.try_get(spalte)?;
    Uuid::parse_str(&s).map_err(|e| DbError::intern(format!("Ungueltige UUID in {spalte} '{s}': {e}")))
}

pub(crate) fn zeitstempel_parsen(spalte: &str, s: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::intern(format!("Ungueltiger Zeitstempel in {spalte} '{s}': {e}")))
}

pub(crate) fn zeitstempel_spalte(row: &SqliteRow, spalte: &str) -> DbResult<DateTime<Utc>> {
    let s: String = row.try_get(spalte)?;
    zeitstempel_parsen(spalte, &s)
}

pub(crate) fn opt_zeitstempel_spalte(
    row: &SqliteRow,
    spalte: &str,
) -> DbResult<Option<DateTime<Utc>>> {
    let s: Option<String> = row.try_get(spalte)?;
    s.as_deref().map(|s| zeitstempel_parsen(spalte, s)).transpose()
}

/// Prueft ob eine Zahl aus der Datenbank in den Zieltyp passt
pub(crate) fn zahl<T: TryFrom<i64>>(spalte: &str, wert: i64) -> DbResult<T> {
    T::try_from(wert)
        .map_err(|_| DbError::UngueltigeDaten(format!("{spalte} ausserhalb des Wertebereichs: {wert}")))
}
