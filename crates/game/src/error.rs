//! Fehlertypen fuer das Spiel-Crate

use lastceo_core::types::SessionId;
use lastceo_db::DbError;
use lastceo_protocol::ErrorCode;
use thiserror::Error;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Persistenz nicht verfuegbar: {0}")]
    Persistenz(#[source] DbError),

    #[error("Session ist voll")]
    SessionVoll,

    #[error("Guthaben unzureichend: benoetigt={benoetigt}, vorhanden={vorhanden}")]
    GuthabenUnzureichend { benoetigt: i64, vorhanden: i64 },

    #[error("Session hat bereits begonnen")]
    BereitsGestartet,

    #[error("Nicht in dieser Session eingeschrieben")]
    NichtEingeschrieben,

    #[error("Session ist beendet")]
    SessionBeendet,

    #[error("Session nicht gefunden: {0}")]
    SessionNichtGefunden(SessionId),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl GameError {
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Fehler die beim erneuten Versuch verschwinden koennen
    pub fn ist_persistenz(&self) -> bool {
        matches!(self, Self::Persistenz(_))
    }

    /// Fehler-Code fuer die `error`-Nachricht an den Client
    pub fn fehler_code(&self) -> ErrorCode {
        match self {
            Self::Persistenz(_) => ErrorCode::PersistenceUnavailable,
            Self::SessionVoll => ErrorCode::SessionFull,
            Self::GuthabenUnzureichend { .. } => ErrorCode::InsufficientBalance,
            Self::BereitsGestartet | Self::SessionBeendet => ErrorCode::AlreadyStarted,
            Self::NichtEingeschrieben => ErrorCode::NotEnrolled,
            Self::SessionNichtGefunden(_) => ErrorCode::NotFound,
            Self::UngueltigeEingabe(_) => ErrorCode::InvalidMessage,
            Self::Intern(_) => ErrorCode::Internal,
        }
    }
}

impl From<DbError> for GameError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::SessionVoll(_) => Self::SessionVoll,
            DbError::GuthabenUnzureichend {
                benoetigt,
                vorhanden,
            } => Self::GuthabenUnzureichend {
                benoetigt,
                vorhanden,
            },
            DbError::NichtBeitretbar(status) if status.ist_beendet() => Self::SessionBeendet,
            DbError::NichtBeitretbar(_) => Self::BereitsGestartet,
            andere => Self::Persistenz(andere),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lastceo_core::SessionStatus;

    #[test]
    fn ablehnungen_werden_uebersetzt() {
        assert!(matches!(
            GameError::from(DbError::SessionVoll(80)),
            GameError::SessionVoll
        ));
        assert!(matches!(
            GameError::from(DbError::NichtBeitretbar(SessionStatus::Movement)),
            GameError::BereitsGestartet
        ));
        assert!(matches!(
            GameError::from(DbError::NichtBeitretbar(SessionStatus::Finished)),
            GameError::SessionBeendet
        ));
    }

    #[test]
    fn sonstige_db_fehler_sind_persistenzfehler() {
        let e = GameError::from(DbError::intern("Pool geschlossen"));
        assert!(e.ist_persistenz());
        assert_eq!(e.fehler_code(), ErrorCode::PersistenceUnavailable);
    }

    #[test]
    fn fehler_codes() {
        assert_eq!(
            GameError::GuthabenUnzureichend {
                benoetigt: 10,
                vorhanden: 1
            }
            .fehler_code(),
            ErrorCode::InsufficientBalance
        );
        assert_eq!(
            GameError::NichtEingeschrieben.fehler_code(),
            ErrorCode::NotEnrolled
        );
    }
}
