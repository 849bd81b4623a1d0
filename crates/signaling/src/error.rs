//! Fehlertypen fuer den Signaling-Service

use lastceo_db::DbError;
use lastceo_game::GameError;
use lastceo_protocol::ErrorCode;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket, Frame)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Identitaet konnte nicht geprueft werden
    #[error("Persistenz nicht verfuegbar: {0}")]
    Persistenz(#[from] DbError),

    /// Vom Session-Actor abgelehnt
    #[error(transparent)]
    Spiel(#[from] GameError),

    /// Unbekanntes oder ungueltiges Token
    #[error("Nicht authentifiziert")]
    NichtAuthentifiziert,

    /// Nachricht passt nicht zum Verbindungszustand
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Fehler-Code fuer die `error`-Nachricht an den Client
    pub fn fehler_code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::Internal,
            Self::Persistenz(_) => ErrorCode::PersistenceUnavailable,
            Self::Spiel(e) => e.fehler_code(),
            Self::NichtAuthentifiziert => ErrorCode::Unauthenticated,
            Self::Protokoll(_) => ErrorCode::InvalidMessage,
            Self::ServerVoll => ErrorCode::SessionFull,
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_der_spielfehler_werden_durchgereicht() {
        let e = SignalingError::from(GameError::SessionVoll);
        assert_eq!(e.fehler_code(), ErrorCode::SessionFull);
        assert_eq!(e.to_string(), "Session ist voll");

        let e = SignalingError::from(DbError::intern("weg"));
        assert_eq!(e.fehler_code(), ErrorCode::PersistenceUnavailable);
        assert_eq!(
            SignalingError::protokoll("connect erwartet").fehler_code(),
            ErrorCode::InvalidMessage
        );
    }
}
