//! Fehlertypen fuer LastCEO
//!
//! Zentraler Fehler-Enum fuer Zustaende, die mehrere Crates betreffen.
//! Die Fach-Crates definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer LastCEO
pub type Result<T> = std::result::Result<T, LastCeoError>;

/// Crate-uebergreifende Fehler im LastCEO-System
#[derive(Debug, Error)]
pub enum LastCeoError {
    // --- Werte ---
    #[error("Ungueltiger Wert fuer {typ}: '{wert}'")]
    UngueltigerWert { typ: &'static str, wert: String },

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl LastCeoError {
    /// Erstellt einen Fehler fuer einen nicht parsebaren Wert
    pub fn ungueltiger_wert(typ: &'static str, wert: impl Into<String>) -> Self {
        Self::UngueltigerWert {
            typ,
            wert: wert.into(),
        }
    }
}
