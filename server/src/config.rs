//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::SocketAddr;
use std::time::Duration;

use lastceo_db::DatabaseConfig;
use lastceo_game::GameRules;
use lastceo_observability::logging::{log_format_gueltig, log_level_gueltig};
use lastceo_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Datenbank-Einstellungen
    pub datenbank: DatenbankEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
    /// Spielregeln und Session-Vorrat
    pub spiel: SpielEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger TCP-Verbindungen
    pub max_verbindungen: usize,
    /// Sekunden ohne empfangenen Frame bis zur Trennung
    pub verbindungs_timeout_secs: u64,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "LastCEO".into(),
            max_verbindungen: 4096,
            verbindungs_timeout_secs: 90,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer Spiel- und Observability-Server
    pub bind_adresse: String,
    /// Port fuer Spielverbindungen
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 7400,
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    /// WAL-Journal aktivieren
    pub wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://lastceo.db".into(),
            max_verbindungen: 5,
            wal: true,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

/// Session-Vorrat und Spielregeln
///
/// Die Felder von `GameRules` stehen direkt unter `[spiel]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpielEinstellungen {
    /// Plaetze pro neu erstellter Session
    pub max_participants: u32,
    /// Startgebuehr pro neu erstellter Session
    pub entry_fee: i64,
    /// Anzahl Sessions die immer beitretbar gehalten werden
    pub open_sessions: usize,
    /// Sekunden zwischen zwei Pruefungen des Session-Vorrats
    pub auffuellen_secs: u64,
    #[serde(flatten)]
    pub regeln: GameRules,
}

impl Default for SpielEinstellungen {
    fn default() -> Self {
        Self {
            max_participants: 10,
            entry_fee: 100,
            open_sessions: 1,
            auffuellen_secs: 5,
            regeln: GameRules::default(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.pruefen()?;
        Ok(config)
    }

    /// Prueft Werte die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        if self.spiel.max_participants == 0 {
            anyhow::bail!("spiel.max_participants muss groesser als 0 sein");
        }
        if self.spiel.entry_fee < 0 {
            anyhow::bail!("spiel.entry_fee darf nicht negativ sein");
        }
        self.spiel.regeln.pruefen()?;
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer Spielverbindungen zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }

    pub fn tcp_socket_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.tcp_bind_adresse()
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige TCP-Adresse '{}': {e}", self.tcp_bind_adresse()))
    }

    pub fn observability_socket_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = self.observability_bind_adresse();
        adresse
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Observability-Adresse '{adresse}': {e}"))
    }

    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: self.datenbank.wal,
        }
    }

    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_verbindungen: self.server.max_verbindungen,
            verbindungs_timeout: Duration::from_secs(self.server.verbindungs_timeout_secs),
            ..SignalingConfig::default()
        }
    }
}
