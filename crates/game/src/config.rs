//! Spielregeln einer Session
//!
//! Alle Zeiten werden als Sekunden (f64) konfiguriert, damit sie direkt in
//! der TOML-Datei unter `[spiel]` stehen koennen. Die Actors lesen sie ueber
//! die `Duration`-Accessoren.

use std::time::Duration;

use lastceo_core::LastCeoError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Mindestanzahl eingeschriebener Teilnehmer fuer den Start
    pub min_participants: u32,

    // --- Quiz ---
    pub question_count: usize,
    pub question_time_limit_secs: f64,
    pub reveal_pause_secs: f64,
    pub quiz_elimination_percent: u32,

    // --- Bewegung ---
    pub movement_total_secs: f64,
    pub go_min_secs: f64,
    pub go_max_secs: f64,
    pub stop_min_secs: f64,
    pub stop_max_secs: f64,
    pub track_length: f64,
    pub finish_threshold: f64,

    // --- Formen ---
    pub shape_stage_enabled: bool,
    pub shape_tolerance: f64,
    pub shape_time_limit_secs: f64,
    pub shape_resample_points: usize,
    pub max_drawing_points: usize,

    // --- Lebenszyklus ---
    pub finished_retention_secs: f64,
    pub persistence_retry_secs: f64,
    /// Fester Seed fuer reproduzierbare Spiele, `None` = OS-Entropie
    pub rng_seed: Option<u64>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            min_participants: 1,
            question_count: 6,
            question_time_limit_secs: 30.0,
            reveal_pause_secs: 3.0,
            quiz_elimination_percent: 30,
            movement_total_secs: 180.0,
            go_min_secs: 3.0,
            go_max_secs: 8.0,
            stop_min_secs: 2.0,
            stop_max_secs: 5.0,
            track_length: 100.0,
            finish_threshold: 90.0,
            shape_stage_enabled: false,
            shape_tolerance: 0.1,
            shape_time_limit_secs: 120.0,
            shape_resample_points: 64,
            max_drawing_points: 4096,
            finished_retention_secs: 60.0,
            persistence_retry_secs: 2.0,
            rng_seed: None,
        }
    }
}

fn dauer(secs: f64) -> Duration {
    Duration::from_secs_f64(secs.max(0.0))
}

impl GameRules {
    pub fn question_time_limit(&self) -> Duration {
        dauer(self.question_time_limit_secs)
    }

    pub fn reveal_pause(&self) -> Duration {
        dauer(self.reveal_pause_secs)
    }

    pub fn finished_retention(&self) -> Duration {
        dauer(self.finished_retention_secs)
    }

    pub fn persistence_retry(&self) -> Duration {
        dauer(self.persistence_retry_secs)
    }

    /// Prueft die Regeln auf Widersprueche
    pub fn pruefen(&self) -> Result<(), LastCeoError> {
        let fehler = |msg: &str| Err(LastCeoError::Konfiguration(msg.to_string()));

        let zeiten = [
            self.question_time_limit_secs,
            self.reveal_pause_secs,
            self.movement_total_secs,
            self.go_min_secs,
            self.go_max_secs,
            self.stop_min_secs,
            self.stop_max_secs,
            self.shape_time_limit_secs,
            self.finished_retention_secs,
            self.persistence_retry_secs,
        ];
        if zeiten.iter().any(|z| !z.is_finite() || *z < 0.0) {
            return fehler("Zeitangaben muessen endlich und nicht negativ sein");
        }
        if self.quiz_elimination_percent > 100 {
            return fehler("quiz_elimination_percent darf 100 nicht ueberschreiten");
        }
        if self.go_min_secs > self.go_max_secs || self.stop_min_secs > self.stop_max_secs {
            return fehler("Verweildauer: Minimum groesser als Maximum");
        }
        if self.go_max_secs <= 0.0 || self.stop_max_secs <= 0.0 {
            return fehler("Verweildauer muss groesser als 0 sein");
        }
        if !(self.track_length > 0.0) || self.finish_threshold > self.track_length {
            return fehler("finish_threshold muss auf der Strecke liegen");
        }
        if self.shape_resample_points < 2 || self.max_drawing_points < 2 {
            return fehler("Formvergleich braucht mindestens 2 Punkte");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardregeln_sind_gueltig() {
        let regeln = GameRules::default();
        assert!(regeln.pruefen().is_ok());
        assert_eq!(regeln.question_count, 6);
        assert_eq!(regeln.question_time_limit(), Duration::from_secs(30));
        assert!(!regeln.shape_stage_enabled);
    }

    #[test]
    fn widersprueche_werden_erkannt() {
        let regeln = GameRules {
            go_min_secs: 9.0,
            ..GameRules::default()
        };
        assert!(regeln.pruefen().is_err());

        let regeln = GameRules {
            finish_threshold: 120.0,
            ..GameRules::default()
        };
        assert!(regeln.pruefen().is_err());

        let regeln = GameRules {
            reveal_pause_secs: f64::NAN,
            ..GameRules::default()
        };
        assert!(regeln.pruefen().is_err());
    }

    #[test]
    fn teilweise_toml_nutzt_standardwerte() {
        let regeln: GameRules = toml::from_str(
            r#"
            question_count = 3
            shape_stage_enabled = true
            rng_seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(regeln.question_count, 3);
        assert!(regeln.shape_stage_enabled);
        assert_eq!(regeln.rng_seed, Some(7));
        assert_eq!(regeln.finish_threshold, 90.0);
    }
}
