//! Abrechnung beim Eintritt in SETTLEMENT
//!
//! Der Preispool wird ganzzahlig auf die Ueberlebenden verteilt, der Rest
//! geht einzeln an die kleinsten Teilnehmernummern. Gutschriften, Endpreise,
//! Statistik und der Endstatus werden in einer Transaktion geschrieben.

use chrono::Utc;
use lastceo_core::types::StageId;
use lastceo_db::models::{Abrechnung, Auszahlung, StatistikRecord};
use lastceo_db::GameRepository;
use lastceo_protocol::message::{GameFinished, Winner};
use lastceo_protocol::ServerMessage;
use tracing::{info, warn};

use crate::error::GameResult;
use crate::session::SessionActor;

/// Teilt `pool` auf die Gewinner auf (aufsteigend nach Nummer erwartet)
///
/// Die Summe der Anteile ist immer genau `pool`, solange es Gewinner gibt.
pub fn preise_aufteilen(pool: i64, gewinner: &[u32]) -> Vec<(u32, i64)> {
    if gewinner.is_empty() || pool <= 0 {
        return gewinner.iter().map(|&n| (n, 0)).collect();
    }
    let n = gewinner.len() as i64;
    let (anteil, rest) = (pool / n, pool % n);
    gewinner
        .iter()
        .enumerate()
        .map(|(i, &nummer)| (nummer, anteil + i64::from((i as i64) < rest)))
        .collect()
}

impl<R: GameRepository> SessionActor<R> {
    pub(crate) async fn abrechnen(&mut self) -> GameResult<()> {
        let jetzt = Utc::now();
        let gewinner: Vec<u32> = self.lebende_nummern();
        let anteile = preise_aufteilen(self.prize_pool, &gewinner);
        let ausgeschuettet: i64 = anteile.iter().map(|(_, b)| b).sum();

        let auszahlungen: Vec<Auszahlung> = anteile
            .iter()
            .filter_map(|&(nummer, betrag)| {
                self.teilnehmer.get(&nummer).map(|t| Auszahlung {
                    participant_id: t.id,
                    user_id: t.user_id,
                    betrag,
                })
            })
            .collect();

        let eliminiert = |stufe: StageId| {
            self.teilnehmer
                .values()
                .filter(|t| t.stufe == Some(stufe))
                .count() as u32
        };
        let start = self.gestartet_um.unwrap_or(jetzt);
        let ueberlebt: Vec<f64> = self
            .teilnehmer
            .values()
            .map(|t| {
                let ende = t.ausgeschieden_um.unwrap_or(jetzt);
                (ende - start).num_milliseconds().max(0) as f64 / 1000.0
            })
            .collect();
        let durchschnitt = if ueberlebt.is_empty() {
            0.0
        } else {
            ueberlebt.iter().sum::<f64>() / ueberlebt.len() as f64
        };

        let abrechnung = Abrechnung {
            session_id: self.session_id,
            auszahlungen,
            statistik: StatistikRecord {
                session_id: self.session_id,
                total_participants: self.teilnehmer.len() as u32,
                quiz_eliminations: eliminiert(StageId::Quiz),
                movement_eliminations: eliminiert(StageId::Movement),
                shape_eliminations: eliminiert(StageId::Shape),
                winners: gewinner.len() as u32,
                total_distributed: ausgeschuettet,
                average_survival_secs: durchschnitt,
                created_at: jetzt,
            },
            finished_at: jetzt,
        };

        if self.repo.settle(&abrechnung).await? {
            self.metriken.abrechnung(ausgeschuettet);
        } else {
            warn!(session_id = %self.session_id, "Abrechnung war bereits gespeichert");
        }

        let mut sieger = Vec::with_capacity(anteile.len());
        for (nummer, betrag) in anteile {
            if let Some(t) = self.teilnehmer.get_mut(&nummer) {
                t.preis = betrag;
                sieger.push(Winner {
                    participant_number: nummer,
                    nickname: t.nickname.clone(),
                    prize: betrag,
                });
            }
        }

        info!(
            session_id = %self.session_id,
            gewinner = sieger.len(),
            preispool = self.prize_pool,
            "Preisgeld verteilt"
        );
        self.hub.senden(
            self.session_id,
            ServerMessage::GameFinished(GameFinished {
                winners: sieger,
                total_prize_pool: self.prize_pool,
            }),
        );
        Ok(())
    }
}
