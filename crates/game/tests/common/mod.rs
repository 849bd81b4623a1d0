//! Gemeinsame Hilfen fuer die Ablauf-Tests der Session-Actors
//!
//! Die Tests laufen in Echtzeit mit sehr kurzen Stufendauern gegen eine
//! In-Memory-Datenbank.

#![allow(dead_code)]

use std::time::Duration;

use lastceo_core::types::{AnswerOption, UserId};
use lastceo_db::models::NeuesKonto;
use lastceo_db::{seed, AccountRepository, QuizRepository, SqliteDb};
use lastceo_game::{
    ConnectionHub, GameRules, SessionHandle, SessionManager, Spielereignis, Verbindung,
};
use lastceo_observability::GameMetrics;
use lastceo_protocol::ServerMessage;
use tokio::sync::mpsc;

pub const WARTEZEIT: Duration = Duration::from_secs(5);

pub struct Umgebung {
    pub db: SqliteDb,
    pub manager: SessionManager<SqliteDb>,
    pub metriken: GameMetrics,
}

pub struct Spieler {
    pub user_id: UserId,
    pub verbindung: Verbindung,
}

impl Spieler {
    pub fn rx(&mut self) -> &mut mpsc::Receiver<ServerMessage> {
        &mut self.verbindung.empfaenger
    }

    pub fn nummer(&self) -> u32 {
        self.verbindung.teilnehmer_nummer
    }
}

/// Regeln mit kurzen Dauern und ohne Quizfragen
pub fn schnelle_regeln() -> GameRules {
    GameRules {
        question_count: 0,
        question_time_limit_secs: 5.0,
        reveal_pause_secs: 0.05,
        movement_total_secs: 0.5,
        go_min_secs: 0.5,
        go_max_secs: 0.5,
        stop_min_secs: 0.5,
        stop_max_secs: 0.5,
        shape_time_limit_secs: 5.0,
        finished_retention_secs: 5.0,
        persistence_retry_secs: 0.05,
        rng_seed: Some(7),
        ..GameRules::default()
    }
}

pub async fn umgebung(regeln: GameRules) -> Umgebung {
    let db = SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden");
    seed::kataloge_befuellen(&db, regeln.shape_tolerance, regeln.shape_time_limit_secs)
        .await
        .expect("Kataloge konnten nicht befuellt werden");
    let metriken = GameMetrics::neu().expect("Metriken konnten nicht erstellt werden");
    let manager = SessionManager::neu(db.clone(), ConnectionHub::neu(), regeln, metriken.clone());
    Umgebung {
        db,
        manager,
        metriken,
    }
}

pub async fn konto(db: &SqliteDb, name: &str, guthaben: i64) -> UserId {
    db.create_account(NeuesKonto {
        nickname: name,
        avatar_url: None,
        access_token: Some(name),
        balance: guthaben,
    })
    .await
    .expect("Konto anlegen fehlgeschlagen")
    .id
}

/// Legt `anzahl` Konten an (Guthaben 1000) und verbindet sie nacheinander
pub async fn spieler_verbinden(u: &Umgebung, handle: &SessionHandle, anzahl: usize) -> Vec<Spieler> {
    let mut spieler = Vec::with_capacity(anzahl);
    for i in 0..anzahl {
        let user_id = konto(&u.db, &format!("ceo-{i}"), 1_000).await;
        let verbindung = handle
            .verbinden(user_id)
            .await
            .expect("Verbinden fehlgeschlagen");
        spieler.push(Spieler {
            user_id,
            verbindung,
        });
    }
    spieler
}

pub async fn alle_bereit(handle: &SessionHandle, spieler: &[Spieler]) {
    for s in spieler {
        handle
            .ereignis(s.user_id, Spielereignis::Bereit)
            .await
            .expect("Bereitmeldung fehlgeschlagen");
    }
}

/// Liest die Queue bis `f` einen Wert liefert
pub async fn warten_auf<T>(
    rx: &mut mpsc::Receiver<ServerMessage>,
    mut f: impl FnMut(ServerMessage) -> Option<T>,
) -> T {
    tokio::time::timeout(WARTEZEIT, async {
        loop {
            let nachricht = rx.recv().await.expect("Queue wurde geschlossen");
            if let Some(wert) = f(nachricht) {
                return wert;
            }
        }
    })
    .await
    .expect("Erwartete Nachricht kam nicht rechtzeitig")
}

pub async fn richtige_antwort(db: &SqliteDb, question_id: i64) -> AnswerOption {
    db.active_questions()
        .await
        .expect("Fragen laden fehlgeschlagen")
        .into_iter()
        .find(|f| f.id == question_id)
        .expect("Frage nicht im Katalog")
        .correct_answer
}

pub fn falsche_antwort(richtig: AnswerOption) -> AnswerOption {
    AnswerOption::ALLE
        .into_iter()
        .find(|o| *o != richtig)
        .expect("Es gibt immer eine falsche Option")
}
