//! Ablauf-Tests fuer Bewegung, Zeichnen, Abrechnung und Spielende

mod common;

use std::time::Duration;

use common::*;
use lastceo_core::types::{PhaseState, Point, SessionStatus, StageId};
use lastceo_db::{
    AccountRepository, MovementRepository, ParticipantRepository, SessionRepository,
    SettlementRepository, ShapeRepository,
};
use lastceo_game::{GameError, GameRules, Spielereignis};
use lastceo_protocol::message::GameFinished;
use lastceo_protocol::ServerMessage;

async fn phase_abwarten(spieler: &mut Spieler, phase: PhaseState) {
    warten_auf(spieler.rx(), |m| match m {
        ServerMessage::PhaseSignal(p) if p.state == phase => Some(()),
        _ => None,
    })
    .await
}

/// Laesst jedes UPDATE von `spalte` in `tabelle` scheitern, bis `ausfall_beheben`
async fn ausfall_einrichten(u: &Umgebung, tabelle: &str, spalte: &str) {
    let sql = format!(
        "CREATE TRIGGER ausfall BEFORE UPDATE OF {spalte} ON {tabelle}
         BEGIN SELECT RAISE(ABORT, 'Datenbank nicht erreichbar'); END"
    );
    sqlx::query(&sql).execute(u.db.pool()).await.unwrap();
}

async fn ausfall_beheben(u: &Umgebung) {
    sqlx::query("DROP TRIGGER ausfall")
        .execute(u.db.pool())
        .await
        .unwrap();
}

async fn spielende_abwarten(spieler: &mut Spieler) -> GameFinished {
    warten_auf(spieler.rx(), |m| match m {
        ServerMessage::GameFinished(f) => Some(f),
        _ => None,
    })
    .await
}

#[tokio::test]
async fn bewegung_bei_stop_eliminiert_bei_go_nicht() {
    let u = umgebung(GameRules {
        movement_total_secs: 30.0,
        go_min_secs: 0.5,
        go_max_secs: 0.5,
        stop_min_secs: 5.0,
        stop_max_secs: 5.0,
        ..schnelle_regeln()
    })
    .await;
    let handle = u.manager.session_erstellen(80, 0).await.unwrap();
    let mut spieler = spieler_verbinden(&u, &handle, 2).await;
    let (erster, zweiter) = (spieler[0].user_id, spieler[1].user_id);
    let zweiter_pid = spieler[1].verbindung.participant_id;
    alle_bereit(&handle, &spieler).await;

    // Ohne Fragen geht es direkt in die Bewegungsstufe
    phase_abwarten(&mut spieler[0], PhaseState::Go).await;
    handle
        .ereignis(erster, Spielereignis::Bewegung(Point::new(50.0, 0.0)))
        .await
        .unwrap();
    let bewegt = warten_auf(spieler[0].rx(), |m| match m {
        ServerMessage::PlayerMovement(b) => Some(b),
        _ => None,
    })
    .await;
    assert_eq!((bewegt.participant_number, bewegt.x), (1, 50.0));

    phase_abwarten(&mut spieler[0], PhaseState::Stop).await;
    handle
        .ereignis(zweiter, Spielereignis::Bewegung(Point::new(10.0, 0.0)))
        .await
        .unwrap();
    let opfer = warten_auf(spieler[0].rx(), |m| match m {
        ServerMessage::PlayerEliminated(e) => Some(e),
        _ => None,
    })
    .await;
    assert_eq!(opfer.participant_number, 2);
    assert_eq!(opfer.stage, StageId::Movement);

    let zustand = handle.zustand().await.unwrap();
    assert_eq!(zustand.phase, Some(PhaseState::Stop));
    assert!(zustand.participants[0].is_alive);
    assert_eq!(zustand.participants[0].position, Point::new(50.0, 0.0));
    assert!(!zustand.participants[1].is_alive);
    assert_eq!(zustand.participants[1].position, Point::new(0.0, 0.0));

    let bewegungen = u.db.list_movements(zweiter_pid).await.unwrap();
    assert_eq!(bewegungen.len(), 1);
    assert!(bewegungen[0].during_stop && bewegungen[0].eliminated);
}

#[tokio::test]
async fn nicht_endliche_koordinaten_werden_abgelehnt() {
    let u = umgebung(GameRules {
        movement_total_secs: 30.0,
        go_min_secs: 10.0,
        go_max_secs: 10.0,
        ..schnelle_regeln()
    })
    .await;
    let handle = u.manager.session_erstellen(80, 0).await.unwrap();
    let mut spieler = spieler_verbinden(&u, &handle, 1).await;
    alle_bereit(&handle, &spieler).await;
    phase_abwarten(&mut spieler[0], PhaseState::Go).await;

    let err = handle
        .ereignis(
            spieler[0].user_id,
            Spielereignis::Bewegung(Point::new(f64::NAN, 1.0)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::UngueltigeEingabe(_)));
    assert!(handle.zustand().await.unwrap().participants[0].is_alive);
}

#[tokio::test]
async fn zwei_gewinner_teilen_den_pool() {
    let u = umgebung(schnelle_regeln()).await;
    let handle = u.manager.session_erstellen(80, 250).await.unwrap();
    let mut spieler = spieler_verbinden(&u, &handle, 2).await;
    let ids: Vec<_> = spieler.iter().map(|s| s.user_id).collect();
    alle_bereit(&handle, &spieler).await;

    phase_abwarten(&mut spieler[0], PhaseState::Go).await;
    for user_id in &ids {
        handle
            .ereignis(*user_id, Spielereignis::Bewegung(Point::new(95.0, 0.0)))
            .await
            .unwrap();
    }

    let ende = spielende_abwarten(&mut spieler[0]).await;
    assert_eq!(ende.total_prize_pool, 500);
    assert_eq!(ende.winners.len(), 2);
    assert!(ende.winners.iter().all(|w| w.prize == 250));

    for user_id in &ids {
        let konto = u.db.get_account(*user_id).await.unwrap().unwrap();
        assert_eq!(konto.balance, 1_000);
        assert_eq!(konto.total_earnings, 250);
        assert_eq!(konto.total_games_won, 1);
    }
    let session = u.db.get_session(handle.session_id()).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Finished);
    let statistik = u
        .db
        .get_statistics(handle.session_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(statistik.winners, 2);
    assert_eq!(statistik.total_distributed, 500);

    warten_auf(spieler[0].rx(), |m| match m {
        ServerMessage::StageTransition(t) if t.stage == SessionStatus::Finished => Some(()),
        _ => None,
    })
    .await;
    assert_eq!(u.metriken.settlements_total.get(), 1);
    assert_eq!(u.metriken.prize_distributed_total.get(), 500);
}

#[tokio::test]
async fn niemand_im_ziel_ergibt_keine_gewinner() {
    let u = umgebung(schnelle_regeln()).await;
    let handle = u.manager.session_erstellen(80, 100).await.unwrap();
    let mut spieler = spieler_verbinden(&u, &handle, 1).await;
    let user_id = spieler[0].user_id;
    alle_bereit(&handle, &spieler).await;

    let ende = spielende_abwarten(&mut spieler[0]).await;
    assert!(ende.winners.is_empty());
    assert_eq!(ende.total_prize_pool, 100);

    let zustand = handle.zustand().await.unwrap();
    assert_eq!(zustand.participants[0].elimination_stage, Some(StageId::Movement));
    let konto = u.db.get_account(user_id).await.unwrap().unwrap();
    assert_eq!(konto.balance, 900);
    assert_eq!(konto.total_games_won, 0);
}

#[tokio::test]
async fn zeichenstufe_bewertet_und_eliminiert() {
    let u = umgebung(GameRules {
        shape_stage_enabled: true,
        ..schnelle_regeln()
    })
    .await;
    let handle = u.manager.session_erstellen(80, 250).await.unwrap();
    let mut spieler = spieler_verbinden(&u, &handle, 2).await;
    let ids: Vec<_> = spieler.iter().map(|s| s.user_id).collect();
    alle_bereit(&handle, &spieler).await;

    phase_abwarten(&mut spieler[0], PhaseState::Go).await;
    for user_id in &ids {
        handle
            .ereignis(*user_id, Spielereignis::Bewegung(Point::new(92.0, 5.0)))
            .await
            .unwrap();
    }

    let mut zuweisungen = Vec::new();
    for s in spieler.iter_mut() {
        zuweisungen.push(
            warten_auf(s.rx(), |m| match m {
                ServerMessage::ShapeAssignment(a) => Some(a),
                _ => None,
            })
            .await,
        );
    }

    // Spieler 1 zeichnet die Vorlage geschlossen nach, Spieler 2 kritzelt
    let mut genau = zuweisungen[0].geometry.clone();
    genau.push(genau[0]);
    let gekritzelt = vec![
        Point::new(0.0, 0.0),
        Point::new(5.0, 0.0),
        Point::new(5.0, 5.0),
        Point::new(0.0, 5.0),
    ];
    handle
        .ereignis(
            ids[0],
            Spielereignis::Zeichnung {
                shape_id: zuweisungen[0].shape_id,
                punkte: genau,
                time_taken: 3.0,
            },
        )
        .await
        .unwrap();
    handle
        .ereignis(
            ids[1],
            Spielereignis::Zeichnung {
                shape_id: zuweisungen[1].shape_id,
                punkte: gekritzelt,
                time_taken: 1.0,
            },
        )
        .await
        .unwrap();

    let ende = spielende_abwarten(&mut spieler[0]).await;
    assert_eq!(ende.winners.len(), 1);
    assert_eq!(ende.winners[0].participant_number, 1);
    assert_eq!(ende.winners[0].prize, 500);

    let zustand = handle.zustand().await.unwrap();
    assert_eq!(zustand.participants[1].elimination_stage, Some(StageId::Shape));
    assert_eq!(
        u.metriken
            .eliminations_total
            .with_label_values(&["shape"])
            .get(),
        1
    );
}

#[tokio::test]
async fn beendete_session_ignoriert_ereignisse_und_raeumt_auf() {
    let u = umgebung(GameRules {
        finished_retention_secs: 0.3,
        ..schnelle_regeln()
    })
    .await;
    let handle = u.manager.session_erstellen(80, 0).await.unwrap();
    let session_id = handle.session_id();
    let mut spieler = spieler_verbinden(&u, &handle, 1).await;
    let user_id = spieler[0].user_id;
    alle_bereit(&handle, &spieler).await;

    warten_auf(spieler[0].rx(), |m| match m {
        ServerMessage::StageTransition(t) if t.stage == SessionStatus::Finished => Some(()),
        _ => None,
    })
    .await;

    handle
        .ereignis(user_id, Spielereignis::Chat("noch da?".into()))
        .await
        .unwrap();
    handle
        .ereignis(user_id, Spielereignis::Bewegung(Point::new(99.0, 0.0)))
        .await
        .unwrap();
    let still = tokio::time::timeout(Duration::from_millis(100), spieler[0].rx().recv()).await;
    assert!(still.is_err(), "Nach Spielende darf nichts mehr gesendet werden");

    let neu = konto(&u.db, "zu-spaet", 1_000).await;
    let err = handle.verbinden(neu).await.unwrap_err();
    assert!(matches!(err, GameError::SessionBeendet));

    let wieder = handle.verbinden(user_id).await.unwrap();
    assert_eq!(wieder.zustand.status, SessionStatus::Finished);

    // Nach der Aufbewahrungszeit traegt sich der Actor aus
    tokio::time::timeout(WARTEZEIT, async {
        while u.manager.handle(session_id).is_some() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Actor wurde nicht beendet");
    assert_eq!(u.manager.anzahl(), 0);
    assert_eq!(u.manager.hub().verbindungen(session_id), 0);
}

#[tokio::test]
async fn bewegung_bei_stop_wird_nach_schreibfehler_nachgeholt() {
    let u = umgebung(GameRules {
        movement_total_secs: 1.5,
        go_min_secs: 0.5,
        go_max_secs: 0.5,
        stop_min_secs: 5.0,
        stop_max_secs: 5.0,
        ..schnelle_regeln()
    })
    .await;
    let handle = u.manager.session_erstellen(80, 250).await.unwrap();
    let mut spieler = spieler_verbinden(&u, &handle, 2).await;
    let (erster, zweiter) = (spieler[0].user_id, spieler[1].user_id);
    let zweiter_pid = spieler[1].verbindung.participant_id;
    alle_bereit(&handle, &spieler).await;

    phase_abwarten(&mut spieler[0], PhaseState::Go).await;
    handle
        .ereignis(erster, Spielereignis::Bewegung(Point::new(95.0, 0.0)))
        .await
        .unwrap();

    phase_abwarten(&mut spieler[0], PhaseState::Stop).await;
    ausfall_einrichten(&u, "participants", "is_alive").await;
    let err = handle
        .ereignis(zweiter, Spielereignis::Bewegung(Point::new(20.0, 0.0)))
        .await
        .unwrap_err();
    assert!(err.ist_persistenz());

    // Die Entscheidung steht aus: weitere Bewegungen zaehlen nicht
    handle
        .ereignis(zweiter, Spielereignis::Bewegung(Point::new(40.0, 0.0)))
        .await
        .unwrap();
    let teilnehmer = u.db.list_participants(handle.session_id()).await.unwrap();
    assert!(teilnehmer.iter().all(|t| t.is_alive));
    assert!(u.db.list_movements(zweiter_pid).await.unwrap().is_empty());

    ausfall_beheben(&u).await;
    let opfer = warten_auf(spieler[0].rx(), |m| match m {
        ServerMessage::PlayerEliminated(e) => Some(e),
        _ => None,
    })
    .await;
    assert_eq!(opfer.participant_number, 2);
    assert_eq!(opfer.stage, StageId::Movement);

    let ende = spielende_abwarten(&mut spieler[0]).await;
    assert_eq!(ende.winners.len(), 1);
    assert_eq!(ende.winners[0].participant_number, 1);
    assert_eq!(ende.winners[0].prize, 500);

    let bewegungen = u.db.list_movements(zweiter_pid).await.unwrap();
    assert_eq!(bewegungen.len(), 1);
    assert_eq!(bewegungen[0].to, Point::new(20.0, 0.0));
    assert!(bewegungen[0].during_stop && bewegungen[0].eliminated);
    assert_eq!(u.db.get_account(zweiter).await.unwrap().unwrap().balance, 750);
}

#[tokio::test]
async fn fehlversuch_wird_nach_schreibfehler_nachgeholt() {
    let u = umgebung(GameRules {
        shape_stage_enabled: true,
        ..schnelle_regeln()
    })
    .await;
    let handle = u.manager.session_erstellen(80, 250).await.unwrap();
    let mut spieler = spieler_verbinden(&u, &handle, 2).await;
    let ids: Vec<_> = spieler.iter().map(|s| s.user_id).collect();
    alle_bereit(&handle, &spieler).await;

    phase_abwarten(&mut spieler[0], PhaseState::Go).await;
    for user_id in &ids {
        handle
            .ereignis(*user_id, Spielereignis::Bewegung(Point::new(92.0, 5.0)))
            .await
            .unwrap();
    }

    let mut zuweisungen = Vec::new();
    for s in spieler.iter_mut() {
        zuweisungen.push(
            warten_auf(s.rx(), |m| match m {
                ServerMessage::ShapeAssignment(a) => Some(a),
                _ => None,
            })
            .await,
        );
    }
    let nachgezeichnet = |i: usize| {
        let mut punkte = zuweisungen[i].geometry.clone();
        punkte.push(punkte[0]);
        Spielereignis::Zeichnung {
            shape_id: zuweisungen[i].shape_id,
            punkte,
            time_taken: 2.0,
        }
    };

    handle.ereignis(ids[0], nachgezeichnet(0)).await.unwrap();

    ausfall_einrichten(&u, "participants", "is_alive").await;
    let err = handle
        .ereignis(
            ids[1],
            Spielereignis::Zeichnung {
                shape_id: zuweisungen[1].shape_id,
                punkte: vec![
                    Point::new(0.0, 0.0),
                    Point::new(5.0, 0.0),
                    Point::new(5.0, 5.0),
                    Point::new(0.0, 5.0),
                ],
                time_taken: 1.0,
            },
        )
        .await
        .unwrap_err();
    assert!(err.ist_persistenz());

    // Eine nachgereichte gute Zeichnung ersetzt den Fehlversuch nicht
    handle.ereignis(ids[1], nachgezeichnet(1)).await.unwrap();
    assert_eq!(u.db.list_attempts(handle.session_id()).await.unwrap().len(), 1);

    ausfall_beheben(&u).await;
    let opfer = warten_auf(spieler[0].rx(), |m| match m {
        ServerMessage::PlayerEliminated(e) => Some(e),
        _ => None,
    })
    .await;
    assert_eq!(opfer.participant_number, 2);
    assert_eq!(opfer.stage, StageId::Shape);

    let ende = spielende_abwarten(&mut spieler[0]).await;
    assert_eq!(ende.winners.len(), 1);
    assert_eq!(ende.winners[0].participant_number, 1);
    assert_eq!(ende.winners[0].prize, 500);

    let versuche = u.db.list_attempts(handle.session_id()).await.unwrap();
    assert_eq!(versuche.len(), 2);
    assert!(versuche.iter().any(|v| !v.success));
    assert_eq!(u.db.get_account(ids[1]).await.unwrap().unwrap().balance, 750);
}

#[tokio::test]
async fn abrechnung_wird_nach_schreibfehler_genau_einmal_gebucht() {
    let u = umgebung(GameRules {
        movement_total_secs: 1.0,
        go_min_secs: 1.0,
        go_max_secs: 1.0,
        ..schnelle_regeln()
    })
    .await;
    let handle = u.manager.session_erstellen(80, 250).await.unwrap();
    let mut spieler = spieler_verbinden(&u, &handle, 2).await;
    let ids: Vec<_> = spieler.iter().map(|s| s.user_id).collect();
    alle_bereit(&handle, &spieler).await;

    phase_abwarten(&mut spieler[0], PhaseState::Go).await;
    for user_id in &ids {
        handle
            .ereignis(*user_id, Spielereignis::Bewegung(Point::new(95.0, 0.0)))
            .await
            .unwrap();
    }
    ausfall_einrichten(&u, "users", "balance").await;

    warten_auf(spieler[0].rx(), |m| match m {
        ServerMessage::StageTransition(t) if t.stage == SessionStatus::Settlement => Some(()),
        _ => None,
    })
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(u.metriken.settlements_total.get(), 0);
    for user_id in &ids {
        assert_eq!(u.db.get_account(*user_id).await.unwrap().unwrap().balance, 750);
    }
    let session = u.db.get_session(handle.session_id()).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Settlement);

    ausfall_beheben(&u).await;
    let ende = spielende_abwarten(&mut spieler[0]).await;
    assert_eq!(ende.winners.len(), 2);
    assert!(ende.winners.iter().all(|w| w.prize == 250));

    warten_auf(spieler[0].rx(), |m| match m {
        ServerMessage::StageTransition(t) if t.stage == SessionStatus::Finished => Some(()),
        _ => None,
    })
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(nachricht) = spieler[0].rx().try_recv() {
        assert!(
            !matches!(nachricht, ServerMessage::GameFinished(_)),
            "Spielende darf nur einmal gemeldet werden"
        );
    }

    for user_id in &ids {
        let konto = u.db.get_account(*user_id).await.unwrap().unwrap();
        assert_eq!(konto.balance, 1_000);
        assert_eq!(konto.total_games_won, 1);
    }
    assert_eq!(u.metriken.settlements_total.get(), 1);
    assert_eq!(u.metriken.prize_distributed_total.get(), 500);
}
