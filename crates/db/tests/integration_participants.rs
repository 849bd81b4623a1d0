//! Integration-Tests fuer Sessions und Einschreibung (In-Memory SQLite)

use chrono::Utc;
use lastceo_core::types::{Point, SessionStatus, StageId, UserId};
use lastceo_db::{
    models::{Einschreibung, KontoRecord, NeueSession, NeuesKonto, StufenWechsel},
    AccountRepository, DbError, ParticipantRepository, SessionRepository, SqliteDb,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn konto(db: &SqliteDb, name: &str, guthaben: i64) -> KontoRecord {
    db.create_account(NeuesKonto {
        nickname: name,
        avatar_url: None,
        access_token: Some(name),
        balance: guthaben,
    })
    .await
    .expect("Konto anlegen fehlgeschlagen")
}

#[tokio::test]
async fn zehn_beitritte_fuellen_den_preispool() {
    let db = db().await;
    let session = db
        .create_session(NeueSession {
            max_participants: 80,
            entry_fee: 100,
        })
        .await
        .unwrap();

    for i in 0..10 {
        let k = konto(&db, &format!("ceo{i}"), 1_000).await;
        let ergebnis = db.enroll(session.id, k.id).await.unwrap();
        assert!(matches!(ergebnis, Einschreibung::Neu(_)));
        assert_eq!(ergebnis.teilnehmer().participant_number, i + 1);
    }

    let geladen = db.get_session(session.id).await.unwrap().unwrap();
    assert_eq!(geladen.prize_pool, 1_000);

    let teilnehmer = db.list_participants(session.id).await.unwrap();
    assert_eq!(teilnehmer.len(), 10);
    assert!(teilnehmer.iter().all(|t| t.is_alive));

    let k = db.get_account_by_token("ceo3").await.unwrap().unwrap();
    assert_eq!(k.balance, 900);
    assert_eq!(k.total_games_played, 1);
}

#[tokio::test]
async fn doppelter_beitritt_bucht_nicht_erneut() {
    let db = db().await;
    let session = db
        .create_session(NeueSession {
            max_participants: 5,
            entry_fee: 50,
        })
        .await
        .unwrap();
    let k = konto(&db, "alice", 500).await;

    let erst = db.enroll(session.id, k.id).await.unwrap();
    let zweit = db.enroll(session.id, k.id).await.unwrap();

    assert!(matches!(zweit, Einschreibung::Bestehend(_)));
    assert_eq!(erst.teilnehmer().id, zweit.teilnehmer().id);
    assert_eq!(db.get_account(k.id).await.unwrap().unwrap().balance, 450);
    assert_eq!(db.get_session(session.id).await.unwrap().unwrap().prize_pool, 50);
}

#[tokio::test]
async fn volle_session_lehnt_ab_ohne_abbuchung() {
    let db = db().await;
    let session = db
        .create_session(NeueSession {
            max_participants: 2,
            entry_fee: 10,
        })
        .await
        .unwrap();
    for name in ["a", "b"] {
        let k = konto(&db, name, 100).await;
        db.enroll(session.id, k.id).await.unwrap();
    }

    let dritter = konto(&db, "c", 100).await;
    let err = db.enroll(session.id, dritter.id).await.unwrap_err();
    assert!(matches!(err, DbError::SessionVoll(2)), "Erhalten: {err:?}");
    assert_eq!(db.get_account(dritter.id).await.unwrap().unwrap().balance, 100);
    assert_eq!(db.get_session(session.id).await.unwrap().unwrap().prize_pool, 20);
}

#[tokio::test]
async fn unzureichendes_guthaben() {
    let db = db().await;
    let session = db
        .create_session(NeueSession {
            max_participants: 10,
            entry_fee: 100,
        })
        .await
        .unwrap();
    let arm = konto(&db, "arm", 99).await;

    let err = db.enroll(session.id, arm.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::GuthabenUnzureichend {
            benoetigt: 100,
            vorhanden: 99
        }
    ));
    assert!(err.ist_ablehnung());
    assert!(db.list_participants(session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn gestartete_session_nimmt_niemanden_mehr_auf() {
    let db = db().await;
    let session = db
        .create_session(NeueSession {
            max_participants: 10,
            entry_fee: 0,
        })
        .await
        .unwrap();
    let frueh = konto(&db, "frueh", 0).await;
    db.enroll(session.id, frueh.id).await.unwrap();

    db.record_stage(
        session.id,
        StufenWechsel {
            status: SessionStatus::Quiz,
            stage_index: 2,
            stage_started_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let spaet = konto(&db, "spaet", 0).await;
    let err = db.enroll(session.id, spaet.id).await.unwrap_err();
    assert!(matches!(err, DbError::NichtBeitretbar(SessionStatus::Quiz)));

    // Wiederverbinden eines Teilnehmers bleibt moeglich
    let wieder = db.enroll(session.id, frueh.id).await.unwrap();
    assert!(matches!(wieder, Einschreibung::Bestehend(_)));

    let geladen = db.get_session(session.id).await.unwrap().unwrap();
    assert_eq!(geladen.status, SessionStatus::Quiz);
    assert_eq!(geladen.stage_index, 2);
    assert!(geladen.started_at.is_some());
    let offen = db.list_unfinished_sessions().await.unwrap();
    assert_eq!(offen.len(), 1);
    assert_eq!(offen[0].status, SessionStatus::Quiz);
}

#[tokio::test]
async fn unbekannte_session_oder_benutzer() {
    let db = db().await;
    let session = db
        .create_session(NeueSession {
            max_participants: 10,
            entry_fee: 0,
        })
        .await
        .unwrap();

    let err = db.enroll(session.id, UserId::new()).await.unwrap_err();
    assert!(matches!(err, DbError::NichtGefunden(_)));

    let k = konto(&db, "x", 0).await;
    let err = db
        .enroll(lastceo_core::SessionId::new(), k.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NichtGefunden(_)));
}

#[tokio::test]
async fn eliminierung_nur_einmal() {
    let db = db().await;
    let session = db
        .create_session(NeueSession {
            max_participants: 10,
            entry_fee: 0,
        })
        .await
        .unwrap();
    let k = konto(&db, "opfer", 0).await;
    let t = db.enroll(session.id, k.id).await.unwrap().teilnehmer().clone();

    assert!(db.eliminate(t.id, StageId::Movement, Utc::now()).await.unwrap());
    assert!(!db.eliminate(t.id, StageId::Quiz, Utc::now()).await.unwrap());

    let geladen = &db.list_participants(session.id).await.unwrap()[0];
    assert!(!geladen.is_alive);
    assert_eq!(geladen.elimination_stage, Some(StageId::Movement));
    assert!(geladen.eliminated_at.is_some());
}

#[tokio::test]
async fn position_aktualisieren() {
    let db = db().await;
    let session = db
        .create_session(NeueSession {
            max_participants: 10,
            entry_fee: 0,
        })
        .await
        .unwrap();
    let k = konto(&db, "laeufer", 0).await;
    let t = db.enroll(session.id, k.id).await.unwrap().teilnehmer().clone();

    db.update_position(t.id, Point::new(42.5, 10.0)).await.unwrap();
    let geladen = &db.list_participants(session.id).await.unwrap()[0];
    assert_eq!(geladen.position, Point::new(42.5, 10.0));
}

#[tokio::test]
async fn nickname_ist_eindeutig() {
    let db = db().await;
    konto(&db, "doppelt", 0).await;
    let err = db
        .create_account(NeuesKonto {
            nickname: "doppelt",
            avatar_url: None,
            access_token: None,
            balance: 0,
        })
        .await
        .unwrap_err();
    assert!(err.ist_eindeutigkeit());
}
