//! SQLite-Implementierung des SessionRepository

use chrono::Utc;
use lastceo_core::types::{SessionId, SessionStatus};
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{NeueSession, SessionRecord, StufenWechsel};
use crate::repository::{DbResult, SessionRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{opt_zeitstempel_spalte, uuid_spalte, zahl, zeitstempel_spalte};

const SESSION_SPALTEN: &str = "id, status, max_participants, entry_fee, prize_pool, stage_index,
     stage_started_at, created_at, started_at, finished_at";

impl SessionRepository for SqliteDb {
    async fn create_session(&self, data: NeueSession) -> DbResult<SessionRecord> {
        if data.max_participants == 0 || data.entry_fee < 0 {
            return Err(DbError::UngueltigeDaten(format!(
                "Ungueltige Session-Parameter: max_participants={}, entry_fee={}",
                data.max_participants, data.entry_fee
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO game_sessions (id, status, max_participants, entry_fee, created_at)
             VALUES (?, 'waiting', ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(data.max_participants as i64)
        .bind(data.entry_fee)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(SessionRecord {
            id: SessionId(id),
            status: SessionStatus::Waiting,
            max_participants: data.max_participants,
            entry_fee: data.entry_fee,
            prize_pool: 0,
            stage_index: 0,
            stage_started_at: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        })
    }

    async fn get_session(&self, id: SessionId) -> DbResult<Option<SessionRecord>> {
        let sql = format!("SELECT {SESSION_SPALTEN} FROM game_sessions WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.inner().to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn list_unfinished_sessions(&self) -> DbResult<Vec<SessionRecord>> {
        let sql = format!(
            "SELECT {SESSION_SPALTEN} FROM game_sessions
             WHERE status != 'finished' ORDER BY created_at"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_session).collect()
    }

    async fn record_stage(&self, id: SessionId, wechsel: StufenWechsel) -> DbResult<()> {
        let start = wechsel.stage_started_at.to_rfc3339();
        let started_at = (wechsel.status == SessionStatus::Quiz).then(|| start.clone());

        let affected = sqlx::query(
            "UPDATE game_sessions
             SET status = ?, stage_index = ?, stage_started_at = ?,
                 started_at = COALESCE(started_at, ?)
             WHERE id = ? AND status != 'finished'",
        )
        .bind(wechsel.status.als_str())
        .bind(wechsel.stage_index as i64)
        .bind(&start)
        .bind(started_at)
        .bind(id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!(
                "Offene Session {id} fuer Stufenwechsel"
            )));
        }
        Ok(())
    }
}

fn row_to_session(row: &SqliteRow) -> DbResult<SessionRecord> {
    use sqlx::Row as _;

    let status: String = row.try_get("status")?;
    let status = status
        .parse::<SessionStatus>()
        .map_err(|e| DbError::UngueltigeDaten(e.to_string()))?;

    Ok(SessionRecord {
        id: SessionId(uuid_spalte(row, "id")?),
        status,
        max_participants: zahl("max_participants", row.try_get("max_participants")?)?,
        entry_fee: row.try_get("entry_fee")?,
        prize_pool: row.try_get("prize_pool")?,
        stage_index: zahl("stage_index", row.try_get("stage_index")?)?,
        stage_started_at: opt_zeitstempel_spalte(row, "stage_started_at")?,
        created_at: zeitstempel_spalte(row, "created_at")?,
        started_at: opt_zeitstempel_spalte(row, "started_at")?,
        finished_at: opt_zeitstempel_spalte(row, "finished_at")?,
    })
}
