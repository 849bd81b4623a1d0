//! SQLite-Implementierung des ChatRepository

use chrono::Utc;
use lastceo_core::types::{ParticipantId, SessionId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::ChatRecord;
use crate::repository::{ChatRepository, DbResult};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_spalte, zeitstempel_spalte};

/// Maximale Laenge einer Chatnachricht in Zeichen
pub const MAX_NACHRICHT_LAENGE: usize = 500;

impl ChatRepository for SqliteDb {
    async fn save_message(
        &self,
        session_id: SessionId,
        participant_id: Option<ParticipantId>,
        message: &str,
    ) -> DbResult<ChatRecord> {
        if message.chars().count() > MAX_NACHRICHT_LAENGE {
            return Err(DbError::UngueltigeDaten(format!(
                "Chatnachricht laenger als {MAX_NACHRICHT_LAENGE} Zeichen"
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let is_system = participant_id.is_none();

        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, participant_id, message, is_system, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(session_id.inner().to_string())
        .bind(participant_id.map(|p| p.inner().to_string()))
        .bind(message)
        .bind(is_system as i64)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ChatRecord {
            id,
            session_id,
            participant_id,
            message: message.to_string(),
            is_system,
            created_at: now,
        })
    }

    async fn chat_history(&self, session_id: SessionId, limit: u32) -> DbResult<Vec<ChatRecord>> {
        // Neueste zuerst laden, dann umdrehen
        let rows = sqlx::query(
            "SELECT id, session_id, participant_id, message, is_system, created_at
             FROM chat_messages WHERE session_id = ?
             ORDER BY rowid DESC LIMIT ?",
        )
        .bind(session_id.inner().to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut verlauf = rows
            .iter()
            .map(row_to_chat)
            .collect::<DbResult<Vec<_>>>()?;
        verlauf.reverse();
        Ok(verlauf)
    }
}

fn row_to_chat(row: &SqliteRow) -> DbResult<ChatRecord> {
    let participant_id: Option<String> = row.try_get("participant_id")?;
    let participant_id = participant_id
        .as_deref()
        .map(|s| {
            Uuid::parse_str(s)
                .map(ParticipantId)
                .map_err(|e| DbError::intern(format!("Ungueltige UUID '{s}': {e}")))
        })
        .transpose()?;
    let is_system: i64 = row.try_get("is_system")?;

    Ok(ChatRecord {
        id: uuid_spalte(row, "id")?,
        session_id: SessionId(uuid_spalte(row, "session_id")?),
        participant_id,
        message: row.try_get("message")?,
        is_system: is_system != 0,
        created_at: zeitstempel_spalte(row, "created_at")?,
    })
}
