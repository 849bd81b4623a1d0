//! SQLite-Implementierung des ShapeRepository
//!
//! Geometrie und Zeichnungen werden als JSON-Array von Punkten gespeichert.

use lastceo_core::types::{ParticipantId, Point, SessionId, StageId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;

use crate::error::DbError;
use crate::models::{FormRecord, NeueForm, VersuchGespeichert, VersuchRecord};
use crate::repository::{DbResult, ShapeRepository};
use crate::sqlite::participants::ausscheiden_in;
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_spalte, zeitstempel_spalte};

impl ShapeRepository for SqliteDb {
    async fn create_shape(&self, data: NeueForm<'_>) -> DbResult<FormRecord> {
        if data.geometry.len() < 3 {
            return Err(DbError::UngueltigeDaten(format!(
                "Form '{}' braucht mindestens 3 Punkte",
                data.shape_type
            )));
        }
        let geometrie = serde_json::to_string(data.geometry)?;

        let id = sqlx::query(
            "INSERT INTO shapes (shape_type, geometry, tolerance, time_limit, difficulty)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(data.shape_type)
        .bind(&geometrie)
        .bind(data.tolerance)
        .bind(data.time_limit)
        .bind(data.difficulty)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(FormRecord {
            id,
            shape_type: data.shape_type.to_string(),
            geometry: data.geometry.to_vec(),
            tolerance: data.tolerance,
            time_limit: data.time_limit,
            difficulty: data.difficulty,
        })
    }

    async fn active_shapes(&self) -> DbResult<Vec<FormRecord>> {
        let rows = sqlx::query(
            "SELECT id, shape_type, geometry, tolerance, time_limit, difficulty
             FROM shapes WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_form).collect()
    }

    async fn record_attempt(&self, versuch: &VersuchRecord) -> DbResult<VersuchGespeichert> {
        let zeichnung = serde_json::to_string(&versuch.drawing_data)?;
        let pid = versuch.participant_id.inner().to_string();
        let sid = versuch.session_id.inner().to_string();

        let mut tx = self.pool.begin().await?;

        let neu = sqlx::query(
            "INSERT INTO shape_attempts
                (participant_id, session_id, shape_id, drawing_data, accuracy_score,
                 success, time_taken, attempted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (participant_id, session_id) DO NOTHING",
        )
        .bind(&pid)
        .bind(&sid)
        .bind(versuch.shape_id)
        .bind(&zeichnung)
        .bind(versuch.accuracy_score)
        .bind(versuch.success as i64)
        .bind(versuch.time_taken)
        .bind(versuch.attempted_at.to_rfc3339())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        let gespeichert = sqlx::query(
            "SELECT success, attempted_at FROM shape_attempts
             WHERE participant_id = ? AND session_id = ?",
        )
        .bind(&pid)
        .bind(&sid)
        .fetch_one(&mut *tx)
        .await?;
        let success: i64 = gespeichert.try_get("success")?;
        let erfolgreich = success != 0;

        if !erfolgreich {
            let zeitpunkt = zeitstempel_spalte(&gespeichert, "attempted_at")?;
            ausscheiden_in(&mut *tx, versuch.participant_id, StageId::Shape, zeitpunkt).await?;
        }

        tx.commit().await?;
        Ok(VersuchGespeichert { neu, erfolgreich })
    }

    async fn list_attempts(&self, session_id: SessionId) -> DbResult<Vec<VersuchRecord>> {
        let rows = sqlx::query(
            "SELECT participant_id, session_id, shape_id, drawing_data, accuracy_score,
                    success, time_taken, attempted_at
             FROM shape_attempts WHERE session_id = ? ORDER BY id",
        )
        .bind(session_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_versuch).collect()
    }
}

fn punkte_spalte(row: &SqliteRow, spalte: &str) -> DbResult<Vec<Point>> {
    let json: String = row.try_get(spalte)?;
    Ok(serde_json::from_str(&json)?)
}

fn row_to_form(row: &SqliteRow) -> DbResult<FormRecord> {
    Ok(FormRecord {
        id: row.try_get("id")?,
        shape_type: row.try_get("shape_type")?,
        geometry: punkte_spalte(row, "geometry")?,
        tolerance: row.try_get("tolerance")?,
        time_limit: row.try_get("time_limit")?,
        difficulty: row.try_get("difficulty")?,
    })
}

fn row_to_versuch(row: &SqliteRow) -> DbResult<VersuchRecord> {
    let success: i64 = row.try_get("success")?;
    Ok(VersuchRecord {
        participant_id: ParticipantId(uuid_spalte(row, "participant_id")?),
        session_id: SessionId(uuid_spalte(row, "session_id")?),
        shape_id: row.try_get("shape_id")?,
        drawing_data: punkte_spalte(row, "drawing_data")?,
        accuracy_score: row.try_get("accuracy_score")?,
        success: success != 0,
        time_taken: row.try_get("time_taken")?,
        attempted_at: zeitstempel_spalte(row, "attempted_at")?,
    })
}
