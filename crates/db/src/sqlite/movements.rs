//! SQLite-Implementierung des MovementRepository

use lastceo_core::types::{ParticipantId, Point, StageId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use tracing::debug;

use crate::models::BewegungRecord;
use crate::repository::{DbResult, MovementRepository};
use crate::sqlite::participants::ausscheiden_in;
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_spalte, zeitstempel_spalte};

impl MovementRepository for SqliteDb {
    async fn record_movement(&self, bewegung: &BewegungRecord) -> DbResult<()> {
        let pid = bewegung.participant_id.inner().to_string();
        let zeitpunkt = bewegung.recorded_at.to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let eingefuegt = sqlx::query(
            "INSERT INTO movement_records
                (participant_id, from_x, from_y, to_x, to_y, during_stop, eliminated, recorded_at)
             SELECT ?, ?, ?, ?, ?, ?, ?, ?
             WHERE NOT EXISTS (
                 SELECT 1 FROM movement_records WHERE participant_id = ? AND recorded_at = ?
             )",
        )
        .bind(&pid)
        .bind(bewegung.from.x)
        .bind(bewegung.from.y)
        .bind(bewegung.to.x)
        .bind(bewegung.to.y)
        .bind(bewegung.during_stop as i64)
        .bind(bewegung.eliminated as i64)
        .bind(&zeitpunkt)
        .bind(&pid)
        .bind(&zeitpunkt)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if eingefuegt == 0 {
            debug!(participant_id = %bewegung.participant_id, "Bewegung bereits gespeichert");
        }

        if bewegung.eliminated {
            ausscheiden_in(
                &mut *tx,
                bewegung.participant_id,
                StageId::Movement,
                bewegung.recorded_at,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_movements(&self, participant_id: ParticipantId) -> DbResult<Vec<BewegungRecord>> {
        let rows = sqlx::query(
            "SELECT participant_id, from_x, from_y, to_x, to_y, during_stop, eliminated, recorded_at
             FROM movement_records WHERE participant_id = ? ORDER BY id",
        )
        .bind(participant_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_bewegung).collect()
    }
}

fn row_to_bewegung(row: &SqliteRow) -> DbResult<BewegungRecord> {
    let during_stop: i64 = row.try_get("during_stop")?;
    let eliminated: i64 = row.try_get("eliminated")?;
    Ok(BewegungRecord {
        participant_id: ParticipantId(uuid_spalte(row, "participant_id")?),
        from: Point::new(row.try_get("from_x")?, row.try_get("from_y")?),
        to: Point::new(row.try_get("to_x")?, row.try_get("to_y")?),
        during_stop: during_stop != 0,
        eliminated: eliminated != 0,
        recorded_at: zeitstempel_spalte(row, "recorded_at")?,
    })
}
