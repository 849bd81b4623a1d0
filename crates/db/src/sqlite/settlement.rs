//! SQLite-Implementierung des SettlementRepository
//!
//! Gutschriften, Endpreise, Statistik und der Endstatus werden in einer
//! einzigen Transaktion geschrieben. Die Transaktion beginnt mit dem
//! bedingten Statuswechsel, eine bereits abgeschlossene Session bucht
//! deshalb kein zweites Mal.

use lastceo_core::types::SessionId;
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use tracing::{info, warn};

use crate::error::DbError;
use crate::models::{Abrechnung, StatistikRecord};
use crate::repository::{DbResult, SettlementRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_spalte, zahl, zeitstempel_spalte};

impl SettlementRepository for SqliteDb {
    async fn settle(&self, abrechnung: &Abrechnung) -> DbResult<bool> {
        let sid = abrechnung.session_id.inner().to_string();
        let mut tx = self.pool.begin().await?;

        let abgeschlossen = sqlx::query(
            "UPDATE game_sessions SET status = 'finished', finished_at = ?
             WHERE id = ? AND status != 'finished'",
        )
        .bind(abrechnung.finished_at.to_rfc3339())
        .bind(&sid)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if abgeschlossen == 0 {
            tx.rollback().await?;
            warn!(session_id = %abrechnung.session_id, "Session bereits abgerechnet");
            return Ok(false);
        }

        for auszahlung in &abrechnung.auszahlungen {
            let gutgeschrieben = sqlx::query(
                "UPDATE users
                 SET balance = balance + ?, total_earnings = total_earnings + ?,
                     total_games_won = total_games_won + 1
                 WHERE id = ?",
            )
            .bind(auszahlung.betrag)
            .bind(auszahlung.betrag)
            .bind(auszahlung.user_id.inner().to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let markiert = sqlx::query(
                "UPDATE participants SET final_prize = ? WHERE id = ? AND session_id = ?",
            )
            .bind(auszahlung.betrag)
            .bind(auszahlung.participant_id.inner().to_string())
            .bind(&sid)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if gutgeschrieben == 0 || markiert == 0 {
                tx.rollback().await?;
                return Err(DbError::nicht_gefunden(format!(
                    "Gewinner {} in Session {}",
                    auszahlung.participant_id, abrechnung.session_id
                )));
            }
        }

        let s = &abrechnung.statistik;
        sqlx::query(
            "INSERT INTO session_statistics
                (session_id, total_participants, quiz_eliminations, movement_eliminations,
                 shape_eliminations, winners, total_distributed, average_survival_secs, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&sid)
        .bind(s.total_participants as i64)
        .bind(s.quiz_eliminations as i64)
        .bind(s.movement_eliminations as i64)
        .bind(s.shape_eliminations as i64)
        .bind(s.winners as i64)
        .bind(s.total_distributed)
        .bind(s.average_survival_secs)
        .bind(s.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            session_id = %abrechnung.session_id,
            gewinner = abrechnung.auszahlungen.len(),
            ausgeschuettet = s.total_distributed,
            "Session abgerechnet"
        );
        Ok(true)
    }

    async fn get_statistics(&self, session_id: SessionId) -> DbResult<Option<StatistikRecord>> {
        let row = sqlx::query(
            "SELECT session_id, total_participants, quiz_eliminations, movement_eliminations,
                    shape_eliminations, winners, total_distributed, average_survival_secs,
                    created_at
             FROM session_statistics WHERE session_id = ?",
        )
        .bind(session_id.inner().to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_statistik(&r)).transpose()
    }
}

fn row_to_statistik(row: &SqliteRow) -> DbResult<StatistikRecord> {
    Ok(StatistikRecord {
        session_id: SessionId(uuid_spalte(row, "session_id")?),
        total_participants: zahl("total_participants", row.try_get("total_participants")?)?,
        quiz_eliminations: zahl("quiz_eliminations", row.try_get("quiz_eliminations")?)?,
        movement_eliminations: zahl(
            "movement_eliminations",
            row.try_get("movement_eliminations")?,
        )?,
        shape_eliminations: zahl("shape_eliminations", row.try_get("shape_eliminations")?)?,
        winners: zahl("winners", row.try_get("winners")?)?,
        total_distributed: row.try_get("total_distributed")?,
        average_survival_secs: row.try_get("average_survival_secs")?,
        created_at: zeitstempel_spalte(row, "created_at")?,
    })
}
