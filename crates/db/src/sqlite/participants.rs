//! SQLite-Implementierung des ParticipantRepository

use chrono::{DateTime, Utc};
use lastceo_core::types::{ParticipantId, Point, SessionId, SessionStatus, StageId, UserId};
use sqlx::sqlite::{SqliteExecutor, SqliteRow};
use sqlx::Row as _;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{Einschreibung, TeilnehmerRecord};
use crate::repository::{DbResult, ParticipantRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{opt_zeitstempel_spalte, uuid_spalte, zahl, zeitstempel_spalte};

const TEILNEHMER_SELECT: &str = "SELECT p.id, p.session_id, p.user_id, p.participant_number,
            u.nickname, u.avatar_url, p.is_alive, p.elimination_stage, p.eliminated_at,
            p.position_x, p.position_y, p.final_prize, p.joined_at
     FROM participants p JOIN users u ON u.id = p.user_id";

/// Scheidet einen lebenden Teilnehmer aus; `false` wenn er bereits
/// ausgeschieden war. Laeuft auf dem Pool oder innerhalb einer Transaktion.
pub(crate) async fn ausscheiden_in<'e, E>(
    ausfuehrer: E,
    id: ParticipantId,
    stage: StageId,
    zeitpunkt: DateTime<Utc>,
) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let affected = sqlx::query(
        "UPDATE participants
         SET is_alive = 0, elimination_stage = ?, eliminated_at = ?
         WHERE id = ? AND is_alive = 1",
    )
    .bind(stage.als_zahl())
    .bind(zeitpunkt.to_rfc3339())
    .bind(id.inner().to_string())
    .execute(ausfuehrer)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Kleinste Nummer ab 1, die in der aufsteigend sortierten Liste fehlt
fn kleinste_freie_nummer(vergeben: &[i64]) -> i64 {
    let mut kandidat = 1;
    for &n in vergeben {
        if n == kandidat {
            kandidat += 1;
        } else if n > kandidat {
            break;
        }
    }
    kandidat
}

impl ParticipantRepository for SqliteDb {
    async fn enroll(&self, session_id: SessionId, user_id: UserId) -> DbResult<Einschreibung> {
        let sid = session_id.inner().to_string();
        let uid = user_id.inner().to_string();

        let mut tx = self.pool.begin().await?;

        let session = sqlx::query(
            "SELECT status, max_participants, entry_fee FROM game_sessions WHERE id = ?",
        )
        .bind(&sid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::nicht_gefunden(format!("Session {session_id}")))?;

        // Wiederholter Beitritt veraendert nichts
        let bestehend = sqlx::query(&format!(
            "{TEILNEHMER_SELECT} WHERE p.session_id = ? AND p.user_id = ?"
        ))
        .bind(&sid)
        .bind(&uid)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(row) = bestehend {
            let teilnehmer = row_to_teilnehmer(&row)?;
            tx.rollback().await?;
            return Ok(Einschreibung::Bestehend(teilnehmer));
        }

        let status: String = session.try_get("status")?;
        let status = status
            .parse::<SessionStatus>()
            .map_err(|e| DbError::UngueltigeDaten(e.to_string()))?;
        if !status.ist_beitretbar() {
            tx.rollback().await?;
            return Err(DbError::NichtBeitretbar(status));
        }

        let max: u32 = zahl("max_participants", session.try_get("max_participants")?)?;
        let entry_fee: i64 = session.try_get("entry_fee")?;

        let vergeben: Vec<i64> = sqlx::query_scalar(
            "SELECT participant_number FROM participants
             WHERE session_id = ? ORDER BY participant_number",
        )
        .bind(&sid)
        .fetch_all(&mut *tx)
        .await?;
        if vergeben.len() >= max as usize {
            tx.rollback().await?;
            return Err(DbError::SessionVoll(max));
        }

        // Bedingte Abbuchung: nur wenn das Guthaben reicht
        let abgebucht = sqlx::query(
            "UPDATE users
             SET balance = balance - ?, total_games_played = total_games_played + 1
             WHERE id = ? AND balance >= ?",
        )
        .bind(entry_fee)
        .bind(&uid)
        .bind(entry_fee)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if abgebucht == 0 {
            let vorhanden: Option<i64> =
                sqlx::query_scalar("SELECT balance FROM users WHERE id = ?")
                    .bind(&uid)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return Err(match vorhanden {
                None => DbError::nicht_gefunden(format!("Benutzer {user_id}")),
                Some(vorhanden) => DbError::GuthabenUnzureichend {
                    benoetigt: entry_fee,
                    vorhanden,
                },
            });
        }

        let id = Uuid::new_v4();
        let nummer = kleinste_freie_nummer(&vergeben);
        sqlx::query(
            "INSERT INTO participants (id, session_id, user_id, participant_number, joined_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&sid)
        .bind(&uid)
        .bind(nummer)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE game_sessions SET prize_pool = prize_pool + ? WHERE id = ?")
            .bind(entry_fee)
            .bind(&sid)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!("{TEILNEHMER_SELECT} WHERE p.id = ?"))
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        let teilnehmer = row_to_teilnehmer(&row)?;

        tx.commit().await?;

        debug!(
            session_id = %session_id,
            user_id = %user_id,
            nummer,
            gebuehr = entry_fee,
            "Teilnehmer eingeschrieben"
        );
        Ok(Einschreibung::Neu(teilnehmer))
    }

    async fn list_participants(&self, session_id: SessionId) -> DbResult<Vec<TeilnehmerRecord>> {
        let rows = sqlx::query(&format!(
            "{TEILNEHMER_SELECT} WHERE p.session_id = ? ORDER BY p.participant_number"
        ))
        .bind(session_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_teilnehmer).collect()
    }

    async fn eliminate(
        &self,
        id: ParticipantId,
        stage: StageId,
        zeitpunkt: DateTime<Utc>,
    ) -> DbResult<bool> {
        ausscheiden_in(&self.pool, id, stage, zeitpunkt).await
    }

    async fn update_position(&self, id: ParticipantId, position: Point) -> DbResult<()> {
        let affected = sqlx::query(
            "UPDATE participants SET position_x = ?, position_y = ? WHERE id = ?",
        )
        .bind(position.x)
        .bind(position.y)
        .bind(id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Teilnehmer {id}")));
        }
        Ok(())
    }
}

fn row_to_teilnehmer(row: &SqliteRow) -> DbResult<TeilnehmerRecord> {
    let stufe: Option<i64> = row.try_get("elimination_stage")?;
    let elimination_stage = stufe
        .map(StageId::try_from)
        .transpose()
        .map_err(|e| DbError::UngueltigeDaten(e.to_string()))?;
    let is_alive: i64 = row.try_get("is_alive")?;

    Ok(TeilnehmerRecord {
        id: ParticipantId(uuid_spalte(row, "id")?),
        session_id: SessionId(uuid_spalte(row, "session_id")?),
        user_id: UserId(uuid_spalte(row, "user_id")?),
        participant_number: zahl("participant_number", row.try_get("participant_number")?)?,
        nickname: row.try_get("nickname")?,
        avatar_url: row.try_get("avatar_url")?,
        is_alive: is_alive != 0,
        elimination_stage,
        eliminated_at: opt_zeitstempel_spalte(row, "eliminated_at")?,
        position: Point::new(row.try_get("position_x")?, row.try_get("position_y")?),
        final_prize: row.try_get("final_prize")?,
        joined_at: zeitstempel_spalte(row, "joined_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::kleinste_freie_nummer;

    #[test]
    fn freie_nummer_fuellt_luecken() {
        assert_eq!(kleinste_freie_nummer(&[]), 1);
        assert_eq!(kleinste_freie_nummer(&[1, 2, 3]), 4);
        assert_eq!(kleinste_freie_nummer(&[1, 3, 4]), 2);
        assert_eq!(kleinste_freie_nummer(&[2, 3]), 1);
    }
}
