//! SQLite-Implementierung des AccountRepository

use chrono::Utc;
use lastceo_core::types::UserId;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::error::{ist_unique_verletzung, DbError};
use crate::models::{KontoRecord, NeuesKonto};
use crate::repository::{AccountRepository, DbResult};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_spalte, zeitstempel_spalte};

const KONTO_SPALTEN: &str = "id, nickname, avatar_url, balance, total_games_played,
     total_games_won, total_earnings, created_at";

impl AccountRepository for SqliteDb {
    async fn create_account(&self, data: NeuesKonto<'_>) -> DbResult<KontoRecord> {
        if data.balance < 0 {
            return Err(DbError::UngueltigeDaten(format!(
                "Negatives Startguthaben: {}",
                data.balance
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, nickname, avatar_url, access_token, balance, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(data.nickname)
        .bind(data.avatar_url)
        .bind(data.access_token)
        .bind(data.balance)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if ist_unique_verletzung(&e) {
                DbError::Eindeutigkeit(format!(
                    "Nickname '{}' oder Token bereits vergeben",
                    data.nickname
                ))
            } else {
                DbError::Sqlx(e)
            }
        })?;

        Ok(KontoRecord {
            id: UserId(id),
            nickname: data.nickname.to_string(),
            avatar_url: data.avatar_url.map(str::to_string),
            balance: data.balance,
            total_games_played: 0,
            total_games_won: 0,
            total_earnings: 0,
            created_at: now,
        })
    }

    async fn get_account(&self, id: UserId) -> DbResult<Option<KontoRecord>> {
        let sql = format!("SELECT {KONTO_SPALTEN} FROM users WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.inner().to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_konto(&r)).transpose()
    }

    async fn get_account_by_token(&self, token: &str) -> DbResult<Option<KontoRecord>> {
        let sql = format!("SELECT {KONTO_SPALTEN} FROM users WHERE access_token = ?");
        let row = sqlx::query(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_konto(&r)).transpose()
    }
}

fn row_to_konto(row: &SqliteRow) -> DbResult<KontoRecord> {
    use sqlx::Row as _;

    Ok(KontoRecord {
        id: UserId(uuid_spalte(row, "id")?),
        nickname: row.try_get("nickname")?,
        avatar_url: row.try_get("avatar_url")?,
        balance: row.try_get("balance")?,
        total_games_played: row.try_get("total_games_played")?,
        total_games_won: row.try_get("total_games_won")?,
        total_earnings: row.try_get("total_earnings")?,
        created_at: zeitstempel_spalte(row, "created_at")?,
    })
}
