//! SQLite-Implementierung des QuizRepository

use chrono::Utc;
use lastceo_core::types::{AnswerOption, ParticipantId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;

use crate::error::DbError;
use crate::models::{AntwortRecord, FrageRecord, NeueFrage};
use crate::repository::{DbResult, QuizRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_spalte, zeitstempel_spalte};

impl QuizRepository for SqliteDb {
    async fn create_question(&self, data: NeueFrage<'_>) -> DbResult<FrageRecord> {
        let [a, b, c, d] = data.options;
        let id = sqlx::query(
            "INSERT INTO quiz_questions
                (question, option_a, option_b, option_c, option_d, correct_answer,
                 difficulty, category, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(data.question)
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(data.correct_answer.als_str())
        .bind(data.difficulty)
        .bind(data.category)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(FrageRecord {
            id,
            question: data.question.to_string(),
            options: data.options.map(str::to_string),
            correct_answer: data.correct_answer,
            difficulty: data.difficulty,
            category: data.category.to_string(),
            is_active: true,
        })
    }

    async fn active_questions(&self) -> DbResult<Vec<FrageRecord>> {
        let rows = sqlx::query(
            "SELECT id, question, option_a, option_b, option_c, option_d, correct_answer,
                    difficulty, category, is_active
             FROM quiz_questions WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_frage).collect()
    }

    async fn record_answer(&self, antwort: &AntwortRecord) -> DbResult<bool> {
        let affected = sqlx::query(
            "INSERT INTO quiz_answers
                (participant_id, question_id, answer, is_correct, time_taken, answered_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (participant_id, question_id) DO NOTHING",
        )
        .bind(antwort.participant_id.inner().to_string())
        .bind(antwort.question_id)
        .bind(antwort.answer.als_str())
        .bind(antwort.is_correct as i64)
        .bind(antwort.time_taken)
        .bind(antwort.answered_at.to_rfc3339())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn list_answers(&self, participant_id: ParticipantId) -> DbResult<Vec<AntwortRecord>> {
        let rows = sqlx::query(
            "SELECT participant_id, question_id, answer, is_correct, time_taken, answered_at
             FROM quiz_answers WHERE participant_id = ? ORDER BY id",
        )
        .bind(participant_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_antwort).collect()
    }
}

fn option_spalte(row: &SqliteRow, spalte: &str) -> DbResult<AnswerOption> {
    let s: String = row.try_get(spalte)?;
    s.parse().map_err(|e: lastceo_core::LastCeoError| DbError::UngueltigeDaten(e.to_string()))
}

fn row_to_frage(row: &SqliteRow) -> DbResult<FrageRecord> {
    let is_active: i64 = row.try_get("is_active")?;
    Ok(FrageRecord {
        id: row.try_get("id")?,
        question: row.try_get("question")?,
        options: [
            row.try_get("option_a")?,
            row.try_get("option_b")?,
            row.try_get("option_c")?,
            row.try_get("option_d")?,
        ],
        correct_answer: option_spalte(row, "correct_answer")?,
        difficulty: row.try_get("difficulty")?,
        category: row.try_get("category")?,
        is_active: is_active != 0,
    })
}

fn row_to_antwort(row: &SqliteRow) -> DbResult<AntwortRecord> {
    let is_correct: i64 = row.try_get("is_correct")?;
    Ok(AntwortRecord {
        participant_id: ParticipantId(uuid_spalte(row, "participant_id")?),
        question_id: row.try_get("question_id")?,
        answer: option_spalte(row, "answer")?,
        is_correct: is_correct != 0,
        time_taken: row.try_get("time_taken")?,
        answered_at: zeitstempel_spalte(row, "answered_at")?,
    })
}
