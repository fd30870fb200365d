// src/store/postgres.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    models::progress::{TopicKey, TopicTally, UserProgress, UserProgressRow},
    services::progress::{ProgressError, ProgressStore},
};

const PROGRESS_COLUMNS: &str = "user_id, subject, topic, total_attempts, total_questions, \
     correct_answers, average_score, time_spent_minutes, last_attempt_date, strength_level";

/// `ProgressStore` backed by the 'user_progress' table.
///
/// One transaction per submission. Rows are locked with `SELECT ... FOR UPDATE`
/// in (subject, topic) order, so concurrent submissions of one user queue up
/// instead of losing increments or deadlocking.
#[derive(Clone)]
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn apply_tallies(
        &self,
        user_id: i64,
        tallies: &BTreeMap<TopicKey, TopicTally>,
        at: DateTime<Utc>,
    ) -> Result<Vec<UserProgress>, ProgressError> {
        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::with_capacity(tallies.len());

        for (key, tally) in tallies {
            sqlx::query(
                r#"
                INSERT INTO user_progress (user_id, subject, topic)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, subject, topic) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(&key.subject)
            .bind(&key.topic)
            .execute(&mut *tx)
            .await?;

            let row: UserProgressRow = sqlx::query_as(&format!(
                "SELECT {PROGRESS_COLUMNS} FROM user_progress \
                 WHERE user_id = $1 AND subject = $2 AND topic = $3 FOR UPDATE"
            ))
            .bind(user_id)
            .bind(&key.subject)
            .bind(&key.topic)
            .fetch_one(&mut *tx)
            .await?;

            let mut progress = UserProgress::from(row);
            progress.absorb(*tally, at);

            sqlx::query(
                r#"
                UPDATE user_progress SET
                    total_attempts = $4,
                    total_questions = $5,
                    correct_answers = $6,
                    average_score = $7,
                    last_attempt_date = $8,
                    strength_level = $9
                WHERE user_id = $1 AND subject = $2 AND topic = $3
                "#,
            )
            .bind(user_id)
            .bind(&key.subject)
            .bind(&key.topic)
            .bind(progress.total_attempts)
            .bind(progress.total_questions)
            .bind(progress.correct_answers)
            .bind(progress.average_score)
            .bind(progress.last_attempt_date)
            .bind(progress.strength_level.as_str())
            .execute(&mut *tx)
            .await?;

            updated.push(progress);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        subject: Option<&str>,
    ) -> Result<Vec<UserProgress>, ProgressError> {
        let rows: Vec<UserProgressRow> = sqlx::query_as(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress \
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR subject = $2) \
             ORDER BY subject, topic"
        ))
        .bind(user_id)
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserProgress::from).collect())
    }
}
