// src/handlers/submission.rs

//! Shared submit flow for mock tests and previous-year papers.

use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        question::Question,
        submission::{ProgressOutcome, ScoreSummary, SubmitAnswersRequest, SubmitResponse},
    },
    services::{
        progress::ProgressAggregator,
        scoring::{score_submission, topic_map},
    },
};

pub const QUESTION_COLUMNS: &str = "id, test_id, paper_id, question_text, question_type, options, \
     correct_answer, marks, subject, topic, explanation, created_at";

/// What the questions of a submission belong to.
#[derive(Debug, Clone, Copy)]
pub enum QuestionSource {
    MockTest(i64),
    Paper(i64),
}

impl QuestionSource {
    fn parent_table(&self) -> &'static str {
        match self {
            QuestionSource::MockTest(_) => "mock_tests",
            QuestionSource::Paper(_) => "previous_year_papers",
        }
    }

    fn owner_column(&self) -> &'static str {
        match self {
            QuestionSource::MockTest(_) => "test_id",
            QuestionSource::Paper(_) => "paper_id",
        }
    }

    fn id(&self) -> i64 {
        match self {
            QuestionSource::MockTest(id) | QuestionSource::Paper(id) => *id,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            QuestionSource::MockTest(_) => "Mock test",
            QuestionSource::Paper(_) => "Paper",
        }
    }
}

/// Loads every question of a test or paper, ordered by id.
pub async fn load_questions(
    pool: &PgPool,
    source: QuestionSource,
) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE {} = $1 ORDER BY id",
        source.owner_column()
    ))
    .bind(source.id())
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Fails with 404 when the test or paper does not exist.
async fn ensure_exists(pool: &PgPool, source: QuestionSource) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        source.parent_table()
    ))
    .bind(source.id())
    .fetch_one(pool)
    .await?;

    if !exists {
        return Err(AppError::NotFound(format!(
            "{} {} not found",
            source.label(),
            source.id()
        )));
    }
    Ok(())
}

/// Records the attempt. Failure is logged and yields `None`.
async fn record_attempt(
    pool: &PgPool,
    user_id: i64,
    source: QuestionSource,
    summary: &ScoreSummary,
) -> Option<i64> {
    let (test_id, paper_id) = match source {
        QuestionSource::MockTest(id) => (Some(id), None),
        QuestionSource::Paper(id) => (None, Some(id)),
    };

    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO attempts (user_id, test_id, paper_id, score, max_score, percentage, pending_review)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id",
    )
    .bind(user_id)
    .bind(test_id)
    .bind(paper_id)
    .bind(summary.score)
    .bind(summary.max_score)
    .bind(summary.percentage)
    .bind(summary.pending_review.len() as i32)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!("Failed to record attempt for user {}: {:?}", user_id, e);
            None
        }
    }
}

/// Scores a submission, records the attempt and updates the user's progress.
///
/// Progress failures do not fail the request: the score is still returned
/// and `progress.status` is `failed`.
pub async fn score_and_record(
    pool: &PgPool,
    aggregator: &ProgressAggregator,
    user_id: i64,
    source: QuestionSource,
    payload: SubmitAnswersRequest,
) -> Result<SubmitResponse, AppError> {
    ensure_exists(pool, source).await?;

    let questions = load_questions(pool, source).await?;
    if questions.is_empty() {
        return Err(AppError::BadRequest(format!(
            "{} {} has no questions",
            source.label(),
            source.id()
        )));
    }

    let summary = score_submission(&questions, &payload.answers);
    tracing::info!(
        "User {} scored {}/{} on {:?}",
        user_id,
        summary.score,
        summary.max_score,
        source
    );

    let attempt_id = record_attempt(pool, user_id, source, &summary).await;

    let progress = match aggregator
        .apply_submission(user_id, &summary, &topic_map(&questions))
        .await
    {
        Ok(topics) => ProgressOutcome::Updated { topics },
        Err(e) => {
            tracing::error!("Progress update failed for user {}: {}", user_id, e);
            ProgressOutcome::Failed {
                retryable: true,
                error: e.to_string(),
            }
        }
    };

    Ok(SubmitResponse {
        summary,
        attempt_id,
        progress,
    })
}
