// src/handlers/papers.rs

use axum::{
    Json,
    extract::{Path, Query, State},
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    handlers::submission::{QuestionSource, load_questions, score_and_record},
    models::{
        paper::{Paper, PaperDetail, PaperListParams, PaperPage, PaperStats},
        submission::{SubmitAnswersRequest, SubmitResponse},
    },
    services::{progress::ProgressAggregator, recommendations::Difficulty},
    utils::{
        jwt::AuthUser,
        pagination::{PageWindow, like_pattern},
    },
};

pub const PAPER_COLUMNS: &str = "id, title, year, exam_type, subject, description, difficulty, \
     duration_minutes, total_marks, pdf_url, tags, created_at";

fn push_paper_filters(builder: &mut QueryBuilder<'_, Postgres>, params: &PaperListParams) {
    builder.push(" WHERE 1 = 1");

    if let Some(year) = params.year {
        builder.push(" AND year = ").push_bind(year);
    }
    if let Some(exam_type) = params.exam_type.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND exam_type = ").push_bind(exam_type.to_string());
    }
    if let Some(subject) = params.subject.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND subject = ").push_bind(subject.to_string());
    }
    if let Some(difficulty) = params.difficulty.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND difficulty = ").push_bind(difficulty.to_string());
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Lists previous-year papers, newest year first, one page at a time.
pub async fn list_papers(
    State(pool): State<PgPool>,
    Query(params): Query<PaperListParams>,
) -> Result<Json<PaperPage>, AppError> {
    let window = PageWindow::new(params.page, params.limit);

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM previous_year_papers");
    push_paper_filters(&mut count_builder, &params);
    let total: i64 = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(&pool)
        .await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {PAPER_COLUMNS} FROM previous_year_papers"));
    push_paper_filters(&mut builder, &params);
    builder
        .push(" ORDER BY year DESC, id DESC LIMIT ")
        .push_bind(window.limit)
        .push(" OFFSET ")
        .push_bind(window.offset());

    let papers = builder
        .build_query_as::<Paper>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list papers: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(PaperPage {
        papers,
        total,
        total_pages: window.total_pages(total),
        current_page: window.page,
    }))
}

/// Returns one paper with its questions, answer keys stripped.
pub async fn get_paper(
    State(pool): State<PgPool>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PaperDetail>, AppError> {
    let paper = sqlx::query_as::<_, Paper>(&format!(
        "SELECT {PAPER_COLUMNS} FROM previous_year_papers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Paper {} not found", id)))?;

    let questions = load_questions(&pool, QuestionSource::Paper(id))
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(PaperDetail { paper, questions }))
}

/// Scores an attempt and updates the caller's progress.
pub async fn submit_paper(
    State(pool): State<PgPool>,
    State(aggregator): State<ProgressAggregator>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let response = score_and_record(
        &pool,
        &aggregator,
        auth.id,
        QuestionSource::Paper(id),
        payload,
    )
    .await?;

    Ok(Json(response))
}

/// Attempt statistics for one paper.
pub async fn paper_stats(
    State(pool): State<PgPool>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PaperStats>, AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM previous_year_papers WHERE id = $1)")
            .bind(id)
            .fetch_one(&pool)
            .await?;
    if !exists {
        return Err(AppError::NotFound(format!("Paper {} not found", id)));
    }

    let stats = sqlx::query_as::<_, PaperStats>(
        "SELECT AVG(score)::DOUBLE PRECISION AS average_score,
                COUNT(*) AS total_attempts,
                MAX(score) AS highest_score
         FROM attempts WHERE paper_id = $1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(stats))
}

/// Papers in a subject at a difficulty whose tags include the topic.
pub async fn find_for_topic(
    pool: &PgPool,
    subject: &str,
    topic: &str,
    difficulty: Difficulty,
    limit: i64,
) -> Result<Vec<Paper>, AppError> {
    let papers = sqlx::query_as::<_, Paper>(&format!(
        "SELECT {PAPER_COLUMNS} FROM previous_year_papers
         WHERE subject = $1 AND difficulty = $2 AND tags @> jsonb_build_array($3::text)
         ORDER BY year DESC, id DESC LIMIT $4"
    ))
    .bind(subject)
    .bind(difficulty.paper_level())
    .bind(topic)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(papers)
}

/// The newest papers across the given subjects.
pub async fn latest_for_subjects(
    pool: &PgPool,
    subjects: &[String],
    limit: i64,
) -> Result<Vec<Paper>, AppError> {
    if subjects.is_empty() {
        return Ok(Vec::new());
    }

    let papers = sqlx::query_as::<_, Paper>(&format!(
        "SELECT {PAPER_COLUMNS} FROM previous_year_papers
         WHERE subject = ANY($1)
         ORDER BY year DESC, id DESC LIMIT $2"
    ))
    .bind(subjects)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(papers)
}
