// src/handlers/admin.rs

//! Admin-only endpoints. Every route here sits behind `admin_middleware`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{feedback::FEEDBACK_COLUMNS, papers::PAPER_COLUMNS},
    models::{
        feedback::{
            Feedback, FeedbackListParams, FeedbackPage, FeedbackStats, LabelCount,
            UpdateFeedbackStatusRequest,
        },
        mock_test::{CreateMockTestRequest, MockTest},
        paper::{CreatePaperRequest, Paper},
        question::{CreateQuestionRequest, TestQuestionStats},
        user::{RecentUser, UpdateRoleRequest, User},
    },
    services::scoring::AnswerKey,
    utils::{
        html::clean_labels,
        jwt::AuthUser,
        pagination::{PageWindow, like_pattern},
    },
};

const TEST_COLUMNS: &str =
    "id, title, subject, description, difficulty, duration_minutes, created_by, created_at";

/// Headline numbers for the admin dashboard.
pub async fn dashboard_stats(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let (total_users, total_tests, total_questions, total_papers): (i64, i64, i64, i64) =
        sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM mock_tests),
                    (SELECT COUNT(*) FROM questions),
                    (SELECT COUNT(*) FROM previous_year_papers)",
        )
        .fetch_one(&pool)
        .await?;

    let recent_tests = sqlx::query_as::<_, MockTest>(&format!(
        "SELECT {TEST_COLUMNS} FROM mock_tests ORDER BY created_at DESC, id DESC LIMIT 5"
    ))
    .fetch_all(&pool)
    .await?;

    let recent_users = sqlx::query_as::<_, RecentUser>(
        "SELECT id, first_name, last_name, email, created_at
         FROM users ORDER BY created_at DESC, id DESC LIMIT 5",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "totalUsers": total_users,
        "totalTests": total_tests,
        "totalQuestions": total_questions,
        "totalPapers": total_papers,
        "recentTests": recent_tests,
        "recentUsers": recent_users,
    })))
}

/// Lists all users in the system, newest first.
pub async fn list_users(State(pool): State<PgPool>) -> Result<Json<Vec<User>>, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, first_name, last_name, email, password, role, last_login, created_at
         FROM users ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(users))
}

/// Changes a user's role. Takes effect on their next login.
pub async fn update_user_role(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
        .bind(payload.role.as_str())
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("User {} is now {}", id, payload.role.as_str());
    Ok(StatusCode::OK)
}

/// Deletes a user and, through cascades, everything they own.
pub async fn delete_user(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if auth.id == id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Question counts per mock test.
pub async fn test_question_stats(
    State(pool): State<PgPool>,
) -> Result<Json<Vec<TestQuestionStats>>, AppError> {
    let stats = sqlx::query_as::<_, TestQuestionStats>(
        "SELECT t.id, t.title, t.subject, t.difficulty, COUNT(q.id) AS question_count, t.created_at
         FROM mock_tests t
         LEFT JOIN questions q ON q.test_id = t.id
         GROUP BY t.id
         ORDER BY t.created_at DESC, t.id DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(stats))
}

pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Rejects a question whose answer key cannot be graded.
///
/// Choice questions need options, and every correct answer must be one of them.
fn check_question(index: usize, question: &CreateQuestionRequest) -> Result<(), AppError> {
    let invalid = |msg: String| AppError::BadRequest(format!("Question {}: {}", index + 1, msg));

    let key = AnswerKey::parse(&question.question_type, question.correct_answer.as_ref())
        .map_err(|e| invalid(e.to_string()))?;

    let expected: Vec<&String> = match &key {
        AnswerKey::SingleChoice(answer) => vec![answer],
        AnswerKey::MultiSelect(answers) => {
            if answers.is_empty() {
                return Err(invalid("multi-select needs at least one correct answer".into()));
            }
            answers.iter().collect()
        }
        AnswerKey::FreeText => return Ok(()),
    };

    if question.options.len() < 2 {
        return Err(invalid("choice questions need at least two options".into()));
    }
    if let Some(missing) = expected.iter().find(|a| !question.options.contains(a)) {
        return Err(invalid(format!("'{}' is not one of the options", missing)));
    }
    Ok(())
}

enum Owner {
    MockTest(i64),
    Paper(i64),
}

async fn insert_questions(
    tx: &mut Transaction<'_, Postgres>,
    owner: Owner,
    questions: &[CreateQuestionRequest],
) -> Result<(), AppError> {
    let (test_id, paper_id) = match owner {
        Owner::MockTest(id) => (Some(id), None),
        Owner::Paper(id) => (None, Some(id)),
    };

    for question in questions {
        sqlx::query(
            "INSERT INTO questions
                 (test_id, paper_id, question_text, question_type, options, correct_answer,
                  marks, subject, topic, explanation)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(test_id)
        .bind(paper_id)
        .bind(&question.question_text)
        .bind(&question.question_type)
        .bind(SqlJson(&question.options))
        .bind(&question.correct_answer)
        .bind(question.marks)
        .bind(question.subject.trim())
        .bind(question.topic.trim())
        .bind(&question.explanation)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Creates a mock test together with its questions in one transaction.
pub async fn create_test(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Json(payload): Json<CreateMockTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    for (index, question) in payload.questions.iter().enumerate() {
        check_question(index, question)?;
    }

    let mut tx = pool.begin().await?;

    let test = sqlx::query_as::<_, MockTest>(&format!(
        "INSERT INTO mock_tests (title, subject, description, difficulty, duration_minutes, created_by)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {TEST_COLUMNS}"
    ))
    .bind(payload.title.trim())
    .bind(payload.subject.trim())
    .bind(&payload.description)
    .bind(&payload.difficulty)
    .bind(payload.duration_minutes)
    .bind(auth.id)
    .fetch_one(&mut *tx)
    .await?;

    insert_questions(&mut tx, Owner::MockTest(test.id), &payload.questions).await?;
    tx.commit().await?;

    tracing::info!(
        "Admin {} created mock test {} with {} questions",
        auth.id,
        test.id,
        payload.questions.len()
    );
    Ok((StatusCode::CREATED, Json(test)))
}

/// Creates a previous-year paper together with its questions in one transaction.
pub async fn create_paper(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Json(payload): Json<CreatePaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    for (index, question) in payload.questions.iter().enumerate() {
        check_question(index, question)?;
    }

    let mut tx = pool.begin().await?;

    let paper = sqlx::query_as::<_, Paper>(&format!(
        "INSERT INTO previous_year_papers
             (title, year, exam_type, subject, description, difficulty, duration_minutes,
              total_marks, pdf_url, tags)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {PAPER_COLUMNS}"
    ))
    .bind(payload.title.trim())
    .bind(payload.year)
    .bind(payload.exam_type.trim())
    .bind(payload.subject.trim())
    .bind(&payload.description)
    .bind(&payload.difficulty)
    .bind(payload.duration_minutes)
    .bind(payload.total_marks)
    .bind(&payload.pdf_url)
    .bind(SqlJson(clean_labels(&payload.tags)))
    .fetch_one(&mut *tx)
    .await?;

    insert_questions(&mut tx, Owner::Paper(paper.id), &payload.questions).await?;
    tx.commit().await?;

    tracing::info!(
        "Admin {} created paper {} with {} questions",
        auth.id,
        paper.id,
        payload.questions.len()
    );
    Ok((StatusCode::CREATED, Json(paper)))
}

fn push_feedback_filters(builder: &mut QueryBuilder<'_, Postgres>, params: &FeedbackListParams) {
    builder.push(" WHERE 1 = 1");

    let exact = [
        ("status", &params.status),
        ("priority", &params.priority),
        ("feedback_type", &params.feedback_type),
        ("category", &params.category),
    ];
    for (column, value) in exact {
        if let Some(value) = value.as_deref().filter(|s| !s.is_empty()) {
            builder
                .push(format!(" AND {column} = "))
                .push_bind(value.to_string());
        }
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

/// Lists all feedback with filters and pagination.
pub async fn list_feedback(
    State(pool): State<PgPool>,
    Query(params): Query<FeedbackListParams>,
) -> Result<Json<FeedbackPage>, AppError> {
    let window = PageWindow::new(params.page, params.limit);

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM feedback");
    push_feedback_filters(&mut count_builder, &params);
    let total = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(&pool)
        .await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {FEEDBACK_COLUMNS} FROM feedback"));
    push_feedback_filters(&mut builder, &params);
    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(window.limit)
        .push(" OFFSET ")
        .push_bind(window.offset());

    let feedback = builder
        .build_query_as::<Feedback>()
        .fetch_all(&pool)
        .await?;

    Ok(Json(FeedbackPage {
        feedback,
        total,
        total_pages: window.total_pages(total),
        current_page: window.page,
    }))
}

/// Moves a feedback item through its lifecycle.
///
/// Resolved and closed items get `resolved_at`; reopening clears it.
pub async fn update_feedback_status(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateFeedbackStatusRequest>,
) -> Result<Json<Feedback>, AppError> {
    payload.validate()?;

    let feedback = sqlx::query_as::<_, Feedback>(&format!(
        "UPDATE feedback
         SET status = $1,
             resolution = COALESCE($2, resolution),
             admin_response = COALESCE($3, admin_response),
             resolved_at = CASE WHEN $4 THEN COALESCE(resolved_at, NOW()) ELSE NULL END
         WHERE id = $5
         RETURNING {FEEDBACK_COLUMNS}"
    ))
    .bind(payload.status.as_str())
    .bind(&payload.resolution)
    .bind(&payload.admin_response)
    .bind(payload.status.is_terminal())
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Feedback {} not found", id)))?;

    tracing::info!("Feedback {} moved to {}", id, payload.status.as_str());
    Ok(Json(feedback))
}

/// Aggregate feedback numbers for the admin dashboard.
pub async fn feedback_stats(State(pool): State<PgPool>) -> Result<Json<FeedbackStats>, AppError> {
    let (total_count, open_count, resolved_count, avg_resolution_seconds): (
        i64,
        i64,
        i64,
        Option<f64>,
    ) = sqlx::query_as(
        "SELECT COUNT(*),
                COUNT(*) FILTER (WHERE status = 'open'),
                COUNT(*) FILTER (WHERE status IN ('resolved', 'closed')),
                AVG(EXTRACT(EPOCH FROM (resolved_at - created_at)))::DOUBLE PRECISION
         FROM feedback",
    )
    .fetch_one(&pool)
    .await?;

    let category_stats = sqlx::query_as::<_, LabelCount>(
        "SELECT category AS label, COUNT(*) AS count
         FROM feedback GROUP BY category ORDER BY count DESC, label",
    )
    .fetch_all(&pool)
    .await?;

    let priority_stats = sqlx::query_as::<_, LabelCount>(
        "SELECT priority AS label, COUNT(*) AS count
         FROM feedback GROUP BY priority ORDER BY count DESC, label",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(FeedbackStats {
        total_count,
        open_count,
        resolved_count,
        avg_resolution_seconds,
        category_stats,
        priority_stats,
    }))
}
