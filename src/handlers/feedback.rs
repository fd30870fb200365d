// src/handlers/feedback.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::feedback::{
        CreateFeedbackCommentRequest, CreateFeedbackRequest, Feedback, FeedbackComment,
        FeedbackWithComments,
    },
    utils::{html::clean_html, jwt::AuthUser},
};

pub const FEEDBACK_COLUMNS: &str = "id, user_id, feedback_type, category, title, description, \
     priority, status, resolution, admin_response, screenshots, browser_info, resolved_at, created_at";

const COMMENT_COLUMNS: &str = "id, feedback_id, user_id, content, is_admin_response, created_at";

/// Submits a new feedback item. Status starts at `open`.
pub async fn create_feedback(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Json(payload): Json<CreateFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let feedback = sqlx::query_as::<_, Feedback>(&format!(
        "INSERT INTO feedback
             (user_id, feedback_type, category, title, description, priority, screenshots, browser_info)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {FEEDBACK_COLUMNS}"
    ))
    .bind(auth.id)
    .bind(&payload.feedback_type)
    .bind(&payload.category)
    .bind(clean_html(payload.title.trim()))
    .bind(clean_html(&payload.description))
    .bind(payload.priority.as_deref().unwrap_or("medium"))
    .bind(SqlJson(payload.screenshots))
    .bind(payload.browser_info)
    .fetch_one(&pool)
    .await?;

    tracing::info!("User {} filed feedback {}", auth.id, feedback.id);
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// The caller's feedback items, newest first, each with its comment thread.
pub async fn my_feedback(
    State(pool): State<PgPool>,
    auth: AuthUser,
) -> Result<Json<Vec<FeedbackWithComments>>, AppError> {
    let items = sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(auth.id)
    .fetch_all(&pool)
    .await?;

    let ids: Vec<i64> = items.iter().map(|f| f.id).collect();
    let comments = sqlx::query_as::<_, FeedbackComment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM feedback_comments
         WHERE feedback_id = ANY($1)
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(&ids)
    .fetch_all(&pool)
    .await?;

    let mut by_feedback: HashMap<i64, Vec<FeedbackComment>> = HashMap::new();
    for comment in comments {
        by_feedback.entry(comment.feedback_id).or_default().push(comment);
    }

    let result = items
        .into_iter()
        .map(|feedback| FeedbackWithComments {
            comments: by_feedback.remove(&feedback.id).unwrap_or_default(),
            feedback,
        })
        .collect();

    Ok(Json(result))
}

/// Adds a comment to a feedback thread.
///
/// Allowed for the item's author and for admins; admin comments are flagged.
pub async fn add_comment(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path(feedback_id): Path<i64>,
    Json(payload): Json<CreateFeedbackCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let owner_id: i64 = sqlx::query_scalar("SELECT user_id FROM feedback WHERE id = $1")
        .bind(feedback_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Feedback {} not found", feedback_id)))?;

    let is_admin = auth.claims.is_admin();
    if owner_id != auth.id && !is_admin {
        return Err(AppError::Forbidden(
            "You can only comment on your own feedback".to_string(),
        ));
    }

    let content = clean_html(&payload.content);
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is empty after sanitization".to_string()));
    }

    let comment = sqlx::query_as::<_, FeedbackComment>(&format!(
        "INSERT INTO feedback_comments (feedback_id, user_id, content, is_admin_response)
         VALUES ($1, $2, $3, $4)
         RETURNING {COMMENT_COLUMNS}"
    ))
    .bind(feedback_id)
    .bind(auth.id)
    .bind(content)
    .bind(is_admin)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}
