// src/handlers/forum.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::forum::{
        CreateCommentRequest, CreatePostRequest, ForumCommentView, ForumPost, ForumPostDetail,
        ForumPostPage, ForumPostSummary, PostListParams, PostSort,
    },
    utils::{
        html::{clean_html, clean_labels},
        jwt::AuthUser,
        pagination::{PageWindow, like_pattern},
    },
};

const POST_COLUMNS: &str = "id, user_id, title, content, category, tags, views, is_resolved, created_at";

fn push_post_filters(builder: &mut QueryBuilder<'_, Postgres>, params: &PostListParams) {
    builder.push(" WHERE 1 = 1");

    if let Some(category) = params.category.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND p.category = ").push_bind(category.to_string());
    }
    if let Some(tag) = params.tag.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND p.tags ? ")
            .push_bind(tag.to_string());
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        builder
            .push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if params.sort == PostSort::Unanswered {
        builder.push(" AND p.is_resolved = FALSE");
    }
}

/// Lists forum posts with author names and comment counts.
pub async fn list_posts(
    State(pool): State<PgPool>,
    Query(params): Query<PostListParams>,
) -> Result<Json<ForumPostPage>, AppError> {
    let window = PageWindow::new(params.page, params.limit);

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM forum_posts p");
    push_post_filters(&mut count_builder, &params);
    let total = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(&pool)
        .await?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT p.id, p.user_id, u.first_name || ' ' || u.last_name AS author_name,
                p.title, p.category, p.tags, p.views, p.is_resolved,
                (SELECT COUNT(*) FROM forum_comments c WHERE c.post_id = p.id) AS comment_count,
                p.created_at
         FROM forum_posts p
         JOIN users u ON u.id = p.user_id",
    );
    push_post_filters(&mut builder, &params);
    builder.push(match params.sort {
        PostSort::Popular => " ORDER BY p.views DESC, p.id DESC",
        PostSort::Newest | PostSort::Unanswered => " ORDER BY p.created_at DESC, p.id DESC",
    });
    builder
        .push(" LIMIT ")
        .push_bind(window.limit)
        .push(" OFFSET ")
        .push_bind(window.offset());

    let posts = builder
        .build_query_as::<ForumPostSummary>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list posts: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(ForumPostPage {
        posts,
        total,
        total_pages: window.total_pages(total),
        current_page: window.page,
    }))
}

/// Creates a new post. Title, content and tags are sanitized.
pub async fn create_post(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let content = clean_html(&payload.content);
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is empty after sanitization".to_string()));
    }

    let post = sqlx::query_as::<_, ForumPost>(&format!(
        "INSERT INTO forum_posts (user_id, title, content, category, tags)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {POST_COLUMNS}"
    ))
    .bind(auth.id)
    .bind(clean_html(payload.title.trim()))
    .bind(content)
    .bind(payload.category.trim())
    .bind(SqlJson(clean_labels(&payload.tags)))
    .fetch_one(&pool)
    .await?;

    tracing::info!("User {} created post {}", auth.id, post.id);
    Ok((StatusCode::CREATED, Json(post)))
}

/// Returns a post with its comments and bumps its view counter.
pub async fn get_post(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Json<ForumPostDetail>, AppError> {
    let post = sqlx::query_as::<_, ForumPost>(&format!(
        "UPDATE forum_posts SET views = views + 1 WHERE id = $1 RETURNING {POST_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

    let comments = sqlx::query_as::<_, ForumCommentView>(
        "SELECT c.id, c.post_id, c.user_id, u.first_name || ' ' || u.last_name AS author_name,
                c.parent_id, c.content, c.is_answer, c.created_at
         FROM forum_comments c
         JOIN users u ON u.id = c.user_id
         WHERE c.post_id = $1
         ORDER BY c.created_at ASC, c.id ASC",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ForumPostDetail { post, comments }))
}

/// Adds a comment, optionally as a reply to another comment on the same post.
pub async fn create_comment(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let post_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM forum_posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&pool)
            .await?;
    if !post_exists {
        return Err(AppError::NotFound(format!("Post {} not found", post_id)));
    }

    if let Some(parent_id) = payload.parent_id {
        let parent_on_post: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM forum_comments WHERE id = $1 AND post_id = $2)",
        )
        .bind(parent_id)
        .bind(post_id)
        .fetch_one(&pool)
        .await?;
        if !parent_on_post {
            return Err(AppError::BadRequest(format!(
                "Comment {} does not belong to post {}",
                parent_id, post_id
            )));
        }
    }

    let content = clean_html(&payload.content);
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is empty after sanitization".to_string()));
    }

    let comment = sqlx::query_as::<_, ForumCommentView>(
        "WITH inserted AS (
             INSERT INTO forum_comments (post_id, user_id, parent_id, content)
             VALUES ($1, $2, $3, $4)
             RETURNING id, post_id, user_id, parent_id, content, is_answer, created_at
         )
         SELECT i.id, i.post_id, i.user_id, u.first_name || ' ' || u.last_name AS author_name,
                i.parent_id, i.content, i.is_answer, i.created_at
         FROM inserted i
         JOIN users u ON u.id = i.user_id",
    )
    .bind(post_id)
    .bind(auth.id)
    .bind(payload.parent_id)
    .bind(content)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Marks a comment as the accepted answer and resolves the post.
///
/// Only the post's author may do this. Any previously accepted answer is unmarked.
pub async fn mark_answer(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let author_id: i64 =
        sqlx::query_scalar("SELECT user_id FROM forum_posts WHERE id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

    if author_id != auth.id {
        return Err(AppError::Forbidden(
            "Only the post author can accept an answer".to_string(),
        ));
    }

    sqlx::query("UPDATE forum_comments SET is_answer = FALSE WHERE post_id = $1 AND is_answer")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    let marked = sqlx::query(
        "UPDATE forum_comments SET is_answer = TRUE WHERE id = $1 AND post_id = $2",
    )
    .bind(comment_id)
    .bind(post_id)
    .execute(&mut *tx)
    .await?;

    if marked.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Comment {} not found on post {}",
            comment_id, post_id
        )));
    }

    sqlx::query("UPDATE forum_posts SET is_resolved = TRUE WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
