// src/models/forum.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'forum_posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Json<Vec<String>>,
    pub views: i32,
    pub is_resolved: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Listing row: post joined with its author and comment count.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostSummary {
    pub id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub title: String,
    pub category: String,
    pub tags: Json<Vec<String>>,
    pub views: i32,
    pub is_resolved: bool,
    pub comment_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostPage {
    pub posts: Vec<ForumPostSummary>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// Comment joined with its author.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumCommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub parent_id: Option<i64>,
    pub content: String,
    pub is_answer: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostDetail {
    #[serde(flatten)]
    pub post: ForumPost,
    /// Flat list in creation order; replies reference their parent by id.
    pub comments: Vec<ForumCommentView>,
}

/// Sort order for the post listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Newest,
    Popular,
    /// Only unresolved posts, newest first.
    Unanswered,
}

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize)]
pub struct PostListParams {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: PostSort,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 10000,
        message = "Content length must be between 1 and 10000 chars"
    ))]
    pub content: String,

    #[validate(length(min = 1, max = 100))]
    pub category: String,

    #[serde(default)]
    #[validate(length(max = 10))]
    pub tags: Vec<String>,
}

/// DTO for commenting on a post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 5000,
        message = "Comment must be between 1 and 5000 characters"
    ))]
    pub content: String,

    /// The comment being replied to, if any.
    pub parent_id: Option<i64>,
}
