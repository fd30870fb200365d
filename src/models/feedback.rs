// src/models/feedback.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

pub const FEEDBACK_TYPES: [&str; 4] = ["bug", "feature", "content", "general"];
pub const FEEDBACK_CATEGORIES: [&str; 5] = ["test", "forum", "analytics", "ui", "other"];
pub const FEEDBACK_PRIORITIES: [&str; 3] = ["low", "medium", "high"];

/// Lifecycle of a feedback item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Open => "open",
            FeedbackStatus::InProgress => "in_progress",
            FeedbackStatus::Resolved => "resolved",
            FeedbackStatus::Closed => "closed",
        }
    }

    /// Resolved and closed items get a `resolved_at` timestamp.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeedbackStatus::Resolved | FeedbackStatus::Closed)
    }
}

/// Represents the 'feedback' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub feedback_type: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub resolution: Option<String>,
    pub admin_response: Option<String>,
    pub screenshots: Json<Vec<String>>,
    pub browser_info: Option<serde_json::Value>,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'feedback_comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackComment {
    pub id: i64,
    pub feedback_id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_admin_response: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackWithComments {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub comments: Vec<FeedbackComment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPage {
    pub feedback: Vec<Feedback>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// DTO for submitting feedback.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    #[serde(rename = "type")]
    #[validate(custom(function = validate_feedback_type))]
    pub feedback_type: String,
    #[validate(custom(function = validate_feedback_category))]
    pub category: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
    #[validate(custom(function = validate_feedback_priority))]
    pub priority: Option<String>,
    /// URLs of screenshots uploaded out of band.
    #[serde(default)]
    #[validate(length(max = 5))]
    pub screenshots: Vec<String>,
    pub browser_info: Option<serde_json::Value>,
}

/// Query parameters for the admin feedback listing.
#[derive(Debug, Default, Deserialize)]
pub struct FeedbackListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub feedback_type: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// DTO for the admin status update.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedbackStatusRequest {
    pub status: FeedbackStatus,
    #[validate(length(max = 5000))]
    pub resolution: Option<String>,
    #[validate(length(max = 5000))]
    pub admin_response: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedbackCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total_count: i64,
    pub open_count: i64,
    pub resolved_count: i64,
    /// Mean seconds from creation to resolution.
    pub avg_resolution_seconds: Option<f64>,
    pub category_stats: Vec<LabelCount>,
    pub priority_stats: Vec<LabelCount>,
}

fn validate_feedback_type(value: &str) -> Result<(), validator::ValidationError> {
    one_of(value, &FEEDBACK_TYPES, "invalid_feedback_type")
}

fn validate_feedback_category(value: &str) -> Result<(), validator::ValidationError> {
    one_of(value, &FEEDBACK_CATEGORIES, "invalid_feedback_category")
}

fn validate_feedback_priority(value: &str) -> Result<(), validator::ValidationError> {
    one_of(value, &FEEDBACK_PRIORITIES, "invalid_priority")
}

fn one_of(
    value: &str,
    allowed: &[&str],
    code: &'static str,
) -> Result<(), validator::ValidationError> {
    if !allowed.contains(&value) {
        return Err(validator::ValidationError::new(code));
    }
    Ok(())
}
