// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table in the database.
///
/// A question belongs to exactly one mock test or one previous-year paper.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub test_id: Option<i64>,
    pub paper_id: Option<i64>,
    pub question_text: String,

    /// 'single-choice', 'multi-select' or 'free-text'.
    /// Kept as the raw column value; `AnswerKey::from_question` gives the typed view.
    pub question_type: String,

    /// Ordered option strings. Empty for free-text questions.
    pub options: Json<Vec<String>>,

    /// A string for single-choice, an array of strings for multi-select, NULL for free-text.
    pub correct_answer: Option<serde_json::Value>,

    pub marks: i32,
    pub subject: String,
    pub topic: String,
    pub explanation: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to a test taker (no answer key, no explanation).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub marks: i32,
    pub subject: String,
    pub topic: String,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text,
            question_type: q.question_type,
            options: q.options.0,
            marks: q.marks,
            subject: q.subject,
            topic: q.topic,
        }
    }
}

/// DTO for creating a question as part of a mock test or paper.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 20))]
    pub question_type: String,
    #[serde(default)]
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<serde_json::Value>,
    #[validate(range(min = 1, max = 100))]
    pub marks: i32,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("option_length"));
        }
    }
    Ok(())
}

/// Per-test question counts for the admin view.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TestQuestionStats {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub difficulty: String,
    pub question_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
