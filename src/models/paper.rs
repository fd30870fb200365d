// src/models/paper.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use url::Url;
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, PublicQuestion};

pub const PAPER_DIFFICULTIES: [&str; 3] = ["Easy", "Medium", "Hard"];

/// Represents the 'previous_year_papers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub exam_type: String,
    pub subject: String,
    pub description: Option<String>,
    pub difficulty: String,
    pub duration_minutes: i32,
    pub total_marks: i32,
    /// Where the scanned paper lives. Uploading it is handled elsewhere.
    pub pdf_url: Option<String>,
    pub tags: Json<Vec<String>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperDetail {
    #[serde(flatten)]
    pub paper: Paper,
    pub questions: Vec<PublicQuestion>,
}

/// One page of the paper catalog.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperPage {
    pub papers: Vec<Paper>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// Query parameters for the paper catalog.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperListParams {
    pub year: Option<i32>,
    pub exam_type: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Aggregate attempt statistics for one paper.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaperStats {
    pub average_score: Option<f64>,
    pub total_attempts: i64,
    pub highest_score: Option<i32>,
}

/// DTO for creating a paper with its questions (admin).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaperRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1950, max = 2100))]
    pub year: i32,
    #[validate(length(min = 1, max = 100))]
    pub exam_type: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_paper_difficulty))]
    pub difficulty: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    #[validate(range(min = 1))]
    pub total_marks: i32,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

fn validate_paper_difficulty(value: &str) -> Result<(), validator::ValidationError> {
    if !PAPER_DIFFICULTIES.contains(&value) {
        return Err(validator::ValidationError::new("invalid_difficulty"));
    }
    Ok(())
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
