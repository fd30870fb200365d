// src/models/submission.rs

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::progress::UserProgress;

/// A raw answer as sent by the client.
///
/// Any JSON value deserializes: strings and string arrays get their own
/// variants, everything else lands in `Malformed` and is graded as incorrect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Text(String),
    Choices(Vec<String>),
    Malformed(serde_json::Value),
}

/// DTO for submitting a mock test or paper attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    /// Key: question id. Value: the user's answer.
    #[serde(default, deserialize_with = "question_id_keys")]
    pub answers: HashMap<i64, SubmittedAnswer>,
}

/// Keeps the entries whose key is a question id and drops the rest.
///
/// A body whose `answers` is not an object at all is read as no answers.
fn question_id_keys<'de, D>(deserializer: D) -> Result<HashMap<i64, SubmittedAnswer>, D::Error>
where
    D: Deserializer<'de>,
{
    let serde_json::Value::Object(raw) = serde_json::Value::deserialize(deserializer)? else {
        tracing::debug!("Submission answers are not an object, treating as empty");
        return Ok(HashMap::new());
    };

    let mut answers = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let Ok(question_id) = key.trim().parse::<i64>() else {
            tracing::debug!("Ignoring answer under non-numeric key '{}'", key);
            continue;
        };
        let answer = serde_json::from_value(value).map_err(serde::de::Error::custom)?;
        answers.insert(question_id, answer);
    }
    Ok(answers)
}

/// Grading outcome for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: i64,
    /// `None` when the question needs manual grading.
    pub correct: Option<bool>,
    pub marks: i32,
}

/// A question that could not be graded because its configuration is invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnscoredQuestion {
    pub question_id: i64,
    pub error: String,
}

/// Result of scoring one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    /// Ordered by question id.
    pub results: Vec<QuestionResult>,
    /// Free-text questions awaiting manual grading.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_review: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unscored: Vec<UnscoredQuestion>,
}

/// What happened to the progress side effect of a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressOutcome {
    Updated { topics: Vec<UserProgress> },
    Failed { retryable: bool, error: String },
}

/// Response body of the submit endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(flatten)]
    pub summary: ScoreSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<i64>,
    pub progress: ProgressOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_deserialize_into_variants() {
        let req: SubmitAnswersRequest = serde_json::from_str(
            r#"{"answers": {"1": "A", "2": ["X", "Y"], "3": 42, "4": ["X", 1], "5": null}}"#,
        )
        .unwrap();

        assert_eq!(req.answers[&1], SubmittedAnswer::Text("A".into()));
        assert_eq!(
            req.answers[&2],
            SubmittedAnswer::Choices(vec!["X".into(), "Y".into()])
        );
        assert!(matches!(req.answers[&3], SubmittedAnswer::Malformed(_)));
        assert!(matches!(req.answers[&4], SubmittedAnswer::Malformed(_)));
        assert_eq!(
            req.answers[&5],
            SubmittedAnswer::Malformed(serde_json::Value::Null)
        );
    }

    #[test]
    fn non_numeric_keys_are_dropped() {
        let req: SubmitAnswersRequest =
            serde_json::from_str(r#"{"answers": {"1": "A", "q7": "B", "": ["X"]}}"#).unwrap();

        assert_eq!(req.answers.len(), 1);
        assert_eq!(req.answers[&1], SubmittedAnswer::Text("A".into()));
    }

    #[test]
    fn non_object_answers_are_empty() {
        for body in [r#"{"answers": null}"#, r#"{"answers": ["A", "B"]}"#] {
            let req: SubmitAnswersRequest = serde_json::from_str(body).unwrap();
            assert!(req.answers.is_empty(), "{body}");
        }
    }

    #[test]
    fn missing_answers_field_is_empty() {
        let req: SubmitAnswersRequest = serde_json::from_str("{}").unwrap();
        assert!(req.answers.is_empty());
    }

    #[test]
    fn empty_flags_are_omitted() {
        let summary = ScoreSummary {
            score: 2,
            max_score: 2,
            percentage: 100.0,
            results: vec![QuestionResult {
                question_id: 1,
                correct: Some(true),
                marks: 2,
            }],
            pending_review: vec![],
            unscored: vec![],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("pendingReview").is_none());
        assert!(json.get("unscored").is_none());
        assert_eq!(json["maxScore"], 2);
        assert_eq!(json["results"][0]["questionId"], 1);
    }

    #[test]
    fn failed_progress_is_tagged() {
        let outcome = ProgressOutcome::Failed {
            retryable: true,
            error: "down".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["retryable"], true);
    }
}
