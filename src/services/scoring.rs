// src/services/scoring.rs

//! Answer comparison and submission scoring.
//!
//! Everything here is pure: the caller fetches the questions and hands them in.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::{
    progress::TopicKey,
    question::Question,
    submission::{QuestionResult, ScoreSummary, SubmittedAnswer, UnscoredQuestion},
};

pub const SINGLE_CHOICE: &str = "single-choice";
pub const MULTI_SELECT: &str = "multi-select";
pub const FREE_TEXT: &str = "free-text";

/// Configuration problems found in a stored question.
///
/// An unknown type keeps the question from being graded. A malformed key only
/// means no answer can match it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("invalid question type '{0}'")]
    InvalidQuestionType(String),

    #[error("answer key does not match question type '{0}'")]
    MalformedAnswerKey(String),
}

/// The typed answer key of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    SingleChoice(String),
    MultiSelect(Vec<String>),
    /// Graded by a human.
    FreeText,
}

impl AnswerKey {
    /// Builds the key from the raw type string and the stored JSON answer.
    pub fn parse(
        question_type: &str,
        correct_answer: Option<&serde_json::Value>,
    ) -> Result<Self, ScoringError> {
        let malformed = || ScoringError::MalformedAnswerKey(question_type.to_string());

        match question_type {
            SINGLE_CHOICE => correct_answer
                .and_then(|v| v.as_str())
                .map(|s| AnswerKey::SingleChoice(s.to_string()))
                .ok_or_else(malformed),
            MULTI_SELECT => {
                let items = correct_answer
                    .and_then(|v| v.as_array())
                    .ok_or_else(malformed)?;
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(AnswerKey::MultiSelect)
                    .ok_or_else(malformed)
            }
            FREE_TEXT => Ok(AnswerKey::FreeText),
            other => Err(ScoringError::InvalidQuestionType(other.to_string())),
        }
    }

    pub fn from_question(question: &Question) -> Result<Self, ScoringError> {
        Self::parse(&question.question_type, question.correct_answer.as_ref())
    }
}

/// Decides whether `answer` matches `key`.
///
/// * Single-choice: exact string equality. Case-sensitive and untrimmed, so
///   `"a"` does not match `"A"` and `"A "` does not match `"A"`.
/// * Multi-select: both sides are compared as sets, order and duplicates
///   are ignored.
/// * Free-text: always `None`, the answer needs manual grading.
///
/// A missing answer or one of the wrong shape is incorrect. Never panics.
pub fn compare(answer: Option<&SubmittedAnswer>, key: &AnswerKey) -> Option<bool> {
    match key {
        AnswerKey::SingleChoice(correct) => Some(matches!(
            answer,
            Some(SubmittedAnswer::Text(given)) if given == correct
        )),
        AnswerKey::MultiSelect(correct) => Some(match answer {
            Some(SubmittedAnswer::Choices(given)) => {
                let given: HashSet<&str> = given.iter().map(String::as_str).collect();
                let correct: HashSet<&str> = correct.iter().map(String::as_str).collect();
                given.len() == correct.len() && given.iter().all(|g| correct.contains(g))
            }
            _ => false,
        }),
        AnswerKey::FreeText => None,
    }
}

/// Scores a submission against the questions of one test or paper.
///
/// Results are ordered by question id so the same input always yields the
/// same summary. Free-text questions score zero, are left out of
/// `max_score` and are listed in `pending_review`. A known type whose stored
/// key has the wrong shape matches nothing, so it is graded incorrect. Questions
/// of an unknown type are left out entirely and listed in `unscored`.
pub fn score_submission(
    questions: &[Question],
    answers: &HashMap<i64, SubmittedAnswer>,
) -> ScoreSummary {
    let mut ordered: Vec<&Question> = questions.iter().collect();
    ordered.sort_by_key(|q| q.id);

    let mut score = 0;
    let mut max_score = 0;
    let mut results = Vec::with_capacity(ordered.len());
    let mut pending_review = Vec::new();
    let mut unscored = Vec::new();

    for question in ordered {
        let correct = match AnswerKey::from_question(question) {
            Ok(key) => compare(answers.get(&question.id), &key),
            Err(e @ ScoringError::MalformedAnswerKey(_)) => {
                tracing::warn!("Question {} graded incorrect: {}", question.id, e);
                Some(false)
            }
            Err(e @ ScoringError::InvalidQuestionType(_)) => {
                tracing::warn!("Question {} cannot be scored: {}", question.id, e);
                unscored.push(UnscoredQuestion {
                    question_id: question.id,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let marks = match correct {
            Some(true) => question.marks,
            _ => 0,
        };

        match correct {
            Some(_) => max_score += question.marks,
            None => pending_review.push(question.id),
        }
        score += marks;

        results.push(QuestionResult {
            question_id: question.id,
            correct,
            marks,
        });
    }

    let unknown = answers
        .keys()
        .filter(|id| !questions.iter().any(|q| q.id == **id))
        .count();
    if unknown > 0 {
        tracing::debug!("Ignoring {} answers for questions outside the submission", unknown);
    }

    ScoreSummary {
        score,
        max_score,
        percentage: percentage(score, max_score),
        results,
        pending_review,
        unscored,
    }
}

/// Maps every question id to its (subject, topic) bucket.
pub fn topic_map(questions: &[Question]) -> HashMap<i64, TopicKey> {
    questions
        .iter()
        .map(|q| (q.id, TopicKey::new(q.subject.clone(), q.topic.clone())))
        .collect()
}

fn percentage(score: i32, max_score: i32) -> f64 {
    if max_score <= 0 {
        return 0.0;
    }
    score as f64 / max_score as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::types::Json;

    fn question(id: i64, question_type: &str, key: serde_json::Value, marks: i32) -> Question {
        Question {
            id,
            test_id: Some(1),
            paper_id: None,
            question_text: format!("Question {id}"),
            question_type: question_type.to_string(),
            options: Json(vec!["A".into(), "B".into(), "C".into()]),
            correct_answer: if key.is_null() { None } else { Some(key) },
            marks,
            subject: "Econ".into(),
            topic: "Supply".into(),
            explanation: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn text(s: &str) -> SubmittedAnswer {
        SubmittedAnswer::Text(s.to_string())
    }

    fn choices(items: &[&str]) -> SubmittedAnswer {
        SubmittedAnswer::Choices(items.iter().map(|s| s.to_string()).collect())
    }

    fn multi(items: &[&str]) -> AnswerKey {
        AnswerKey::MultiSelect(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn single_choice_is_reflexive() {
        for x in ["A", "", "Opportunity cost", "  spaced  ", "ünïcödé"] {
            let key = AnswerKey::SingleChoice(x.to_string());
            assert_eq!(compare(Some(&text(x)), &key), Some(true), "{x:?}");
        }
    }

    #[test]
    fn single_choice_is_strict() {
        let key = AnswerKey::SingleChoice("A".into());
        assert_eq!(compare(Some(&text("B")), &key), Some(false));
        assert_eq!(compare(Some(&text("a")), &key), Some(false));
        assert_eq!(compare(Some(&text("A ")), &key), Some(false));
        assert_eq!(compare(Some(&choices(&["A"])), &key), Some(false));
        assert_eq!(compare(None, &key), Some(false));
    }

    #[test]
    fn multi_select_ignores_order() {
        assert_eq!(compare(Some(&choices(&["A", "B"])), &multi(&["B", "A"])), Some(true));
        assert_eq!(
            compare(Some(&choices(&["X", "Y", "Z"])), &multi(&["Z", "X", "Y"])),
            Some(true)
        );
    }

    #[test]
    fn multi_select_rejects_subsets_and_supersets() {
        assert_eq!(compare(Some(&choices(&["A"])), &multi(&["A", "B"])), Some(false));
        assert_eq!(compare(Some(&choices(&["A", "B", "C"])), &multi(&["A", "B"])), Some(false));
        assert_eq!(compare(Some(&choices(&[])), &multi(&["A"])), Some(false));
        assert_eq!(compare(Some(&choices(&["A", "C"])), &multi(&["A", "B"])), Some(false));
    }

    #[test]
    fn multi_select_treats_duplicates_as_one() {
        assert_eq!(compare(Some(&choices(&["A", "A"])), &multi(&["A", "B"])), Some(false));
        assert_eq!(compare(Some(&choices(&["A", "A"])), &multi(&["A"])), Some(true));
    }

    #[test]
    fn multi_select_rejects_non_sequences() {
        let key = multi(&["A"]);
        assert_eq!(compare(Some(&text("A")), &key), Some(false));
        assert_eq!(
            compare(Some(&SubmittedAnswer::Malformed(json!({"A": true}))), &key),
            Some(false)
        );
        assert_eq!(compare(None, &key), Some(false));
    }

    #[test]
    fn free_text_always_needs_review() {
        let answers = [
            None,
            Some(text("Because demand is elastic")),
            Some(choices(&["A"])),
            Some(SubmittedAnswer::Malformed(json!(3))),
        ];
        for answer in answers.iter() {
            assert_eq!(compare(answer.as_ref(), &AnswerKey::FreeText), None);
        }
    }

    #[test]
    fn answer_key_parsing() {
        assert_eq!(
            AnswerKey::parse(SINGLE_CHOICE, Some(&json!("A"))),
            Ok(AnswerKey::SingleChoice("A".into()))
        );
        assert_eq!(
            AnswerKey::parse(MULTI_SELECT, Some(&json!(["A", "B"]))),
            Ok(multi(&["A", "B"]))
        );
        assert_eq!(AnswerKey::parse(FREE_TEXT, None), Ok(AnswerKey::FreeText));
        assert_eq!(
            AnswerKey::parse("MCQ", Some(&json!("A"))),
            Err(ScoringError::InvalidQuestionType("MCQ".into()))
        );
        assert_eq!(
            AnswerKey::parse(MULTI_SELECT, Some(&json!("A"))),
            Err(ScoringError::MalformedAnswerKey(MULTI_SELECT.into()))
        );
        assert_eq!(
            AnswerKey::parse(MULTI_SELECT, Some(&json!(["A", 2]))),
            Err(ScoringError::MalformedAnswerKey(MULTI_SELECT.into()))
        );
        assert_eq!(
            AnswerKey::parse(SINGLE_CHOICE, None),
            Err(ScoringError::MalformedAnswerKey(SINGLE_CHOICE.into()))
        );
    }

    #[test]
    fn scores_mixed_submission() {
        let questions = vec![
            question(3, FREE_TEXT, serde_json::Value::Null, 5),
            question(1, SINGLE_CHOICE, json!("A"), 2),
            question(2, MULTI_SELECT, json!(["Y", "X"]), 3),
            question(4, SINGLE_CHOICE, json!("C"), 4),
        ];
        let answers = HashMap::from([
            (1, text("A")),
            (2, choices(&["X", "Y"])),
            (3, text("An essay")),
            (4, text("B")),
            (99, text("stray")),
        ]);

        let summary = score_submission(&questions, &answers);

        assert_eq!(summary.score, 5);
        assert_eq!(summary.max_score, 9);
        assert!((summary.percentage - 500.0 / 9.0).abs() < 1e-9);
        assert_eq!(summary.pending_review, vec![3]);
        assert!(summary.unscored.is_empty());

        let ids: Vec<i64> = summary.results.iter().map(|r| r.question_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(
            summary.results[2],
            QuestionResult {
                question_id: 3,
                correct: None,
                marks: 0
            }
        );
        assert_eq!(summary.results[3].correct, Some(false));
    }

    #[test]
    fn invalid_question_type_only_skips_that_question() {
        let questions = vec![
            question(1, SINGLE_CHOICE, json!("A"), 2),
            question(2, "essay-ish", json!("A"), 10),
        ];
        let answers = HashMap::from([(1, text("A")), (2, text("A"))]);

        let summary = score_submission(&questions, &answers);

        assert_eq!(summary.score, 2);
        assert_eq!(summary.max_score, 2);
        assert_eq!(summary.percentage, 100.0);
        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.unscored.len(), 1);
        assert_eq!(summary.unscored[0].question_id, 2);
        assert!(summary.unscored[0].error.contains("essay-ish"));
    }

    #[test]
    fn malformed_key_is_graded_incorrect() {
        let questions = vec![
            question(1, MULTI_SELECT, json!("A"), 3),
            question(2, SINGLE_CHOICE, json!(["A"]), 2),
            question(3, SINGLE_CHOICE, json!("A"), 1),
        ];
        let answers = HashMap::from([(1, choices(&["A"])), (2, text("A")), (3, text("A"))]);

        let summary = score_submission(&questions, &answers);

        assert_eq!(
            summary.results[0],
            QuestionResult {
                question_id: 1,
                correct: Some(false),
                marks: 0
            }
        );
        assert_eq!(summary.results[1].correct, Some(false));
        assert_eq!(summary.score, 1);
        assert_eq!(summary.max_score, 6);
        assert!(summary.unscored.is_empty());
    }

    #[test]
    fn empty_or_free_text_only_gives_zero_percent() {
        let summary = score_submission(&[], &HashMap::new());
        assert_eq!(summary.percentage, 0.0);

        let questions = vec![question(1, FREE_TEXT, serde_json::Value::Null, 5)];
        let summary = score_submission(&questions, &HashMap::new());
        assert_eq!(summary.max_score, 0);
        assert_eq!(summary.percentage, 0.0);
        assert_eq!(summary.pending_review, vec![1]);
    }

    #[test]
    fn unanswered_questions_are_wrong() {
        let questions = vec![question(1, SINGLE_CHOICE, json!("A"), 2)];
        let summary = score_submission(&questions, &HashMap::new());
        assert_eq!(summary.results[0].correct, Some(false));
        assert_eq!(summary.max_score, 2);
    }

    #[test]
    fn topic_map_covers_every_question() {
        let mut q2 = question(2, SINGLE_CHOICE, json!("A"), 1);
        q2.topic = "Demand".into();
        let map = topic_map(&[question(1, SINGLE_CHOICE, json!("A"), 1), q2]);
        assert_eq!(map[&1], TopicKey::new("Econ", "Supply"));
        assert_eq!(map[&2], TopicKey::new("Econ", "Demand"));
    }
}
