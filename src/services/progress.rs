// src/services/progress.rs

//! Rolling per-topic progress tracking.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    progress::{TopicKey, TopicTally, UserProgress},
    submission::ScoreSummary,
};

#[derive(Debug, Error)]
pub enum ProgressError {
    /// The store could not be read or written. Nothing was committed.
    #[error("progress persistence failed: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for ProgressError {
    fn from(err: sqlx::Error) -> Self {
        ProgressError::Persistence(err.to_string())
    }
}

/// Persistent home of `UserProgress` records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Folds every tally into the matching record, creating missing records.
    ///
    /// Implementations must apply all tallies or none, and must serialize
    /// concurrent updates of the same (user, subject, topic).
    async fn apply_tallies(
        &self,
        user_id: i64,
        tallies: &BTreeMap<TopicKey, TopicTally>,
        at: DateTime<Utc>,
    ) -> Result<Vec<UserProgress>, ProgressError>;

    async fn list_for_user(
        &self,
        user_id: i64,
        subject: Option<&str>,
    ) -> Result<Vec<UserProgress>, ProgressError>;
}

/// Turns scored submissions into progress updates.
#[derive(Clone)]
pub struct ProgressAggregator {
    store: Arc<dyn ProgressStore>,
}

impl ProgressAggregator {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Groups a summary's results by topic.
    ///
    /// Results pending manual grading mark their topic as attempted but add
    /// nothing to the question or correct counts.
    pub fn tally(
        summary: &ScoreSummary,
        topics: &HashMap<i64, TopicKey>,
    ) -> BTreeMap<TopicKey, TopicTally> {
        let mut tallies: BTreeMap<TopicKey, TopicTally> = BTreeMap::new();

        for result in &summary.results {
            let Some(key) = topics.get(&result.question_id) else {
                tracing::warn!(
                    "No topic for question {}, skipping progress",
                    result.question_id
                );
                continue;
            };

            let tally = tallies.entry(key.clone()).or_default();
            if let Some(correct) = result.correct {
                tally.questions += 1;
                if correct {
                    tally.correct += 1;
                }
            }
        }

        tallies
    }

    /// Updates the user's progress for every topic the submission touched.
    ///
    /// Either every touched record is updated or none is.
    pub async fn apply_submission(
        &self,
        user_id: i64,
        summary: &ScoreSummary,
        topics: &HashMap<i64, TopicKey>,
    ) -> Result<Vec<UserProgress>, ProgressError> {
        let tallies = Self::tally(summary, topics);
        if tallies.is_empty() {
            return Ok(Vec::new());
        }

        let updated = self.store.apply_tallies(user_id, &tallies, Utc::now()).await?;
        tracing::debug!("Updated progress for user {} on {} topics", user_id, updated.len());
        Ok(updated)
    }

    pub async fn progress_for(
        &self,
        user_id: i64,
        subject: Option<&str>,
    ) -> Result<Vec<UserProgress>, ProgressError> {
        self.store.list_for_user(user_id, subject).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::QuestionResult;

    fn result(question_id: i64, correct: Option<bool>) -> QuestionResult {
        QuestionResult {
            question_id,
            correct,
            marks: 0,
        }
    }

    #[test]
    fn tally_groups_by_topic() {
        let summary = ScoreSummary {
            score: 0,
            max_score: 0,
            percentage: 0.0,
            results: vec![
                result(1, Some(true)),
                result(2, Some(false)),
                result(3, Some(true)),
                result(4, None),
                result(5, None),
                result(6, Some(true)),
            ],
            pending_review: vec![4, 5],
            unscored: vec![],
        };
        let supply = TopicKey::new("Econ", "Supply");
        let demand = TopicKey::new("Econ", "Demand");
        let essays = TopicKey::new("Econ", "Essays");
        let topics = HashMap::from([
            (1, supply.clone()),
            (2, supply.clone()),
            (3, demand.clone()),
            (4, demand.clone()),
            (5, essays.clone()),
        ]);

        let tallies = ProgressAggregator::tally(&summary, &topics);

        assert_eq!(tallies.len(), 3);
        assert_eq!(tallies[&supply], TopicTally { questions: 2, correct: 1 });
        assert_eq!(tallies[&demand], TopicTally { questions: 1, correct: 1 });
        assert_eq!(tallies[&essays], TopicTally { questions: 0, correct: 0 });
    }
}
