// src/models/progress.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Qualitative label derived from a topic's average score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum StrengthLevel {
    Weak,
    #[default]
    Improving,
    Good,
    Excellent,
}

impl StrengthLevel {
    /// Weak < 40, Improving 40-59, Good 60-79, Excellent >= 80.
    pub fn from_average(average: f64) -> Self {
        if average >= 80.0 {
            StrengthLevel::Excellent
        } else if average >= 60.0 {
            StrengthLevel::Good
        } else if average >= 40.0 {
            StrengthLevel::Improving
        } else {
            StrengthLevel::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthLevel::Weak => "Weak",
            StrengthLevel::Improving => "Improving",
            StrengthLevel::Good => "Good",
            StrengthLevel::Excellent => "Excellent",
        }
    }

    pub fn needs_work(&self) -> bool {
        matches!(self, StrengthLevel::Weak | StrengthLevel::Improving)
    }
}

impl fmt::Display for StrengthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrengthLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Weak" => Ok(StrengthLevel::Weak),
            "Improving" => Ok(StrengthLevel::Improving),
            "Good" => Ok(StrengthLevel::Good),
            "Excellent" => Ok(StrengthLevel::Excellent),
            other => Err(format!("unknown strength level '{other}'")),
        }
    }
}

/// (subject, topic) bucket used for progress tracking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TopicKey {
    pub subject: String,
    pub topic: String,
}

impl TopicKey {
    pub fn new(subject: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            topic: topic.into(),
        }
    }
}

/// One submission's contribution to a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopicTally {
    /// Auto-graded questions seen in this submission.
    pub questions: i32,
    /// Of those, how many were correct.
    pub correct: i32,
}

/// Rolling performance record for one (user, subject, topic).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: i64,
    pub subject: String,
    pub topic: String,
    pub total_attempts: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub average_score: f64,
    pub time_spent_minutes: i32,
    pub last_attempt_date: Option<DateTime<Utc>>,
    pub strength_level: StrengthLevel,
}

impl UserProgress {
    /// A fresh record with zero counts.
    pub fn new(user_id: i64, key: &TopicKey) -> Self {
        Self {
            user_id,
            subject: key.subject.clone(),
            topic: key.topic.clone(),
            total_attempts: 0,
            total_questions: 0,
            correct_answers: 0,
            average_score: 0.0,
            time_spent_minutes: 0,
            last_attempt_date: None,
            strength_level: StrengthLevel::default(),
        }
    }

    pub fn key(&self) -> TopicKey {
        TopicKey::new(self.subject.clone(), self.topic.clone())
    }

    /// Folds one submission's tally into the record.
    ///
    /// The average and strength are derived from the counts and stay unchanged
    /// while `total_questions` is zero.
    pub fn absorb(&mut self, tally: TopicTally, at: DateTime<Utc>) {
        let correct = tally.correct.clamp(0, tally.questions.max(0));

        self.total_attempts += 1;
        self.total_questions += tally.questions.max(0);
        self.correct_answers += correct;

        if self.total_questions > 0 {
            self.average_score =
                self.correct_answers as f64 / self.total_questions as f64 * 100.0;
            self.strength_level = StrengthLevel::from_average(self.average_score);
        }

        self.last_attempt_date = Some(at);
    }
}

/// Raw 'user_progress' row; `strength_level` is stored as text.
#[derive(Debug, FromRow)]
pub struct UserProgressRow {
    pub user_id: i64,
    pub subject: String,
    pub topic: String,
    pub total_attempts: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub average_score: f64,
    pub time_spent_minutes: i32,
    pub last_attempt_date: Option<DateTime<Utc>>,
    pub strength_level: String,
}

impl From<UserProgressRow> for UserProgress {
    fn from(row: UserProgressRow) -> Self {
        let strength_level = row.strength_level.parse().unwrap_or_else(|e| {
            tracing::warn!("user_progress row for user {}: {}", row.user_id, e);
            StrengthLevel::from_average(row.average_score)
        });

        Self {
            user_id: row.user_id,
            subject: row.subject,
            topic: row.topic,
            total_attempts: row.total_attempts,
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            average_score: row.average_score,
            time_spent_minutes: row.time_spent_minutes,
            last_attempt_date: row.last_attempt_date,
            strength_level,
        }
    }
}

/// Query parameters for `GET /api/progress`.
#[derive(Debug, Deserialize)]
pub struct ProgressParams {
    pub subject: Option<String>,
}

/// Weak and strong areas for the study focus view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusAreas {
    /// Weak and Improving topics, lowest average first.
    pub weak_areas: Vec<UserProgress>,
    /// Good and Excellent topics, highest average first.
    pub strong_areas: Vec<UserProgress>,
}

impl FocusAreas {
    pub fn split(progress: Vec<UserProgress>) -> Self {
        let (mut weak_areas, mut strong_areas): (Vec<_>, Vec<_>) = progress
            .into_iter()
            .partition(|p| p.strength_level.needs_work());

        weak_areas.sort_by(|a, b| a.average_score.total_cmp(&b.average_score));
        strong_areas.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));

        Self {
            weak_areas,
            strong_areas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> TopicKey {
        TopicKey::new("Econ", "Supply")
    }

    #[test]
    fn strength_thresholds() {
        assert_eq!(StrengthLevel::from_average(0.0), StrengthLevel::Weak);
        assert_eq!(StrengthLevel::from_average(39.99), StrengthLevel::Weak);
        assert_eq!(StrengthLevel::from_average(40.0), StrengthLevel::Improving);
        assert_eq!(StrengthLevel::from_average(59.9), StrengthLevel::Improving);
        assert_eq!(StrengthLevel::from_average(60.0), StrengthLevel::Good);
        assert_eq!(StrengthLevel::from_average(79.9), StrengthLevel::Good);
        assert_eq!(StrengthLevel::from_average(80.0), StrengthLevel::Excellent);
        assert_eq!(StrengthLevel::from_average(100.0), StrengthLevel::Excellent);
    }

    #[test]
    fn strength_labels_round_trip_through_column_text() {
        for level in [
            StrengthLevel::Weak,
            StrengthLevel::Improving,
            StrengthLevel::Good,
            StrengthLevel::Excellent,
        ] {
            assert_eq!(level.as_str().parse::<StrengthLevel>().unwrap(), level);
        }
        assert!("Mediocre".parse::<StrengthLevel>().is_err());
    }

    #[test]
    fn absorb_accumulates_and_recomputes() {
        let now = Utc::now();
        let mut p = UserProgress::new(7, &key());

        p.absorb(TopicTally { questions: 4, correct: 1 }, now);
        assert_eq!(p.total_attempts, 1);
        assert_eq!(p.average_score, 25.0);
        assert_eq!(p.strength_level, StrengthLevel::Weak);

        p.absorb(TopicTally { questions: 4, correct: 4 }, now);
        assert_eq!(p.total_attempts, 2);
        assert_eq!(p.total_questions, 8);
        assert_eq!(p.correct_answers, 5);
        assert_eq!(p.average_score, 62.5);
        assert_eq!(p.strength_level, StrengthLevel::Good);
        assert_eq!(p.last_attempt_date, Some(now));
    }

    #[test]
    fn empty_tally_keeps_average() {
        let mut p = UserProgress::new(1, &key());
        p.absorb(TopicTally::default(), Utc::now());

        assert_eq!(p.total_attempts, 1);
        assert_eq!(p.total_questions, 0);
        assert_eq!(p.average_score, 0.0);
        assert_eq!(p.strength_level, StrengthLevel::Improving);

        p.absorb(TopicTally { questions: 2, correct: 2 }, Utc::now());
        p.absorb(TopicTally::default(), Utc::now());
        assert_eq!(p.average_score, 100.0);
        assert_eq!(p.strength_level, StrengthLevel::Excellent);
    }

    #[test]
    fn correct_never_exceeds_questions() {
        let mut p = UserProgress::new(1, &key());
        p.absorb(TopicTally { questions: 1, correct: 3 }, Utc::now());
        assert!(p.correct_answers <= p.total_questions);
    }

    #[test]
    fn focus_split_orders_areas() {
        let mk = |topic: &str, avg: f64| {
            let mut p = UserProgress::new(1, &TopicKey::new("Econ", topic));
            p.average_score = avg;
            p.strength_level = StrengthLevel::from_average(avg);
            p
        };
        let focus = FocusAreas::split(vec![
            mk("a", 55.0),
            mk("b", 90.0),
            mk("c", 10.0),
            mk("d", 65.0),
        ]);

        let weak: Vec<_> = focus.weak_areas.iter().map(|p| p.topic.as_str()).collect();
        let strong: Vec<_> = focus.strong_areas.iter().map(|p| p.topic.as_str()).collect();
        assert_eq!(weak, vec!["c", "a"]);
        assert_eq!(strong, vec!["b", "d"]);
    }
}
