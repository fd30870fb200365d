// src/services/recommendations.rs

//! Study suggestions derived from a user's progress records.
//!
//! Everything here is pure. The handlers turn the planned lookups into
//! catalog queries.

use serde::Serialize;

use crate::models::progress::UserProgress;

/// Tests suggested per weak or improving topic.
pub const WEAK_AREA_TESTS: i64 = 3;
/// Hard tests suggested per good or excellent topic.
pub const STRONG_AREA_TESTS: i64 = 2;
/// Latest papers across the subjects the user has attempted.
pub const LATEST_PAPERS: i64 = 5;
/// Per learning-path step.
pub const STEP_TESTS: i64 = 3;
pub const STEP_PAPERS: i64 = 2;

/// Difficulty band used for suggestions.
///
/// Papers store these names directly; tests use their own scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn paper_level(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn test_level(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Beginner",
            Difficulty::Medium => "Intermediate",
            Difficulty::Hard => "Advanced",
        }
    }
}

/// How a test lookup combines the topic and difficulty conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicMatch {
    /// Covers the topic or sits at the difficulty.
    TopicOrDifficulty,
    /// Covers the topic and sits at the difficulty.
    TopicAndDifficulty,
}

/// One catalog lookup for tests in a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct TestLookup {
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub matching: TopicMatch,
    pub limit: i64,
}

/// Plans the test lookups for the recommendations view.
///
/// Weak and improving topics get easier material (Easy below 40, Medium
/// otherwise). Good and excellent topics get Hard tests on the same topic.
pub fn plan_test_lookups(progress: &[UserProgress]) -> Vec<TestLookup> {
    let (weak, strong): (Vec<_>, Vec<_>) =
        progress.iter().partition(|p| p.strength_level.needs_work());

    let weak = weak.into_iter().map(|p| TestLookup {
        subject: p.subject.clone(),
        topic: p.topic.clone(),
        difficulty: if p.average_score < 40.0 {
            Difficulty::Easy
        } else {
            Difficulty::Medium
        },
        matching: TopicMatch::TopicOrDifficulty,
        limit: WEAK_AREA_TESTS,
    });
    let strong = strong.into_iter().map(|p| TestLookup {
        subject: p.subject.clone(),
        topic: p.topic.clone(),
        difficulty: Difficulty::Hard,
        matching: TopicMatch::TopicAndDifficulty,
        limit: STRONG_AREA_TESTS,
    });

    weak.chain(strong).collect()
}

/// Distinct subjects in first-seen order.
pub fn attempted_subjects(progress: &[UserProgress]) -> Vec<String> {
    let mut subjects: Vec<String> = Vec::new();
    for p in progress {
        if !subjects.contains(&p.subject) {
            subjects.push(p.subject.clone());
        }
    }
    subjects
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepKind {
    Practice,
    Advanced,
    Mastery,
}

/// What to do next on a topic, before resources are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepPlan {
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub difficulty: Difficulty,
    pub focus: &'static str,
}

impl StepPlan {
    /// Bands: below 40, 40-59, 60-79, 80 and up.
    pub fn for_average(average: f64) -> Self {
        let (kind, difficulty, focus) = if average < 40.0 {
            (StepKind::Practice, Difficulty::Easy, "Fundamentals")
        } else if average < 60.0 {
            (StepKind::Practice, Difficulty::Medium, "Concept Building")
        } else if average < 80.0 {
            (StepKind::Advanced, Difficulty::Hard, "Problem Solving")
        } else {
            (StepKind::Mastery, Difficulty::Hard, "Advanced Concepts")
        };
        Self {
            kind,
            difficulty,
            focus,
        }
    }
}

/// Orders records for the learning path: weakest average first.
pub fn learning_path_order(mut progress: Vec<UserProgress>) -> Vec<UserProgress> {
    progress.sort_by(|a, b| {
        a.average_score
            .total_cmp(&b.average_score)
            .then_with(|| a.key().cmp(&b.key()))
    });
    progress
}
