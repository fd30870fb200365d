// src/models/recommendation.rs

use serde::Serialize;

use crate::{
    models::{
        mock_test::MockTestSummary,
        paper::Paper,
        progress::{StrengthLevel, UserProgress},
    },
    services::recommendations::StepPlan,
};

/// Response of `GET /api/progress/recommendations`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub recommended_tests: Vec<MockTestSummary>,
    pub previous_year_papers: Vec<Paper>,
    pub weak_areas: Vec<UserProgress>,
    pub strong_areas: Vec<UserProgress>,
}

#[derive(Debug, Default, Serialize)]
pub struct RecommendedResources {
    pub tests: Vec<MockTestSummary>,
    pub papers: Vec<Paper>,
}

#[derive(Debug, Serialize)]
pub struct NextStep {
    #[serde(flatten)]
    pub plan: StepPlan,
    pub recommended: RecommendedResources,
}

/// One topic on the learning path.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathEntry {
    pub subject: String,
    pub topic: String,
    pub current_level: StrengthLevel,
    /// The topic's average score.
    pub progress: f64,
    pub next_steps: Vec<NextStep>,
}
