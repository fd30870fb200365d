// src/handlers/progress.rs

use axum::{
    Json,
    extract::{Query, State},
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::{mock_tests, papers},
    models::{
        mock_test::MockTestSummary,
        progress::{FocusAreas, ProgressParams, UserProgress},
        recommendation::{LearningPathEntry, NextStep, Recommendations, RecommendedResources},
    },
    services::{
        progress::ProgressAggregator,
        recommendations::{
            LATEST_PAPERS, STEP_PAPERS, STEP_TESTS, StepPlan, TestLookup, TopicMatch,
            attempted_subjects, learning_path_order, plan_test_lookups,
        },
    },
    utils::jwt::AuthUser,
};

/// The caller's progress records, optionally limited to one subject.
pub async fn get_progress(
    State(aggregator): State<ProgressAggregator>,
    auth: AuthUser,
    Query(params): Query<ProgressParams>,
) -> Result<Json<Vec<UserProgress>>, AppError> {
    let subject = params.subject.as_deref().filter(|s| !s.is_empty());
    let progress = aggregator.progress_for(auth.id, subject).await?;
    Ok(Json(progress))
}

/// Weak and strong areas across all subjects.
pub async fn get_focus_areas(
    State(aggregator): State<ProgressAggregator>,
    auth: AuthUser,
) -> Result<Json<FocusAreas>, AppError> {
    let progress = aggregator.progress_for(auth.id, None).await?;
    Ok(Json(FocusAreas::split(progress)))
}

/// Tests picked for the caller's weak and strong topics, plus the latest
/// papers in every subject they have attempted.
pub async fn get_recommendations(
    State(pool): State<PgPool>,
    State(aggregator): State<ProgressAggregator>,
    auth: AuthUser,
) -> Result<Json<Recommendations>, AppError> {
    let progress = aggregator.progress_for(auth.id, None).await?;

    let mut recommended_tests: Vec<MockTestSummary> = Vec::new();
    for lookup in plan_test_lookups(&progress) {
        for test in mock_tests::find_for_topic(&pool, &lookup).await? {
            // The same test can match several topics
            if !recommended_tests.iter().any(|t| t.id == test.id) {
                recommended_tests.push(test);
            }
        }
    }

    let previous_year_papers =
        papers::latest_for_subjects(&pool, &attempted_subjects(&progress), LATEST_PAPERS).await?;

    let FocusAreas {
        weak_areas,
        strong_areas,
    } = FocusAreas::split(progress);

    Ok(Json(Recommendations {
        recommended_tests,
        previous_year_papers,
        weak_areas,
        strong_areas,
    }))
}

/// One next step per topic, weakest topic first.
pub async fn get_learning_path(
    State(pool): State<PgPool>,
    State(aggregator): State<ProgressAggregator>,
    auth: AuthUser,
) -> Result<Json<Vec<LearningPathEntry>>, AppError> {
    let progress = learning_path_order(aggregator.progress_for(auth.id, None).await?);

    let mut path = Vec::with_capacity(progress.len());
    for record in progress {
        let plan = StepPlan::for_average(record.average_score);
        let lookup = TestLookup {
            subject: record.subject.clone(),
            topic: record.topic.clone(),
            difficulty: plan.difficulty,
            matching: TopicMatch::TopicAndDifficulty,
            limit: STEP_TESTS,
        };

        let recommended = RecommendedResources {
            tests: mock_tests::find_for_topic(&pool, &lookup).await?,
            papers: papers::find_for_topic(
                &pool,
                &record.subject,
                &record.topic,
                plan.difficulty,
                STEP_PAPERS,
            )
            .await?,
        };

        path.push(LearningPathEntry {
            subject: record.subject,
            topic: record.topic,
            current_level: record.strength_level,
            progress: record.average_score,
            next_steps: vec![NextStep { plan, recommended }],
        });
    }

    Ok(Json(path))
}
