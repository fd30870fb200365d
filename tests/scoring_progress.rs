// tests/scoring_progress.rs

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use q_economics::{
    models::{
        progress::StrengthLevel,
        question::Question,
        submission::{SubmitAnswersRequest, SubmittedAnswer},
    },
    services::{
        progress::ProgressAggregator,
        scoring::{score_submission, topic_map},
    },
    store::MemoryProgressStore,
};
use serde_json::{Value, json};
use sqlx::types::Json;

const USER: i64 = 7;

fn question(id: i64, kind: &str, answer: Value, marks: i32, topic: &str) -> Question {
    Question {
        id,
        test_id: Some(1),
        paper_id: None,
        question_text: format!("Question {id}"),
        question_type: kind.to_string(),
        options: Json(vec!["A".into(), "B".into(), "X".into(), "Y".into(), "Z".into()]),
        correct_answer: if answer.is_null() { None } else { Some(answer) },
        marks,
        subject: "Economics".to_string(),
        topic: topic.to_string(),
        explanation: None,
        created_at: Utc::now(),
    }
}

fn answers(raw: Value) -> HashMap<i64, SubmittedAnswer> {
    serde_json::from_value::<SubmitAnswersRequest>(json!({ "answers": raw }))
        .unwrap()
        .answers
}

fn aggregator() -> (Arc<MemoryProgressStore>, ProgressAggregator) {
    let store = Arc::new(MemoryProgressStore::new());
    let aggregator = ProgressAggregator::new(store.clone());
    (store, aggregator)
}

fn two_topic_test() -> Vec<Question> {
    vec![
        question(1, "single-choice", json!("A"), 2, "Demand"),
        question(2, "multi-select", json!(["X", "Y"]), 3, "Supply"),
    ]
}

#[tokio::test]
async fn perfect_submission_across_two_topics() {
    let (_, aggregator) = aggregator();
    let questions = two_topic_test();

    let summary = score_submission(&questions, &answers(json!({"1": "A", "2": ["Y", "X"]})));

    assert_eq!(summary.score, 5);
    assert_eq!(summary.max_score, 5);
    assert_eq!(summary.percentage, 100.0);

    let updated = aggregator
        .apply_submission(USER, &summary, &topic_map(&questions))
        .await
        .unwrap();

    assert_eq!(updated.len(), 2);
    for row in &updated {
        assert_eq!(row.total_attempts, 1);
        assert_eq!(row.total_questions, 1);
        assert_eq!(row.correct_answers, 1);
        assert_eq!(row.average_score, 100.0);
        assert_eq!(row.strength_level, StrengthLevel::Excellent);
    }

    let stored = aggregator.progress_for(USER, None).await.unwrap();
    assert_eq!(stored, {
        let mut sorted = updated.clone();
        sorted.sort_by(|a, b| a.topic.cmp(&b.topic));
        sorted
    });
}

#[tokio::test]
async fn free_text_is_pending_and_left_out_of_denominators() {
    let (_, aggregator) = aggregator();
    let questions = vec![
        question(1, "single-choice", json!("A"), 2, "Demand"),
        question(2, "free-text", Value::Null, 5, "Essays"),
    ];

    let summary = score_submission(
        &questions,
        &answers(json!({"1": "A", "2": "Prices rise when supply falls."})),
    );

    assert_eq!(summary.score, 2);
    assert_eq!(summary.max_score, 2);
    assert_eq!(summary.pending_review, vec![2]);

    let essay = &summary.results[1];
    assert_eq!(essay.correct, None);
    assert_eq!(essay.marks, 0);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["results"][1]["correct"], Value::Null);

    aggregator
        .apply_submission(USER, &summary, &topic_map(&questions))
        .await
        .unwrap();
    let essays = aggregator
        .progress_for(USER, Some("Economics"))
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.topic == "Essays")
        .unwrap();

    assert_eq!(essays.total_attempts, 1);
    assert_eq!(essays.total_questions, 0);
    assert_eq!(essays.average_score, 0.0);
    assert_eq!(essays.strength_level, StrengthLevel::Improving);
}

#[tokio::test]
async fn scoring_the_same_submission_twice_is_identical() {
    let questions = two_topic_test();
    let submitted = answers(json!({"1": "B", "2": ["X", "Y", "Z"], "99": "ignored"}));

    let first = serde_json::to_string(&score_submission(&questions, &submitted)).unwrap();
    let second = serde_json::to_string(&score_submission(&questions, &submitted)).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn repeated_submissions_only_grow_the_counts() {
    let (_, aggregator) = aggregator();
    let questions = two_topic_test();
    let topics = topic_map(&questions);

    let rounds = [
        json!({"1": "A", "2": ["X"]}),
        json!({"1": "B"}),
        json!({"1": "A", "2": ["X", "Y"]}),
        json!({}),
    ];

    let mut previous: HashMap<String, (i32, i32, i32)> = HashMap::new();
    for (n, raw) in rounds.into_iter().enumerate() {
        let summary = score_submission(&questions, &answers(raw));
        aggregator
            .apply_submission(USER, &summary, &topics)
            .await
            .unwrap();

        for row in aggregator.progress_for(USER, None).await.unwrap() {
            assert_eq!(row.total_attempts, n as i32 + 1);
            assert!(row.correct_answers <= row.total_questions);
            assert!((0.0..=100.0).contains(&row.average_score));

            let now = (row.total_attempts, row.total_questions, row.correct_answers);
            if let Some(before) = previous.get(&row.topic) {
                assert!(now.0 > before.0 && now.1 >= before.1 && now.2 >= before.2);
            }
            previous.insert(row.topic.clone(), now);
        }
    }

    assert_eq!(previous["Demand"], (4, 4, 2));
    assert_eq!(previous["Supply"], (4, 4, 1));
}

#[tokio::test]
async fn concurrent_submissions_lose_no_increments() {
    let (_, aggregator) = aggregator();
    let questions = two_topic_test();
    let topics = Arc::new(topic_map(&questions));
    let summary = Arc::new(score_submission(&questions, &answers(json!({"1": "A"}))));

    let mut handles = Vec::new();
    for _ in 0..25 {
        let aggregator = aggregator.clone();
        let topics = topics.clone();
        let summary = summary.clone();
        handles.push(tokio::spawn(async move {
            aggregator
                .apply_submission(USER, &summary, &topics)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let demand = aggregator
        .progress_for(USER, None)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.topic == "Demand")
        .unwrap();
    assert_eq!(demand.total_attempts, 25);
    assert_eq!(demand.total_questions, 25);
    assert_eq!(demand.correct_answers, 25);
}

#[tokio::test]
async fn failing_store_leaves_no_partial_rows() {
    let (store, aggregator) = aggregator();
    let questions = two_topic_test();
    let summary = score_submission(&questions, &answers(json!({"1": "A", "2": ["X", "Y"]})));

    store.set_unavailable(true);
    let err = aggregator
        .apply_submission(USER, &summary, &topic_map(&questions))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unavailable"));

    // The score itself is unaffected by the failure.
    assert_eq!(summary.score, 5);

    store.set_unavailable(false);
    assert!(aggregator.progress_for(USER, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_and_ungradable_submissions_do_not_divide_by_zero() {
    let summary = score_submission(&[], &HashMap::new());
    assert_eq!(summary.max_score, 0);
    assert_eq!(summary.percentage, 0.0);

    let only_essays = vec![question(1, "free-text", Value::Null, 4, "Essays")];
    let summary = score_submission(&only_essays, &answers(json!({"1": "..."})));
    assert_eq!(summary.max_score, 0);
    assert_eq!(summary.percentage, 0.0);
    assert!(summary.percentage.is_finite());
}

#[tokio::test]
async fn broken_question_is_unscored_and_the_rest_still_counts() {
    let (_, aggregator) = aggregator();
    let questions = vec![
        question(1, "single-choice", json!("A"), 2, "Demand"),
        question(2, "true-false", json!("A"), 2, "Demand"),
    ];

    let summary = score_submission(&questions, &answers(json!({"1": "A", "2": "A"})));
    assert_eq!(summary.score, 2);
    assert_eq!(summary.max_score, 2);
    assert_eq!(summary.unscored.len(), 1);
    assert_eq!(summary.unscored[0].question_id, 2);

    let updated = aggregator
        .apply_submission(USER, &summary, &topic_map(&questions))
        .await
        .unwrap();
    assert_eq!(updated[0].total_questions, 1);
}

#[tokio::test]
async fn non_numeric_answer_keys_are_skipped() {
    let questions = two_topic_test();

    let summary = score_submission(&questions, &answers(json!({"1": "A", "q7": "B"})));

    assert_eq!(summary.results[0].correct, Some(true));
    assert_eq!(summary.results[0].marks, 2);
    assert_eq!(summary.results[1].correct, Some(false));
    assert_eq!(summary.score, 2);
    assert_eq!(summary.max_score, 5);
}
