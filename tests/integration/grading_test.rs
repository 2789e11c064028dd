//! Answer verification integration tests.
//!
//! Tests grading of submissions against reference solutions, result
//! equivalence, and progress reporting.

use super::common::start_app;
use sqlcoach::db::{BundledScripts, DatabaseKind, DatabaseManager};
use sqlcoach::grading::{
    AnswerVerifier, Difficulty, InMemoryProgress, PracticeQuestion, QuestionCatalog,
    CORRECT_MESSAGE, INCORRECT_MESSAGE, NOT_FOUND_MESSAGE,
};
use sqlcoach::query::QueryEngine;
use std::sync::Arc;
use tempfile::TempDir;

fn custom_question(id: &str, reference: &str) -> PracticeQuestion {
    PracticeQuestion {
        id: id.to_string(),
        title: format!("Question {id}"),
        description: "Custom question for tests.".to_string(),
        example_sql: String::new(),
        reference_solution: reference.to_string(),
        difficulty: Difficulty::Easy,
        category: "Tests".to_string(),
        points: None,
        hint: None,
    }
}

/// Verifier over a custom catalog, with progress captured in memory.
async fn verifier_with(
    questions: Vec<PracticeQuestion>,
) -> (TempDir, Arc<DatabaseManager>, AnswerVerifier, Arc<InMemoryProgress>) {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(DatabaseManager::new(
        dir.path().join("main.db"),
        Arc::new(BundledScripts),
    ));
    manager.open().await.unwrap();

    let catalog = Arc::new(QuestionCatalog::new(questions).unwrap());
    let progress = Arc::new(InMemoryProgress::new());
    let verifier = AnswerVerifier::new(manager.clone(), catalog, QueryEngine::default())
        .with_progress(progress.clone());
    (dir, manager, verifier, progress)
}

async fn create_t(manager: &DatabaseManager, rows: &[(i64, &str)]) {
    let handle = manager.practice_handle().unwrap();
    let engine = QueryEngine::default();
    let result = engine
        .execute("CREATE TABLE t (id INTEGER, name TEXT)", &handle)
        .await;
    assert!(result.success, "{}", result.message);
    for (id, name) in rows {
        let result = engine
            .execute(&format!("INSERT INTO t (id, name) VALUES ({id}, '{name}')"), &handle)
            .await;
        assert!(result.success, "{}", result.message);
    }
}

#[tokio::test]
async fn test_every_builtin_reference_grades_itself_correct() {
    let (_dir, app) = start_app().await;

    let questions: Vec<_> = app.questions().all().to_vec();
    assert_eq!(questions.len(), 18);
    for question in questions {
        let outcome = app
            .validate(&question.id, &question.reference_solution)
            .await
            .unwrap();
        assert!(
            outcome.correct,
            "{}: {} {:?}",
            question.id, outcome.message, outcome.hint
        );
        assert_eq!(outcome.points_earned, question.points());
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_unknown_question_never_executes() {
    let (_dir, manager, verifier, progress) = verifier_with(vec![custom_question(
        "q1",
        "SELECT 1",
    )])
    .await;
    let handle = manager.practice_handle().unwrap();
    let calls = handle.store_calls();

    let outcome = verifier.validate("nope", "SELECT 1").await.unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.message, NOT_FOUND_MESSAGE);
    assert_eq!(outcome.points_earned, 0);
    assert!(outcome.submitted.is_none());
    assert_eq!(outcome.submitted_query, "SELECT 1");
    assert_eq!(handle.store_calls(), calls);
    assert_eq!(progress.attempts("nope"), 0);

    manager.close().await;
}

#[tokio::test]
async fn test_row_order_is_ignored_but_column_order_is_not() {
    let (_dir, manager, verifier, progress) = verifier_with(vec![custom_question(
        "t_pairs",
        "SELECT id, name FROM t ORDER BY id",
    )])
    .await;
    create_t(&manager, &[(2, "b"), (1, "a")]).await;

    let outcome = verifier
        .validate("t_pairs", "SELECT id, name FROM t")
        .await
        .unwrap();
    assert!(outcome.correct, "{:?}", outcome.hint);
    assert_eq!(outcome.message, CORRECT_MESSAGE);
    assert_eq!(outcome.submitted_query, "SELECT id, name FROM t");
    assert_eq!(outcome.points_earned, Difficulty::Easy.default_points());
    assert_eq!(outcome.formatted_message(), format!("{CORRECT_MESSAGE} (+10 points)"));

    let outcome = verifier
        .validate("t_pairs", "SELECT name, id FROM t")
        .await
        .unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.message, INCORRECT_MESSAGE);
    assert_eq!(outcome.points_earned, 0);
    assert_eq!(outcome.submitted_query, "SELECT name, id FROM t");
    let hint = outcome.hint.unwrap();
    assert!(hint.starts_with("Column name mismatch at position 1"), "{hint}");

    assert_eq!(progress.attempts("t_pairs"), 2);
    assert!(progress.is_completed("t_pairs"));
    let snapshot = progress.snapshot();
    assert_eq!(snapshot.correct_answers, 1);
    assert_eq!(snapshot.current_streak, 0);
    assert_eq!(snapshot.best_streak, 1);

    manager.close().await;
}

#[tokio::test]
async fn test_numeric_and_whitespace_normalization() {
    let (_dir, manager, verifier, _progress) = verifier_with(vec![
        custom_question("numbers", "SELECT 10 AS n, 2.5 AS r"),
        custom_question("text", "SELECT 'Sales' AS name"),
    ])
    .await;

    let outcome = verifier
        .validate("numbers", "SELECT 10.0 AS n, 2.50 AS r")
        .await
        .unwrap();
    assert!(outcome.correct, "{:?}", outcome.hint);

    let outcome = verifier
        .validate("text", "SELECT '  Sales ' AS NAME")
        .await
        .unwrap();
    assert!(outcome.correct, "{:?}", outcome.hint);

    let outcome = verifier
        .validate("numbers", "SELECT 11 AS n, 2.5 AS r")
        .await
        .unwrap();
    assert!(!outcome.correct);
    assert!(outcome.hint.unwrap().contains("expected 10, got 11"));

    manager.close().await;
}

#[tokio::test]
async fn test_wrong_row_count_reports_counts() {
    let (_dir, app) = start_app().await;

    let outcome = app
        .validate("easy_2", "SELECT * FROM employees WHERE salary > 90000")
        .await
        .unwrap();
    assert!(!outcome.correct);
    let hint = outcome.hint.unwrap();
    assert!(hint.starts_with("Row count mismatch: expected 10 rows, got 3."), "{hint}");
    assert!(hint.contains("WHERE clause"));
    assert!(outcome.expected.is_some());
    assert!(outcome.submitted.is_some());

    app.shutdown().await;
}

#[tokio::test]
async fn test_failing_submission_reports_engine_message() {
    let (_dir, manager, verifier, progress) = verifier_with(vec![custom_question(
        "q1",
        "SELECT COUNT(*) FROM employees",
    )])
    .await;

    let outcome = verifier
        .validate("q1", "SELECT COUNT(*) FROM missing_table")
        .await
        .unwrap();
    assert!(!outcome.correct);
    assert!(outcome.message.starts_with("SQL Error: "), "{}", outcome.message);
    assert!(outcome.expected.is_none());
    assert_eq!(outcome.submitted_query, "SELECT COUNT(*) FROM missing_table");
    assert_eq!(progress.attempts("q1"), 1);
    assert!(!progress.is_completed("q1"));

    let outcome = verifier.validate("q1", "   ").await.unwrap();
    assert_eq!(outcome.message, "Empty query");
    assert_eq!(outcome.submitted_query, "   ");

    manager.close().await;
}

#[tokio::test]
async fn test_broken_reference_is_reported() {
    let (_dir, manager, verifier, _progress) = verifier_with(vec![custom_question(
        "broken",
        "SELECT * FROM does_not_exist",
    )])
    .await;

    let outcome = verifier.validate("broken", "SELECT 1").await.unwrap();
    assert!(!outcome.correct);
    assert!(
        outcome.message.starts_with("Reference solution failed: "),
        "{}",
        outcome.message
    );
    assert_eq!(outcome.submitted_query, "SELECT 1");

    manager.close().await;
}

#[tokio::test]
async fn test_validate_after_close_is_not_initialized() {
    let (_dir, manager, verifier, _progress) =
        verifier_with(vec![custom_question("q1", "SELECT 1")]).await;
    manager.close().await;

    let err = verifier.validate("q1", "SELECT 1").await.unwrap_err();
    assert_eq!(
        err,
        sqlcoach::error::CoachError::NotInitialized(DatabaseKind::Practice)
    );
}
