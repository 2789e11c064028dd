//! Store lifecycle integration tests.
//!
//! Tests open, reset, and close of the Main and Practice stores.

use super::common::{practice_count, start_app, SEED_COUNTS};
use sqlcoach::app::App;
use sqlcoach::config::Config;
use sqlcoach::db::{BundledScripts, DatabaseKind, DatabaseManager, Value};
use sqlcoach::error::CoachError;
use sqlcoach::query::ExecuteOptions;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_practice_starts_seeded() {
    let (_dir, app) = start_app().await;

    for (table, expected) in SEED_COUNTS {
        assert_eq!(
            practice_count(&app, table).await,
            *expected,
            "seed count for {table}"
        );
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_reset_restores_seed_after_mutation() {
    let (_dir, app) = start_app().await;

    let statements = [
        "DELETE FROM employee_projects",
        "DELETE FROM orders WHERE status = 'COMPLETED'",
        "INSERT INTO departments (department_name, location, budget) VALUES ('Ops', 'Remote', 1)",
        "CREATE TABLE scratch (id INTEGER PRIMARY KEY)",
    ];
    for sql in statements {
        let result = app.execute(sql, DatabaseKind::Practice).await.unwrap();
        assert!(result.success, "{sql}: {}", result.message);
    }
    assert_eq!(practice_count(&app, "employee_projects").await, 0);
    assert_eq!(practice_count(&app, "departments").await, 6);

    app.reset().await.unwrap();

    for (table, expected) in SEED_COUNTS {
        assert_eq!(practice_count(&app, table).await, *expected, "{table}");
    }
    let result = app
        .execute("SELECT * FROM scratch", DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.message.contains("no such table"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_reset_keeps_handle_identity() {
    let (_dir, app) = start_app().await;

    let before = app.manager().practice_handle().unwrap();
    app.reset().await.unwrap();
    let after = app.manager().practice_handle().unwrap();

    assert!(before.same_handle(&after));
    assert!(after.is_open());
    assert!(!after.is_resetting());

    app.shutdown().await;
}

#[tokio::test]
async fn test_reset_leaves_main_untouched() {
    let (_dir, app) = start_app().await;

    let result = app
        .execute(
            "INSERT INTO app_settings (key, value) VALUES ('theme', 'dark')",
            DatabaseKind::Main,
        )
        .await
        .unwrap();
    assert!(result.success, "{}", result.message);

    app.reset().await.unwrap();

    let result = app
        .execute("SELECT value FROM app_settings WHERE key = 'theme'", DatabaseKind::Main)
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::Text("dark".to_string())]]);

    app.shutdown().await;
}

#[tokio::test]
async fn test_main_store_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.database.main_path = dir.path().join("nested").join("main.db");

    let app = App::start(&config).await.unwrap();
    let result = app
        .execute(
            "INSERT INTO user_progress (user_id, total_points) VALUES ('local', 30)",
            DatabaseKind::Main,
        )
        .await
        .unwrap();
    assert!(result.success, "{}", result.message);
    app.shutdown().await;

    // Reopening must not reapply the schema over existing data.
    let app = App::start(&config).await.unwrap();
    let result = app
        .execute(
            "SELECT total_points FROM user_progress WHERE user_id = 'local'",
            DatabaseKind::Main,
        )
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::Int(30)]]);

    // Practice is rebuilt from scratch on every start.
    assert_eq!(practice_count(&app, "employees").await, 10);
    app.shutdown().await;
}

#[tokio::test]
async fn test_not_initialized_before_open_and_after_close() {
    let dir = tempfile::tempdir().unwrap();
    let manager = DatabaseManager::new(dir.path().join("main.db"), Arc::new(BundledScripts));

    assert_eq!(
        manager.practice_handle().unwrap_err(),
        CoachError::NotInitialized(DatabaseKind::Practice)
    );
    assert_eq!(
        manager.main_handle().unwrap_err(),
        CoachError::NotInitialized(DatabaseKind::Main)
    );
    assert_eq!(
        manager.reset().await.unwrap_err(),
        CoachError::NotInitialized(DatabaseKind::Practice)
    );

    manager.open().await.unwrap();
    assert!(manager.is_initialized());
    manager.close().await;
    manager.close().await;

    assert!(!manager.is_initialized());
    assert!(matches!(
        manager.handle(DatabaseKind::Main),
        Err(CoachError::NotInitialized(DatabaseKind::Main))
    ));
}

#[tokio::test]
async fn test_statements_fail_fast_while_resetting() {
    let (_dir, app) = start_app().await;
    let app = Arc::new(app);

    // Occupy the practice handle with a statement that runs until its bound.
    let slow = {
        let app = app.clone();
        tokio::spawn(async move {
            let runaway = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) \
                           SELECT COUNT(*) FROM c";
            app.execute_with(runaway, DatabaseKind::Practice, &ExecuteOptions::new(2, 10))
                .await
                .unwrap()
        })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The reset queues behind the slow statement but claims the handle now.
    let reset = {
        let app = app.clone();
        tokio::spawn(async move { app.reset().await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    let handle = app.manager().practice_handle().unwrap();
    assert!(handle.is_resetting());

    let result = app
        .execute("SELECT COUNT(*) FROM employees", DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.message, CoachError::Busy(DatabaseKind::Practice).to_string());

    let slow = slow.await.unwrap();
    assert!(!slow.success);
    assert!(slow.message.contains("timed out"), "{}", slow.message);
    reset.await.unwrap().unwrap();

    assert!(!handle.is_resetting());
    assert_eq!(practice_count(&app, "employees").await, 10);
    app.shutdown().await;
}
