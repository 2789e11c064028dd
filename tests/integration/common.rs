//! Shared helpers for the integration tests.

use sqlcoach::app::App;
use sqlcoach::config::Config;
use sqlcoach::db::{DatabaseKind, Value};
use tempfile::TempDir;

/// Starts an app whose Main store lives in a fresh temporary directory.
///
/// The directory must outlive the app, so it is returned alongside it.
pub async fn start_app() -> (TempDir, App) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.database.main_path = dir.path().join("main.db");
    let app = App::start(&config).await.unwrap();
    (dir, app)
}

/// Runs `SELECT COUNT(*)` on a practice table.
pub async fn practice_count(app: &App, table: &str) -> i64 {
    let result = app
        .execute(&format!("SELECT COUNT(*) FROM {table}"), DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(result.success, "{}", result.message);
    match result.rows[0][0] {
        Value::Int(n) => n,
        ref other => panic!("unexpected count value: {other:?}"),
    }
}

/// Seed row counts of the practice dataset.
pub const SEED_COUNTS: &[(&str, i64)] = &[
    ("departments", 5),
    ("employees", 10),
    ("projects", 5),
    ("employee_projects", 10),
    ("customers", 5),
    ("orders", 8),
    ("Person", 2),
    ("Address", 2),
];
