//! Query execution integration tests.
//!
//! Tests classification, result shaping, row caps, timeouts, and syntax
//! checks against the seeded practice store.

use super::common::{practice_count, start_app};
use pretty_assertions::assert_eq;
use sqlcoach::db::{DatabaseKind, StatementCategory, Value};
use sqlcoach::query::ExecuteOptions;

#[tokio::test]
async fn test_blank_input_is_rejected_without_store_access() {
    let (_dir, app) = start_app().await;
    let handle = app.manager().practice_handle().unwrap();
    let calls = handle.store_calls();

    let result = app.execute("  \n ", DatabaseKind::Practice).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.message, "Empty query");
    assert_eq!(result.category, StatementCategory::Unknown);
    assert_eq!(result.execution_time_ms, 0);
    assert_eq!(handle.store_calls(), calls);

    app.shutdown().await;
}

#[tokio::test]
async fn test_categories_follow_leading_keyword() {
    let (_dir, app) = start_app().await;

    let cases = [
        ("select 1", StatementCategory::Read),
        ("  WITH x AS (SELECT 1) SELECT * FROM x", StatementCategory::Read),
        ("UPDATE employees SET salary = salary WHERE id = 1", StatementCategory::Mutate),
        ("CREATE TABLE t1 (id INTEGER)", StatementCategory::SchemaDefine),
        ("DROP TABLE t1", StatementCategory::SchemaDefine),
        ("PRAGMA table_info(employees)", StatementCategory::Other),
    ];
    for (sql, expected) in cases {
        let result = app.execute(sql, DatabaseKind::Practice).await.unwrap();
        assert!(result.success, "{sql}: {}", result.message);
        assert_eq!(result.category, expected, "{sql}");
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_read_result_shape() {
    let (_dir, app) = start_app().await;

    let result = app
        .execute(
            "SELECT first_name, last_name, manager_id FROM employees \
             WHERE manager_id IS NULL ORDER BY id",
            DatabaseKind::Practice,
        )
        .await
        .unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.column_names, vec!["first_name", "last_name", "manager_id"]);
    assert_eq!(result.row_count, result.rows.len());
    assert!(!result.truncated);
    for row in &result.rows {
        assert_eq!(row.len(), 3);
        assert_eq!(row[2], Value::Null);
    }
    assert_eq!(
        result.message,
        format!("Query executed successfully. Retrieved {} row(s).", result.row_count)
    );

    app.shutdown().await;
}

#[tokio::test]
async fn test_mutation_reports_affected_rows() {
    let (_dir, app) = start_app().await;

    let result = app
        .execute("DELETE FROM orders WHERE status = 'PENDING'", DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(result.success, "{}", result.message);
    assert_eq!(result.category, StatementCategory::Mutate);
    assert!(result.column_names.is_empty());
    assert_eq!(
        result.message,
        format!("DELETE executed successfully. {} row(s) affected.", result.row_count)
    );
    assert_eq!(practice_count(&app, "orders").await, 8 - result.row_count as i64);

    app.shutdown().await;
}

#[tokio::test]
async fn test_row_cap_truncates_without_failing() {
    let (_dir, app) = start_app().await;

    let result = app
        .execute_with(
            "SELECT * FROM employee_projects",
            DatabaseKind::Practice,
            &ExecuteOptions::new(5, 4),
        )
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.truncated);
    assert_eq!(result.rows.len(), 4);
    assert_eq!(result.row_count, 4);

    // Unlimited when the cap is disabled.
    let result = app
        .execute_with(
            "SELECT * FROM employee_projects",
            DatabaseKind::Practice,
            &ExecuteOptions::new(5, 0),
        )
        .await
        .unwrap();
    assert!(!result.truncated);
    assert_eq!(result.rows.len(), 10);

    app.shutdown().await;
}

#[tokio::test]
async fn test_timeout_leaves_handle_usable() {
    let (_dir, app) = start_app().await;

    let result = app
        .execute("UPDATE employees SET salary = 1 WHERE id = 1", DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(result.success);

    let runaway = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) \
                   SELECT MAX(x) FROM c";
    let result = app
        .execute_with(runaway, DatabaseKind::Practice, &ExecuteOptions::new(1, 10))
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.message, "Query timed out after 1 seconds");
    assert!(result.execution_time_ms >= 900);

    let result = app
        .execute("SELECT salary FROM employees WHERE id = 1", DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(result.success, "{}", result.message);
    assert_eq!(result.rows.len(), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn test_store_errors_become_failed_results() {
    let (_dir, app) = start_app().await;

    for sql in [
        "SELECT nope FROM employees",
        "INSERT INTO departments (id, department_name) VALUES (1, 'dup')",
        "SELEC 1",
    ] {
        let result = app.execute(sql, DatabaseKind::Practice).await.unwrap();
        assert!(!result.success, "{sql}");
        assert!(result.message.starts_with("SQL Error: "), "{}", result.message);
        assert!(result.rows.is_empty());
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_trailing_statement_never_runs() {
    let (_dir, app) = start_app().await;

    let result = app
        .execute("SELECT id FROM departments; DELETE FROM employees", DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.column_names.is_empty());
    assert_eq!(practice_count(&app, "employees").await, 10);

    app.shutdown().await;
}

#[tokio::test]
async fn test_syntax_check_never_executes() {
    let (_dir, app) = start_app().await;

    let check = app
        .validate_syntax("DELETE FROM employees", DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(check.valid);
    assert_eq!(check.message, "SQL syntax is valid");
    assert_eq!(practice_count(&app, "employees").await, 10);

    let check = app
        .validate_syntax("SELECT * FROM", DatabaseKind::Practice)
        .await
        .unwrap();
    assert!(!check.valid);
    assert!(check.message.starts_with("SQL syntax error: "));

    app.shutdown().await;
}

#[tokio::test]
async fn test_introspect_lists_seeded_tables() {
    let (_dir, app) = start_app().await;

    let schema = app.introspect(DatabaseKind::Practice).await.unwrap();
    for name in ["departments", "employees", "orders", "Person", "Address"] {
        assert!(schema.table(name).is_some(), "missing table {name}");
    }
    let orders = schema.table("ORDERS").unwrap();
    assert_eq!(orders.row_count, 8);
    assert!(orders.foreign_keys.iter().any(|fk| fk.to_table == "customers"));

    let employees = schema.table("employees").unwrap();
    let email = employees
        .indexes
        .iter()
        .find(|index| index.columns == ["email"])
        .expect("unique email index");
    assert!(email.is_unique);

    let schema = app.introspect(DatabaseKind::Main).await.unwrap();
    assert!(schema.table("user_progress").is_some());

    app.shutdown().await;
}
