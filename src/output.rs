//! Plain-text and JSON rendering of engine results.
//!
//! Front ends decide where the text goes; these helpers only build strings.

use crate::db::{Schema, TabularResult, Value};
use crate::error::{CoachError, Result};
use crate::grading::{Difficulty, PracticeQuestion, ValidationOutcome};
use crate::query::SyntaxCheck;
use serde::Serialize;

/// Longest cell rendered before eliding.
const MAX_CELL_WIDTH: usize = 40;

/// Serializes any result type as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CoachError::internal(format!("Failed to serialize output: {e}")))
}

/// Renders a result as a boxed table followed by its status line.
pub fn render_result(result: &TabularResult) -> String {
    let mut out = String::new();

    if result.success && !result.column_names.is_empty() {
        let cells: Vec<Vec<String>> = result
            .rows
            .iter()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();
        out.push_str(&render_table(&result.column_names, &cells));
    }

    out.push_str(&result.message);
    if result.success {
        out.push_str(&format!(" ({} ms)", result.execution_time_ms));
    }
    out.push('\n');
    out
}

fn render_cell(value: &Value) -> String {
    let text = value.to_display_string().replace('\n', " ");
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{cut}...")
    } else {
        text
    }
}

/// Draws headers and rows with `+---+` borders.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let border = {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let line_for = |cells: &[String]| {
        let mut line = String::from("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let pad = w - cell.chars().count();
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(pad + 1));
            line.push('|');
        }
        line.push('\n');
        line
    };

    let mut out = border.clone();
    out.push_str(&line_for(headers));
    out.push_str(&border);
    for row in rows {
        out.push_str(&line_for(row));
    }
    if !rows.is_empty() {
        out.push_str(&border);
    }
    out
}

pub fn render_syntax(check: &SyntaxCheck) -> String {
    format!("{}\n", check.message)
}

pub fn render_outcome(outcome: &ValidationOutcome) -> String {
    let mut out = format!("{}\n", outcome.formatted_message());
    if let Some(hint) = &outcome.hint {
        out.push_str(&format!("Hint: {hint}\n"));
    }
    if !outcome.correct {
        if let Some(expected) = &outcome.expected {
            out.push_str("\nExpected:\n");
            out.push_str(&render_result(expected));
        }
        if let Some(submitted) = &outcome.submitted {
            out.push_str("\nYour result:\n");
            out.push_str(&render_result(submitted));
        }
    }
    out
}

pub fn render_question_list(questions: &[&PracticeQuestion]) -> String {
    let headers = ["ID", "Difficulty", "Points", "Category", "Title"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows: Vec<Vec<String>> = questions
        .iter()
        .map(|q| {
            vec![
                q.id.clone(),
                q.difficulty.to_string(),
                q.points().to_string(),
                q.category.clone(),
                q.title.clone(),
            ]
        })
        .collect();
    render_table(&headers, &rows)
}

/// One-line catalog summary, e.g. `18 questions (Easy 5, Medium 5, ...)`.
pub fn render_catalog_summary(counts: &[(Difficulty, usize)]) -> String {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    let parts: Vec<String> = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(d, n)| format!("{d} {n}"))
        .collect();
    format!("{total} questions ({})\n", parts.join(", "))
}

pub fn render_question(question: &PracticeQuestion) -> String {
    let mut out = format!(
        "{} [{}] ({}, {} points)\n\n{}\n",
        question.title,
        question.id,
        question.difficulty,
        question.points(),
        question.description
    );
    if !question.example_sql.trim().is_empty() {
        out.push_str(&format!("\n{}\n", question.example_sql.trim_end()));
    }
    out
}

pub fn render_schema(schema: &Schema) -> String {
    if schema.tables.is_empty() {
        return "No tables found.\n".to_string();
    }
    schema.format_for_display()
}
