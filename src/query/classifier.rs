//! Statement classification and splitting.
//!
//! Both use the sqlparser tokenizer so that comments, quoted text, and
//! whitespace are handled the same way the store would handle them.

use crate::db::StatementCategory;
use crate::error::{CoachError, Result};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer};

/// Classifies a statement by its leading keyword.
///
/// Blank input is rejected with `EmptyInput`. Input that cannot be
/// tokenized, or has no leading keyword, is `Unknown`.
pub fn classify(sql: &str) -> Result<StatementCategory> {
    if sql.trim().is_empty() {
        return Err(CoachError::EmptyInput);
    }

    Ok(leading_keyword(sql)
        .map(|keyword| StatementCategory::from_keyword(&keyword))
        .unwrap_or(StatementCategory::Unknown))
}

/// Returns the upper-cased leading keyword of a statement, if any.
///
/// Opening parentheses are skipped so `(SELECT 1)` reads as SELECT.
pub fn leading_keyword(sql: &str) -> Option<String> {
    for TokenWithSpan { token, .. } in tokenize(sql)? {
        match token {
            Token::Whitespace(_) | Token::LParen => continue,
            Token::Word(word) if word.quote_style.is_none() => {
                return Some(word.value.to_uppercase());
            }
            _ => return None,
        }
    }
    None
}

/// Splits text into individual statements on `;` tokens.
///
/// Semicolons inside quoted text or comments do not split. Comments before
/// and after a statement are dropped, as are fragments with nothing but
/// whitespace and comments. Text that cannot be tokenized is returned as a
/// single statement so the store can report the error.
pub fn split_statements(sql: &str) -> Vec<String> {
    let Some(tokens) = tokenize(sql) else {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![trimmed.to_string()];
    };

    let offsets = LineOffsets::new(sql);
    let mut statements = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for TokenWithSpan { token, span } in &tokens {
        match token {
            Token::SemiColon => {
                if let Some((start, end)) = current.take() {
                    statements.push(sql[start..end].to_string());
                }
            }
            Token::Whitespace(_) | Token::EOF => {}
            _ => {
                let end = offsets.byte_offset(span.end);
                let start = match current {
                    Some((start, _)) => start,
                    None => offsets.byte_offset(span.start),
                };
                current = Some((start, end));
            }
        }
    }
    if let Some((start, end)) = current {
        statements.push(sql[start..end].to_string());
    }

    statements
}

/// Counts the statements in the text.
pub fn statement_count(sql: &str) -> usize {
    split_statements(sql).len()
}

fn tokenize(sql: &str) -> Option<Vec<TokenWithSpan>> {
    let dialect = SQLiteDialect {};
    Tokenizer::new(&dialect, sql).tokenize_with_location().ok()
}

/// Maps tokenizer locations (1-based line and character column) to byte
/// offsets in the source text.
struct LineOffsets<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineOffsets<'a> {
    fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, starts }
    }

    fn byte_offset(&self, location: Location) -> usize {
        if location.line == 0 {
            return 0;
        }
        let Some(&line_start) = self.starts.get(location.line as usize - 1) else {
            return self.text.len();
        };
        let line = &self.text[line_start..];
        line.char_indices()
            .nth(location.column.saturating_sub(1) as usize)
            .map(|(i, _)| line_start + i)
            .unwrap_or(self.text.len())
    }
}
