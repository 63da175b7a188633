//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use chrono::DateTime;

use super::super::token::{Token, TokenStream};
use super::TimeUnit;

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: BigQuery
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes, doubling embedded quotes.
/// Used by: Postgres, DuckDB
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with single quotes, backslash-escaping.
/// Used by: BigQuery (does not accept `''`)
pub fn quote_string_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

// =============================================================================
// Timestamp Formatting
// =============================================================================

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS.mmm` in UTC.
///
/// Out-of-range values fall back to the raw millisecond count; callers
/// validate ranges before building predicates.
pub fn format_timestamp_millis(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => millis.to_string(),
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit LIMIT ... OFFSET ... (standard SQL).
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit)
            .space()
            .push(Token::LitInt(lim as i64));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset)
            .space()
            .push(Token::LitInt(off as i64));
    }

    ts
}

// =============================================================================
// Time Truncation
// =============================================================================

/// `DATE_TRUNC('unit', expr)`.
/// Used by: Postgres, DuckDB
pub fn emit_date_trunc(unit: TimeUnit, expr: &TokenStream) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName("date_trunc".into()))
        .lparen()
        .push(Token::LitString(unit.as_str().into()))
        .comma()
        .space()
        .append(expr)
        .rparen();
    ts
}

/// `TIMESTAMP_TRUNC(expr, UNIT)`.
/// Used by: BigQuery
pub fn emit_timestamp_trunc(unit: TimeUnit, expr: &TokenStream) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName("timestamp_trunc".into()))
        .lparen()
        .append(expr)
        .comma()
        .space()
        .push(Token::Keyword(unit.as_keyword()))
        .rparen();
    ts
}

// =============================================================================
// Arrays and Key/Value Columns
// =============================================================================

/// `alias(col1, col2, ...)` - a table alias with a column alias list.
pub fn alias_with_columns(alias: &str, columns: &[&str]) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Ident(alias.to_string())).lparen();
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.push(Token::Ident((*column).to_string()));
    }
    ts.rparen();
    ts
}

/// `UNNEST(array) AS alias(alias)`.
/// Used by: Postgres, DuckDB
pub fn emit_unnest_with_column_alias(array: &TokenStream, alias: &str) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName("unnest".into()))
        .lparen()
        .append(array)
        .rparen()
        .space()
        .push(Token::As)
        .space()
        .append(&alias_with_columns(alias, &[alias]));
    ts
}

/// `[v1, v2, ...]` list literal, optionally prefixed (`ARRAY[...]`).
pub fn emit_bracket_list(prefix: Option<Token>, values: &[TokenStream]) -> TokenStream {
    let mut ts = TokenStream::new();
    if let Some(prefix) = prefix {
        ts.push(prefix);
    }
    ts.push(Token::LBracket)
        .append_comma_separated(values)
        .push(Token::RBracket);
    ts
}
