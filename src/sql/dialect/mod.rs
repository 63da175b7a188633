//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PG/DuckDB), `` ` `` (BigQuery)
//! - Timestamp literals and truncation (`date_trunc` vs `TIMESTAMP_TRUNC`)
//! - Array unnesting as a FROM item
//! - Key/value map expansion (hstore `each`, DuckDB `MAP`, BigQuery repeated `STRUCT`)
//! - Array membership and key lookup predicates
//!
//! # Usage
//!
//! ```ignore
//! use statsq::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("appid");  // "appid"
//! ```
//!
//! The fact tables are expected to model multi-valued entity references as
//! arrays and free-form tags as a key/value column:
//!
//! | Concept | PostgreSQL | DuckDB | BigQuery |
//! |---------|-----------|--------|----------|
//! | Multi-valued id | `TEXT[]` | `VARCHAR[]` | `ARRAY<STRING>` |
//! | Tags | `hstore` | `MAP(VARCHAR, VARCHAR)` | `ARRAY<STRUCT<key STRING, value STRING>>` |

mod bigquery;
mod duckdb;
pub mod helpers;
mod postgres;

pub use bigquery::BigQuery;
pub use duckdb::DuckDb;
pub use postgres::Postgres;

use std::str::FromStr;

use super::token::{Token, TokenStream};

/// Escape character for `%` and `_` in LIKE patterns.
pub const LIKE_ESCAPE: char = '\\';

/// Truncation unit for time bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Hour,
    Day,
    Week,
    Month,
}

impl TimeUnit {
    /// Lowercase unit name as accepted by `date_trunc`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
        }
    }

    /// Uppercase date part keyword (BigQuery style).
    pub fn as_keyword(&self) -> &'static str {
        match self {
            TimeUnit::Hour => "HOUR",
            TimeUnit::Day => "DAY",
            TimeUnit::Week => "WEEK",
            TimeUnit::Month => "MONTH",
        }
    }
}

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations handle dialect-specific syntax differences.
/// The default implementations follow PostgreSQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// Default doubles embedded single quotes.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a timestamp literal from epoch milliseconds (UTC).
    fn format_timestamp_literal(&self, millis: i64) -> String {
        format!("TIMESTAMP '{}'", helpers::format_timestamp_millis(millis))
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    // =========================================================================
    // Date/Time
    // =========================================================================

    /// Truncate a timestamp expression to the start of its bucket.
    ///
    /// - PostgreSQL/DuckDB: `DATE_TRUNC('day', expr)`
    /// - BigQuery: `TIMESTAMP_TRUNC(expr, DAY)`
    fn emit_time_truncate(&self, unit: TimeUnit, expr: &TokenStream) -> TokenStream {
        helpers::emit_date_trunc(unit, expr)
    }

    // =========================================================================
    // Arrays and Key/Value Columns
    // =========================================================================

    /// FROM item that unnests an array into one row per element.
    ///
    /// The element is addressable as the unqualified column `alias`.
    fn emit_unnest(&self, array: &TokenStream, alias: &str) -> TokenStream {
        helpers::emit_unnest_with_column_alias(array, alias)
    }

    /// FROM item that expands a key/value column into one row per entry.
    ///
    /// Entries are addressable as `alias.key` and `alias.value`.
    fn emit_key_value_expand(&self, map: &TokenStream, alias: &str) -> TokenStream;

    /// Predicate: the array shares at least one element with `values`.
    fn emit_array_contains_any(&self, array: &TokenStream, values: &[TokenStream]) -> TokenStream;

    /// Expression: the value stored under `key` in a key/value column.
    fn emit_key_lookup(&self, map: &TokenStream, key: &str) -> TokenStream;

    /// Clause following a LIKE pattern so that `\` escapes `%` and `_`.
    fn emit_like_escape(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.space()
            .push(Token::Escape)
            .space()
            .push(Token::LitString(LIKE_ESCAPE.to_string()));
        ts
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    DuckDb,
    BigQuery,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
            Dialect::BigQuery => &BigQuery,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_timestamp_literal(&self, millis: i64) -> String {
        self.dialect().format_timestamp_literal(millis)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn emit_time_truncate(&self, unit: TimeUnit, expr: &TokenStream) -> TokenStream {
        self.dialect().emit_time_truncate(unit, expr)
    }

    fn emit_unnest(&self, array: &TokenStream, alias: &str) -> TokenStream {
        self.dialect().emit_unnest(array, alias)
    }

    fn emit_key_value_expand(&self, map: &TokenStream, alias: &str) -> TokenStream {
        self.dialect().emit_key_value_expand(map, alias)
    }

    fn emit_array_contains_any(&self, array: &TokenStream, values: &[TokenStream]) -> TokenStream {
        self.dialect().emit_array_contains_any(array, values)
    }

    fn emit_key_lookup(&self, map: &TokenStream, key: &str) -> TokenStream {
        self.dialect().emit_key_lookup(map, key)
    }

    fn emit_like_escape(&self) -> TokenStream {
        self.dialect().emit_like_escape()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

/// Error returned when a dialect name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported SQL dialect: {0}")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "timescale" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            "bigquery" => Ok(Dialect::BigQuery),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}
