//! SQL generation module.
//!
//! A small query AST that renders to several SQL dialects:
//!
//! - [`query`] - SELECT query builder with FROM items and cross joins
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect, TimeUnit};
pub use expr::{
    any_of, col, count_star, func, lit_float, lit_int, lit_str, lit_timestamp, star, table_col,
    time_trunc, BinaryOperator, Expr, ExprExt, Literal,
};
pub use query::{FromItem, LimitOffset, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use token::{Token, TokenStream};
