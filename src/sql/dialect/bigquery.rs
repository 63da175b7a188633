//! BigQuery SQL dialect.
//!
//! BigQuery features:
//! - Backtick identifier quoting
//! - Backslash escapes in string literals
//! - `TIMESTAMP_TRUNC(ts, DAY)` for time buckets
//! - Repeated fields (`ARRAY<...>`) unnested in FROM; tags stored as
//!   `ARRAY<STRUCT<key STRING, value STRING>>`

use super::helpers;
use super::{SqlDialect, TimeUnit};
use crate::sql::token::{Token, TokenStream};

/// BigQuery SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct BigQuery;

impl BigQuery {
    /// `UNNEST(array) AS alias`
    fn unnest_as(array: &TokenStream, alias: &str) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("unnest".into()))
            .lparen()
            .append(array)
            .rparen()
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(alias.to_string()));
        ts
    }
}

impl SqlDialect for BigQuery {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_backslash(s)
    }

    fn emit_time_truncate(&self, unit: TimeUnit, expr: &TokenStream) -> TokenStream {
        helpers::emit_timestamp_trunc(unit, expr)
    }

    fn emit_unnest(&self, array: &TokenStream, alias: &str) -> TokenStream {
        Self::unnest_as(array, alias)
    }

    fn emit_key_value_expand(&self, map: &TokenStream, alias: &str) -> TokenStream {
        Self::unnest_as(map, alias)
    }

    fn emit_array_contains_any(&self, array: &TokenStream, values: &[TokenStream]) -> TokenStream {
        // EXISTS (SELECT 1 FROM UNNEST(arr) AS `v` WHERE `v` IN (...))
        let mut ts = TokenStream::new();
        ts.push(Token::Exists)
            .space()
            .lparen()
            .push(Token::Select)
            .space()
            .push(Token::LitInt(1))
            .space()
            .push(Token::From)
            .space()
            .append(&Self::unnest_as(array, "v"))
            .space()
            .push(Token::Where)
            .space()
            .push(Token::Ident("v".into()))
            .space()
            .push(Token::In)
            .space()
            .lparen()
            .append_comma_separated(values)
            .rparen()
            .rparen();
        ts
    }

    // LIKE already treats backslash as its escape and has no ESCAPE clause.
    fn emit_like_escape(&self) -> TokenStream {
        TokenStream::new()
    }

    fn emit_key_lookup(&self, map: &TokenStream, key: &str) -> TokenStream {
        // (SELECT `e`.`value` FROM UNNEST(tags) AS `e` WHERE `e`.`key` = 'k')
        let mut ts = TokenStream::new();
        ts.lparen()
            .push(Token::Select)
            .space()
            .push(Token::Ident("e".into()))
            .push(Token::Dot)
            .push(Token::Ident("value".into()))
            .space()
            .push(Token::From)
            .space()
            .append(&Self::unnest_as(map, "e"))
            .space()
            .push(Token::Where)
            .space()
            .push(Token::Ident("e".into()))
            .push(Token::Dot)
            .push(Token::Ident("key".into()))
            .space()
            .push(Token::Eq)
            .space()
            .push(Token::LitString(key.to_string()))
            .rparen();
        ts
    }
}
