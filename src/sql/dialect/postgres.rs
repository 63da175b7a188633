//! PostgreSQL SQL dialect.
//!
//! PostgreSQL (and TimescaleDB) features used by the stats planner:
//! - ANSI identifier quoting (`"`)
//! - `DATE_TRUNC` for time buckets
//! - `UNNEST(array)` as a FROM item with a column alias list
//! - hstore: `EACH(tags)` expansion and `tags -> 'key'` lookup
//! - Array overlap operator `&&`

use super::helpers;
use super::SqlDialect;
use crate::sql::token::{Token, TokenStream};

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)

    fn emit_key_value_expand(&self, map: &TokenStream, alias: &str) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("each".into()))
            .lparen()
            .append(map)
            .rparen()
            .space()
            .push(Token::As)
            .space()
            .append(&helpers::alias_with_columns(alias, &["key", "value"]));
        ts
    }

    fn emit_array_contains_any(&self, array: &TokenStream, values: &[TokenStream]) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.append(array)
            .space()
            .push(Token::Overlaps)
            .space()
            .append(&helpers::emit_bracket_list(Some(Token::Array), values));
        ts
    }

    fn emit_key_lookup(&self, map: &TokenStream, key: &str) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.lparen()
            .append(map)
            .space()
            .push(Token::Arrow)
            .space()
            .push(Token::LitString(key.to_string()))
            .rparen();
        ts
    }
}
