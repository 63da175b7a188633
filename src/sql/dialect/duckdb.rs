//! DuckDB SQL dialect.
//!
//! DuckDB is PostgreSQL-compatible with extensions:
//! - ANSI identifier quoting (`"`)
//! - `LIST_HAS_ANY` for list membership
//! - Native `MAP` type; expansion goes through a lateral subquery
//!   over `MAP_KEYS`/`MAP_VALUES`

use super::helpers;
use super::SqlDialect;
use crate::sql::token::{Token, TokenStream};

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn emit_key_value_expand(&self, map: &TokenStream, alias: &str) -> TokenStream {
        // LATERAL (SELECT UNNEST(MAP_KEYS(m)) AS "key", UNNEST(MAP_VALUES(m)) AS "value") AS alias
        let mut ts = TokenStream::new();
        ts.push(Token::Lateral)
            .space()
            .lparen()
            .push(Token::Select)
            .space();
        for (i, (func, column)) in [("map_keys", "key"), ("map_values", "value")]
            .iter()
            .enumerate()
        {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::FunctionName("unnest".into()))
                .lparen()
                .push(Token::FunctionName((*func).into()))
                .lparen()
                .append(map)
                .rparen()
                .rparen()
                .space()
                .push(Token::As)
                .space()
                .push(Token::Ident((*column).into()));
        }
        ts.rparen()
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(alias.to_string()));
        ts
    }

    fn emit_array_contains_any(&self, array: &TokenStream, values: &[TokenStream]) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("list_has_any".into()))
            .lparen()
            .append(array)
            .comma()
            .space()
            .append(&helpers::emit_bracket_list(None, values))
            .rparen();
        ts
    }

    fn emit_key_lookup(&self, map: &TokenStream, key: &str) -> TokenStream {
        // MAP_EXTRACT returns a list; take its first element.
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("map_extract".into()))
            .lparen()
            .append(map)
            .comma()
            .space()
            .push(Token::LitString(key.to_string()))
            .rparen()
            .push(Token::LBracket)
            .push(Token::LitInt(1))
            .push(Token::RBracket);
        ts
    }
}
