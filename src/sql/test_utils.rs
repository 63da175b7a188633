//! Parser checks for rendered statistics queries.

use sqlparser::dialect::{BigQueryDialect, DuckDbDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Parse `sql` with the matching sqlparser dialect.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parsed = match dialect {
        Dialect::Postgres => Parser::parse_sql(&PostgreSqlDialect {}, sql),
        Dialect::DuckDb => Parser::parse_sql(&DuckDbDialect {}, sql),
        Dialect::BigQuery => Parser::parse_sql(&BigQueryDialect {}, sql),
    };
    match parsed {
        Ok(statements) if statements.len() == 1 => Ok(()),
        Ok(statements) => Err(format!(
            "expected one statement, got {}\nSQL: {}",
            statements.len(),
            sql
        )),
        Err(e) => Err(format!("invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_multiple_statements() {
        let sql = r#"SELECT COUNT(*) FROM "deployment"; SELECT 1"#;
        assert!(validate_sql(sql, Dialect::Postgres).is_err());
        validate_sql(r#"SELECT COUNT(*) FROM "deployment""#, Dialect::DuckDb).unwrap();
    }

    #[test]
    fn test_rejects_broken_sql() {
        assert!(validate_sql("SELEC SUM(cost) FORM billing_data", Dialect::Postgres).is_err());
    }
}
