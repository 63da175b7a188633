//! SELECT statements.
//!
//! A statistics query is always a single flat SELECT over one base table,
//! optionally cross joined with unnested arrays or expanded key/value
//! columns. Each clause goes on its own line; select items are indented one
//! level.

use super::dialect::{Dialect, SqlDialect};
use super::expr::{Expr, ExprExt};
use super::token::{Token, TokenStream};

// =============================================================================
// Clauses
// =============================================================================

/// A SELECT list item.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    fn write(&self, ts: &mut TokenStream, dialect: Dialect) {
        self.expr.write(ts, dialect);
        if let Some(alias) = &self.alias {
            write_alias(ts, alias);
        }
    }
}

fn write_alias(ts: &mut TokenStream, alias: &str) {
    ts.space()
        .push(Token::As)
        .space()
        .push(Token::Ident(alias.to_string()));
}

/// `[schema.]table [AS alias]`
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.into(),
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn write(&self, ts: &mut TokenStream) {
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });
        if let Some(alias) = &self.alias {
            write_alias(ts, alias);
        }
    }
}

/// Anything that can appear after FROM or CROSS JOIN.
#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    /// A base table.
    Table(TableRef),
    /// One row per element of an array column; the element is the column `alias`.
    Unnest { array: Expr, alias: String },
    /// One row per entry of a key/value column; entries are `alias.key` / `alias.value`.
    KeyValueExpand { map: Expr, alias: String },
}

impl FromItem {
    fn write(&self, ts: &mut TokenStream, dialect: Dialect) {
        match self {
            FromItem::Table(table) => table.write(ts),
            FromItem::Unnest { array, alias } => {
                let array = array.to_tokens_for_dialect(dialect);
                ts.append(&dialect.emit_unnest(&array, alias));
            }
            FromItem::KeyValueExpand { map, alias } => {
                let map = map.to_tokens_for_dialect(dialect);
                ts.append(&dialect.emit_key_value_expand(&map, alias));
            }
        }
    }
}

impl From<TableRef> for FromItem {
    fn from(table: TableRef) -> Self {
        FromItem::Table(table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// An ORDER BY item. The direction is always rendered.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderByExpr {
    pub expr: Expr,
    pub dir: SortDir,
}

impl OrderByExpr {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Asc,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Desc,
        }
    }

    fn write(&self, ts: &mut TokenStream, dialect: Dialect) {
        self.expr.write(ts, dialect);
        ts.space().push(match self.dir {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        });
    }
}

/// LIMIT and OFFSET, rendered by the dialect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimitOffset {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

// =============================================================================
// Query
// =============================================================================

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until rendered with to_sql()"]
pub struct Query {
    pub select: Vec<SelectExpr>,
    pub from: Option<FromItem>,
    pub cross_joins: Vec<FromItem>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit_offset: Option<LimitOffset>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one item to the SELECT list.
    pub fn project(mut self, expr: SelectExpr) -> Self {
        self.select.push(expr);
        self
    }

    pub fn from(mut self, item: impl Into<FromItem>) -> Self {
        self.from = Some(item.into());
        self
    }

    pub fn cross_join(mut self, item: impl Into<FromItem>) -> Self {
        self.cross_joins.push(item.into());
        self
    }

    /// AND `condition` onto the WHERE clause.
    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn group(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn order(mut self, order: OrderByExpr) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set LIMIT and OFFSET. Passing neither clears pagination.
    pub fn paginate(mut self, limit: Option<u64>, offset: Option<u64>) -> Self {
        self.limit_offset = (limit.is_some() || offset.is_some())
            .then_some(LimitOffset { limit, offset });
        self
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Select);
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                ts.comma();
            }
            ts.newline().indent(1);
            item.write(&mut ts, dialect);
        }

        if let Some(from) = &self.from {
            ts.newline().push(Token::From).space();
            from.write(&mut ts, dialect);
        }

        for item in &self.cross_joins {
            ts.newline()
                .push(Token::Cross)
                .space()
                .push(Token::Join)
                .space();
            item.write(&mut ts, dialect);
        }

        if let Some(condition) = &self.where_clause {
            ts.newline().push(Token::Where).space();
            condition.write(&mut ts, dialect);
        }

        for (i, expr) in self.group_by.iter().enumerate() {
            if i == 0 {
                ts.newline().push(Token::GroupBy).space();
            } else {
                ts.comma().space();
            }
            expr.write(&mut ts, dialect);
        }

        for (i, order) in self.order_by.iter().enumerate() {
            if i == 0 {
                ts.newline().push(Token::OrderBy).space();
            } else {
                ts.comma().space();
            }
            order.write(&mut ts, dialect);
        }

        if let Some(lo) = &self.limit_offset {
            let clause = dialect.emit_limit_offset(lo.limit, lo.offset);
            if !clause.is_empty() {
                ts.newline().append(&clause);
            }
        }

        ts
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}

impl std::fmt::Display for Query {
    /// Renders for the default dialect; use [`Query::to_sql`] for others.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql(Dialect::default()))
    }
}
