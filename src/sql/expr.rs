//! Expression AST for the predicates and projections of a statistics query.
//!
//! Expressions are built with the free constructors (`col`, `lit_str`, ...)
//! and the [`ExprExt`] combinators, then rendered into a [`TokenStream`] for
//! one dialect. Rendering is a single pass that appends to the caller's
//! stream; dialect hooks that need a sub-expression as tokens get it rendered
//! on its own first.

use super::dialect::{Dialect, SqlDialect, TimeUnit};
use super::query::SelectExpr;
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `[table.]column`
    Column {
        table: Option<String>,
        column: String,
    },

    Literal(Literal),

    /// `left op right`
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// `NAME(args...)`
    Call { name: String, args: Vec<Expr> },

    /// `expr [NOT] IN (values...)`; an empty list renders as a constant.
    InList {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// `expr IS [NOT] NULL`
    IsNull { expr: Box<Expr>, negated: bool },

    /// `*`
    Star,

    /// `(expr)`
    Nested(Box<Expr>),

    /// Timestamp truncated to the start of its bucket.
    TimeTrunc { unit: TimeUnit, expr: Box<Expr> },

    /// Array column sharing at least one element with `values`. Same empty
    /// list convention as `InList`.
    ContainsAny {
        array: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// Value stored under `key` in a key/value column.
    KeyLookup { map: Box<Expr>, key: String },
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    /// Epoch milliseconds, UTC.
    Timestamp(i64),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Like,
}

impl BinaryOperator {
    fn token(self) -> Token {
        match self {
            BinaryOperator::Eq => Token::Eq,
            BinaryOperator::Ne => Token::Ne,
            BinaryOperator::Lt => Token::Lt,
            BinaryOperator::Gt => Token::Gt,
            BinaryOperator::Lte => Token::Lte,
            BinaryOperator::Gte => Token::Gte,
            BinaryOperator::And => Token::And,
            BinaryOperator::Or => Token::Or,
            BinaryOperator::Like => Token::Like,
        }
    }
}

impl Literal {
    fn token(&self) -> Token {
        match self {
            Literal::Int(n) => Token::LitInt(*n),
            Literal::Float(f) => Token::LitFloat(*f),
            Literal::String(s) => Token::LitString(s.clone()),
            Literal::Timestamp(ms) => Token::LitTimestamp(*ms),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

impl Expr {
    /// Render for the default dialect.
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        self.write(&mut ts, dialect);
        ts
    }

    /// Append this expression to `ts`.
    pub fn write(&self, ts: &mut TokenStream, dialect: Dialect) {
        match self {
            Expr::Column { table, column } => {
                if let Some(table) = table {
                    ts.push(Token::Ident(table.clone())).push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Literal(lit) => {
                ts.push(lit.token());
            }

            Expr::Binary { left, op, right } => {
                left.write(ts, dialect);
                ts.space().push(op.token()).space();
                right.write(ts, dialect);
                if *op == BinaryOperator::Like {
                    ts.append(&dialect.emit_like_escape());
                }
            }

            Expr::Call { name, args } => {
                ts.push(Token::FunctionName(name.clone())).lparen();
                write_list(ts, args, dialect);
                ts.rparen();
            }

            Expr::InList { values, negated, .. } | Expr::ContainsAny { values, negated, .. }
                if values.is_empty() =>
            {
                // Nothing matches an empty set.
                ts.push(if *negated { Token::True } else { Token::False });
            }

            Expr::InList {
                expr,
                values,
                negated,
            } => {
                expr.write(ts, dialect);
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::In).space().lparen();
                write_list(ts, values, dialect);
                ts.rparen();
            }

            Expr::IsNull { expr, negated } => {
                expr.write(ts, dialect);
                ts.space()
                    .push(if *negated { Token::IsNotNull } else { Token::IsNull });
            }

            Expr::Star => {
                ts.push(Token::Star);
            }

            Expr::Nested(inner) => {
                ts.lparen();
                inner.write(ts, dialect);
                ts.rparen();
            }

            Expr::TimeTrunc { unit, expr } => {
                let inner = expr.to_tokens_for_dialect(dialect);
                ts.append(&dialect.emit_time_truncate(*unit, &inner));
            }

            Expr::ContainsAny {
                array,
                values,
                negated,
            } => {
                let array = array.to_tokens_for_dialect(dialect);
                let values: Vec<TokenStream> = values
                    .iter()
                    .map(|v| v.to_tokens_for_dialect(dialect))
                    .collect();
                let test = dialect.emit_array_contains_any(&array, &values);
                if *negated {
                    ts.push(Token::Not).space().lparen().append(&test).rparen();
                } else {
                    ts.append(&test);
                }
            }

            Expr::KeyLookup { map, key } => {
                let map = map.to_tokens_for_dialect(dialect);
                ts.append(&dialect.emit_key_lookup(&map, key));
            }
        }
    }
}

fn write_list(ts: &mut TokenStream, exprs: &[Expr], dialect: Dialect) {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        expr.write(ts, dialect);
    }
}

// =============================================================================
// Constructors
// =============================================================================

pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// `table.column`
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

/// Timestamp literal from epoch milliseconds.
pub fn lit_timestamp(millis: i64) -> Expr {
    Expr::Literal(Literal::Timestamp(millis))
}

pub fn star() -> Expr {
    Expr::Star
}

/// `COUNT(*)`
pub fn count_star() -> Expr {
    func("COUNT", vec![star()])
}

pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        name: name.into(),
        args,
    }
}

/// Truncate `expr` to the start of its `unit` bucket.
pub fn time_trunc(unit: TimeUnit, expr: Expr) -> Expr {
    Expr::TimeTrunc {
        unit,
        expr: Box::new(expr),
    }
}

/// OR the predicates together, parenthesized when there is more than one so
/// the result composes under AND. `None` for an empty list.
pub fn any_of(exprs: Vec<Expr>) -> Option<Expr> {
    let mut iter = exprs.into_iter();
    let first = iter.next()?;
    let mut rest = iter.peekable();
    if rest.peek().is_none() {
        return Some(first);
    }
    let folded = rest.fold(first, |acc, e| acc.or(e));
    Some(Expr::Nested(Box::new(folded)))
}

// =============================================================================
// Combinators
// =============================================================================

/// Fluent builders on anything convertible to an [`Expr`].
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::Binary {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other.into()),
        }
    }

    fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Ne, other)
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gt, other)
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gte, other)
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lt, other)
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lte, other)
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Or, other)
    }

    /// Substring match; `pattern` carries its own wildcards.
    fn like(self, pattern: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Like, pattern)
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn not_in_list(self, values: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self.into_expr()),
            values,
            negated: true,
        }
    }

    fn contains_any(self, values: Vec<Expr>) -> Expr {
        Expr::ContainsAny {
            array: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn contains_none(self, values: Vec<Expr>) -> Expr {
        Expr::ContainsAny {
            array: Box::new(self.into_expr()),
            values,
            negated: true,
        }
    }

    fn key(self, key: &str) -> Expr {
        Expr::KeyLookup {
            map: Box::new(self.into_expr()),
            key: key.into(),
        }
    }

    /// SELECT list item named `name`.
    fn alias(self, name: &str) -> SelectExpr {
        SelectExpr {
            expr: self.into_expr(),
            alias: Some(name.into()),
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Self {
        lit_float(f)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Literal::String(s))
    }
}
