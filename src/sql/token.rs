//! Output tokens for rendered SQL.
//!
//! Keywords, punctuation and operators have one spelling in every dialect.
//! Identifiers and literals are quoted and formatted by the target
//! [`SqlDialect`].

use super::dialect::{Dialect, SqlDialect};

/// One element of a rendered statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    Join,
    Cross,
    Lateral,
    GroupBy,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Offset,
    In,
    Like,
    Escape,
    IsNull,
    IsNotNull,
    Exists,
    Array,
    True,
    False,

    // Punctuation
    Comma,
    Dot,
    Star,
    LParen,
    RParen,
    LBracket,
    RBracket,

    // Operators
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    /// Array overlap, `&&`.
    Overlaps,
    /// hstore lookup, `->`.
    Arrow,

    // Layout
    Space,
    Newline,
    Indent(usize),

    /// Table, column or alias name.
    Ident(String),
    /// `[schema.]table`
    QualifiedIdent {
        schema: Option<String>,
        name: String,
    },
    LitInt(i64),
    LitFloat(f64),
    LitString(String),
    /// Epoch milliseconds, UTC.
    LitTimestamp(i64),

    /// Function name, uppercased on output.
    FunctionName(String),

    /// Bare keyword passed through unquoted (e.g. a date part like `DAY`).
    ///
    /// Only ever built from closed enums inside the crate, never from request input.
    Keyword(&'static str),
}

impl Token {
    /// Spelling of tokens that do not depend on the dialect.
    fn fixed(&self) -> Option<&'static str> {
        let text = match self {
            Token::Select => "SELECT",
            Token::From => "FROM",
            Token::Where => "WHERE",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::As => "AS",
            Token::Join => "JOIN",
            Token::Cross => "CROSS",
            Token::Lateral => "LATERAL",
            Token::GroupBy => "GROUP BY",
            Token::OrderBy => "ORDER BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::Limit => "LIMIT",
            Token::Offset => "OFFSET",
            Token::In => "IN",
            Token::Like => "LIKE",
            Token::Escape => "ESCAPE",
            Token::IsNull => "IS NULL",
            Token::IsNotNull => "IS NOT NULL",
            Token::Exists => "EXISTS",
            Token::Array => "ARRAY",
            Token::True => "TRUE",
            Token::False => "FALSE",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Star => "*",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Eq => "=",
            Token::Ne => "<>",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Lte => "<=",
            Token::Gte => ">=",
            Token::Overlaps => "&&",
            Token::Arrow => "->",
            Token::Space => " ",
            Token::Newline => "\n",
            Token::Keyword(kw) => *kw,
            _ => return None,
        };
        Some(text)
    }

    /// Append this token's text for `dialect` to `out`.
    fn write_to(&self, out: &mut String, dialect: Dialect) {
        if let Some(text) = self.fixed() {
            out.push_str(text);
            return;
        }
        match self {
            Token::Indent(n) => {
                for _ in 0..*n {
                    out.push_str("  ");
                }
            }
            Token::Ident(name) => out.push_str(&dialect.quote_identifier(name)),
            Token::QualifiedIdent { schema, name } => {
                if let Some(schema) = schema {
                    out.push_str(&dialect.quote_identifier(schema));
                    out.push('.');
                }
                out.push_str(&dialect.quote_identifier(name));
            }
            Token::LitInt(n) => out.push_str(&n.to_string()),
            // Request values come from JSON, which has no NaN or infinity.
            Token::LitFloat(f) if !f.is_finite() => out.push_str("NULL"),
            Token::LitFloat(f) => out.push_str(ryu::Buffer::new().format(*f)),
            Token::LitString(s) => out.push_str(&dialect.quote_string(s)),
            Token::LitTimestamp(millis) => {
                out.push_str(&dialect.format_timestamp_literal(*millis))
            }
            Token::FunctionName(name) => out.push_str(&name.to_uppercase()),
            _ => {}
        }
    }

    pub fn serialize(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        self.write_to(&mut out, dialect);
        out
    }
}

/// Tokens of a statement or fragment, in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend_from_slice(&other.tokens);
        self
    }

    /// Append `items` separated by `, `.
    pub fn append_comma_separated(&mut self, items: &[TokenStream]) -> &mut Self {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.comma().space();
            }
            self.append(item);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn serialize(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            token.write_to(&mut out, dialect);
        }
        out
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }
    pub fn indent(&mut self, n: usize) -> &mut Self {
        self.push(Token::Indent(n))
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}
