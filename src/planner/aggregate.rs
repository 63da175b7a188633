//! Aggregate functions and their result types.

use serde::Serialize;

use crate::catalog::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Parse a requested function name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" | "average" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    /// SQL function name.
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    /// Prefix for projected column aliases.
    pub fn alias_prefix(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Type of the aggregate over a column of type `input`, or `None` when
    /// the reduction is meaningless for it.
    pub fn result_type(&self, input: DataType) -> Option<DataType> {
        use DataType::*;
        match (self, input) {
            (Self::Count, _) => Some(Long),
            (Self::Sum, Integer | Long) => Some(Long),
            (Self::Sum, Double) => Some(Double),
            (Self::Avg, Integer | Long | Double) => Some(Double),
            (Self::Min | Self::Max, Integer | Long | Double | Timestamp) => Some(input),
            _ => None,
        }
    }
}

impl std::fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}
