//! Response types, one variant per [`ResultShape`].

use serde::{Deserialize, Serialize};

use crate::shape::ResultShape;

/// Label of the single point's key.
pub const TOTAL_LABEL: &str = "Total";

/// A decoded numeric value, typed by the projected column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i32),
    Long(i64),
    Double(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Integer(v) => f64::from(v),
            Number::Long(v) => v as f64,
            Number::Double(v) => v,
        }
    }

    /// Integer view, truncating doubles.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Number::Integer(v) => i64::from(v),
            Number::Long(v) => v,
            Number::Double(v) => v as i64,
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Integer(v) => write!(f, "{}", v),
            Number::Long(v) => write!(f, "{}", v),
            Number::Double(v) => write!(f, "{}", v),
        }
    }
}

/// A group key: the raw id plus its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Projected column the key came from.
    pub field: String,
    pub id: String,
    pub name: String,
}

impl Reference {
    pub fn new(field: &str, id: &str, name: &str) -> Self {
        Self {
            field: field.into(),
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn total() -> Self {
        Self::new("", TOTAL_LABEL, TOTAL_LABEL)
    }
}

/// Aggregate values under one key, in projection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub key: Reference,
    pub values: Vec<Number>,
}

impl DataPoint {
    /// First aggregate value.
    pub fn value(&self) -> Option<Number> {
        self.values.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    /// Bucket start, epoch milliseconds.
    pub time: i64,
    pub values: Vec<Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedTimePoint {
    pub time: i64,
    pub points: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedBar {
    pub key: Reference,
    pub points: Vec<DataPoint>,
}

/// Decoded response for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryResult {
    /// `None` when the backend returned no row.
    SinglePoint(Option<DataPoint>),
    AggregateList(Vec<DataPoint>),
    TimeSeries(Vec<TimePoint>),
    StackedTimeSeries(Vec<StackedTimePoint>),
    StackedBarChart(Vec<StackedBar>),
}

impl QueryResult {
    pub fn shape(&self) -> ResultShape {
        match self {
            QueryResult::SinglePoint(_) => ResultShape::SinglePoint,
            QueryResult::AggregateList(_) => ResultShape::AggregateList,
            QueryResult::TimeSeries(_) => ResultShape::TimeSeries,
            QueryResult::StackedTimeSeries(_) => ResultShape::StackedTimeSeries,
            QueryResult::StackedBarChart(_) => ResultShape::StackedBarChart,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            QueryResult::SinglePoint(p) => p.is_none(),
            QueryResult::AggregateList(v) => v.is_empty(),
            QueryResult::TimeSeries(v) => v.is_empty(),
            QueryResult::StackedTimeSeries(v) => v.is_empty(),
            QueryResult::StackedBarChart(v) => v.is_empty(),
        }
    }
}
