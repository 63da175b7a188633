//! Result shape selection.

use serde::Serialize;

use crate::error::{ValidationError, ValidationResult};

/// Structural type of a response, derived from the request's cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultShape {
    SinglePoint,
    AggregateList,
    TimeSeries,
    StackedTimeSeries,
    StackedBarChart,
}

impl std::fmt::Display for ResultShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResultShape::SinglePoint => "single_point",
            ResultShape::AggregateList => "aggregate_list",
            ResultShape::TimeSeries => "time_series",
            ResultShape::StackedTimeSeries => "stacked_time_series",
            ResultShape::StackedBarChart => "stacked_bar_chart",
        };
        write!(f, "{}", s)
    }
}

/// Pick the shape for `group_by_count` entity groupings, with or without a
/// time bucket.
pub fn select_shape(group_by_count: usize, has_time_bucket: bool) -> ValidationResult<ResultShape> {
    match (group_by_count, has_time_bucket) {
        (0, false) => Ok(ResultShape::SinglePoint),
        (0, true) => Ok(ResultShape::TimeSeries),
        (1, false) => Ok(ResultShape::AggregateList),
        (1, true) => Ok(ResultShape::StackedTimeSeries),
        (2, false) => Ok(ResultShape::StackedBarChart),
        (2, true) => Err(ValidationError::UnsupportedGroupBy(
            "a time bucket allows at most one group by".into(),
        )),
        (n, _) => Err(ValidationError::UnsupportedGroupBy(format!(
            "at most two group bys are supported, got {}",
            n
        ))),
    }
}
