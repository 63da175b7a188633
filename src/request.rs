//! Request contract for statistics queries.
//!
//! A [`StatsRequest`] is the declarative input accepted from callers:
//!
//! ```json
//! {
//!   "accountId": "acc-1",
//!   "aggregations": [{ "function": "SUM", "column": "cost" }],
//!   "filters": [{ "type": "time", "field": "starttime", "operator": "AFTER", "value": 1700000000000 }],
//!   "groupBy": [{ "type": "entity", "field": "clusterid" }],
//!   "timeBucket": { "granularity": "DAY" },
//!   "sort": [{ "field": "cost", "direction": "DESCENDING" }],
//!   "limit": 10
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::TagEntityType;
use crate::sql::TimeUnit;

/// A complete statistics request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    pub account_id: String,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub group_by: Vec<GroupBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_bucket: Option<TimeBucket>,
    #[serde(default)]
    pub sort: Vec<SortCriterion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl StatsRequest {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Default::default()
        }
    }

    pub fn aggregate(mut self, function: &str, column: Option<&str>) -> Self {
        self.aggregations.push(Aggregation {
            function: function.into(),
            column: column.map(Into::into),
        });
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by.push(group_by);
        self
    }

    pub fn bucket(mut self, granularity: Granularity) -> Self {
        self.time_bucket = Some(TimeBucket {
            granularity,
            time_field: None,
        });
        self
    }

    pub fn sort_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort.push(SortCriterion {
            field: field.into(),
            direction,
        });
        self
    }

    /// Ignored by the planner when grouping by a tag or label.
    pub fn paginate(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// One requested aggregate: a function name and the field it reduces.
///
/// The function is kept as free text; names the planner does not recognize
/// are skipped rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

// =============================================================================
// Filters
// =============================================================================

/// A request filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    Id(IdFilter),
    Number(NumberFilter),
    /// String filters share the id operator set.
    String(IdFilter),
    Time(TimeFilter),
    /// Enum filters share the id operator set.
    Enum(IdFilter),
    Tag(TagFilter),
    Label(LabelFilter),
}

impl Filter {
    /// Id filter: `field IN (values)`.
    pub fn id_in(field: &str, values: &[&str]) -> Self {
        Filter::Id(IdFilter::new(field, IdOperator::In, values))
    }

    pub fn after(field: &str, millis: i64) -> Self {
        Filter::Time(TimeFilter {
            field: field.into(),
            operator: TimeOperator::After,
            value: millis,
        })
    }

    pub fn before(field: &str, millis: i64) -> Self {
        Filter::Time(TimeFilter {
            field: field.into(),
            operator: TimeOperator::Before,
            value: millis,
        })
    }

    /// The catalog field this filter constrains, if it names one directly.
    pub fn field(&self) -> Option<&str> {
        match self {
            Filter::Id(f) | Filter::String(f) | Filter::Enum(f) => Some(&f.field),
            Filter::Number(f) => Some(&f.field),
            Filter::Time(f) => Some(&f.field),
            Filter::Tag(_) | Filter::Label(_) => None,
        }
    }

    /// A filter with no operand values never emits a predicate.
    pub fn is_inert(&self) -> bool {
        match self {
            Filter::Id(f) | Filter::String(f) | Filter::Enum(f) => {
                f.operator != IdOperator::NotNull && f.values.is_empty()
            }
            Filter::Number(f) => f.values.is_empty(),
            Filter::Label(f) => f.values.is_empty(),
            Filter::Time(_) | Filter::Tag(_) => false,
        }
    }
}

/// Operator set for id, string and enum filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdOperator {
    Equals,
    In,
    NotIn,
    NotNull,
    Like,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdFilter {
    pub field: String,
    pub operator: IdOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

impl IdFilter {
    pub fn new(field: &str, operator: IdOperator, values: &[&str]) -> Self {
        Self {
            field: field.into(),
            operator,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NumberOperator {
    Equals,
    NotEquals,
    In,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberFilter {
    pub field: String,
    pub operator: NumberOperator,
    #[serde(default)]
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOperator {
    Before,
    After,
}

/// A bound on a timestamp field, in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeFilter {
    pub field: String,
    pub operator: TimeOperator,
    pub value: i64,
}

/// Match entities carrying tag `tag_name` (with `tag_value`, if given).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilter {
    pub entity_type: TagEntityType,
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_value: Option<String>,
}

/// Match workloads carrying label `name` with any of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelFilter {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

// =============================================================================
// Grouping, bucketing and sorting
// =============================================================================

/// A requested grouping.
///
/// Entity groupings name a catalog field; the planner decides from the
/// field's filter kind whether it is a plain column or an unnested array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupBy {
    Entity { field: String },
    Tag { name: String },
    Label { name: String },
}

impl GroupBy {
    pub fn entity(field: &str) -> Self {
        GroupBy::Entity {
            field: field.into(),
        }
    }

    /// Grouping on a free-form key/value column.
    pub fn is_key_value(&self) -> bool {
        matches!(self, GroupBy::Tag { .. } | GroupBy::Label { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
}

impl From<Granularity> for TimeUnit {
    fn from(g: Granularity) -> Self {
        match g {
            Granularity::Hour => TimeUnit::Hour,
            Granularity::Day => TimeUnit::Day,
            Granularity::Week => TimeUnit::Week,
            Granularity::Month => TimeUnit::Month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub granularity: Granularity,
    /// Timestamp field to bucket on; chosen from the filters when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    #[serde(alias = "ASC")]
    Ascending,
    #[default]
    #[serde(alias = "DESC")]
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriterion {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_request() {
        let json = r#"{
            "accountId": "acc-1",
            "aggregations": [{"function": "SUM", "column": "cost"}, {"function": "COUNT"}],
            "filters": [
                {"type": "id", "field": "clusterid", "operator": "IN", "values": ["c1"]},
                {"type": "time", "field": "starttime", "operator": "AFTER", "value": 1000},
                {"type": "tag", "entityType": "APPLICATION", "tagName": "env", "tagValue": "prod"},
                {"type": "label", "name": "app", "values": ["web"]}
            ],
            "groupBy": [{"type": "entity", "field": "clusterid"}, {"type": "tag", "name": "team"}],
            "timeBucket": {"granularity": "DAY"},
            "sort": [{"field": "cost", "direction": "ASC"}],
            "limit": 10
        }"#;

        let req: StatsRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.account_id, "acc-1");
        assert_eq!(req.aggregations[1].column, None);
        assert_eq!(req.filters[0], Filter::id_in("clusterid", &["c1"]));
        assert_eq!(req.filters[1], Filter::after("starttime", 1000));
        assert!(matches!(
            &req.filters[2],
            Filter::Tag(TagFilter { entity_type: TagEntityType::Application, tag_value: Some(v), .. }) if v == "prod"
        ));
        assert!(req.group_by[1].is_key_value());
        assert_eq!(req.time_bucket.unwrap().granularity, Granularity::Day);
        assert_eq!(req.sort[0].direction, SortDirection::Ascending);
        assert_eq!(req.limit, Some(10));
        assert_eq!(req.offset, None);
    }

    #[test]
    fn test_inert_filters() {
        assert!(Filter::id_in("appid", &[]).is_inert());
        assert!(!Filter::id_in("appid", &["a"]).is_inert());
        assert!(!Filter::Id(IdFilter::new("workloadtype", IdOperator::NotNull, &[])).is_inert());
        assert!(Filter::Label(LabelFilter {
            name: "app".into(),
            values: vec![]
        })
        .is_inert());
        assert!(!Filter::after("starttime", 0).is_inert());
    }

    #[test]
    fn test_sort_direction_default() {
        let sort: SortCriterion = serde_json::from_str(r#"{"field": "count"}"#).unwrap();
        assert_eq!(sort.direction, SortDirection::Descending);
    }
}
