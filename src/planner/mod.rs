//! Query planning.
//!
//! [`QueryPlanBuilder`] turns a request and its normalized filters into a
//! [`QueryPlan`]: the SQL query plus the ordered list of projected fields the
//! decoder reads rows back with. Projection order is aggregates, then group
//! keys, then the time bucket; the decoder relies on exactly this order.
//!
//! Group bys dispatch on the field's kind:
//!
//! - simple columns are projected, grouped and required to be non-null
//! - array columns are unnested through a cross join and grouped per element
//! - key/value columns are expanded through a cross join, restricted to one
//!   key, and grouped by value; pagination is disabled for these

mod aggregate;
mod predicate;

pub use aggregate::AggregateFunction;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{DataType, FieldCatalog, FieldDescriptor, FilterKind};
use crate::error::{ValidationError, ValidationResult};
use crate::request::{Aggregation, Filter, GroupBy, SortDirection, StatsRequest, TimeBucket};
use crate::shape::{select_shape, ResultShape};
use crate::sql::{
    col, count_star, func, table_col, time_trunc, Dialect, Expr, ExprExt, FromItem, OrderByExpr,
    Query, TableRef,
};

/// Alias of the projected time bucket column.
pub const TIME_BUCKET_ALIAS: &str = "time_bucket";

/// Alias of the projected `COUNT(*)` column.
pub const COUNT_ALIAS: &str = "count";

// =============================================================================
// Plan types
// =============================================================================

/// A resolved grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKey {
    /// Plain column.
    Simple { field: FieldDescriptor },
    /// Array column, unnested as `alias`.
    Array { field: FieldDescriptor, alias: String },
    /// Entries of a key/value column under `key`, expanded as `alias`.
    KeyValue {
        field: FieldDescriptor,
        key: String,
        alias: String,
    },
}

impl GroupKey {
    /// Catalog field grouped on.
    pub fn field(&self) -> &FieldDescriptor {
        match self {
            GroupKey::Simple { field }
            | GroupKey::Array { field, .. }
            | GroupKey::KeyValue { field, .. } => field,
        }
    }

    /// Name of the projected column.
    pub fn projected_alias(&self) -> String {
        match self {
            GroupKey::Simple { field } | GroupKey::Array { field, .. } => field.name.clone(),
            GroupKey::KeyValue { field, key, .. } => format!("{}_{}", field.name, key),
        }
    }

    pub fn is_key_value(&self) -> bool {
        matches!(self, GroupKey::KeyValue { .. })
    }

    fn data_type(&self) -> DataType {
        match self {
            GroupKey::Simple { .. } | GroupKey::Array { .. } => DataType::String,
            GroupKey::KeyValue { .. } => DataType::KeyValue,
        }
    }
}

/// What a projected column carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum FieldRole {
    Aggregate {
        function: AggregateFunction,
        /// Source field; `None` for `COUNT(*)`.
        field: Option<String>,
    },
    GroupKey(GroupKey),
    TimeBucket,
}

/// One column of the plan's SELECT list, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedField {
    pub alias: String,
    pub data_type: DataType,
    pub role: FieldRole,
}

impl ProjectedField {
    pub fn is_aggregate(&self) -> bool {
        matches!(self.role, FieldRole::Aggregate { .. })
    }

    fn matches_sort(&self, field: &str) -> bool {
        match &self.role {
            FieldRole::Aggregate { field: Some(source), .. } => {
                self.alias == field || source == field
            }
            _ => self.alias == field,
        }
    }
}

/// A sort criterion that survived planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSort {
    /// Alias of the projected column sorted on.
    pub alias: String,
    pub direction: SortDirection,
}

/// An executable plan for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub account_id: String,
    pub shape: ResultShape,
    pub projected_fields: Vec<ProjectedField>,
    pub group_keys: Vec<GroupKey>,
    /// Normalized filters the predicates were built from.
    pub filters: Vec<Filter>,
    pub sort: Vec<PlannedSort>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub query: Query,
}

impl QueryPlan {
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.query.to_sql(dialect)
    }

    /// Position of the projected column named `alias`.
    pub fn position(&self, alias: &str) -> Option<usize> {
        self.projected_fields.iter().position(|f| f.alias == alias)
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct QueryPlanBuilder<'a> {
    catalog: &'a FieldCatalog,
}

impl<'a> QueryPlanBuilder<'a> {
    pub fn new(catalog: &'a FieldCatalog) -> Self {
        Self { catalog }
    }

    /// Build the plan for `request` from its normalized `filters`.
    pub fn build(
        &self,
        request: &StatsRequest,
        filters: Vec<Filter>,
        shape: ResultShape,
    ) -> ValidationResult<QueryPlan> {
        let expected = select_shape(request.group_by.len(), request.time_bucket.is_some())?;
        if shape != expected {
            return Err(ValidationError::UnsupportedGroupBy(format!(
                "{} result requested, but the grouping yields {}",
                shape, expected
            )));
        }

        let table = self.catalog.table();
        let mut from = TableRef::new(&table.name).with_alias(&table.alias);
        if let Some(schema) = &table.schema {
            from = from.with_schema(schema);
        }
        let mut query = Query::new().from(from);
        let mut projected = Vec::new();

        for (expr, field) in self.aggregates(&request.aggregations)? {
            query = query.project(expr.alias(&field.alias));
            projected.push(field);
        }

        let mut group_predicates = Vec::new();
        let mut group_keys = Vec::with_capacity(request.group_by.len());
        for (i, group_by) in request.group_by.iter().enumerate() {
            let key = self.resolve_group_by(i, group_by)?;
            query = self.apply_group_key(query, &key, &mut group_predicates);
            projected.push(ProjectedField {
                alias: key.projected_alias(),
                data_type: key.data_type(),
                role: FieldRole::GroupKey(key.clone()),
            });
            group_keys.push(key);
        }

        if let Some(bucket) = &request.time_bucket {
            let field = self.bucket_field(bucket, &filters)?;
            let trunc = time_trunc(
                bucket.granularity.into(),
                table_col(&table.alias, &field.column),
            );
            query = query
                .project(trunc.clone().alias(TIME_BUCKET_ALIAS))
                .group(trunc)
                .order(OrderByExpr::asc(col(TIME_BUCKET_ALIAS)));
            projected.push(ProjectedField {
                alias: TIME_BUCKET_ALIAS.into(),
                data_type: DataType::Timestamp,
                role: FieldRole::TimeBucket,
            });
        }

        for filter in &filters {
            if let Some(p) = predicate::predicate(self.catalog, filter)? {
                query = query.filter(p);
            }
        }
        for p in group_predicates {
            query = query.filter(p);
        }

        let mut sort = Vec::new();
        if request.time_bucket.is_some() {
            if !request.sort.is_empty() {
                debug!(
                    count = request.sort.len(),
                    "time bucket ordering overrides sort criteria"
                );
            }
        } else {
            for criterion in &request.sort {
                let Some(target) = projected.iter().find(|f| f.matches_sort(&criterion.field))
                else {
                    debug!(field = %criterion.field, "dropping sort on unprojected field");
                    continue;
                };
                let column = col(&target.alias);
                query = query.order(match criterion.direction {
                    SortDirection::Ascending => OrderByExpr::asc(column),
                    SortDirection::Descending => OrderByExpr::desc(column),
                });
                sort.push(PlannedSort {
                    alias: target.alias.clone(),
                    direction: criterion.direction,
                });
            }
        }

        let (limit, offset) = if group_keys.iter().any(GroupKey::is_key_value) {
            if request.limit.is_some() || request.offset.is_some() {
                debug!("pagination disabled for key/value group by");
            }
            (None, None)
        } else {
            (request.limit, request.offset)
        };
        query = query.paginate(limit, offset);

        Ok(QueryPlan {
            account_id: request.account_id.clone(),
            shape,
            projected_fields: projected,
            group_keys,
            filters,
            sort,
            limit,
            offset,
            query,
        })
    }

    /// Aggregate expressions in request order. Unknown functions are skipped
    /// and duplicates are emitted once; with nothing left, `COUNT(*)`.
    fn aggregates(
        &self,
        aggregations: &[Aggregation],
    ) -> ValidationResult<Vec<(Expr, ProjectedField)>> {
        let alias = &self.catalog.table().alias;
        let mut out: Vec<(Expr, ProjectedField)> = Vec::new();

        for aggregation in aggregations {
            let Some(function) = AggregateFunction::parse(&aggregation.function) else {
                debug!(function = %aggregation.function, "skipping unknown aggregation");
                continue;
            };

            let (expr, field) = match (&aggregation.column, function) {
                (None, AggregateFunction::Count) => (
                    count_star(),
                    ProjectedField {
                        alias: COUNT_ALIAS.into(),
                        data_type: DataType::Long,
                        role: FieldRole::Aggregate {
                            function,
                            field: None,
                        },
                    },
                ),
                (None, _) => {
                    return Err(ValidationError::UnsupportedAggregation {
                        function: function.to_string(),
                        field: "*".into(),
                    })
                }
                (Some(name), _) => {
                    let source = self.catalog.describe(name)?;
                    let data_type = function.result_type(source.data_type).ok_or_else(|| {
                        ValidationError::UnsupportedAggregation {
                            function: function.to_string(),
                            field: source.name.clone(),
                        }
                    })?;
                    (
                        func(function.sql_name(), vec![table_col(alias, &source.column)]),
                        ProjectedField {
                            alias: format!("{}_{}", function.alias_prefix(), source.name),
                            data_type,
                            role: FieldRole::Aggregate {
                                function,
                                field: Some(source.name.clone()),
                            },
                        },
                    )
                }
            };

            if out.iter().all(|(_, f)| f.alias != field.alias) {
                out.push((expr, field));
            }
        }

        if out.is_empty() {
            out.push((
                count_star(),
                ProjectedField {
                    alias: COUNT_ALIAS.into(),
                    data_type: DataType::Long,
                    role: FieldRole::Aggregate {
                        function: AggregateFunction::Count,
                        field: None,
                    },
                },
            ));
        }
        Ok(out)
    }

    fn resolve_group_by(&self, index: usize, group_by: &GroupBy) -> ValidationResult<GroupKey> {
        let key_value = |field: Option<&str>, key: &str, what: &str| -> ValidationResult<GroupKey> {
            let name = field.ok_or_else(|| {
                ValidationError::UnsupportedGroupBy(format!(
                    "catalog '{}' has no {} column",
                    self.catalog.name(),
                    what
                ))
            })?;
            Ok(GroupKey::KeyValue {
                field: self.catalog.describe(name)?.clone(),
                key: key.to_string(),
                alias: format!("kv{}", index),
            })
        };

        match group_by {
            GroupBy::Entity { field } => {
                let field = self.catalog.describe(field)?;
                if field.data_type != DataType::String {
                    return Err(ValidationError::UnsupportedGroupBy(format!(
                        "'{}' is not an entity field",
                        field.name
                    )));
                }
                match field.filter_kind {
                    FilterKind::Simple => Ok(GroupKey::Simple {
                        field: field.clone(),
                    }),
                    FilterKind::Array => Ok(GroupKey::Array {
                        field: field.clone(),
                        alias: format!("u{}", index),
                    }),
                    FilterKind::KeyValue => Err(ValidationError::UnsupportedGroupBy(format!(
                        "'{}' is grouped by tag or label",
                        field.name
                    ))),
                }
            }
            GroupBy::Tag { name } => key_value(self.catalog.tag_field(), name, "tag"),
            GroupBy::Label { name } => key_value(self.catalog.label_field(), name, "label"),
        }
    }

    fn apply_group_key(&self, query: Query, key: &GroupKey, predicates: &mut Vec<Expr>) -> Query {
        let table = &self.catalog.table().alias;
        let alias = key.projected_alias();
        match key {
            GroupKey::Simple { field } => {
                let c = table_col(table, &field.column);
                predicates.push(c.clone().is_not_null());
                query.project(c.clone().alias(&alias)).group(c)
            }
            GroupKey::Array { field, alias: element } => query
                .cross_join(FromItem::Unnest {
                    array: table_col(table, &field.column),
                    alias: element.clone(),
                })
                .project(col(element).alias(&alias))
                .group(col(element)),
            GroupKey::KeyValue {
                field,
                key,
                alias: entry,
            } => {
                predicates.push(table_col(entry, "key").eq(key.as_str()));
                let value = table_col(entry, "value");
                query
                    .cross_join(FromItem::KeyValueExpand {
                        map: table_col(table, &field.column),
                        alias: entry.clone(),
                    })
                    .project(value.clone().alias(&alias))
                    .group(value)
            }
        }
    }

    /// Timestamp field to bucket on: the explicit one, else whichever of the
    /// end or start field the filters bound, else the default.
    fn bucket_field(
        &self,
        bucket: &TimeBucket,
        filters: &[Filter],
    ) -> ValidationResult<&'a FieldDescriptor> {
        let name = match &bucket.time_field {
            Some(name) => name.as_str(),
            None => {
                let bound = |field: &str| {
                    filters
                        .iter()
                        .any(|f| matches!(f, Filter::Time(t) if t.field == field))
                };
                if bound(self.catalog.end_time_field()) {
                    self.catalog.end_time_field()
                } else if bound(self.catalog.start_time_field()) {
                    self.catalog.start_time_field()
                } else {
                    self.catalog.default_time_field()
                }
            }
        };
        let field = self.catalog.describe(name)?;
        if field.data_type != DataType::Timestamp {
            return Err(ValidationError::UnsupportedGroupBy(format!(
                "cannot bucket on non-timestamp field '{}'",
                field.name
            )));
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{billing, deployment};
    use crate::request::{Granularity, IdFilter, IdOperator};
    use crate::sql::test_utils::validate_sql;

    const T0: i64 = 1_700_000_000_000;
    const T1: i64 = 1_700_604_800_000;

    fn window() -> Vec<Filter> {
        vec![
            Filter::id_in("accountid", &["acc-1"]),
            Filter::after("starttime", T0),
            Filter::before("endtime", T1),
        ]
    }

    fn plan(catalog: &FieldCatalog, request: &StatsRequest, shape: ResultShape) -> QueryPlan {
        QueryPlanBuilder::new(catalog)
            .build(request, window(), shape)
            .unwrap()
    }

    #[test]
    fn test_single_point_sql() {
        let catalog = billing();
        let request = StatsRequest::new("acc-1").aggregate("SUM", Some("cost"));
        let plan = plan(&catalog, &request, ResultShape::SinglePoint);

        let sql = plan.to_sql(Dialect::Postgres);
        insta::assert_snapshot!(sql, @r#"
        SELECT
          SUM("t0"."cost") AS "sum_cost"
        FROM "billing_data" AS "t0"
        WHERE "t0"."accountid" IN ('acc-1') AND "t0"."starttime" >= TIMESTAMP '2023-11-14 22:13:20.000' AND "t0"."starttime" <= TIMESTAMP '2023-11-21 22:13:20.000'
        "#);
        validate_sql(&sql, Dialect::Postgres).unwrap();
        assert_eq!(plan.projected_fields.len(), 1);
        assert_eq!(plan.projected_fields[0].data_type, DataType::Double);
    }

    #[test]
    fn test_simple_group_by() {
        let catalog = billing();
        let request = StatsRequest::new("acc-1")
            .aggregate("sum", Some("cost"))
            .group_by(GroupBy::entity("clusterid"))
            .sort_by("cost", SortDirection::Descending)
            .paginate(10, 20);
        let plan = plan(&catalog, &request, ResultShape::AggregateList);

        let sql = plan.to_sql(Dialect::Postgres);
        insta::assert_snapshot!(sql, @r#"
        SELECT
          SUM("t0"."cost") AS "sum_cost",
          "t0"."clusterid" AS "clusterid"
        FROM "billing_data" AS "t0"
        WHERE "t0"."accountid" IN ('acc-1') AND "t0"."starttime" >= TIMESTAMP '2023-11-14 22:13:20.000' AND "t0"."starttime" <= TIMESTAMP '2023-11-21 22:13:20.000' AND "t0"."clusterid" IS NOT NULL
        GROUP BY "t0"."clusterid"
        ORDER BY "sum_cost" DESC
        LIMIT 10 OFFSET 20
        "#);
        validate_sql(&sql, Dialect::Postgres).unwrap();
        assert_eq!(
            plan.sort,
            vec![PlannedSort {
                alias: "sum_cost".into(),
                direction: SortDirection::Descending
            }]
        );
    }

    #[test]
    fn test_array_group_by_unnests() {
        let catalog = deployment();
        let request = StatsRequest::new("acc-1")
            .aggregate("COUNT", None)
            .group_by(GroupBy::entity("serviceid"));
        let plan = plan(&catalog, &request, ResultShape::AggregateList);

        let sql = plan.to_sql(Dialect::Postgres);
        assert!(sql.contains(r#"CROSS JOIN UNNEST("t0"."services") AS "u0"("u0")"#));
        assert!(sql.contains(r#""u0" AS "serviceid""#));
        assert!(sql.contains(r#"GROUP BY "u0""#));
        assert_eq!(plan.projected_fields[1].alias, "serviceid");
    }

    #[test]
    fn test_tag_group_by_disables_pagination() {
        let catalog = deployment();
        let request = StatsRequest::new("acc-1")
            .aggregate("COUNT", None)
            .group_by(GroupBy::Tag { name: "team".into() })
            .paginate(5, 5);
        let plan = plan(&catalog, &request, ResultShape::AggregateList);

        let sql = plan.to_sql(Dialect::Postgres);
        assert!(sql.contains(r#"CROSS JOIN EACH("t0"."tags") AS "kv0"("key", "value")"#));
        assert!(sql.contains(r#""kv0"."key" = 'team'"#));
        assert!(sql.contains(r#""kv0"."value" AS "tags_team""#));
        assert!(!sql.contains("LIMIT"));
        assert_eq!((plan.limit, plan.offset), (None, None));
        assert_eq!(plan.projected_fields[1].data_type, DataType::KeyValue);
    }

    #[test]
    fn test_label_group_by_requires_label_column() {
        let catalog = deployment();
        let request = StatsRequest::new("acc-1").group_by(GroupBy::Label { name: "app".into() });
        let err = QueryPlanBuilder::new(&catalog)
            .build(&request, window(), ResultShape::AggregateList)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedGroupBy(_)));
    }

    #[test]
    fn test_shape_must_match_request() {
        let catalog = billing();
        let request = StatsRequest::new("acc-1").aggregate("SUM", Some("cost"));
        let err = QueryPlanBuilder::new(&catalog)
            .build(&request, window(), ResultShape::AggregateList)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedGroupBy(_)));

        let request = request
            .group_by(GroupBy::entity("clusterid"))
            .group_by(GroupBy::entity("namespace"))
            .bucket(Granularity::Day);
        let err = QueryPlanBuilder::new(&catalog)
            .build(&request, window(), ResultShape::StackedBarChart)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedGroupBy(_)));
    }

    #[test]
    fn test_time_bucket_prefers_end_time_and_overrides_sort() {
        let catalog = deployment();
        let request = StatsRequest::new("acc-1")
            .aggregate("COUNT", None)
            .bucket(Granularity::Day)
            .sort_by("count", SortDirection::Descending);
        let plan = plan(&catalog, &request, ResultShape::TimeSeries);

        let sql = plan.to_sql(Dialect::Postgres);
        assert!(sql.contains(r#"DATE_TRUNC('day', "t0"."endtime") AS "time_bucket""#));
        assert!(sql.contains(r#"GROUP BY DATE_TRUNC('day', "t0"."endtime")"#));
        assert!(sql.ends_with(r#"ORDER BY "time_bucket" ASC"#));
        assert!(plan.sort.is_empty());
        validate_sql(&sql, Dialect::Postgres).unwrap();
    }

    #[test]
    fn test_time_bucket_falls_back_to_start_time() {
        let catalog = deployment();
        let request = StatsRequest::new("acc-1").bucket(Granularity::Hour);
        let filters = vec![Filter::after("starttime", T0), Filter::before("starttime", T1)];
        let plan = QueryPlanBuilder::new(&catalog)
            .build(&request, filters, ResultShape::TimeSeries)
            .unwrap();
        assert!(plan
            .to_sql(Dialect::Postgres)
            .contains(r#"DATE_TRUNC('hour', "t0"."starttime")"#));
    }

    #[test]
    fn test_sort_on_unprojected_field_dropped() {
        let catalog = billing();
        let request = StatsRequest::new("acc-1")
            .aggregate("SUM", Some("cost"))
            .group_by(GroupBy::entity("clusterid"))
            .sort_by("idlecost", SortDirection::Ascending)
            .sort_by("clusterid", SortDirection::Ascending);
        let plan = plan(&catalog, &request, ResultShape::AggregateList);

        let sql = plan.to_sql(Dialect::Postgres);
        assert!(!sql.contains("idlecost"));
        assert!(sql.contains(r#"ORDER BY "clusterid" ASC"#));
        assert_eq!(plan.sort.len(), 1);
    }

    #[test]
    fn test_unknown_aggregation_skipped_and_duplicates_merged() {
        let catalog = billing();
        let request = StatsRequest::new("acc-1")
            .aggregate("median", Some("cost"))
            .aggregate("SUM", Some("cost"))
            .aggregate("sum", Some("cost"))
            .aggregate("average", Some("cpurequest"));
        let plan = plan(&catalog, &request, ResultShape::SinglePoint);

        let aliases: Vec<_> = plan.projected_fields.iter().map(|f| f.alias.as_str()).collect();
        assert_eq!(aliases, vec!["sum_cost", "avg_cpurequest"]);
    }

    #[test]
    fn test_no_aggregation_counts_rows() {
        let catalog = billing();
        let request = StatsRequest::new("acc-1").aggregate("median", Some("cost"));
        let plan = plan(&catalog, &request, ResultShape::SinglePoint);
        assert_eq!(plan.projected_fields[0].alias, COUNT_ALIAS);
    }

    #[test]
    fn test_aggregation_type_mismatch() {
        let catalog = billing();
        let request = StatsRequest::new("acc-1").aggregate("SUM", Some("namespace"));
        let err = QueryPlanBuilder::new(&catalog)
            .build(&request, window(), ResultShape::SinglePoint)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedAggregation { .. }));
    }

    #[test]
    fn test_empty_id_set_never_renders_in_empty() {
        let catalog = billing();
        let mut filters = window();
        filters.push(Filter::Id(IdFilter::new("clusterid", IdOperator::In, &[])));
        let request = StatsRequest::new("acc-1").aggregate("SUM", Some("cost"));
        let plan = QueryPlanBuilder::new(&catalog)
            .build(&request, filters, ResultShape::SinglePoint)
            .unwrap();
        let sql = plan.to_sql(Dialect::Postgres);
        assert!(!sql.contains("IN ()"));
        assert!(!sql.contains("clusterid"));
    }

    #[test]
    fn test_stacked_bar_chart_projection_order() {
        let catalog = billing();
        let request = StatsRequest::new("acc-1")
            .aggregate("SUM", Some("cost"))
            .group_by(GroupBy::entity("clusterid"))
            .group_by(GroupBy::entity("namespace"));
        let plan = plan(&catalog, &request, ResultShape::StackedBarChart);
        let aliases: Vec<_> = plan.projected_fields.iter().map(|f| f.alias.as_str()).collect();
        assert_eq!(aliases, vec!["sum_cost", "clusterid", "namespace"]);
        assert_eq!(plan.position("namespace"), Some(2));
        validate_sql(&plan.to_sql(Dialect::Postgres), Dialect::Postgres).unwrap();
    }

    #[test]
    fn test_renders_for_duckdb_and_bigquery() {
        let catalog = deployment();
        let request = StatsRequest::new("acc-1")
            .aggregate("MAX", Some("duration"))
            .group_by(GroupBy::entity("envid"))
            .bucket(Granularity::Week);
        let plan = plan(&catalog, &request, ResultShape::StackedTimeSeries);

        let duck = plan.to_sql(Dialect::DuckDb);
        assert!(duck.contains(r#"DATE_TRUNC('week', "t0"."endtime")"#));

        let bq = plan.to_sql(Dialect::BigQuery);
        assert!(bq.contains("TIMESTAMP_TRUNC(`t0`.`endtime`, WEEK)"));
        assert!(bq.contains("CROSS JOIN UNNEST(`t0`.`environments`) AS `u0`"));
    }
}
