//! Result decoding.
//!
//! [`ResultDecoder`] reads rows back through the plan's projected fields, in
//! the order the planner emitted them, and assembles the shape the plan was
//! built for. Group keys outside an explicit id allow-list are dropped, entity
//! ids are resolved to display names once per distinct id, and a retained sort
//! on an aggregate is reapplied where decoding can reorder results.

mod names;
mod value;

pub use names::{IdNameResolver, NameResolver, StaticNameResolver, DELETED_ENTITY_NAME};

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use thiserror::Error;

use crate::executor::RowCursor;
use crate::planner::{FieldRole, GroupKey, PlannedSort, QueryPlan};
use crate::request::{Filter, IdOperator, SortDirection};
use crate::result::{
    DataPoint, Number, QueryResult, Reference, StackedBar, StackedTimePoint, TimePoint,
};
use crate::shape::ResultShape;

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Rows that do not match the plan they were produced for.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("row has no column {index} ('{alias}')")]
    MissingColumn { index: usize, alias: String },

    #[error("column '{column}' holds undecodable value {value}")]
    InvalidValue { column: String, value: String },

    #[error("{shape} row has no group key at position {position}")]
    MissingGroupKey { shape: ResultShape, position: usize },
}

/// A group key cell before name resolution.
#[derive(Debug, Clone)]
struct RawKey {
    alias: String,
    /// Catalog field for name lookup; `None` for key/value composites.
    field: Option<String>,
    id: String,
}

/// One decoded row.
#[derive(Debug)]
struct Row {
    values: Vec<Number>,
    keys: Vec<RawKey>,
    time: Option<i64>,
}

pub struct ResultDecoder<'a> {
    plan: &'a QueryPlan,
    names: &'a dyn NameResolver,
    allowed: HashMap<String, HashSet<String>>,
}

impl<'a> ResultDecoder<'a> {
    pub fn new(plan: &'a QueryPlan, names: &'a dyn NameResolver) -> Self {
        Self {
            plan,
            names,
            allowed: allow_lists(plan),
        }
    }

    /// Decode `cursor` into the plan's result shape.
    pub async fn decode(&self, cursor: RowCursor) -> DecodeResult<QueryResult> {
        let mut pass = Pass {
            names: self.names,
            memo: HashMap::new(),
        };

        let mut rows = Vec::with_capacity(cursor.rows.len());
        for raw in &cursor.rows {
            if let Some(row) = self.decode_row(raw)? {
                rows.push(row);
            }
        }

        Ok(match self.plan.shape {
            ResultShape::SinglePoint => QueryResult::SinglePoint(rows.into_iter().next().map(
                |row| DataPoint {
                    key: Reference::total(),
                    values: row.values,
                },
            )),
            ResultShape::AggregateList => {
                let mut points = Vec::with_capacity(rows.len());
                for row in rows {
                    if !self.allowed(&row.keys) {
                        continue;
                    }
                    let key = pass.reference(self.key_at(&row, 0)?).await;
                    points.push(DataPoint {
                        key,
                        values: row.values,
                    });
                }
                if let Some((index, direction)) = self.value_sort() {
                    points.sort_by(|a, b| {
                        directed(compare_values(&a.values, &b.values, index), direction)
                    });
                }
                QueryResult::AggregateList(points)
            }
            ResultShape::TimeSeries => {
                let mut points: Vec<TimePoint> = rows
                    .into_iter()
                    .filter_map(|row| {
                        row.time.map(|time| TimePoint {
                            time,
                            values: row.values,
                        })
                    })
                    .collect();
                points.sort_by_key(|p| p.time);
                QueryResult::TimeSeries(points)
            }
            ResultShape::StackedTimeSeries => {
                let mut buckets: BTreeMap<i64, Vec<DataPoint>> = BTreeMap::new();
                for row in rows {
                    let Some(time) = row.time else { continue };
                    let bucket = buckets.entry(time).or_default();
                    if !self.allowed(&row.keys) {
                        continue;
                    }
                    bucket.push(DataPoint {
                        key: pass.reference(self.key_at(&row, 0)?).await,
                        values: row.values,
                    });
                }
                QueryResult::StackedTimeSeries(
                    buckets
                        .into_iter()
                        .map(|(time, points)| StackedTimePoint { time, points })
                        .collect(),
                )
            }
            ResultShape::StackedBarChart => {
                let mut bars: Vec<StackedBar> = Vec::new();
                let mut index: HashMap<String, usize> = HashMap::new();
                for row in rows {
                    let outer = self.key_at(&row, 0)?;
                    let inner = self.key_at(&row, 1)?;
                    // Outer bars are kept even when every inner key is filtered.
                    let i = match index.get(&outer.id) {
                        Some(&i) => i,
                        None => {
                            index.insert(outer.id.clone(), bars.len());
                            bars.push(StackedBar {
                                key: pass.reference(outer).await,
                                points: Vec::new(),
                            });
                            bars.len() - 1
                        }
                    };
                    if !self.allowed_key(inner) {
                        continue;
                    }
                    let point = DataPoint {
                        key: pass.reference(inner).await,
                        values: row.values,
                    };
                    bars[i].points.push(point);
                }
                if let Some((i, direction)) = self.value_sort() {
                    bars.sort_by(|a, b| {
                        directed(stack_total(a, i).cmp(&stack_total(b, i)), direction)
                    });
                }
                QueryResult::StackedBarChart(bars)
            }
        })
    }

    /// Decode one row. `None` when a group key or the time bucket is NULL.
    fn decode_row(&self, raw: &[Value]) -> DecodeResult<Option<Row>> {
        let mut row = Row {
            values: Vec::new(),
            keys: Vec::with_capacity(self.plan.group_keys.len()),
            time: None,
        };
        for (index, field) in self.plan.projected_fields.iter().enumerate() {
            let cell = raw.get(index).ok_or_else(|| DecodeError::MissingColumn {
                index,
                alias: field.alias.clone(),
            })?;
            match &field.role {
                FieldRole::Aggregate { .. } => {
                    row.values
                        .push(value::number(cell, field.data_type, &field.alias)?);
                }
                FieldRole::GroupKey(key) => {
                    let Some(id) = value::key(cell, &field.alias)? else {
                        return Ok(None);
                    };
                    row.keys.push(match key {
                        GroupKey::KeyValue { key: name, .. } => RawKey {
                            alias: field.alias.clone(),
                            field: None,
                            id: format!("{}:{}", name, id),
                        },
                        _ => RawKey {
                            alias: field.alias.clone(),
                            field: Some(key.field().name.clone()),
                            id,
                        },
                    });
                }
                FieldRole::TimeBucket => match value::timestamp(cell, &field.alias)? {
                    Some(t) => row.time = Some(t),
                    None => return Ok(None),
                },
            }
        }
        Ok(Some(row))
    }

    fn allowed(&self, keys: &[RawKey]) -> bool {
        keys.iter().all(|key| self.allowed_key(key))
    }

    fn allowed_key(&self, key: &RawKey) -> bool {
        match &key.field {
            Some(field) => self
                .allowed
                .get(field)
                .map_or(true, |ids| ids.contains(&key.id)),
            None => true,
        }
    }

    fn key_at<'r>(&self, row: &'r Row, position: usize) -> DecodeResult<&'r RawKey> {
        row.keys.get(position).ok_or(DecodeError::MissingGroupKey {
            shape: self.plan.shape,
            position,
        })
    }

    /// Index into the row values and direction of the first retained sort on
    /// an aggregate.
    fn value_sort(&self) -> Option<(usize, SortDirection)> {
        let aggregates: Vec<&str> = self
            .plan
            .projected_fields
            .iter()
            .filter(|f| f.is_aggregate())
            .map(|f| f.alias.as_str())
            .collect();
        self.plan.sort.iter().find_map(|sort: &PlannedSort| {
            aggregates
                .iter()
                .position(|a| *a == sort.alias)
                .map(|i| (i, sort.direction))
        })
    }
}

/// Name resolution state for one decode pass.
struct Pass<'a> {
    names: &'a dyn NameResolver,
    memo: HashMap<(String, String), String>,
}

impl Pass<'_> {
    async fn reference(&mut self, key: &RawKey) -> Reference {
        let Some(field) = &key.field else {
            return Reference::new(&key.alias, &key.id, &key.id);
        };
        let memo_key = (field.clone(), key.id.clone());
        let name = match self.memo.get(&memo_key) {
            Some(name) => name.clone(),
            None => {
                let name = self.names.display_name(field, &key.id).await;
                self.memo.insert(memo_key, name.clone());
                name
            }
        };
        Reference::new(&key.alias, &key.id, &name)
    }
}

/// Per group field, the ids an explicit IN filter on that field allows.
/// Several filters on one field intersect.
fn allow_lists(plan: &QueryPlan) -> HashMap<String, HashSet<String>> {
    let grouped: HashSet<&str> = plan
        .group_keys
        .iter()
        .filter(|k| !k.is_key_value())
        .map(|k| k.field().name.as_str())
        .collect();

    let mut allowed: HashMap<String, HashSet<String>> = HashMap::new();
    for filter in &plan.filters {
        let (Filter::Id(f) | Filter::String(f) | Filter::Enum(f)) = filter else {
            continue;
        };
        if !grouped.contains(f.field.as_str())
            || !matches!(f.operator, IdOperator::In | IdOperator::Equals)
            || f.values.is_empty()
        {
            continue;
        }
        let ids: HashSet<String> = f.values.iter().cloned().collect();
        allowed
            .entry(f.field.clone())
            .and_modify(|existing| existing.retain(|id| ids.contains(id)))
            .or_insert(ids);
    }
    allowed
}

fn compare_values(a: &[Number], b: &[Number], index: usize) -> Ordering {
    let value = |v: &[Number]| v.get(index).map_or(0.0, Number::as_f64);
    value(a).total_cmp(&value(b))
}

fn stack_total(bar: &StackedBar, index: usize) -> i64 {
    bar.points
        .iter()
        .filter_map(|p| p.values.get(index))
        .map(Number::as_i64)
        .sum()
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}
