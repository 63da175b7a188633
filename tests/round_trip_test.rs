//! Rows populated in projection order decode back to the values put in.

mod common;

use std::sync::Arc;

use common::{planner, MapIdResolver, T0, T1};
use serde_json::{json, Value};
use statsq::catalog::{billing, deployment, DataType, FieldCatalog};
use statsq::decode::{IdNameResolver, ResultDecoder};
use statsq::executor::RowCursor;
use statsq::planner::{FieldRole, GroupKey, QueryPlan};
use statsq::request::{Filter, GroupBy, Granularity, StatsRequest};
use statsq::result::{DataPoint, Number, QueryResult, Reference};

/// A synthetic row for `plan` and the values it should decode to.
struct Encoded {
    row: Vec<Value>,
    values: Vec<Number>,
    keys: Vec<Reference>,
    time: Option<i64>,
}

fn encode(plan: &QueryPlan) -> Encoded {
    let mut encoded = Encoded {
        row: Vec::new(),
        values: Vec::new(),
        keys: Vec::new(),
        time: None,
    };
    for (i, field) in plan.projected_fields.iter().enumerate() {
        match &field.role {
            FieldRole::Aggregate { .. } => {
                let (cell, number) = match field.data_type {
                    DataType::Integer => (json!(7 + i), Number::Integer(7 + i as i32)),
                    DataType::Long => (json!(40 + i), Number::Long(40 + i as i64)),
                    DataType::Double => (json!(2.5 + i as f64), Number::Double(2.5 + i as f64)),
                    DataType::Timestamp => (json!(T0 + i as i64), Number::Long(T0 + i as i64)),
                    other => panic!("no aggregate of type {:?}", other),
                };
                encoded.row.push(cell);
                encoded.values.push(number);
            }
            FieldRole::GroupKey(key) => {
                let raw = format!("v{}", i);
                let id = match key {
                    GroupKey::KeyValue { key, .. } => format!("{}:{}", key, raw),
                    _ => raw.clone(),
                };
                encoded.row.push(json!(raw));
                encoded.keys.push(Reference::new(&field.alias, &id, &id));
            }
            FieldRole::TimeBucket => {
                encoded.row.push(json!(T1));
                encoded.time = Some(T1);
            }
        }
    }
    encoded
}

async fn round_trip(catalog: FieldCatalog, request: StatsRequest) {
    let request = request
        .filter(Filter::after("starttime", T0))
        .filter(Filter::before("endtime", T1));
    let plan = planner(catalog, Arc::new(MapIdResolver::default()))
        .prepare(&request)
        .await
        .unwrap();
    let encoded = encode(&plan);

    let names = IdNameResolver;
    let decoded = ResultDecoder::new(&plan, &names)
        .decode(RowCursor::new(vec![], vec![encoded.row.clone()]))
        .await
        .unwrap();

    let point = |key: Reference| DataPoint {
        key,
        values: encoded.values.clone(),
    };
    let keys = encoded.keys.clone();
    match decoded {
        QueryResult::SinglePoint(p) => assert_eq!(p, Some(point(Reference::total()))),
        QueryResult::AggregateList(points) => assert_eq!(points, vec![point(keys[0].clone())]),
        QueryResult::TimeSeries(points) => {
            assert_eq!(points.len(), 1);
            assert_eq!(Some(points[0].time), encoded.time);
            assert_eq!(points[0].values, encoded.values);
        }
        QueryResult::StackedTimeSeries(buckets) => {
            assert_eq!(buckets.len(), 1);
            assert_eq!(Some(buckets[0].time), encoded.time);
            assert_eq!(buckets[0].points, vec![point(keys[0].clone())]);
        }
        QueryResult::StackedBarChart(bars) => {
            assert_eq!(bars.len(), 1);
            assert_eq!(bars[0].key, keys[0]);
            assert_eq!(bars[0].points, vec![point(keys[1].clone())]);
        }
    }
}

#[tokio::test]
async fn test_single_point_round_trip() {
    round_trip(
        billing(),
        StatsRequest::new("acc-1")
            .aggregate("SUM", Some("cost"))
            .aggregate("COUNT", None)
            .aggregate("MAX", Some("podcount")),
    )
    .await;
}

#[tokio::test]
async fn test_aggregate_list_round_trip() {
    round_trip(
        deployment(),
        StatsRequest::new("acc-1")
            .aggregate("AVG", Some("duration"))
            .aggregate("SUM", Some("instances_deployed"))
            .aggregate("MIN", Some("starttime"))
            .group_by(GroupBy::entity("serviceid")),
    )
    .await;
}

#[tokio::test]
async fn test_time_series_round_trip() {
    round_trip(
        billing(),
        StatsRequest::new("acc-1")
            .aggregate("SUM", Some("idlecost"))
            .bucket(Granularity::Hour),
    )
    .await;
}

#[tokio::test]
async fn test_stacked_time_series_round_trip() {
    round_trip(
        deployment(),
        StatsRequest::new("acc-1")
            .aggregate("COUNT", None)
            .group_by(GroupBy::Tag { name: "team".into() })
            .bucket(Granularity::Month),
    )
    .await;
}

#[tokio::test]
async fn test_stacked_bar_chart_round_trip() {
    round_trip(
        billing(),
        StatsRequest::new("acc-1")
            .aggregate("SUM", Some("cost"))
            .aggregate("AVG", Some("memoryrequest"))
            .group_by(GroupBy::entity("clusterid"))
            .group_by(GroupBy::Label { name: "app".into() }),
    )
    .await;
}
