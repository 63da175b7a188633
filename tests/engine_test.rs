//! End-to-end requests against a scripted backend.

mod common;

use std::sync::Arc;

use common::{engine, engine_with, FakeBackend, MapIdResolver, T0, T1};
use serde_json::json;
use statsq::catalog::{billing, deployment, TagEntityType};
use statsq::decode::{StaticNameResolver, DELETED_ENTITY_NAME};
use statsq::executor::{ExecutionError, RowCursor};
use statsq::request::{Filter, GroupBy, SortDirection, StatsRequest, TagFilter};
use statsq::result::{DataPoint, Number, QueryResult, Reference};
use statsq::StatsError;

fn cost_request() -> StatsRequest {
    StatsRequest::new("acc-1")
        .aggregate("SUM", Some("cost"))
        .filter(Filter::after("starttime", T0))
        .filter(Filter::before("endtime", T1))
}

fn rows(rows: Vec<Vec<serde_json::Value>>) -> RowCursor {
    RowCursor::new(vec![], rows)
}

#[tokio::test]
async fn test_single_point_sum() {
    let backend = FakeBackend::returning(vec![vec![json!(30.0)]]);
    let result = engine(billing(), &backend)
        .fetch(&cost_request())
        .await
        .unwrap();

    assert_eq!(
        result,
        QueryResult::SinglePoint(Some(DataPoint {
            key: Reference::total(),
            values: vec![Number::Double(30.0)],
        }))
    );
    let sql = backend.last_statement();
    assert!(sql.contains(r#"SUM("t0"."cost") AS "sum_cost""#));
    assert!(sql.contains(r#""t0"."starttime" >= TIMESTAMP '2023-11-14 22:13:20.000'"#));
    assert!(sql.contains(r#""t0"."starttime" <= TIMESTAMP '2023-11-21 22:13:20.000'"#));
}

#[tokio::test]
async fn test_aggregate_list_in_returned_order() {
    let backend = FakeBackend::returning(vec![
        vec![json!(10.0), json!("A")],
        vec![json!(20.0), json!("B")],
    ]);
    let request = cost_request().group_by(GroupBy::entity("clusterid"));
    let result = engine(billing(), &backend).fetch(&request).await.unwrap();

    let QueryResult::AggregateList(points) = result else {
        panic!("expected aggregate list, got {:?}", result);
    };
    let keys: Vec<_> = points.iter().map(|p| p.key.id.as_str()).collect();
    assert_eq!(keys, vec!["A", "B"]);
    assert_eq!(points[0].value(), Some(Number::Double(10.0)));
    assert_eq!(points[1].value(), Some(Number::Double(20.0)));
}

#[tokio::test]
async fn test_aggregate_list_sorted_descending() {
    let backend = FakeBackend::returning(vec![
        vec![json!(10.0), json!("A")],
        vec![json!(20.0), json!("B")],
    ]);
    let request = cost_request()
        .group_by(GroupBy::entity("clusterid"))
        .sort_by("cost", SortDirection::Descending);
    let result = engine(billing(), &backend).fetch(&request).await.unwrap();

    let QueryResult::AggregateList(points) = result else {
        panic!("expected aggregate list, got {:?}", result);
    };
    let keys: Vec<_> = points.iter().map(|p| p.key.id.as_str()).collect();
    assert_eq!(keys, vec!["B", "A"]);
    assert!(backend
        .last_statement()
        .contains(r#"ORDER BY "sum_cost" DESC"#));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let backend = FakeBackend::new(vec![
        Err(ExecutionError::Connection("connection reset".into())),
        Err(ExecutionError::Connection("connection reset".into())),
        Ok(rows(vec![vec![json!(30.0)]])),
    ]);
    let result = engine(billing(), &backend)
        .fetch(&cost_request())
        .await
        .unwrap();

    assert_eq!(result.shape(), statsq::shape::ResultShape::SinglePoint);
    assert_eq!(backend.acquired(), 3);
    assert_eq!(backend.open(), 0);
}

#[tokio::test]
async fn test_exhausted_retries_surface_execution_error() {
    let backend = FakeBackend::new(vec![
        Err(ExecutionError::Timeout(30_000)),
        Err(ExecutionError::Timeout(30_000)),
        Err(ExecutionError::Connection("refused".into())),
        Ok(rows(vec![vec![json!(30.0)]])),
    ]);
    let err = engine(billing(), &backend)
        .fetch(&cost_request())
        .await
        .unwrap_err();

    let StatsError::Execution(failure) = &err else {
        panic!("expected execution error, got {:?}", err);
    };
    assert_eq!(failure.attempts, 3);
    assert_eq!(failure.source, ExecutionError::Connection("refused".into()));
    assert_eq!(failure.account_id, "acc-1");
    assert!(failure.sql.contains("billing_data"));

    let message = err.to_string();
    assert!(!message.contains("acc-1"));
    assert!(!message.contains("SELECT"));
    assert_eq!(backend.acquired(), 3);
    assert_eq!(backend.open(), 0);
}

#[tokio::test]
async fn test_connection_released_on_statement_error() {
    let backend = FakeBackend::new(vec![Err(ExecutionError::Statement(
        "column does not exist".into(),
    ))]);
    let err = engine(billing(), &backend)
        .fetch(&cost_request())
        .await
        .unwrap_err();
    assert!(matches!(err, StatsError::Execution(ref e) if e.attempts == 1));
    assert_eq!(backend.open(), 0);
}

#[tokio::test]
async fn test_undecodable_rows_are_decode_errors() {
    let backend = FakeBackend::returning(vec![vec![json!("not a number")]]);
    let err = engine(billing(), &backend)
        .fetch(&cost_request())
        .await
        .unwrap_err();
    assert!(matches!(err, StatsError::Decode(_)));
    assert_eq!(backend.open(), 0);
}

#[tokio::test]
async fn test_missing_entities_named_deleted() {
    let backend = FakeBackend::returning(vec![
        vec![json!(3), json!("app-1")],
        vec![json!(1), json!("app-2")],
    ]);
    let names = StaticNameResolver::new().with("appid", "app-1", "checkout");
    let engine = engine_with(
        deployment(),
        &backend,
        Arc::new(MapIdResolver::default()),
        Arc::new(names),
    );
    let request = StatsRequest::new("acc-1")
        .aggregate("COUNT", None)
        .group_by(GroupBy::entity("appid"));

    let QueryResult::AggregateList(points) = engine.fetch(&request).await.unwrap() else {
        panic!("expected aggregate list");
    };
    assert_eq!(points[0].key.name, "checkout");
    assert_eq!(points[1].key.name, DELETED_ENTITY_NAME);
}

#[tokio::test]
async fn test_tag_filter_restricts_keys() {
    let backend = FakeBackend::returning(vec![
        vec![json!(4), json!("svc-1")],
        vec![json!(2), json!("svc-9")],
    ]);
    let ids = MapIdResolver::default().with(TagEntityType::Service, "tier", &["svc-1", "svc-2"]);
    let engine = engine_with(
        deployment(),
        &backend,
        Arc::new(ids),
        Arc::new(statsq::decode::IdNameResolver),
    );
    let request = StatsRequest::new("acc-1")
        .aggregate("COUNT", None)
        .filter(Filter::Tag(TagFilter {
            entity_type: TagEntityType::Service,
            tag_name: "tier".into(),
            tag_value: Some("gold".into()),
        }))
        .group_by(GroupBy::entity("serviceid"));

    let QueryResult::AggregateList(points) = engine.fetch(&request).await.unwrap() else {
        panic!("expected aggregate list");
    };
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].key.id, "svc-1");
    assert!(backend
        .last_statement()
        .contains(r#""t0"."services" && ARRAY['svc-1', 'svc-2']"#));
}

#[tokio::test]
async fn test_engine_from_settings() {
    let settings = statsq::config::Settings::from_toml_str(
        "[query]\nmax_retry = 1\ndialect = \"duckdb\"\n",
    )
    .unwrap();
    let backend = FakeBackend::new(vec![
        Err(ExecutionError::Timeout(30_000)),
        Ok(rows(vec![vec![json!(30.0)]])),
    ]);
    let engine = statsq::StatsEngine::from_settings(
        &settings,
        Arc::new(billing()),
        Arc::new(common::FakePool(backend.clone())),
        Arc::new(MapIdResolver::default()),
        Arc::new(statsq::decode::IdNameResolver),
    )
    .unwrap()
    .with_clock(Arc::new(statsq::normalize::FixedClock(common::NOW)));

    let err = engine.fetch(&cost_request()).await.unwrap_err();
    assert!(matches!(err, StatsError::Execution(ref e) if e.attempts == 1));
    assert_eq!(backend.acquired(), 1);
}
