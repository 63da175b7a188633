//! Fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use statsq::catalog::{FieldCatalog, TagEntityType};
use statsq::decode::{IdNameResolver, NameResolver};
use statsq::executor::{
    Connection, ConnectionProvider, ExecutionError, ExecutionResult, QueryExecutor, RowCursor,
};
use statsq::normalize::{FixedClock, IdResolver, TagPair};
use statsq::{Dialect, RequestPlanner, StatsEngine};

pub const T0: i64 = 1_700_000_000_000;
pub const T1: i64 = 1_700_604_800_000;
pub const DAY: i64 = 86_400_000;
pub const NOW: i64 = 1_701_000_000_000;

// ============================================================================
// Id resolution
// ============================================================================

/// Resolves `(entity type, tag name)` to a fixed id list.
#[derive(Default)]
pub struct MapIdResolver {
    ids: HashMap<(TagEntityType, String), Vec<String>>,
    pub calls: AtomicUsize,
}

impl MapIdResolver {
    pub fn with(mut self, entity: TagEntityType, tag: &str, ids: &[&str]) -> Self {
        self.ids.insert(
            (entity, tag.to_string()),
            ids.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl IdResolver for MapIdResolver {
    async fn resolve_ids(
        &self,
        _account_id: &str,
        tags: &[TagPair],
        entity_type: TagEntityType,
    ) -> HashSet<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tags.iter()
            .filter_map(|t| self.ids.get(&(entity_type, t.name.clone())))
            .flatten()
            .cloned()
            .collect()
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Scripted backend: each query pops the next outcome.
pub struct FakeBackend {
    outcomes: Mutex<VecDeque<ExecutionResult<RowCursor>>>,
    pub acquired: AtomicUsize,
    pub open: AtomicUsize,
    pub statements: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(outcomes: Vec<ExecutionResult<RowCursor>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            acquired: AtomicUsize::new(0),
            open: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn returning(rows: Vec<Vec<serde_json::Value>>) -> Arc<Self> {
        Self::new(vec![Ok(RowCursor::new(vec![], rows))])
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn last_statement(&self) -> String {
        self.statements
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

struct FakeConnection(Arc<FakeBackend>);

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.0.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn query(&mut self, sql: &str) -> ExecutionResult<RowCursor> {
        self.0.statements.lock().unwrap().push(sql.to_string());
        self.0
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExecutionError::Statement("no scripted outcome".into())))
    }
}

pub struct FakePool(pub Arc<FakeBackend>);

#[async_trait]
impl ConnectionProvider for FakePool {
    async fn acquire(&self) -> ExecutionResult<Box<dyn Connection>> {
        self.0.acquired.fetch_add(1, Ordering::SeqCst);
        self.0.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection(self.0.clone())))
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn planner(catalog: FieldCatalog, ids: Arc<dyn IdResolver>) -> RequestPlanner {
    RequestPlanner::new(Arc::new(catalog), ids).with_clock(Arc::new(FixedClock(NOW)))
}

pub fn engine_with(
    catalog: FieldCatalog,
    backend: &Arc<FakeBackend>,
    ids: Arc<dyn IdResolver>,
    names: Arc<dyn NameResolver>,
) -> StatsEngine {
    let executor = QueryExecutor::new(Arc::new(FakePool(backend.clone())), Dialect::Postgres);
    StatsEngine::new(planner(catalog, ids), executor, names)
}

pub fn engine(catalog: FieldCatalog, backend: &Arc<FakeBackend>) -> StatsEngine {
    engine_with(
        catalog,
        backend,
        Arc::new(MapIdResolver::default()),
        Arc::new(IdNameResolver),
    )
}
