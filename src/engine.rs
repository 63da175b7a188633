//! End-to-end request handling.
//!
//! ```text
//! StatsRequest → Normalize → Select shape → Plan → Execute → Decode → QueryResult
//! ```
//!
//! [`RequestPlanner`] covers the steps that need no backend and is what the
//! CLI uses; [`StatsEngine`] adds execution and decoding.

use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::FieldCatalog;
use crate::config::Settings;
use crate::decode::{NameResolver, ResultDecoder};
use crate::error::{StatsError, ValidationResult};
use crate::executor::{ConnectionProvider, QueryExecutor};
use crate::normalize::{Clock, FilterNormalizer, IdResolver, SystemClock, DEFAULT_WINDOW_DAYS};
use crate::planner::{QueryPlan, QueryPlanBuilder};
use crate::request::StatsRequest;
use crate::result::QueryResult;
use crate::shape::select_shape;

// ============================================================================
// Planning
// ============================================================================

/// Normalizes and plans requests against one catalog.
#[derive(Clone)]
pub struct RequestPlanner {
    catalog: Arc<FieldCatalog>,
    ids: Arc<dyn IdResolver>,
    clock: Arc<dyn Clock>,
    window_days: u32,
}

impl RequestPlanner {
    pub fn new(catalog: Arc<FieldCatalog>, ids: Arc<dyn IdResolver>) -> Self {
        Self {
            catalog,
            ids,
            clock: Arc::new(SystemClock),
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Validate, normalize and plan `request`. Nothing is executed.
    pub async fn prepare(&self, request: &StatsRequest) -> ValidationResult<QueryPlan> {
        let shape = select_shape(request.group_by.len(), request.time_bucket.is_some())?;
        let filters = FilterNormalizer::new(&self.catalog, self.ids.as_ref(), self.clock.as_ref())
            .with_window_days(self.window_days)
            .normalize(request)
            .await?;

        info!(
            catalog = self.catalog.name(),
            shape = %shape,
            "planning statistics request"
        );
        QueryPlanBuilder::new(&self.catalog).build(request, filters, shape)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Runs requests end to end.
///
/// Holds only shared, read-only state; every call builds its own plan and
/// decode state, so one engine serves concurrent requests.
#[derive(Clone)]
pub struct StatsEngine {
    planner: RequestPlanner,
    executor: QueryExecutor,
    names: Arc<dyn NameResolver>,
}

impl StatsEngine {
    pub fn new(
        planner: RequestPlanner,
        executor: QueryExecutor,
        names: Arc<dyn NameResolver>,
    ) -> Self {
        Self {
            planner,
            executor,
            names,
        }
    }

    /// Build an engine configured by `settings`.
    pub fn from_settings(
        settings: &Settings,
        catalog: Arc<FieldCatalog>,
        connections: Arc<dyn ConnectionProvider>,
        ids: Arc<dyn IdResolver>,
        names: Arc<dyn NameResolver>,
    ) -> Result<Self, StatsError> {
        let planner =
            RequestPlanner::new(catalog, ids).with_window_days(settings.query.default_window_days);
        let executor =
            QueryExecutor::new(connections, settings.dialect()?).with_settings(&settings.query);
        Ok(Self::new(planner, executor, names))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.planner = self.planner.with_clock(clock);
        self
    }

    pub fn planner(&self) -> &RequestPlanner {
        &self.planner
    }

    pub async fn prepare(&self, request: &StatsRequest) -> Result<QueryPlan, StatsError> {
        Ok(self.planner.prepare(request).await?)
    }

    /// Answer `request`.
    pub async fn fetch(&self, request: &StatsRequest) -> Result<QueryResult, StatsError> {
        let plan = self.prepare(request).await?;
        let rows = self.executor.execute(&plan).await?;
        let row_count = rows.rows.len();
        let result = ResultDecoder::new(&plan, self.names.as_ref())
            .decode(rows)
            .await?;
        debug!(rows = row_count, shape = %plan.shape, "decoded query result");
        Ok(result)
    }
}
