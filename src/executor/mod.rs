//! Query execution.
//!
//! [`QueryExecutor`] renders a plan for its dialect and runs it on a pooled
//! connection, retrying transient failures a bounded number of times with no
//! backoff. Connections are released by dropping them, so every exit path
//! returns the connection to its pool.

mod error;
mod retry;

pub use error::{ExecutionError, ExecutionResult, QueryExecutionError};
pub use retry::{retry_bounded, RetryFailure};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::QuerySettings;
use crate::planner::QueryPlan;
use crate::sql::Dialect;

/// Raw rows returned by the backend, values in SELECT-list order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowCursor {
    /// Column names as reported by the backend.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl RowCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A live connection. Dropping it releases it.
#[async_trait]
pub trait Connection: Send {
    async fn query(&mut self, sql: &str) -> ExecutionResult<RowCursor>;
}

/// A pool of connections, shared by concurrent requests.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self) -> ExecutionResult<Box<dyn Connection>>;
}

/// Runs plans with bounded retry and slow-query reporting.
#[derive(Clone)]
pub struct QueryExecutor {
    connections: Arc<dyn ConnectionProvider>,
    dialect: Dialect,
    max_attempts: u32,
    slow_query_threshold: Duration,
}

impl QueryExecutor {
    pub fn new(connections: Arc<dyn ConnectionProvider>, dialect: Dialect) -> Self {
        let defaults = QuerySettings::default();
        Self {
            connections,
            dialect,
            max_attempts: defaults.max_retry,
            slow_query_threshold: defaults.slow_query_threshold(),
        }
    }

    pub fn with_settings(mut self, settings: &QuerySettings) -> Self {
        self.max_attempts = settings.max_retry;
        self.slow_query_threshold = settings.slow_query_threshold();
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Render and run `plan`.
    pub async fn execute(&self, plan: &QueryPlan) -> Result<RowCursor, QueryExecutionError> {
        let sql = plan.to_sql(self.dialect);
        let account_id = plan.account_id.as_str();

        let result = retry_bounded(
            self.max_attempts,
            ExecutionError::is_retriable,
            |attempt| {
                let sql = sql.as_str();
                async move {
                    let outcome = self.execute_once(sql, account_id).await;
                    if let Err(e) = &outcome {
                        warn!(attempt, account_id, error = %e, "query attempt failed");
                    }
                    outcome
                }
            },
        )
        .await;

        result.map_err(|failure| {
            warn!(
                attempts = failure.attempts,
                account_id,
                sql = %sql,
                error = %failure.error,
                "giving up on query"
            );
            QueryExecutionError {
                sql: sql.clone(),
                account_id: account_id.to_string(),
                attempts: failure.attempts,
                source: failure.error,
            }
        })
    }

    async fn execute_once(&self, sql: &str, account_id: &str) -> ExecutionResult<RowCursor> {
        let mut connection = self.connections.acquire().await?;
        let started = Instant::now();
        let rows = connection.query(sql).await;
        let elapsed = started.elapsed();
        drop(connection);

        if elapsed > self.slow_query_threshold {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                account_id,
                sql,
                "slow query"
            );
        }
        rows
    }
}
