//! Execution error types.

use thiserror::Error;

/// Result type for backend operations.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// A failure reported by the SQL backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// Could not obtain or keep a connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Statement exceeded the backend's timeout.
    #[error("statement timed out after {0} ms")]
    Timeout(u64),

    /// The backend rejected the statement.
    #[error("statement failed: {0}")]
    Statement(String),
}

impl ExecutionError {
    /// Check if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Execution failed for good, either on a fatal error or after the last retry.
///
/// The rendered SQL and account are kept for operator diagnostics and are not
/// part of the message.
#[derive(Error, Debug)]
#[error("query execution failed after {attempts} attempt(s)")]
pub struct QueryExecutionError {
    pub sql: String,
    pub account_id: String,
    pub attempts: u32,
    #[source]
    pub source: ExecutionError,
}
