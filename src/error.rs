//! Error taxonomy.
//!
//! Validation errors are raised before any query runs and are never retried.
//! Execution errors are retried by the executor and surface as
//! [`QueryExecutionError`] once retries are exhausted. Decode errors mean the
//! backend returned rows that do not match the plan.

use crate::catalog::{CatalogError, TagEntityType};
use crate::config::SettingsError;
use crate::decode::DecodeError;
use crate::executor::QueryExecutionError;

/// Result type for request validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A request the pipeline refuses to plan.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported group by: {0}")]
    UnsupportedGroupBy(String),

    #[error(transparent)]
    UnknownField(#[from] CatalogError),

    #[error("unsupported aggregation {function} on field '{field}'")]
    UnsupportedAggregation { function: String, field: String },

    #[error("unsupported filter on '{field}': {reason}")]
    UnsupportedFilter { field: String, reason: String },

    #[error("tags on {0} entities cannot be filtered in this catalog")]
    UnsupportedTagEntity(TagEntityType),
}

impl ValidationError {
    pub(crate) fn filter(field: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedFilter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Any failure of a statistics request.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] QueryExecutionError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl StatsError {
    /// True for errors caused by the request itself rather than the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, StatsError::Validation(_))
    }
}

impl From<CatalogError> for StatsError {
    fn from(err: CatalogError) -> Self {
        StatsError::Validation(ValidationError::UnknownField(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_is_validation() {
        let err: StatsError = CatalogError::UnknownField {
            catalog: "billing".into(),
            field: "region".into(),
        }
        .into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "unknown field 'region' in catalog 'billing'");
    }

    #[test]
    fn test_unsupported_tag_entity_message() {
        let err = ValidationError::UnsupportedTagEntity(TagEntityType::Cluster);
        assert_eq!(
            err.to_string(),
            "tags on CLUSTER entities cannot be filtered in this catalog"
        );
    }
}
