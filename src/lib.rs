//! # statsq
//!
//! Compiles declarative statistics requests against a wide fact table into
//! SQL, runs them, and shapes the rows into typed results.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     StatsRequest                         │
//! │  (aggregations, filters, group bys, time bucket, sort)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [normalize + shape]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Normalized filters + ResultShape                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner]
//! ┌─────────────────────────────────────────────────────────┐
//! │       QueryPlan (projected fields + query AST)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor, per dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     RowCursor                            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [decode]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    QueryResult                           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage reads the same [`catalog::FieldCatalog`], an immutable value
//! passed in by the caller.

pub mod catalog;
pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod planner;
pub mod request;
pub mod result;
pub mod shape;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{DataType, FieldCatalog, FieldDescriptor, FilterKind, TagEntityType};
    pub use crate::decode::{NameResolver, ResultDecoder, DELETED_ENTITY_NAME};
    pub use crate::engine::{RequestPlanner, StatsEngine};
    pub use crate::error::{StatsError, ValidationError};
    pub use crate::executor::{Connection, ConnectionProvider, QueryExecutor, RowCursor};
    pub use crate::normalize::{Clock, FilterNormalizer, IdResolver, TagPair};
    pub use crate::planner::{QueryPlan, QueryPlanBuilder};
    pub use crate::request::{
        Filter, Granularity, GroupBy, SortDirection, StatsRequest, TimeBucket,
    };
    pub use crate::result::{DataPoint, Number, QueryResult, Reference};
    pub use crate::shape::{select_shape, ResultShape};
    pub use crate::sql::Dialect;
}

pub use engine::{RequestPlanner, StatsEngine};
pub use error::StatsError;
pub use request::StatsRequest;
pub use result::QueryResult;
pub use sql::Dialect;
