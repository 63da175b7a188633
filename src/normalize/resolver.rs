//! Collaborators consulted during normalization.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;

use crate::catalog::TagEntityType;

/// A tag (or label) name with an optional value to match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagPair {
    pub name: String,
    pub value: Option<String>,
}

impl TagPair {
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.map(Into::into),
        }
    }
}

/// Resolves tag or label selectors to the ids of the entities carrying them.
///
/// Implementations own their caching and must be safe to share across
/// concurrent requests.
#[async_trait]
pub trait IdResolver: Send + Sync {
    /// Ids of `entity_type` entities in `account_id` that carry any of `tags`.
    async fn resolve_ids(
        &self,
        account_id: &str,
        tags: &[TagPair],
        entity_type: TagEntityType,
    ) -> HashSet<String>;
}

/// Resolves nothing. Filters that need resolution are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineIdResolver;

#[async_trait]
impl IdResolver for OfflineIdResolver {
    async fn resolve_ids(
        &self,
        _account_id: &str,
        _tags: &[TagPair],
        _entity_type: TagEntityType,
    ) -> HashSet<String> {
        HashSet::new()
    }
}

/// Source of "now" for default time windows.
pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}
