//! Display-name lookup for decoded ids.

use async_trait::async_trait;
use std::collections::HashMap;

/// Name returned for ids whose entity no longer exists.
pub const DELETED_ENTITY_NAME: &str = "Deleted";

/// Resolves entity ids to display names.
///
/// Implementations never fail: an id that no longer resolves yields
/// [`DELETED_ENTITY_NAME`].
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Display name of `id`, an entity referenced by the catalog field `field`.
    async fn display_name(&self, field: &str, id: &str) -> String;
}

/// Uses the id itself as the name.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdNameResolver;

#[async_trait]
impl NameResolver for IdNameResolver {
    async fn display_name(&self, _field: &str, id: &str) -> String {
        id.to_string()
    }
}

/// Fixed `(field, id) -> name` table.
#[derive(Debug, Clone, Default)]
pub struct StaticNameResolver {
    names: HashMap<(String, String), String>,
}

impl StaticNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, id: &str, name: &str) -> Self {
        self.names
            .insert((field.to_string(), id.to_string()), name.to_string());
        self
    }
}

#[async_trait]
impl NameResolver for StaticNameResolver {
    async fn display_name(&self, field: &str, id: &str) -> String {
        self.names
            .get(&(field.to_string(), id.to_string()))
            .cloned()
            .unwrap_or_else(|| DELETED_ENTITY_NAME.to_string())
    }
}
