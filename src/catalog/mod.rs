//! Field catalogs.
//!
//! A [`FieldCatalog`] is the read-only registry for one fact table: it maps
//! the logical field names used in requests to SQL columns, data types and
//! filter kinds, and records the table-level roles the normalizer and planner
//! need (account field, time fields, tag columns, implied filters).
//!
//! Catalogs are plain values. The built-in ones come from [`deployment`] and
//! [`billing`]; others load from TOML:
//!
//! ```toml
//! name = "deployment"
//! account_field = "accountid"
//! own_entity = "DEPLOYMENT"
//! tag_field = "tags"
//!
//! [table]
//! schema = "stats"
//! name = "deployment"
//!
//! [time]
//! start = "starttime"
//! end = "endtime"
//!
//! [tag_targets]
//! APPLICATION = "appid"
//!
//! [[fields]]
//! name = "accountid"
//! column = "accountid"
//! type = "string"
//! ```

mod builtin;

pub use builtin::{billing, deployment};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::request::{Filter, GroupBy};

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown field '{field}' in catalog '{catalog}'")]
    UnknownField { catalog: String, field: String },

    #[error("failed to read catalog file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid catalog '{catalog}': {message}")]
    Invalid { catalog: String, message: String },
}

// =============================================================================
// Field descriptors
// =============================================================================

/// Storage type of a column, which also drives decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer,
    Long,
    Double,
    String,
    Timestamp,
    KeyValue,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Long | DataType::Double)
    }
}

/// How a column is filtered and grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Plain scalar column.
    #[default]
    Simple,
    /// Multi-valued column; grouping unnests it.
    Array,
    /// Free-form key/value map.
    KeyValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub column: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub filter_kind: FilterKind,
}

impl FieldDescriptor {
    pub fn new(name: &str, column: &str, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            data_type,
            filter_kind: FilterKind::Simple,
        }
    }

    pub fn with_kind(mut self, filter_kind: FilterKind) -> Self {
        self.filter_kind = filter_kind;
        self
    }
}

/// Entity types that carry tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagEntityType {
    Application,
    Service,
    Environment,
    Cluster,
    Deployment,
    /// Kubernetes workloads; the subject of label filters.
    Workload,
}

impl std::fmt::Display for TagEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TagEntityType::Application => "APPLICATION",
            TagEntityType::Service => "SERVICE",
            TagEntityType::Environment => "ENVIRONMENT",
            TagEntityType::Cluster => "CLUSTER",
            TagEntityType::Deployment => "DEPLOYMENT",
            TagEntityType::Workload => "WORKLOAD",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Catalog definition
// =============================================================================

fn default_alias() -> String {
    "t0".to_string()
}

/// The fact table a catalog describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    /// Alias used to qualify the table's columns.
    #[serde(default = "default_alias")]
    pub alias: String,
}

/// Start and end timestamp fields. The end field is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFields {
    pub start: String,
    pub end: String,
}

/// A filter added whenever the request groups by `group_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpliedFilter {
    pub group_by: String,
    pub filter: Filter,
}

/// Serialized form of a catalog, validated into a [`FieldCatalog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDef {
    pub name: String,
    pub table: TableSpec,
    pub account_field: String,
    pub time: TimeFields,
    /// Entity type whose tags live on the fact table itself.
    #[serde(default)]
    pub own_entity: Option<TagEntityType>,
    /// Key/value field holding the own entity's tags.
    #[serde(default)]
    pub tag_field: Option<String>,
    /// Key/value field holding workload labels.
    #[serde(default)]
    pub label_field: Option<String>,
    /// Field that resolved entity ids are matched against, per entity type.
    #[serde(default)]
    pub tag_targets: HashMap<TagEntityType, String>,
    #[serde(default)]
    pub implied_filters: Vec<ImpliedFilter>,
    pub fields: Vec<FieldDescriptor>,
}

/// Immutable, validated field registry for one fact table.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    def: CatalogDef,
    index: HashMap<String, usize>,
}

impl FieldCatalog {
    /// Validate a definition. Every field the definition refers to must exist
    /// with a type suited to its role.
    pub fn new(def: CatalogDef) -> CatalogResult<Self> {
        let mut index = HashMap::with_capacity(def.fields.len());
        for (i, field) in def.fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(invalid(&def, format!("duplicate field '{}'", field.name)));
            }
        }

        let catalog = Self { def, index };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_toml_str(content: &str) -> CatalogResult<Self> {
        let def: CatalogDef = toml::from_str(content)?;
        Self::new(def)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> CatalogResult<()> {
        let expect = |name: &str, ok: fn(&FieldDescriptor) -> bool, role: &str| -> CatalogResult<()> {
            let field = self.describe(name)?;
            if ok(field) {
                Ok(())
            } else {
                Err(invalid(
                    &self.def,
                    format!("field '{}' cannot serve as {}", name, role),
                ))
            }
        };

        expect(
            &self.def.account_field,
            |f| f.data_type == DataType::String,
            "the account field",
        )?;
        for time in [&self.def.time.start, &self.def.time.end] {
            expect(time, |f| f.data_type == DataType::Timestamp, "a time field")?;
        }
        for kv in self.def.tag_field.iter().chain(&self.def.label_field) {
            expect(kv, |f| f.filter_kind == FilterKind::KeyValue, "a key/value field")?;
        }
        for target in self.def.tag_targets.values() {
            expect(target, |f| f.data_type == DataType::String, "a tag target")?;
        }
        for implied in &self.def.implied_filters {
            self.describe(&implied.group_by)?;
            if let Some(field) = implied.filter.field() {
                self.describe(field)?;
            }
        }
        if self.def.own_entity.is_some() && self.def.tag_field.is_none() {
            return Err(invalid(&self.def, "own_entity requires a tag_field".into()));
        }
        Ok(())
    }

    /// Look up a field by logical name.
    pub fn describe(&self, name: &str) -> CatalogResult<&FieldDescriptor> {
        self.index
            .get(name)
            .map(|&i| &self.def.fields[i])
            .ok_or_else(|| CatalogError::UnknownField {
                catalog: self.def.name.clone(),
                field: name.to_string(),
            })
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn table(&self) -> &TableSpec {
        &self.def.table
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.def.fields
    }

    pub fn account_field(&self) -> &str {
        &self.def.account_field
    }

    pub fn start_time_field(&self) -> &str {
        &self.def.time.start
    }

    pub fn end_time_field(&self) -> &str {
        &self.def.time.end
    }

    /// Field used when nothing in the request picks a time field.
    pub fn default_time_field(&self) -> &str {
        &self.def.time.end
    }

    pub fn own_entity(&self) -> Option<TagEntityType> {
        self.def.own_entity
    }

    pub fn tag_field(&self) -> Option<&str> {
        self.def.tag_field.as_deref()
    }

    pub fn label_field(&self) -> Option<&str> {
        self.def.label_field.as_deref()
    }

    /// Field matched against resolved ids of `entity`.
    pub fn tag_target(&self, entity: TagEntityType) -> Option<&str> {
        self.def.tag_targets.get(&entity).map(String::as_str)
    }

    /// Filters implied by grouping on `group_by`, in declaration order.
    pub fn implied_filters<'a>(
        &'a self,
        group_by: &'a GroupBy,
    ) -> impl Iterator<Item = &'a Filter> + 'a {
        let field = match group_by {
            GroupBy::Entity { field } => Some(field.as_str()),
            GroupBy::Tag { .. } | GroupBy::Label { .. } => None,
        };
        self.def
            .implied_filters
            .iter()
            .filter(move |implied| Some(implied.group_by.as_str()) == field)
            .map(|implied| &implied.filter)
    }
}

fn invalid(def: &CatalogDef, message: String) -> CatalogError {
    CatalogError::Invalid {
        catalog: def.name.clone(),
        message,
    }
}
