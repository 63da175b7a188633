//! Filter normalization.
//!
//! Turns the caller's filter list into the list the planner consumes:
//!
//! 1. the account filter is injected first
//! 2. tag and label filters are resolved to id sets (or dropped when nothing matches)
//! 3. the time window is completed so both bounds are always present
//! 4. filters implied by the requested group bys are appended
//!
//! Every step is idempotent: normalizing a normalized list returns it unchanged.

mod resolver;

pub use resolver::{Clock, FixedClock, IdResolver, OfflineIdResolver, SystemClock, TagPair};

use std::collections::HashSet;
use tracing::warn;

use crate::catalog::{FieldCatalog, TagEntityType};
use crate::error::{ValidationError, ValidationResult};
use crate::request::{
    Filter, IdFilter, IdOperator, LabelFilter, StatsRequest, TagFilter, TimeOperator,
};
use crate::shape::select_shape;

/// Window applied when a request leaves a time bound open.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub struct FilterNormalizer<'a> {
    catalog: &'a FieldCatalog,
    ids: &'a dyn IdResolver,
    clock: &'a dyn Clock,
    window_millis: i64,
}

impl<'a> FilterNormalizer<'a> {
    pub fn new(catalog: &'a FieldCatalog, ids: &'a dyn IdResolver, clock: &'a dyn Clock) -> Self {
        Self {
            catalog,
            ids,
            clock,
            window_millis: i64::from(DEFAULT_WINDOW_DAYS) * MILLIS_PER_DAY,
        }
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_millis = i64::from(days) * MILLIS_PER_DAY;
        self
    }

    /// Normalize the filters of `request`.
    ///
    /// Rejects unsupported group-by combinations before doing anything else.
    pub async fn normalize(&self, request: &StatsRequest) -> ValidationResult<Vec<Filter>> {
        select_shape(request.group_by.len(), request.time_bucket.is_some())?;

        let mut filters = Vec::with_capacity(request.filters.len() + 3);
        push_unique(&mut filters, self.account_filter(&request.account_id));

        for filter in &request.filters {
            if filter.is_inert() {
                continue;
            }
            let normalized = match filter {
                Filter::Tag(tag) => self.resolve_tag(&request.account_id, tag).await?,
                Filter::Label(label) => self.resolve_label(&request.account_id, label).await?,
                Filter::Id(f) => Some(Filter::Id(canonical(f))),
                Filter::String(f) => Some(Filter::String(canonical(f))),
                Filter::Enum(f) => Some(Filter::Enum(canonical(f))),
                Filter::Number(_) | Filter::Time(_) => Some(filter.clone()),
            };
            if let Some(f) = normalized {
                push_unique(&mut filters, f);
            }
        }

        self.complete_time_window(&mut filters);

        for group_by in &request.group_by {
            for implied in self.catalog.implied_filters(group_by) {
                push_unique(&mut filters, implied.clone());
            }
        }

        Ok(filters)
    }

    fn account_filter(&self, account_id: &str) -> Filter {
        Filter::Id(IdFilter::new(
            self.catalog.account_field(),
            IdOperator::In,
            &[account_id],
        ))
    }

    async fn resolve_tag(
        &self,
        account_id: &str,
        tag: &TagFilter,
    ) -> ValidationResult<Option<Filter>> {
        // Tags on the table's own entity are stored inline and filtered in SQL.
        if self.catalog.own_entity() == Some(tag.entity_type) {
            return Ok(Some(Filter::Tag(tag.clone())));
        }

        let target = self
            .catalog
            .tag_target(tag.entity_type)
            .ok_or(ValidationError::UnsupportedTagEntity(tag.entity_type))?;
        let pairs = [TagPair::new(&tag.tag_name, tag.tag_value.as_deref())];
        let ids = self
            .ids
            .resolve_ids(account_id, &pairs, tag.entity_type)
            .await;
        Ok(id_set_filter(target, ids, &tag.tag_name))
    }

    async fn resolve_label(
        &self,
        account_id: &str,
        label: &LabelFilter,
    ) -> ValidationResult<Option<Filter>> {
        let target = self
            .catalog
            .tag_target(TagEntityType::Workload)
            .ok_or(ValidationError::UnsupportedTagEntity(TagEntityType::Workload))?;
        let pairs: Vec<TagPair> = label
            .values
            .iter()
            .map(|v| TagPair::new(&label.name, Some(v)))
            .collect();
        let ids = self
            .ids
            .resolve_ids(account_id, &pairs, TagEntityType::Workload)
            .await;
        Ok(id_set_filter(target, ids, &label.name))
    }

    /// Close open time bounds.
    ///
    /// With no bounds, the window ends now on the default time field. With one
    /// bound, the other is derived on the same field.
    fn complete_time_window(&self, filters: &mut Vec<Filter>) {
        let mut after = None;
        let mut before = None;
        for filter in filters.iter() {
            if let Filter::Time(t) = filter {
                let slot = match t.operator {
                    TimeOperator::After => &mut after,
                    TimeOperator::Before => &mut before,
                };
                slot.get_or_insert_with(|| (t.field.clone(), t.value));
            }
        }

        match (after, before) {
            (None, None) => {
                let now = self.clock.now_millis();
                let field = self.catalog.default_time_field();
                filters.push(Filter::after(field, now - self.window_millis));
                filters.push(Filter::before(field, now));
            }
            (Some((field, start)), None) => {
                filters.push(Filter::before(&field, start + self.window_millis));
            }
            (None, Some((field, end))) => {
                filters.push(Filter::after(&field, end - self.window_millis));
            }
            (Some(_), Some(_)) => {}
        }
    }
}

/// EQUALS is a one-element IN.
fn canonical(filter: &IdFilter) -> IdFilter {
    let mut filter = filter.clone();
    if filter.operator == IdOperator::Equals {
        filter.operator = IdOperator::In;
    }
    filter
}

fn id_set_filter(field: &str, ids: HashSet<String>, selector: &str) -> Option<Filter> {
    if ids.is_empty() {
        warn!(field, selector, "selector matched no entities, dropping filter");
        return None;
    }
    let mut values: Vec<String> = ids.into_iter().collect();
    values.sort();
    Some(Filter::Id(IdFilter {
        field: field.to_string(),
        operator: IdOperator::In,
        values,
    }))
}

fn push_unique(filters: &mut Vec<Filter>, filter: Filter) {
    if !filters.contains(&filter) {
        filters.push(filter);
    }
}
