//! C8 — the filter pipeline: `grep`, `sed`, `join`, dispatched by a
//! target-selector suffix on the filter id and composed in registration
//! order (spec.md §4.5).

mod grep;
mod join;
mod sed;

pub use grep::GrepFilter;
pub use join::JoinFilter;
pub use sed::SedFilter;

use crate::error::{Result, ResourceChain};
use crate::kv::KeyValue;
use crate::resource::FilterSpec;
use std::sync::Arc;

/// What part of a [`KeyValue`] a filter operates on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Key,
    Value,
}

/// Split a filter id into its base name and target, per the `_key`
/// (default) / `_val` / `_value` suffix convention.
pub fn parse_id(id: &str) -> (&str, Target) {
    if let Some(base) = id.strip_suffix("_value") {
        (base, Target::Value)
    } else if let Some(base) = id.strip_suffix("_val") {
        (base, Target::Value)
    } else if let Some(base) = id.strip_suffix("_key") {
        (base, Target::Key)
    } else {
        (id, Target::Key)
    }
}

/// A registered filter implementation, answering to one base name
/// (`grep`, `sed`, `join`, or a user extension).
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    /// `resource_key_ignore`, when set, bypasses the filter for any
    /// entry whose key it accepts (the entry is always retained
    /// unmodified) — set by the `NO_FILTER_RESOURCE_KEYS` flag so DSL
    /// meta-keys survive filtering until C7 strips them.
    fn apply(
        &self,
        target: Target,
        expression: &str,
        entries: Vec<KeyValue>,
        resource_key_ignore: Option<&dyn Fn(&str) -> bool>,
        chain: &ResourceChain,
    ) -> Result<Vec<KeyValue>>;
}

/// Order-sorted registry of [`Filter`]s, tried in order for each filter
/// id; the first to claim the base name applies (spec.md §9 "Finder
/// registries").
pub struct FilterRegistry {
    entries: Vec<(i32, Arc<dyn Filter>)>,
}

impl FilterRegistry {
    pub const BUILTIN_ORDER: i32 = -127;
    pub const DEFAULT_ORDER: i32 = 0;

    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Self::BUILTIN_ORDER, Arc::new(GrepFilter));
        registry.register(Self::BUILTIN_ORDER, Arc::new(SedFilter));
        registry.register(Self::BUILTIN_ORDER, Arc::new(JoinFilter));
        registry
    }

    pub fn register(&mut self, order: i32, filter: Arc<dyn Filter>) {
        self.entries.push((order, filter));
        self.entries.sort_by_key(|(order, _)| *order);
    }

    /// Run a resource's filter chain over `entries` in declared order.
    /// A filter id whose base name matches no registered filter is a
    /// no-op (spec.md §6: "unknown filter id = empty filter output").
    pub fn apply_chain(
        &self,
        filters: &[FilterSpec],
        mut entries: Vec<KeyValue>,
        resource_key_ignore: Option<&dyn Fn(&str) -> bool>,
        chain: &ResourceChain,
    ) -> Result<Vec<KeyValue>> {
        for spec in filters {
            let (base, target) = parse_id(&spec.id);
            match self.entries.iter().map(|(_, f)| f).find(|f| f.name() == base) {
                Some(filter) => {
                    entries = filter.apply(target, &spec.expression, entries, resource_key_ignore, chain)?;
                }
                None => {
                    log::warn!("unknown filter id `{}`; treating as no-op", spec.id);
                }
            }
        }
        Ok(entries)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
