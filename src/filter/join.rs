use super::{Filter, Target};
use crate::error::{Result, ResourceChain};
use crate::kv::KeyValue;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Groups entries sharing a key and joins their expanded values with the
/// filter expression as separator; always targets values (spec.md §4.5).
pub struct JoinFilter;

impl Filter for JoinFilter {
    fn name(&self) -> &'static str {
        "join"
    }

    fn apply(
        &self,
        _target: Target,
        expression: &str,
        entries: Vec<KeyValue>,
        resource_key_ignore: Option<&dyn Fn(&str) -> bool>,
        _chain: &ResourceChain,
    ) -> Result<Vec<KeyValue>> {
        let separator = expression;
        let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
        for kv in &entries {
            if resource_key_ignore.is_some_and(|ignore| ignore(kv.key())) {
                continue;
            }
            grouped.entry(kv.key().to_string()).or_default().push(kv.expanded().to_string());
        }

        let mut emitted: HashSet<String> = HashSet::new();
        let mut out = Vec::with_capacity(entries.len());
        for kv in entries {
            if resource_key_ignore.is_some_and(|ignore| ignore(kv.key())) {
                out.push(kv);
                continue;
            }
            if !emitted.insert(kv.key().to_string()) {
                continue;
            }
            let values = &grouped[kv.key()];
            let joined = values.join(separator);
            out.push(kv.with_value(joined));
        }
        Ok(out)
    }
}
