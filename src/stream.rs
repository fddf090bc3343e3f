//! C2 — `KeyValues`: a lazy, composable, restartable ordered sequence of
//! [`KeyValue`]s.
//!
//! "Restartable" means calling [`KeyValues::to_vec`] twice produces the
//! same result both times, even after `map`/`filter`/`flat_map` have been
//! chained on — per spec.md §9, a stateful iterator that can't be replayed
//! isn't an acceptable representation here. The producer is a reference
//! counted closure tree instead of a consuming `Iterator`, so composing
//! combinators stays lazy without giving up restartability.

use crate::error::{Result, ResourceChain};
use crate::interpolate;
use crate::kv::KeyValue;
use crate::media::Formatter;
use crate::variables::VariablesChain;
use indexmap::IndexMap;
use std::sync::Arc;

type Producer = Arc<dyn Fn() -> Vec<KeyValue> + Send + Sync>;

#[derive(Clone)]
pub struct KeyValues(Producer);

impl KeyValues {
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(entries: Vec<KeyValue>) -> Self {
        Self(Arc::new(move || entries.clone()))
    }

    /// Lazily map each entry. The mapping function must be pure and
    /// side-effect free so that replaying the producer is safe.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(&KeyValue) -> KeyValue + Send + Sync + 'static,
    {
        let inner = self.0.clone();
        Self(Arc::new(move || inner().iter().map(&f).collect()))
    }

    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&KeyValue) -> bool + Send + Sync + 'static,
    {
        let inner = self.0.clone();
        Self(Arc::new(move || {
            inner().into_iter().filter(|kv| predicate(kv)).collect()
        }))
    }

    pub fn flat_map<F>(&self, f: F) -> Self
    where
        F: Fn(&KeyValue) -> Vec<KeyValue> + Send + Sync + 'static,
    {
        let inner = self.0.clone();
        Self(Arc::new(move || {
            inner().iter().flat_map(&f).collect()
        }))
    }

    /// Materialize the stream into a backed list. Idempotent: calling it
    /// repeatedly, or on an already-memoized stream, yields the same
    /// vector.
    pub fn memoize(&self) -> Self {
        Self::from_vec(self.to_vec())
    }

    pub fn to_vec(&self) -> Vec<KeyValue> {
        (self.0)()
    }

    pub fn len(&self) -> usize {
        self.to_vec().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = KeyValue> {
        self.to_vec().into_iter()
    }

    /// Mark sensitive entries so their *expanded* value prints as
    /// `REDACTED`. The real value stays reachable through `raw()` on the
    /// resulting entries; only the display-facing expanded value changes.
    pub fn redact(&self) -> Self {
        self.map(|kv| {
            if kv.is_sensitive() {
                kv.with_expanded("REDACTED")
            } else {
                kv.clone()
            }
        })
    }

    /// The final entry for a key, if present.
    pub fn last(&self, key: &str) -> Option<KeyValue> {
        self.to_vec().into_iter().rev().find(|kv| kv.key() == key)
    }

    /// Collapse to a map: last entry wins per key, insertion order is the
    /// order of each key's *first* appearance (spec.md §8 law 3).
    pub fn to_map(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        for kv in self.to_vec() {
            map.insert(kv.key().to_string(), kv.expanded().to_string());
        }
        map
    }

    pub fn format(&self, formatter: &dyn Formatter) -> crate::error::Result<String> {
        formatter.format(&self.to_vec())
    }

    /// Resolve every `${…}` reference in this stream against `vars`
    /// (falling back to the stream's own entries, like a resource's local
    /// pass), returning a new stream of fully expanded entries. A
    /// reference with no binding and no default is a hard error (spec.md
    /// §4.1).
    pub fn expand(&self, vars: &VariablesChain) -> Result<KeyValues> {
        let expanded = interpolate::expand_batch(&self.to_vec(), vars, true, true, ResourceChain::default)?;
        Ok(KeyValues::from_vec(expanded))
    }

    /// Equal to `expand(vars).to_map()` (spec.md §4.1).
    pub fn interpolate(&self, vars: &VariablesChain) -> Result<IndexMap<String, String>> {
        Ok(self.expand(vars)?.to_map())
    }
}

impl Default for KeyValues {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for KeyValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ResourceId;
    use crate::flags::KvFlags;
    use crate::kv::{Meta, Source};

    fn kv(key: &str, value: &str, sensitive: bool) -> KeyValue {
        KeyValue::new(
            key,
            value,
            Meta {
                original_key: key.into(),
                source: Source {
                    resource: ResourceId::root(),
                    reference: None,
                    index: 1,
                },
                flags: KvFlags {
                    sensitive,
                    no_interpolation: false,
                },
            },
        )
    }

    #[test]
    fn test_restartable_after_combinators() {
        let kvs = KeyValues::from_vec(vec![kv("a", "1", false), kv("b", "2", false)])
            .map(|kv| kv.with_expanded(kv.expanded().to_string() + "!"));
        assert_eq!(kvs.to_vec(), kvs.to_vec());
        assert_eq!(
            kvs.to_vec().iter().map(|kv| kv.expanded().to_string()).collect::<Vec<_>>(),
            vec!["1!", "2!"]
        );
    }

    #[test]
    fn test_to_map_last_wins_first_appearance_order() {
        let kvs = KeyValues::from_vec(vec![
            kv("a", "1", false),
            kv("b", "2", false),
            kv("a", "3", false),
        ]);
        let map = kvs.to_map();
        assert_eq!(
            map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<Vec<_>>(),
            vec![("a", "3"), ("b", "2")]
        );
    }

    #[test]
    fn test_redact_keeps_raw_but_masks_expanded() {
        let kvs = KeyValues::from_vec(vec![kv("token", "secret", true), kv("plain", "v", false)]);
        let redacted = kvs.redact().to_vec();
        assert_eq!(redacted[0].raw(), "secret");
        assert_eq!(redacted[0].expanded(), "REDACTED");
        assert_eq!(redacted[1].expanded(), "v");
    }

    #[test]
    fn test_memoize_idempotent() {
        let kvs = KeyValues::from_vec(vec![kv("a", "1", false)]);
        let once = kvs.memoize();
        let twice = once.memoize();
        assert_eq!(once.to_vec(), twice.to_vec());
    }

    #[test]
    fn test_expand_resolves_against_vars_and_own_entries() {
        let kvs = KeyValues::from_vec(vec![
            kv("greeting", "Hello ${name}", false),
            kv("name", "World", false),
        ]);
        let vars = VariablesChain::new();
        let expanded = kvs.expand(&vars).unwrap();
        assert_eq!(
            expanded.to_vec().iter().map(|kv| kv.expanded().to_string()).collect::<Vec<_>>(),
            vec!["Hello World", "World"]
        );
    }

    #[test]
    fn test_interpolate_equals_expand_then_to_map() {
        let kvs = KeyValues::from_vec(vec![kv("a", "${b}", false), kv("b", "2", false)]);
        let vars = VariablesChain::new();
        let map = kvs.interpolate(&vars).unwrap();
        assert_eq!(map.get("a").map(String::as_str), Some("2"));
        assert_eq!(map, kvs.expand(&vars).unwrap().to_map());
    }

    #[test]
    fn test_expand_missing_variable_errors() {
        let kvs = KeyValues::from_vec(vec![kv("a", "${missing}", false)]);
        let vars = VariablesChain::new();
        let err = kvs.expand(&vars).unwrap_err();
        assert!(matches!(err, crate::error::Error::MissingVariable { .. }));
    }
}
