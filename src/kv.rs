//! C1 — the immutable `KeyValue` record and its provenance metadata.

use crate::arena::ResourceId;
use crate::flags::KvFlags;
use crate::resource::Reference;
use std::fmt;

/// Where a [`KeyValue`] came from: the resource that produced it, its
/// declaring reference (if any), and its 1-based position within that
/// resource's output.
///
/// `resource` is an index into the arena owned by the scheduler, rather
/// than an owned pointer back to the `Resource` — the spec explicitly
/// calls for arena indices here to avoid reference cycles between a
/// resource and the key/value that declared it. `reference` mirrors the
/// producing [`crate::resource::Resource`]'s own `reference` field
/// (spec.md §3: "`reference` is the resource-key that declared this
/// resource"); it is the same for every entry a given resource produces.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Source {
    pub resource: ResourceId,
    pub reference: Option<Reference>,
    pub index: usize,
}

/// Provenance and flags attached to a [`KeyValue`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Meta {
    pub original_key: String,
    pub source: Source,
    pub flags: KvFlags,
}

/// An immutable (key, raw value, expanded value) triple with provenance.
///
/// `raw` is the value as parsed, before interpolation; `expanded` is the
/// post-interpolation value and starts out equal to `raw`. Interpolation
/// never mutates a `KeyValue` in place — the scheduler replaces its
/// accumulator with a new vector each round so that `KeyValue` stays
/// immutable after construction, with the accumulator as the sole mutable
/// structure (spec.md §3 "Lifecycles").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyValue {
    key: String,
    raw: String,
    expanded: String,
    meta: Meta,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, raw: impl Into<String>, meta: Meta) -> Self {
        let key = key.into();
        let raw = raw.into();
        let expanded = raw.clone();
        Self {
            key,
            raw,
            expanded,
            meta,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The current interpolated value. Equal to `raw()` until an
    /// interpolation pass updates it.
    pub fn expanded(&self) -> &str {
        &self.expanded
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn is_sensitive(&self) -> bool {
        self.meta.flags.sensitive
    }

    pub fn is_no_interpolation(&self) -> bool {
        self.meta.flags.no_interpolation
    }

    /// Value used by formatters that must not apply redaction (e.g. the
    /// loader's own local re-interpolation, which is allowed to read
    /// sensitive values within the same resource batch).
    pub fn raw_display_value(&self) -> &str {
        &self.expanded
    }

    /// Display value honoring redaction: `REDACTED` for sensitive entries,
    /// the expanded value otherwise. Used by [`redact`](crate::stream::KeyValuesExt::redact).
    pub fn display_value(&self, redact: bool) -> &str {
        if redact && self.is_sensitive() {
            "REDACTED"
        } else {
            &self.expanded
        }
    }

    /// Build a copy of this entry with a new expanded value. Used by the
    /// interpolator; `raw` and all metadata are untouched.
    pub fn with_expanded(&self, expanded: impl Into<String>) -> Self {
        Self {
            key: self.key.clone(),
            raw: self.raw.clone(),
            expanded: expanded.into(),
            meta: self.meta.clone(),
        }
    }

    /// Build a copy with a different key, used by `sed`'s key-target
    /// substitution.
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            raw: self.raw.clone(),
            expanded: self.expanded.clone(),
            meta: self.meta.clone(),
        }
    }

    /// Build a copy with a different raw+expanded value, used by `sed`'s
    /// value-target substitution and by `join`.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            key: self.key.clone(),
            raw: value.clone(),
            expanded: value,
            meta: self.meta.clone(),
        }
    }

    pub fn with_flags(&self, flags: KvFlags) -> Self {
        Self {
            key: self.key.clone(),
            raw: self.raw.clone(),
            expanded: self.expanded.clone(),
            meta: Meta {
                flags,
                ..self.meta.clone()
            },
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.display_value(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ResourceId;

    fn meta() -> Meta {
        Meta {
            original_key: "k".into(),
            source: Source {
                resource: ResourceId::root(),
                reference: None,
                index: 1,
            },
            flags: KvFlags::default(),
        }
    }

    #[test]
    fn test_expanded_defaults_to_raw() {
        let kv = KeyValue::new("k", "v", meta());
        assert_eq!(kv.raw(), "v");
        assert_eq!(kv.expanded(), "v");
    }

    #[test]
    fn test_redaction_display() {
        let mut m = meta();
        m.flags.sensitive = true;
        let kv = KeyValue::new("token", "secret", m);
        assert_eq!(kv.display_value(true), "REDACTED");
        assert_eq!(kv.display_value(false), "secret");
    }

    #[test]
    fn test_with_expanded_preserves_raw() {
        let kv = KeyValue::new("k", "${x}", meta());
        let kv2 = kv.with_expanded("resolved");
        assert_eq!(kv2.raw(), "${x}");
        assert_eq!(kv2.expanded(), "resolved");
    }
}
