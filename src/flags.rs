//! Load flags (spec.md §4.6) and the per-[`KeyValue`](crate::kv::KeyValue)
//! flags they project onto produced entries.

use crate::error::{Error, ResourceChain};
use std::fmt;

/// A single load flag, settable programmatically on a [`Resource`] or
/// named (case-insensitively) in a `_flags_<name>` / `_flag_<name>`
/// meta-key.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum LoadFlag {
    NoRequire,
    NoEmpty,
    NoReplace,
    NoAdd,
    NoLoadChildren,
    NoInterpolate,
    Sensitive,
    NoFilterResourceKeys,
    Propagate,
    /// Declared but reserved; the source's semantics for this flag are
    /// unspecified, so it is rejected rather than silently ignored.
    Lock,
}

impl LoadFlag {
    /// Parse a flag name, matching case-insensitively and accepting the
    /// `NO_REQUIRE`/`OPTIONAL` alias pair.
    pub fn parse(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Some(match upper.as_str() {
            "NO_REQUIRE" | "OPTIONAL" => Self::NoRequire,
            "NO_EMPTY" => Self::NoEmpty,
            "NO_REPLACE" => Self::NoReplace,
            "NO_ADD" => Self::NoAdd,
            "NO_LOAD_CHILDREN" => Self::NoLoadChildren,
            "NO_INTERPOLATE" => Self::NoInterpolate,
            "SENSITIVE" => Self::Sensitive,
            "NO_FILTER_RESOURCE_KEYS" => Self::NoFilterResourceKeys,
            "PROPAGATE" => Self::Propagate,
            "LOCK" => Self::Lock,
            _ => return None,
        })
    }
}

impl fmt::Display for LoadFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoRequire => "NO_REQUIRE",
            Self::NoEmpty => "NO_EMPTY",
            Self::NoReplace => "NO_REPLACE",
            Self::NoAdd => "NO_ADD",
            Self::NoLoadChildren => "NO_LOAD_CHILDREN",
            Self::NoInterpolate => "NO_INTERPOLATE",
            Self::Sensitive => "SENSITIVE",
            Self::NoFilterResourceKeys => "NO_FILTER_RESOURCE_KEYS",
            Self::Propagate => "PROPAGATE",
            Self::Lock => "LOCK",
        };
        write!(f, "{name}")
    }
}

/// An ordered, deduplicated set of [`LoadFlag`]s. Small enough that a
/// `Vec` scanned linearly reads more plainly than a bitset, and preserves
/// first-seen order for display.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LoadFlags(Vec<LoadFlag>);

impl LoadFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, flag: LoadFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn insert(&mut self, flag: LoadFlag) {
        if !self.0.contains(&flag) {
            self.0.push(flag);
        }
    }

    /// Union in-place with another flag set (used for URI-derived flags
    /// merging with programmatically-set ones, per spec.md §4.3 step 2).
    pub fn union(&mut self, other: &LoadFlags) {
        for flag in &other.0 {
            self.insert(*flag);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = LoadFlag> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a comma-separated flag list, rejecting unknown names and the
    /// reserved `LOCK` flag.
    pub fn parse_csv(csv: &str, chain: &ResourceChain) -> Result<Self, Error> {
        let mut flags = Self::new();
        for part in csv.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let flag = LoadFlag::parse(part).ok_or_else(|| Error::UnknownFlag {
                flag: part.to_string(),
                chain: chain.clone(),
            })?;
            if flag == LoadFlag::Lock {
                return Err(Error::ReservedFlag {
                    chain: chain.clone(),
                });
            }
            flags.insert(flag);
        }
        Ok(flags)
    }
}

impl fmt::Display for LoadFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, flag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{flag}")?;
        }
        Ok(())
    }
}

impl FromIterator<LoadFlag> for LoadFlags {
    fn from_iter<T: IntoIterator<Item = LoadFlag>>(iter: T) -> Self {
        let mut flags = Self::new();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

/// The subset of flags that matter once a [`KeyValue`](crate::kv::KeyValue)
/// has been produced: whether it should never be interpolated, and whether
/// it should be redacted on display.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct KvFlags {
    pub sensitive: bool,
    pub no_interpolation: bool,
}

impl KvFlags {
    pub fn from_load_flags(flags: &LoadFlags) -> Self {
        Self {
            sensitive: flags.contains(LoadFlag::Sensitive),
            no_interpolation: flags.contains(LoadFlag::NoInterpolate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(LoadFlag::parse("no_require"), Some(LoadFlag::NoRequire));
        assert_eq!(LoadFlag::parse("OPTIONAL"), Some(LoadFlag::NoRequire));
        assert_eq!(LoadFlag::parse("bogus"), None);
    }

    #[test]
    fn test_parse_csv_union_and_order() {
        let chain = ResourceChain::default();
        let flags =
            LoadFlags::parse_csv(" NO_ADD, no_interpolate ,NO_ADD", &chain).unwrap();
        assert_eq!(flags.iter().collect::<Vec<_>>(), vec![
            LoadFlag::NoAdd,
            LoadFlag::NoInterpolate
        ]);
    }

    #[test]
    fn test_lock_rejected() {
        let chain = ResourceChain::default();
        let err = LoadFlags::parse_csv("LOCK", &chain).unwrap_err();
        assert!(matches!(err, Error::ReservedFlag { .. }));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let chain = ResourceChain::default();
        let err = LoadFlags::parse_csv("NOT_A_FLAG", &chain).unwrap_err();
        assert!(matches!(err, Error::UnknownFlag { .. }));
    }
}
