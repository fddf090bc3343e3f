//! C6 — the resource model: a parsed declaration of a URI-addressable
//! source, plus the inline-literal variant the scheduler also accepts.

use crate::arena::ResourceId;
use crate::flags::LoadFlags;
use indexmap::IndexMap;
use std::fmt;

/// A single filter entry in a resource's filter chain: the filter id
/// (which may carry a target suffix like `_key`/`_val`, see
/// [`crate::filter`]), its expression, and the symbolic name it was
/// declared under (used only for diagnostics).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilterSpec {
    pub id: String,
    pub expression: String,
    pub label: String,
}

/// Ordered `short-name -> value` parameters attached to a resource (e.g.
/// `stdin_arg`, `profile`).
pub type Parameters = IndexMap<String, String>;

/// A back-pointer to the meta-key that declared a resource: the literal
/// key name (e.g. `_load_child`) and the URI of the resource it was
/// found in. Carried on [`Resource::reference`] and copied onto every
/// [`crate::kv::Source`] the resource produces (spec.md §3: "`reference`
/// is the resource-key that declared this resource (key name + declaring
/// URI)").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reference {
    pub key: String,
    pub uri: String,
}

/// A parsed resource declaration (spec.md §3 "Resource").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub flags: LoadFlags,
    pub media_type: Option<String>,
    pub parameters: Parameters,
    pub filters: Vec<FilterSpec>,
    /// The `_load_<name>` `KeyValue` that declared this resource, if
    /// any. `None` for root resources (spec.md §3).
    pub reference: Option<Reference>,
    pub normalized: bool,
}

impl Resource {
    /// Construct a bare resource with defaults, as produced by C7's
    /// extraction step before any query-string merge has run.
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            flags: LoadFlags::new(),
            media_type: None,
            parameters: Parameters::new(),
            filters: Vec::new(),
            reference: None,
            normalized: false,
        }
    }

    /// Scheme portion of the URI, lowercase. Absence of a scheme (a bare
    /// path) means `file`, per spec.md §3.
    pub fn scheme(&self) -> String {
        match self.uri.split_once(':') {
            // Guard against drive-letter-looking or bare relative paths
            // being mistaken for a scheme (single ASCII letter followed by
            // ':' is not a URI scheme in this DSL).
            Some((scheme, _))
                if !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
                    && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) =>
            {
                scheme.to_ascii_lowercase()
            }
            _ => "file".to_string(),
        }
    }
}

/// Renders the exact shape spec.md §6 fixes for the `load` log event:
/// `uri='…' [flags=[…]] [specified with key: '…' in uri='…']`, the last
/// clause present only when [`Resource::reference`] is set.
impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uri='{}'", self.uri)?;
        if !self.flags.is_empty() {
            write!(f, " [flags=[{}]]", self.flags)?;
        }
        if let Some(reference) = &self.reference {
            write!(f, " [specified with key: '{}' in uri='{}']", reference.key, reference.uri)?;
        }
        Ok(())
    }
}

/// A literal, in-memory `name -> [(key, value)]` source, supplied
/// programmatically rather than addressed by URI. This is the other half
/// of the `Resource | InlineNamedKeyValues` tagged variant the scheduler
/// dispatches on (spec.md §9 "Polymorphism over heterogeneous sources").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InlineNamedKeyValues {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

/// A root-level declaration supplied by the caller: either a [`Resource`]
/// to dispatch through C9, or a literal [`InlineNamedKeyValues`].
#[derive(Clone, Debug, Eq, PartialEq, derive_more::From)]
pub enum Declaration {
    Resource(Resource),
    Inline(InlineNamedKeyValues),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Resource(r) => &r.name,
            Declaration::Inline(i) => &i.name,
        }
    }
}

/// An arena-owned node: a resource plus a pointer to its declaring
/// parent (if any) and the meta-key name it was declared under, used to
/// build [`crate::error::ResourceChain`]s and [`crate::kv::Source`]
/// references without owning pointers.
#[derive(Clone, Debug)]
pub struct ResourceNode {
    pub resource: Resource,
    pub parent: Option<ResourceId>,
    pub declaring_key: Option<String>,
}
