//! Error types for the loader.
//!
//! Every fatal error kind from the component table carries the resource
//! chain that was active when it was raised (this resource plus its
//! declaring references, up to the root), so a caller can locate the
//! offending resource without re-deriving it from scratch.

use std::fmt;

/// One link in a resource's declaration chain, used for error context.
///
/// Built from the arena rather than owned pointers, so a chain can be
/// materialized for an error without holding a borrow of the arena.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChainLink {
    pub uri: String,
    pub name: Option<String>,
}

impl fmt::Display for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({})", self.uri),
            None => write!(f, "{}", self.uri),
        }
    }
}

/// The resource chain attached to a fatal error: this resource first,
/// then its declaring reference, and so on up to a root resource.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourceChain(pub Vec<ChainLink>);

impl fmt::Display for ResourceChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, link) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " <- ")?;
            }
            write!(f, "{link}")?;
        }
        Ok(())
    }
}

/// All errors this crate can produce. One variant per row of the error
/// table; the context the table requires (resource chain, originating
/// URI, triggering key) is folded into each variant's fields.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("resource not found: {uri} (chain: {chain})")]
    ResourceNotFound { uri: String, chain: ResourceChain },

    #[error("duplicate resource name `{name}` among siblings (chain: {chain})")]
    ResourceNameDuplicate { name: String, chain: ResourceChain },

    #[error("invalid resource key `{key}`: {reason} (chain: {chain})")]
    ResourceKeyInvalid {
        key: String,
        reason: String,
        chain: ResourceChain,
    },

    #[error("bad filter expression for `{filter_id}`: {reason} (chain: {chain})")]
    BadFilterExpression {
        filter_id: String,
        reason: String,
        chain: ResourceChain,
    },

    #[error("media error for {uri}: {reason}")]
    MediaError { uri: String, reason: String },

    #[error("missing variable `{name}` (chain: {chain})")]
    MissingVariable { name: String, chain: ResourceChain },

    #[error("interpolation recursion limit ({limit}) exceeded for `{name}`")]
    InterpolationLimit { name: String, limit: u32 },

    #[error("resource {uri} produced no key/values after filtering (chain: {chain})")]
    Empty { uri: String, chain: ResourceChain },

    #[error("no loader registered for scheme `{scheme}` ({uri})")]
    LoaderNotFound { scheme: String, uri: String },

    #[error("io error accessing {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::sync::Arc<std::io::Error>,
    },

    #[error("invalid URI `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("unknown load flag `{flag}` (chain: {chain})")]
    UnknownFlag { flag: String, chain: ResourceChain },

    #[error("the LOCK flag is reserved and not yet supported (chain: {chain})")]
    ReservedFlag { chain: ResourceChain },
}

impl Error {
    /// Normalized cause kind, used by `NO_REQUIRE`/`OPTIONAL` handling to
    /// decide whether an error should be swallowed into an empty stream,
    /// without matching on exception identity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. })
            || matches!(self, Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    pub fn io(uri: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            uri: uri.into(),
            source: std::sync::Arc::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_chain_display() {
        let chain = ResourceChain(vec![
            ChainLink {
                uri: "mem:/child".into(),
                name: Some("child".into()),
            },
            ChainLink {
                uri: "mem:/root".into(),
                name: None,
            },
        ]);
        assert_eq!(
            chain.to_string(),
            "child (mem:/child) <- mem:/root"
        );
    }

    #[test]
    fn test_is_not_found() {
        let err = Error::ResourceNotFound {
            uri: "file:///x".into(),
            chain: ResourceChain::default(),
        };
        assert!(err.is_not_found());

        let err = Error::io("file:///x", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = Error::MissingVariable {
            name: "x".into(),
            chain: ResourceChain::default(),
        };
        assert!(!err.is_not_found());
    }
}
