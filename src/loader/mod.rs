//! C9 — the loader dispatcher: given a normalized resource, select the
//! scheme handler that produces its key/values (spec.md §4.7).

mod classpath;
mod file;
mod mem;
mod profile;
mod provider;
mod stdin;
mod sysenv;
mod url_scheme;

pub use classpath::{ClasspathLoader, ClasspathsLoader};
pub use file::FileLoader;
pub use mem::MemLoader;
pub use profile::ProfileLoader;
pub use provider::{Provider, ProviderLoader, ProviderRegistry};
pub use stdin::StdinLoader;
pub use sysenv::{CmdLoader, EnvLoader, SystemLoader};
pub use url_scheme::UrlLoader;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::media::MediaRegistry;
use crate::resource::Resource;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

/// Context threaded through every loader call: the collaborators a
/// scheme handler may need, none of which it owns.
pub struct LoadContext<'a> {
    pub environment: &'a dyn Environment,
    pub media: &'a MediaRegistry,
    pub providers: &'a ProviderRegistry,
    pub mem_documents: &'a IndexMap<String, String>,
}

/// What a loader produces for one resource: the raw `(key, value)` pairs
/// it read (the scheduler assigns provenance/index), plus any resources
/// it synthesizes as children (`provider`, `classpaths`, `profile.*`
/// fan-out) distinct from the `_load_*` children C7 extracts from the
/// body.
#[derive(Default)]
pub struct LoadOutcome {
    pub pairs: Vec<(String, String)>,
    pub children: Vec<Resource>,
}

impl LoadOutcome {
    pub fn pairs(pairs: Vec<(String, String)>) -> Self {
        Self { pairs, children: Vec::new() }
    }

    pub fn children(children: Vec<Resource>) -> Self {
        Self { pairs: Vec::new(), children }
    }
}

pub trait Loader: Send + Sync {
    /// Whether this loader handles `scheme` (already lowercased).
    fn handles(&self, scheme: &str) -> bool;

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome>;
}

/// Order-sorted dispatch table, first handler to claim the scheme wins
/// (spec.md §9 "Finder registries").
pub struct LoaderRegistry {
    entries: Vec<(i32, Arc<dyn Loader>)>,
}

impl LoaderRegistry {
    pub const BUILTIN_ORDER: i32 = -127;
    pub const DEFAULT_ORDER: i32 = 0;

    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let order = Self::BUILTIN_ORDER;
        registry.register(order, Arc::new(FileLoader));
        registry.register(order, Arc::new(SystemLoader));
        registry.register(order, Arc::new(EnvLoader));
        registry.register(order, Arc::new(CmdLoader));
        registry.register(order, Arc::new(StdinLoader));
        registry.register(order, Arc::new(ClasspathLoader));
        registry.register(order, Arc::new(ClasspathsLoader));
        registry.register(order, Arc::new(ProfileLoader));
        registry.register(order, Arc::new(ProviderLoader));
        registry.register(order, Arc::new(MemLoader));
        // Generic URL fallback binds last among built-ins so specific
        // schemes above always get first refusal.
        registry.register(order + 1, Arc::new(UrlLoader));
        registry
    }

    pub fn register(&mut self, order: i32, loader: Arc<dyn Loader>) {
        self.entries.push((order, loader));
        self.entries.sort_by_key(|(order, _)| *order);
    }

    pub fn dispatch(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let scheme = resource.scheme();
        self.entries
            .iter()
            .map(|(_, loader)| loader)
            .find(|loader| loader.handles(&scheme))
            .ok_or_else(|| Error::LoaderNotFound {
                scheme: scheme.clone(),
                uri: resource.uri.clone(),
            })?
            .load(ctx, resource)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Resolve the "path" portion of a resource URI: everything after the
/// scheme and an optional authority (`//`), with one more leading slash
/// stripped. `system:///` → `""`; `mem:/child` → `"child"`.
pub fn path_after_scheme(uri: &str) -> &str {
    let Some((_, after_colon)) = uri.split_once(':') else {
        // No scheme prefix at all: a bare relative/absolute path is the
        // whole URI (spec.md §3: "Absence of scheme means file").
        return uri;
    };
    let after_colon = after_colon.strip_prefix("//").unwrap_or(after_colon);
    after_colon.strip_prefix('/').unwrap_or(after_colon)
}

/// Shared "select one entry and re-parse its value as nested content"
/// behavior used by `system`, `env`, and `cmd` (spec.md §4.7).
pub(crate) fn map_or_keyed(
    ctx: &LoadContext,
    resource: &Resource,
    map: &IndexMap<String, String>,
) -> Result<Vec<(String, String)>> {
    let path = path_after_scheme(&resource.uri);
    if path.is_empty() {
        return Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    }
    let value = map.get(path).ok_or_else(|| Error::ResourceNotFound {
        uri: resource.uri.clone(),
        chain: crate::error::ResourceChain::default(),
    })?;
    let entry = ctx.media.resolve(resource.media_type.as_deref(), &resource.uri)?;
    let mut pairs = Vec::new();
    entry.parser.parse(value, &mut |k, v| pairs.push((k, v)))?;
    Ok(pairs)
}

pub(crate) fn io_not_found(uri: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::ResourceNotFound {
            uri: uri.to_string(),
            chain: crate::error::ResourceChain::default(),
        }
    } else {
        Error::io(uri, err)
    }
}

pub(crate) fn resolve_relative(path: &str, cwd: Option<&Path>) -> std::path::PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        match cwd {
            Some(cwd) => cwd.join(path),
            None => path.to_path_buf(),
        }
    }
}
