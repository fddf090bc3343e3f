//! C11 — the `System` facade: the single entry point an application
//! embeds, composing every registry plus the environment collaborator,
//! and exposing the one operation applications actually call: load a
//! declared set of sources into a [`KeyValues`] stream (spec.md §6).

use crate::env::{Environment, StdEnvironment};
use crate::error::Result;
use crate::filter::{Filter, FilterRegistry};
use crate::loader::{Loader, LoaderRegistry, Provider, ProviderRegistry};
use crate::media::{MediaEntry, MediaRegistry};
use crate::resource::{Declaration, InlineNamedKeyValues, Resource};
use crate::scheduler;
use crate::stream::KeyValues;
use indexmap::IndexMap;
use std::sync::Arc;

/// Builds a [`System`]: register extension media, filters, loaders and
/// providers before loading anything, the same way the builder composes
/// collaborators and registries before producing a runnable value.
pub struct SystemBuilder {
    media: MediaRegistry,
    filters: FilterRegistry,
    loaders: LoaderRegistry,
    providers: ProviderRegistry,
    environment: Box<dyn Environment>,
    mem_documents: IndexMap<String, String>,
    initial_vars: IndexMap<String, String>,
}

impl SystemBuilder {
    pub fn new() -> Self {
        Self {
            media: MediaRegistry::with_builtins(),
            filters: FilterRegistry::with_builtins(),
            loaders: LoaderRegistry::with_builtins(),
            providers: ProviderRegistry::new(),
            environment: Box::new(StdEnvironment::new()),
            mem_documents: IndexMap::new(),
            initial_vars: IndexMap::new(),
        }
    }

    pub fn environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Box::new(environment);
        self
    }

    /// Register a user media kind at [`MediaRegistry::DEFAULT_ORDER`].
    pub fn media(mut self, entry: MediaEntry) -> Self {
        self.media.register(MediaRegistry::DEFAULT_ORDER, entry);
        self
    }

    /// Register a user filter at [`FilterRegistry::DEFAULT_ORDER`].
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.register(FilterRegistry::DEFAULT_ORDER, Arc::new(filter));
        self
    }

    /// Register a user loader at [`LoaderRegistry::DEFAULT_ORDER`].
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.register(LoaderRegistry::DEFAULT_ORDER, Arc::new(loader));
        self
    }

    /// Register a provider, reachable via `provider:/<name>` and fanned
    /// out under a bare `provider:///`.
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.register(ProviderRegistry::DEFAULT_ORDER, Arc::new(provider));
        self
    }

    /// Bind an in-memory named document, reachable via `mem:/<name>`.
    pub fn mem_document(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.mem_documents.insert(name.into(), content.into());
        self
    }

    /// Seed a variable available to interpolation from the first
    /// resource onward, without it ever appearing in the output itself
    /// (e.g. `user.home`).
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.initial_vars.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> System {
        System {
            media: self.media,
            filters: self.filters,
            loaders: self.loaders,
            providers: self.providers,
            environment: self.environment,
            mem_documents: self.mem_documents,
            initial_vars: self.initial_vars,
        }
    }
}

impl Default for SystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The composed facade: every registry plus the collaborator needed to
/// actually run a load. Build one with [`SystemBuilder`], then call
/// [`System::load`] once per set of roots.
pub struct System {
    media: MediaRegistry,
    filters: FilterRegistry,
    loaders: LoaderRegistry,
    providers: ProviderRegistry,
    environment: Box<dyn Environment>,
    mem_documents: IndexMap<String, String>,
    initial_vars: IndexMap<String, String>,
}

impl System {
    pub fn builder() -> SystemBuilder {
        SystemBuilder::new()
    }

    /// Load `roots` (processed depth-first, left to right) into a single
    /// [`KeyValues`] stream.
    pub fn load(&self, roots: Vec<Declaration>) -> Result<KeyValues> {
        scheduler::run(
            &self.loaders,
            &self.filters,
            &self.media,
            self.environment.as_ref(),
            &self.providers,
            &self.mem_documents,
            roots,
            self.initial_vars.clone(),
        )
    }

    /// Convenience for the common case of a single URI root.
    pub fn load_uri(&self, uri: impl Into<String>, name: impl Into<String>) -> Result<KeyValues> {
        self.load(vec![Declaration::Resource(Resource::new(uri, name))])
    }

    /// Convenience for loading a single literal, in-memory named source.
    pub fn load_inline(&self, name: impl Into<String>, entries: Vec<(String, String)>) -> Result<KeyValues> {
        self.load(vec![Declaration::Inline(InlineNamedKeyValues {
            name: name.into(),
            entries,
        })])
    }
}
