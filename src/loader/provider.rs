use super::{path_after_scheme, LoadContext, LoadOutcome, Loader};
use crate::error::{Error, Result};
use crate::resource::Resource;
use std::sync::Arc;

/// A programmatic key/value builder, registered on the [`System`]
/// facade and invoked through the `provider:///` scheme (spec.md §4.7).
///
/// [`System`]: crate::system::System
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn provide(&self) -> Result<Vec<(String, String)>>;
}

/// Order-sorted registry of [`Provider`]s.
pub struct ProviderRegistry {
    entries: Vec<(i32, Arc<dyn Provider>)>,
}

impl ProviderRegistry {
    pub const DEFAULT_ORDER: i32 = 0;

    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn register(&mut self, order: i32, provider: Arc<dyn Provider>) {
        self.entries.push((order, provider));
        self.entries.sort_by_key(|(order, _)| *order);
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.entries.iter().map(|(_, p)| p).find(|p| p.name() == name)
    }

    /// Provider names in registration (order) precedence.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(_, p)| p.name().to_string()).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// With an empty path, synthesizes one child resource per registered
/// provider so each is loaded (and logged) through the scheduler like
/// any other resource. With a path naming a provider, invokes only that
/// one (spec.md §4.7).
pub struct ProviderLoader;

impl Loader for ProviderLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "provider"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let path = path_after_scheme(&resource.uri);
        if path.is_empty() {
            let children = ctx
                .providers
                .names()
                .into_iter()
                .map(|name| {
                    let uri = format!("provider:/{name}");
                    Resource::new(uri, name)
                })
                .collect();
            return Ok(LoadOutcome::children(children));
        }
        let provider = ctx.providers.find(path).ok_or_else(|| Error::ResourceNotFound {
            uri: resource.uri.clone(),
            chain: crate::error::ResourceChain::default(),
        })?;
        Ok(LoadOutcome::pairs(provider.provide()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StdEnvironment;
    use crate::media::MediaRegistry;
    use indexmap::IndexMap;

    struct StaticProvider(&'static str, Vec<(String, String)>);

    impl Provider for StaticProvider {
        fn name(&self) -> &str {
            self.0
        }
        fn provide(&self) -> Result<Vec<(String, String)>> {
            Ok(self.1.clone())
        }
    }

    #[test]
    fn test_empty_path_synthesizes_one_child_per_provider() {
        let mut providers = ProviderRegistry::new();
        providers.register(0, Arc::new(StaticProvider("a", vec![])));
        providers.register(0, Arc::new(StaticProvider("b", vec![])));
        let environment = StdEnvironment::new();
        let media = MediaRegistry::with_builtins();
        let mem = IndexMap::new();
        let ctx = LoadContext { environment: &environment, media: &media, providers: &providers, mem_documents: &mem };
        let resource = Resource::new("provider:///", "providers");
        let outcome = ProviderLoader.load(&ctx, &resource).unwrap();
        assert_eq!(outcome.children.len(), 2);
        assert_eq!(outcome.children[0].name, "a");
    }

    #[test]
    fn test_named_path_invokes_single_provider() {
        let mut providers = ProviderRegistry::new();
        providers.register(0, Arc::new(StaticProvider("secrets", vec![("k".into(), "v".into())])));
        let environment = StdEnvironment::new();
        let media = MediaRegistry::with_builtins();
        let mem = IndexMap::new();
        let ctx = LoadContext { environment: &environment, media: &media, providers: &providers, mem_documents: &mem };
        let resource = Resource::new("provider:/secrets", "secrets");
        let outcome = ProviderLoader.load(&ctx, &resource).unwrap();
        assert_eq!(outcome.pairs, vec![("k".to_string(), "v".to_string())]);
    }
}
