use super::{io_not_found, LoadContext, LoadOutcome, Loader};
use crate::error::{Error, Result};
use crate::resource::Resource;
use url::Url;

/// Fallback for schemes with no dedicated handler (`jar`, `jrt`, and
/// other generic URL schemes, spec.md §4.7). Without a bundled HTTP or
/// JVM-module client in the dependency stack, this covers the
/// locally-reachable subset: any URI the `url` crate can parse whose
/// path resolves to a readable file.
pub struct UrlLoader;

impl Loader for UrlLoader {
    fn handles(&self, _scheme: &str) -> bool {
        // Registered at the lowest priority among built-ins; claims
        // whatever nothing more specific has already handled.
        true
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let url = Url::parse(&resource.uri).map_err(|err| Error::InvalidUri {
            uri: resource.uri.clone(),
            reason: err.to_string(),
        })?;
        let content = std::fs::read_to_string(url.path()).map_err(|err| io_not_found(&resource.uri, err))?;
        let entry = ctx.media.resolve(resource.media_type.as_deref(), &resource.uri)?;
        let mut pairs = Vec::new();
        entry.parser.parse(&content, &mut |k, v| pairs.push((k, v)))?;
        Ok(LoadOutcome::pairs(pairs))
    }
}
