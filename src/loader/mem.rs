use super::{path_after_scheme, LoadContext, LoadOutcome, Loader};
use crate::error::{Error, Result};
use crate::resource::Resource;

/// `mem:/<name>` — an in-memory named document, registered on the
/// [`System`](crate::system::System) builder. Not part of spec.md's own
/// scheme table; added so the literal scenarios of spec.md §8 (which
/// load from `mem:/child`, `mem:/app`, …) are expressible as executable
/// tests without a real filesystem or process environment.
pub struct MemLoader;

impl Loader for MemLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "mem"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let path = path_after_scheme(&resource.uri);
        let content = ctx.mem_documents.get(path).ok_or_else(|| Error::ResourceNotFound {
            uri: resource.uri.clone(),
            chain: crate::error::ResourceChain::default(),
        })?;
        let entry = ctx.media.resolve(resource.media_type.as_deref(), &resource.uri)?;
        let mut pairs = Vec::new();
        entry.parser.parse(content, &mut |k, v| pairs.push((k, v)))?;
        Ok(LoadOutcome::pairs(pairs))
    }
}
