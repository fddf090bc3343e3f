use super::{io_not_found, path_after_scheme, resolve_relative, LoadContext, LoadOutcome, Loader};
use crate::error::Result;
use crate::resource::Resource;

/// Opens from the filesystem, resolving relative paths against the
/// environment's CWD (spec.md §4.7).
pub struct FileLoader;

impl Loader for FileLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "file"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let path = path_after_scheme(&resource.uri);
        let path = if path.is_empty() { resource.uri.as_str() } else { path };
        let resolved = resolve_relative(path, ctx.environment.cwd().as_deref());
        let content = std::fs::read_to_string(&resolved).map_err(|err| io_not_found(&resource.uri, err))?;

        let entry = ctx.media.resolve(resource.media_type.as_deref(), &resource.uri)?;
        let mut pairs = Vec::new();
        entry.parser.parse(&content, &mut |k, v| pairs.push((k, v)))?;
        Ok(LoadOutcome::pairs(pairs))
    }
}
