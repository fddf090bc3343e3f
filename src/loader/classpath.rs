use super::{path_after_scheme, LoadContext, LoadOutcome, Loader};
use crate::error::{Error, Result};
use crate::flags::LoadFlag;
use crate::resource::Resource;

/// Reads a single classpath-like resource via the environment's
/// resource-loader collaborator (spec.md §4.7).
pub struct ClasspathLoader;

impl Loader for ClasspathLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "classpath"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let path = path_after_scheme(&resource.uri);
        let content = ctx.environment.read_classpath(path)?.ok_or_else(|| Error::ResourceNotFound {
            uri: resource.uri.clone(),
            chain: crate::error::ResourceChain::default(),
        })?;
        let entry = ctx.media.resolve(resource.media_type.as_deref(), &resource.uri)?;
        let mut pairs = Vec::new();
        entry.parser.parse(&content, &mut |k, v| pairs.push((k, v)))?;
        Ok(LoadOutcome::pairs(pairs))
    }
}

/// Enumerates all classpath resources matching the path, deduplicated
/// by URL, synthesizing one `NO_LOAD_CHILDREN`-forced child resource per
/// match (spec.md §4.7) — each then opened in turn by [`ClasspathLoader`].
pub struct ClasspathsLoader;

impl Loader for ClasspathsLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "classpaths"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let path = path_after_scheme(&resource.uri);
        let mut matches = ctx.environment.list_classpath(path);
        matches.sort();
        matches.dedup();
        let children = matches
            .into_iter()
            .enumerate()
            .map(|(i, url)| {
                let mut child = Resource::new(format!("classpath:/{url}"), format!("{}_{i}", resource.name));
                child.flags.insert(LoadFlag::NoLoadChildren);
                child
            })
            .collect();
        Ok(LoadOutcome::children(children))
    }
}
