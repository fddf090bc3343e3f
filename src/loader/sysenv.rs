use super::{map_or_keyed, LoadContext, LoadOutcome, Loader};
use crate::error::Result;
use crate::resource::Resource;
use indexmap::IndexMap;

/// Enumerates system properties (treated here as process environment
/// variables, see [`crate::env::Environment`]); the path portion, if
/// present, selects a single entry re-parsed as nested content
/// (spec.md §4.7).
pub struct SystemLoader;

impl Loader for SystemLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "system"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let map = ctx.environment.system_properties();
        Ok(LoadOutcome::pairs(map_or_keyed(ctx, resource, &map)?))
    }
}

/// Enumerates environment variables; same path-selection behavior as
/// [`SystemLoader`].
pub struct EnvLoader;

impl Loader for EnvLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "env"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let map = ctx.environment.env_vars();
        Ok(LoadOutcome::pairs(map_or_keyed(ctx, resource, &map)?))
    }
}

/// Parses the process's command-line arguments as `key=value` tokens;
/// non-matching tokens are ignored. Same path-selection behavior as
/// [`SystemLoader`].
pub struct CmdLoader;

impl Loader for CmdLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "cmd"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let mut map = IndexMap::new();
        for arg in ctx.environment.args() {
            if let Some((k, v)) = arg.split_once('=') {
                map.insert(k.to_string(), v.to_string());
            }
        }
        Ok(LoadOutcome::pairs(map_or_keyed(ctx, resource, &map)?))
    }
}
