use super::{path_after_scheme, LoadContext, LoadOutcome, Loader};
use crate::error::Result;
use crate::resource::Resource;

/// Reads standard input, gated by an enable-predicate so a load never
/// blocks on stdin unless the caller opted in (spec.md §4.7, §5).
pub struct StdinLoader;

impl StdinLoader {
    fn enabled(resource: &Resource, args: &[String]) -> bool {
        if resource.parameters.get("stdin").map(String::as_str) == Some("true") {
            return true;
        }
        if let Some(flag) = resource.parameters.get("stdin_arg") {
            return args.iter().any(|arg| arg == flag);
        }
        let default_flag = format!("--{}", resource.name);
        args.iter().any(|arg| arg == &default_flag)
    }
}

impl Loader for StdinLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme == "stdin"
    }

    fn load(&self, ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let args = ctx.environment.args();
        if !Self::enabled(resource, &args) {
            return Ok(LoadOutcome::default());
        }
        let content = ctx.environment.read_stdin()?;
        let path = path_after_scheme(&resource.uri);
        if !path.is_empty() {
            return Ok(LoadOutcome::pairs(vec![(path.to_string(), content)]));
        }
        let entry = ctx.media.resolve(resource.media_type.as_deref(), &resource.uri)?;
        let mut pairs = Vec::new();
        entry.parser.parse(&content, &mut |k, v| pairs.push((k, v)))?;
        Ok(LoadOutcome::pairs(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let resource = Resource::new("stdin:///", "stdin");
        assert!(!StdinLoader::enabled(&resource, &[]));
    }

    #[test]
    fn test_enabled_by_default_flag() {
        let resource = Resource::new("stdin:///", "creds");
        assert!(StdinLoader::enabled(&resource, &["--creds".to_string()]));
    }

    #[test]
    fn test_enabled_by_named_arg_param() {
        let mut resource = Resource::new("stdin:///", "creds");
        resource.parameters.insert("stdin_arg".to_string(), "--secret".to_string());
        assert!(StdinLoader::enabled(&resource, &["--secret".to_string()]));
    }
}
