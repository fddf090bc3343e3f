use super::{path_after_scheme, LoadContext, LoadOutcome, Loader};
use crate::error::{Error, Result};
use crate::resource::Resource;

const TOKEN: &str = "__PROFILE__";

/// `profile.<sub-scheme>` meta-loader: requires a `profile` CSV
/// parameter and a literal `__PROFILE__` placeholder, and synthesizes
/// one child resource per profile with the placeholder substituted
/// (spec.md §4.7, §8 law 10).
pub struct ProfileLoader;

impl Loader for ProfileLoader {
    fn handles(&self, scheme: &str) -> bool {
        scheme.starts_with("profile.") && scheme.len() > "profile.".len()
    }

    fn load(&self, _ctx: &LoadContext, resource: &Resource) -> Result<LoadOutcome> {
        let scheme = resource.scheme();
        let sub_scheme = scheme.strip_prefix("profile.").expect("handles() guarantees this prefix");

        let profiles = resource.parameters.get("profile").ok_or_else(|| Error::ResourceKeyInvalid {
            key: "profile".to_string(),
            reason: "`profile.*` resources require a `profile` parameter".to_string(),
            chain: crate::error::ResourceChain::default(),
        })?;

        let path = path_after_scheme(&resource.uri);
        if !path.contains(TOKEN) {
            return Err(Error::ResourceKeyInvalid {
                key: resource.uri.clone(),
                reason: format!("`profile.*` resource URI must contain the literal token `{TOKEN}`"),
                chain: crate::error::ResourceChain::default(),
            });
        }

        let children = profiles
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|profile| {
                let substituted = path.replace(TOKEN, profile);
                let uri = format!("{sub_scheme}:/{substituted}");
                Resource::new(uri, format!("{}_{}", resource.name, profile))
            })
            .collect();
        Ok(LoadOutcome::children(children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StdEnvironment;
    use crate::loader::ProviderRegistry;
    use crate::media::MediaRegistry;
    use indexmap::IndexMap;

    #[test]
    fn test_fan_out_one_child_per_profile() {
        let mut resource = Resource::new("profile.mem:/app-__PROFILE__.props", "app");
        resource.parameters.insert("profile".to_string(), "dev,prod".to_string());
        let environment = StdEnvironment::new();
        let media = MediaRegistry::with_builtins();
        let providers = ProviderRegistry::new();
        let mem = IndexMap::new();
        let ctx = LoadContext { environment: &environment, media: &media, providers: &providers, mem_documents: &mem };
        let outcome = ProfileLoader.load(&ctx, &resource).unwrap();
        assert_eq!(outcome.children.len(), 2);
        assert_eq!(outcome.children[0].uri, "mem:/app-dev.props");
        assert_eq!(outcome.children[1].uri, "mem:/app-prod.props");
    }

    #[test]
    fn test_missing_profile_parameter_errors() {
        let resource = Resource::new("profile.mem:/app-__PROFILE__.props", "app");
        let environment = StdEnvironment::new();
        let media = MediaRegistry::with_builtins();
        let providers = ProviderRegistry::new();
        let mem = IndexMap::new();
        let ctx = LoadContext { environment: &environment, media: &media, providers: &providers, mem_documents: &mem };
        let err = ProfileLoader.load(&ctx, &resource).unwrap_err();
        assert!(matches!(err, Error::ResourceKeyInvalid { .. }));
    }
}
