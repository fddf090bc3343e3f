//! C7 — the resource-key DSL: meta-keys embedded in a key/value stream
//! (`_load_`, `_mediaType_`/`_mime_`, `_flags_`/`_flag_`, `_param_`/`_p_`,
//! `_filter_`) plus the URI-query merge that normalizes a single resource
//! (spec.md §4.3).

use crate::error::{Error, Result, ResourceChain};
use crate::flags::LoadFlags;
use crate::kv::KeyValue;
use crate::resource::{FilterSpec, Parameters, Reference, Resource};
use indexmap::IndexMap;
use url::form_urlencoded;

/// A recognized in-body meta-key, already split into its kind and the
/// `<name>` it refers to.
enum MetaKey {
    Load(String),
    MediaType(String),
    Flags(String),
    Param(String, String),
    Filter(String, String),
}

impl MetaKey {
    fn name(&self) -> &str {
        match self {
            MetaKey::Load(n)
            | MetaKey::MediaType(n)
            | MetaKey::Flags(n)
            | MetaKey::Param(n, _)
            | MetaKey::Filter(n, _) => n,
        }
    }
}

fn is_valid_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Split `"<name>_<rest>"` at the first underscore after a non-empty
/// alphanumeric name.
fn split_name_and_rest(s: &str) -> Option<(String, String)> {
    let idx = s.find('_')?;
    let (name, rest) = (&s[..idx], &s[idx + 1..]);
    if !is_valid_name(name) || rest.is_empty() {
        return None;
    }
    Some((name.to_string(), rest.to_string()))
}

/// Classify a key as a meta-key, a malformed meta-key, or ordinary data.
fn classify(key: &str) -> Option<std::result::Result<MetaKey, String>> {
    let rest = key.strip_prefix('_')?;
    if let Some(name) = rest.strip_prefix("load_") {
        return Some(if is_valid_name(name) {
            Ok(MetaKey::Load(name.to_string()))
        } else {
            Err(format!("invalid resource name `{name}` in `_load_`"))
        });
    }
    for prefix in ["mediaType_", "mime_"] {
        if let Some(name) = rest.strip_prefix(prefix) {
            return Some(if is_valid_name(name) {
                Ok(MetaKey::MediaType(name.to_string()))
            } else {
                Err(format!("invalid resource name `{name}` in `_{prefix}`"))
            });
        }
    }
    for prefix in ["flags_", "flag_"] {
        if let Some(name) = rest.strip_prefix(prefix) {
            return Some(if is_valid_name(name) {
                Ok(MetaKey::Flags(name.to_string()))
            } else {
                Err(format!("invalid resource name `{name}` in `_{prefix}`"))
            });
        }
    }
    for prefix in ["param_", "p_"] {
        if let Some(tail) = rest.strip_prefix(prefix) {
            return Some(match split_name_and_rest(tail) {
                Some((name, k)) => Ok(MetaKey::Param(name, k)),
                None => Err(format!("malformed parameter key `{key}`")),
            });
        }
    }
    if let Some(tail) = rest.strip_prefix("filter_") {
        return Some(match split_name_and_rest(tail) {
            Some((name, filter_id)) => Ok(MetaKey::Filter(name, filter_id)),
            None => Err(format!("malformed filter key `{key}`")),
        });
    }
    None
}

#[derive(Default)]
struct Builder {
    load_value: Option<String>,
    media_type: Option<String>,
    flags_csv: Vec<String>,
    parameters: Parameters,
    filters: Vec<(String, String)>,
}

/// Group the DSL meta-keys in `entries` by `<name>`, building one
/// [`Resource`] per distinct `_load_<name>` anchor, and strip the
/// meta-keys from the returned stream (spec.md §4.3 "Extraction").
pub fn extract(entries: &[KeyValue], chain: impl Fn() -> ResourceChain) -> Result<(Vec<Resource>, Vec<KeyValue>)> {
    let mut builders: IndexMap<String, Builder> = IndexMap::new();
    let mut stripped = Vec::with_capacity(entries.len());

    for kv in entries {
        match classify(kv.key()) {
            None => {
                stripped.push(kv.clone());
                continue;
            }
            Some(Err(reason)) => {
                return Err(Error::ResourceKeyInvalid {
                    key: kv.key().to_string(),
                    reason,
                    chain: chain(),
                });
            }
            Some(Ok(meta)) => {
                let name = meta.name().to_string();
                let builder = builders.entry(name.clone()).or_default();
                match meta {
                    MetaKey::Load(_) => {
                        if builder.load_value.is_some() {
                            return Err(Error::ResourceKeyInvalid {
                                key: kv.key().to_string(),
                                reason: format!("duplicate `_load_{name}`"),
                                chain: chain(),
                            });
                        }
                        builder.load_value = Some(kv.expanded().to_string());
                    }
                    MetaKey::MediaType(_) => builder.media_type = Some(kv.expanded().to_string()),
                    MetaKey::Flags(_) => builder.flags_csv.push(kv.expanded().to_string()),
                    MetaKey::Param(_, k) => {
                        builder.parameters.insert(k, kv.expanded().to_string());
                    }
                    MetaKey::Filter(_, filter_id) => {
                        builder.filters.push((filter_id, kv.expanded().to_string()))
                    }
                }
            }
        }
    }

    let mut resources = Vec::with_capacity(builders.len());
    for (name, builder) in builders {
        let Some(uri) = builder.load_value else {
            return Err(Error::ResourceKeyInvalid {
                key: format!("_flags_{name}/_param_{name}_*/_filter_{name}_*"),
                reason: format!("meta-keys for `{name}` with no `_load_{name}` anchor"),
                chain: chain(),
            });
        };
        let mut resource = Resource::new(uri, name);
        resource.reference = Some(Reference {
            key: format!("_load_{}", resource.name),
            uri: chain().0.first().map(|link| link.uri.clone()).unwrap_or_default(),
        });
        if !builder.flags_csv.is_empty() {
            resource.flags = LoadFlags::parse_csv(&builder.flags_csv.join(","), &chain())?;
        }
        resource.media_type = builder.media_type;
        resource.parameters = builder.parameters;
        resource.filters = builder
            .filters
            .into_iter()
            .map(|(id, expression)| FilterSpec {
                label: resource.name.clone(),
                id,
                expression,
            })
            .collect();
        normalize(&mut resource, &chain())?;
        resources.push(resource);
    }

    Ok((resources, stripped))
}

enum QueryKey {
    MediaType,
    Flags,
    Param(String),
    Filter(String),
}

fn classify_query_key(key: &str) -> Option<QueryKey> {
    let rest = key.strip_prefix('_')?;
    match rest {
        "mediaType" | "mime" => return Some(QueryKey::MediaType),
        "flags" | "flag" => return Some(QueryKey::Flags),
        _ => {}
    }
    for prefix in ["param_", "p_"] {
        if let Some(k) = rest.strip_prefix(prefix) {
            if !k.is_empty() {
                return Some(QueryKey::Param(k.to_string()));
            }
        }
    }
    if let Some(id) = rest.strip_prefix("filter_") {
        if !id.is_empty() {
            return Some(QueryKey::Filter(id.to_string()));
        }
    }
    None
}

fn split_uri_query(uri: &str) -> (String, Option<String>) {
    match uri.split_once('?') {
        Some((base, query)) if !query.is_empty() => (base.to_string(), Some(query.to_string())),
        _ => (uri.to_string(), None),
    }
}

fn rebuild_uri(base: &str, leftover: &[(String, String)]) -> String {
    if leftover.is_empty() {
        return base.to_string();
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in leftover {
        serializer.append_pair(k, v);
    }
    format!("{base}?{}", serializer.finish())
}

/// Whether `key` is one of the reserved DSL meta-key shapes (used to
/// build the filter-bypass predicate for `NO_FILTER_RESOURCE_KEYS`, and
/// to strip meta-keys after filtering).
pub fn is_meta_key(key: &str) -> bool {
    matches!(classify(key), Some(Ok(_)))
}

/// Remove every recognized meta-key from `entries`, leaving only
/// application data (spec.md §4.3 "After extraction the meta-keys
/// themselves are stripped from the stream").
pub fn strip_meta_keys(entries: &[KeyValue]) -> Vec<KeyValue> {
    entries.iter().filter(|kv| !is_meta_key(kv.key())).cloned().collect()
}

/// Normalize a single resource: fold its URI's query-string DSL
/// parameters into its fields (spec.md §4.3 steps 1-3), then mark it
/// normalized. Idempotent — a resource already marked normalized is left
/// untouched.
pub fn normalize(resource: &mut Resource, chain: &ResourceChain) -> Result<()> {
    if resource.normalized {
        return Ok(());
    }
    let (base, query) = split_uri_query(&resource.uri);
    if let Some(query) = query {
        let mut uri_flags = LoadFlags::new();
        let mut uri_params: Parameters = Parameters::new();
        let mut uri_filters: Vec<FilterSpec> = Vec::new();
        let mut media_type: Option<String> = None;
        let mut leftover: Vec<(String, String)> = Vec::new();

        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            let (k, v) = (k.into_owned(), v.into_owned());
            match classify_query_key(&k) {
                Some(QueryKey::MediaType) => media_type = Some(v),
                Some(QueryKey::Flags) => {
                    uri_flags = LoadFlags::parse_csv(&v, chain)?;
                }
                Some(QueryKey::Param(param_key)) => {
                    uri_params.insert(param_key, v);
                }
                Some(QueryKey::Filter(filter_id)) => uri_filters.push(FilterSpec {
                    id: filter_id,
                    expression: v,
                    label: resource.name.clone(),
                }),
                None => leftover.push((k, v)),
            }
        }

        // Step 2: URI-derived flags union with existing; parameters from
        // the URI override same-named existing ones; filters append after
        // any already set programmatically/from the body.
        resource.flags.union(&uri_flags);
        for (k, v) in uri_params {
            resource.parameters.insert(k, v);
        }
        resource.filters.extend(uri_filters);
        if media_type.is_some() {
            resource.media_type = media_type;
        }
        resource.uri = rebuild_uri(&base, &leftover);
    }
    resource.normalized = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ResourceId;
    use crate::error::ChainLink;
    use crate::flags::{KvFlags, LoadFlag};
    use crate::kv::{Meta, Source};

    fn kv(key: &str, value: &str) -> KeyValue {
        KeyValue::new(
            key,
            value,
            Meta {
                original_key: key.into(),
                source: Source {
                    resource: ResourceId::root(),
                    reference: None,
                    index: 1,
                },
                flags: KvFlags::default(),
            },
        )
    }

    #[test]
    fn test_extract_groups_by_name() {
        let entries = vec![
            kv("_load_child", "mem:/child"),
            kv("_flags_child", "NO_ADD, NO_INTERPOLATE"),
            kv("_param_child_profile", "dev"),
            kv("_filter_child_grep", "^MY_"),
            kv("plain.key", "value"),
        ];
        let (resources, stripped) = extract(&entries, ResourceChain::default).unwrap();
        assert_eq!(resources.len(), 1);
        let r = &resources[0];
        assert_eq!(r.name, "child");
        assert_eq!(r.uri, "mem:/child");
        assert!(r.flags.contains(LoadFlag::NoAdd));
        assert!(r.flags.contains(LoadFlag::NoInterpolate));
        assert_eq!(r.parameters.get("profile").map(String::as_str), Some("dev"));
        assert_eq!(r.filters.len(), 1);
        assert_eq!(r.filters[0].id, "grep");
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped[0].key(), "plain.key");
    }

    #[test]
    fn test_extract_sets_reference() {
        let entries = vec![kv("_load_child", "mem:/child")];
        let chain = || ResourceChain(vec![ChainLink { uri: "mem:/root".into(), name: None }]);
        let (resources, _) = extract(&entries, chain).unwrap();
        let reference = resources[0].reference.as_ref().unwrap();
        assert_eq!(reference.key, "_load_child");
        assert_eq!(reference.uri, "mem:/root");
    }

    #[test]
    fn test_extract_alias_prefixes() {
        let entries = vec![
            kv("_load_a", "mem:/a"),
            kv("_mime_a", "application/x-www-form-urlencoded"),
            kv("_p_a_k", "v"),
        ];
        let (resources, _) = extract(&entries, ResourceChain::default).unwrap();
        assert_eq!(resources[0].media_type.as_deref(), Some("application/x-www-form-urlencoded"));
        assert_eq!(resources[0].parameters.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_extract_missing_anchor_errors() {
        let entries = vec![kv("_flags_orphan", "SENSITIVE")];
        let err = extract(&entries, ResourceChain::default).unwrap_err();
        assert!(matches!(err, Error::ResourceKeyInvalid { .. }));
    }

    #[test]
    fn test_extract_duplicate_load_errors() {
        let entries = vec![kv("_load_a", "mem:/a"), kv("_load_a", "mem:/b")];
        let err = extract(&entries, ResourceChain::default).unwrap_err();
        assert!(matches!(err, Error::ResourceKeyInvalid { .. }));
    }

    #[test]
    fn test_normalize_merges_query_and_strips_it() {
        let mut resource = Resource::new(
            "env:///?_filter_grep_key=%5EMY_APP_&_filter_sed_key=s%2F%5EMY_APP_%2Fmyapp.%2F",
            "env",
        );
        normalize(&mut resource, &ResourceChain::default()).unwrap();
        assert_eq!(resource.uri, "env:///");
        assert_eq!(resource.filters.len(), 2);
        assert_eq!(resource.filters[0].id, "grep_key");
        assert_eq!(resource.filters[1].id, "sed_key");
    }

    #[test]
    fn test_normalize_flags_union_and_params_override() {
        let mut resource = Resource::new("mem:/app?_flags=NO_ADD&_param_profile=prod", "app");
        resource.flags.insert(LoadFlag::Sensitive);
        resource.parameters.insert("profile".to_string(), "dev".to_string());
        normalize(&mut resource, &ResourceChain::default()).unwrap();
        assert!(resource.flags.contains(LoadFlag::Sensitive));
        assert!(resource.flags.contains(LoadFlag::NoAdd));
        assert_eq!(resource.parameters.get("profile").map(String::as_str), Some("prod"));
        assert_eq!(resource.uri, "mem:/app");
    }

    #[test]
    fn test_normalize_leftover_query_preserved() {
        let mut resource = Resource::new("file:///x?_flags=NO_ADD&keep=1", "x");
        normalize(&mut resource, &ResourceChain::default()).unwrap();
        assert_eq!(resource.uri, "file:///x?keep=1");
    }

    #[test]
    fn test_normalize_idempotent() {
        let mut resource = Resource::new("mem:/a?_flags=NO_ADD", "a");
        normalize(&mut resource, &ResourceChain::default()).unwrap();
        let after_first = resource.clone();
        normalize(&mut resource, &ResourceChain::default()).unwrap();
        assert_eq!(resource, after_first);
    }
}
