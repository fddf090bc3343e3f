//! C10 — the scheduler: a LIFO stack that walks the resource tree
//! depth-first, dispatching each resource through the loader, filtering
//! and interpolating its output, and folding it into a growing
//! accumulator (spec.md §4.8).

use crate::arena::{ResourceArena, ResourceId};
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::flags::{KvFlags, LoadFlag};
use crate::interpolate;
use crate::kv::{KeyValue, Meta, Source};
use crate::loader::{LoadContext, LoaderRegistry, ProviderRegistry};
use crate::media::MediaRegistry;
use crate::resource::{Declaration, InlineNamedKeyValues, Resource, ResourceNode};
use crate::resource_key;
use crate::stream::KeyValues;
use crate::variables::VariablesChain;
use indexmap::IndexMap;
use std::collections::HashSet;

struct Node {
    declaration: Declaration,
    parent: Option<ResourceId>,
}

/// Drive a complete load: pop a node, dispatch it, fold its output into
/// the accumulator, push its children, repeat until the stack is empty.
///
/// `initial_vars` seeds the variables store (e.g. `user.home`); it sits
/// underneath the growing accumulator, which takes precedence once a key
/// collides (spec.md §4.4, §4.8 "the accumulator feeds back into the
/// variables chain").
pub fn run(
    loaders: &LoaderRegistry,
    filters: &crate::filter::FilterRegistry,
    media: &MediaRegistry,
    environment: &dyn Environment,
    providers: &ProviderRegistry,
    mem_documents: &IndexMap<String, String>,
    roots: Vec<Declaration>,
    initial_vars: IndexMap<String, String>,
) -> Result<KeyValues> {
    let mut arena = ResourceArena::new();
    let mut accumulator: Vec<KeyValue> = Vec::new();
    let mut keys_index: IndexMap<String, usize> = IndexMap::new();
    let mut variables_store = initial_vars;

    let mut stack: Vec<Node> = Vec::new();
    push_siblings(&mut stack, roots, None, || crate::error::ResourceChain::default())?;

    while let Some(Node { declaration, parent }) = stack.pop() {
        let load_ctx = LoadContext {
            environment,
            media,
            providers,
            mem_documents,
        };

        let (resource_id, resource, outcome) = match declaration {
            Declaration::Inline(inline) => {
                let InlineNamedKeyValues { name, entries } = inline;
                let mut pseudo = Resource::new(format!("inline:/{name}"), name);
                pseudo.normalized = true;
                let declaring_key = pseudo.reference.as_ref().map(|r| r.key.clone());
                let id = arena.insert(ResourceNode {
                    resource: pseudo.clone(),
                    parent,
                    declaring_key,
                });
                log::debug!("loading inline source '{}'", pseudo.name);
                log::info!("loaded {pseudo}");
                (id, pseudo, crate::loader::LoadOutcome::pairs(entries))
            }
            Declaration::Resource(resource) => {
                let declaring_key = resource.reference.as_ref().map(|r| r.key.clone());
                let id = arena.insert(ResourceNode {
                    resource: resource.clone(),
                    parent,
                    declaring_key,
                });
                let chain = arena.chain(id);
                resource_key::normalize(&mut arena.get_mut(id).resource, &chain)?;
                let resource = arena.get(id).resource.clone();
                log::debug!("Loading {resource}");
                let outcome = match loaders.dispatch(&load_ctx, &resource) {
                    Ok(outcome) => outcome,
                    Err(err) if err.is_not_found() && resource.flags.contains(LoadFlag::NoRequire) => {
                        log::debug!("missing (tolerated by NO_REQUIRE): {resource} ({err})");
                        crate::loader::LoadOutcome::default()
                    }
                    Err(err) => return Err(err),
                };
                log::info!("loaded {resource}");
                (id, resource, outcome)
            }
        };

        let resource_chain = arena.chain(resource_id);
        let kv_flags = KvFlags::from_load_flags(&resource.flags);
        let kv_reference = resource.reference.clone();
        let mut entries = Vec::with_capacity(outcome.pairs.len());
        for (index, (key, value)) in outcome.pairs.into_iter().enumerate() {
            let meta = Meta {
                original_key: key.clone(),
                source: Source {
                    resource: resource_id,
                    reference: kv_reference.clone(),
                    index: index + 1,
                },
                flags: kv_flags,
            };
            entries.push(KeyValue::new(key, value, meta));
        }

        // Step 3: local interpolation — this resource's own keys plus the
        // outer variables chain, sensitive values included.
        let local_vars = VariablesChain::new().with_map(variables_store.clone());
        entries = interpolate::expand_batch(&entries, &local_vars, true, false, || resource_chain.clone())?;

        // Step 4: discover `_load_*` children, unless suppressed.
        let (body_children, _) = resource_key::extract(&entries, || resource_chain.clone())?;
        let mut children = if resource.flags.contains(LoadFlag::NoLoadChildren) {
            if !body_children.is_empty() || !outcome.children.is_empty() {
                log::warn!(
                    "{resource} declares children but NO_LOAD_CHILDREN is set; ignoring them"
                );
            }
            Vec::new()
        } else {
            let mut children = body_children;
            children.extend(outcome.children);
            children
        };

        // Open question (spec.md §9): whether a synthesized or declared
        // child inherits its parent's flags. Resolved here by generalizing
        // the existing PROPAGATE flag rather than special-casing any one
        // loader: a parent carrying PROPAGATE unions its flags onto every
        // child it produces, body-declared or loader-synthesized alike.
        if resource.flags.contains(LoadFlag::Propagate) {
            for child in &mut children {
                child.flags.union(&resource.flags);
            }
        }

        // Step 5: filter chain, bypassing meta-keys when requested so
        // they survive to step 6 untouched.
        let ignore: Option<Box<dyn Fn(&str) -> bool>> = if resource.flags.contains(LoadFlag::NoFilterResourceKeys) {
            Some(Box::new(resource_key::is_meta_key))
        } else {
            None
        };
        let filtered = filters.apply_chain(&resource.filters, entries, ignore.as_deref(), &resource_chain)?;

        // Step 6: strip the DSL meta-keys.
        let final_entries = resource_key::strip_meta_keys(&filtered);

        // Step 7: append to the accumulator, or route into the variables
        // store only, per NO_ADD/NO_REPLACE/NO_EMPTY.
        if resource.flags.contains(LoadFlag::NoAdd) {
            for kv in &final_entries {
                variables_store.insert(kv.key().to_string(), kv.expanded().to_string());
            }
        } else {
            let mut appended = 0usize;
            for kv in final_entries {
                if resource.flags.contains(LoadFlag::NoReplace) && keys_index.contains_key(kv.key()) {
                    continue;
                }
                keys_index.insert(kv.key().to_string(), accumulator.len());
                accumulator.push(kv);
                appended += 1;
            }
            if resource.flags.contains(LoadFlag::NoEmpty) && appended == 0 {
                return Err(Error::Empty {
                    uri: resource.uri.clone(),
                    chain: resource_chain.clone(),
                });
            }
        }

        // Step 8: re-interpolate the full accumulator globally (sensitive
        // entries untouched), then fold the new snapshot back into the
        // variables store so later siblings can reference it.
        let global_vars = VariablesChain::new().with_map(variables_store.clone());
        accumulator =
            interpolate::expand_batch(&accumulator, &global_vars, false, false, crate::error::ResourceChain::default)?;
        for kv in &accumulator {
            variables_store.insert(kv.key().to_string(), kv.expanded().to_string());
        }

        // Step 9: push children, first-declared on top so it pops first
        // (depth-first, left to right).
        push_siblings(&mut stack, to_declarations(children), Some(resource_id), || resource_chain.clone())?;
    }

    // Termination: the stack is empty. Globally expand the accumulator one
    // final time, strict this time — anything still unresolved at this
    // point has no further resource left to supply it.
    let final_vars = VariablesChain::new().with_map(variables_store.clone());
    accumulator = interpolate::expand_batch(&accumulator, &final_vars, false, true, crate::error::ResourceChain::default)?;

    Ok(KeyValues::from_vec(accumulator))
}

fn to_declarations(resources: Vec<Resource>) -> Vec<Declaration> {
    resources.into_iter().map(Declaration::Resource).collect()
}

/// Push a batch of sibling declarations onto the stack in reverse order
/// (so the first-declared one is processed first), after checking that
/// no two siblings share a name (spec.md §3: "uniqueness of name is
/// enforced only among siblings pushed together").
fn push_siblings(
    stack: &mut Vec<Node>,
    declarations: Vec<Declaration>,
    parent: Option<ResourceId>,
    chain: impl Fn() -> crate::error::ResourceChain,
) -> Result<()> {
    let mut seen = HashSet::new();
    for declaration in &declarations {
        if !seen.insert(declaration.name().to_string()) {
            return Err(Error::ResourceNameDuplicate {
                name: declaration.name().to_string(),
                chain: chain(),
            });
        }
    }
    for declaration in declarations.into_iter().rev() {
        stack.push(Node { declaration, parent });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRegistry;

    fn mem(documents: &[(&str, &str)]) -> IndexMap<String, String> {
        documents.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_single_mem_resource_loads_and_interpolates() {
        let loaders = LoaderRegistry::with_builtins();
        let filters = FilterRegistry::with_builtins();
        let media = MediaRegistry::with_builtins();
        let environment = crate::env::StdEnvironment::new();
        let providers = ProviderRegistry::new();
        let docs = mem(&[("app", "greeting=Hello ${name}\nname=World")]);

        let roots = vec![Declaration::Resource(Resource::new("mem:/app", "app"))];
        let result = run(&loaders, &filters, &media, &environment, &providers, &docs, roots, IndexMap::new()).unwrap();
        let map = result.to_map();
        assert_eq!(map.get("greeting").map(String::as_str), Some("Hello World"));
    }

    #[test]
    fn test_load_chains_child_via_body_meta_key() {
        let loaders = LoaderRegistry::with_builtins();
        let filters = FilterRegistry::with_builtins();
        let media = MediaRegistry::with_builtins();
        let environment = crate::env::StdEnvironment::new();
        let providers = ProviderRegistry::new();
        let docs = mem(&[
            ("root", "_load_child=mem:/child\nport.prefix=56"),
            ("child", "db.port=${port.prefix}72"),
        ]);

        let roots = vec![Declaration::Resource(Resource::new("mem:/root", "root"))];
        let result = run(&loaders, &filters, &media, &environment, &providers, &docs, roots, IndexMap::new()).unwrap();
        let map = result.to_map();
        assert_eq!(map.get("db.port").map(String::as_str), Some("5672"));
        assert!(!map.contains_key("_load_child"));
    }

    #[test]
    fn test_no_add_flows_into_variables_only() {
        let loaders = LoaderRegistry::with_builtins();
        let filters = FilterRegistry::with_builtins();
        let media = MediaRegistry::with_builtins();
        let environment = crate::env::StdEnvironment::new();
        let providers = ProviderRegistry::new();
        let docs = mem(&[
            ("vars", "prefix=east"),
            ("app", "region=${prefix}-1"),
        ]);

        let mut vars_resource = Resource::new("mem:/vars", "vars");
        vars_resource.flags.insert(LoadFlag::NoAdd);
        let roots = vec![
            Declaration::Resource(vars_resource),
            Declaration::Resource(Resource::new("mem:/app", "app")),
        ];
        let result = run(&loaders, &filters, &media, &environment, &providers, &docs, roots, IndexMap::new()).unwrap();
        let map = result.to_map();
        assert_eq!(map.get("region").map(String::as_str), Some("east-1"));
        assert!(!map.contains_key("prefix"));
    }

    #[test]
    fn test_no_require_tolerates_missing_resource() {
        let loaders = LoaderRegistry::with_builtins();
        let filters = FilterRegistry::with_builtins();
        let media = MediaRegistry::with_builtins();
        let environment = crate::env::StdEnvironment::new();
        let providers = ProviderRegistry::new();
        let docs = mem(&[]);

        let mut resource = Resource::new("mem:/missing", "missing");
        resource.flags.insert(LoadFlag::NoRequire);
        let roots = vec![Declaration::Resource(resource)];
        let result = run(&loaders, &filters, &media, &environment, &providers, &docs, roots, IndexMap::new()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_child_keyvalues_carry_declaring_reference() {
        let loaders = LoaderRegistry::with_builtins();
        let filters = FilterRegistry::with_builtins();
        let media = MediaRegistry::with_builtins();
        let environment = crate::env::StdEnvironment::new();
        let providers = ProviderRegistry::new();
        let docs = mem(&[
            ("root", "_load_child=mem:/child"),
            ("child", "k=v"),
        ]);

        let roots = vec![Declaration::Resource(Resource::new("mem:/root", "root"))];
        let result = run(&loaders, &filters, &media, &environment, &providers, &docs, roots, IndexMap::new()).unwrap();
        let kv = result.to_vec().into_iter().find(|kv| kv.key() == "k").unwrap();
        let reference = kv.meta().source.reference.as_ref().unwrap();
        assert_eq!(reference.key, "_load_child");
        assert_eq!(reference.uri, "mem:/root");
    }

    #[test]
    fn test_duplicate_sibling_names_error() {
        let loaders = LoaderRegistry::with_builtins();
        let filters = FilterRegistry::with_builtins();
        let media = MediaRegistry::with_builtins();
        let environment = crate::env::StdEnvironment::new();
        let providers = ProviderRegistry::new();
        let docs = mem(&[("a", "k=v")]);

        let roots = vec![
            Declaration::Resource(Resource::new("mem:/a", "dup")),
            Declaration::Resource(Resource::new("mem:/a", "dup")),
        ];
        let err = run(&loaders, &filters, &media, &environment, &providers, &docs, roots, IndexMap::new()).unwrap_err();
        assert!(matches!(err, Error::ResourceNameDuplicate { .. }));
    }
}
