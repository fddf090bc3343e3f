//! Resource arena: owns every [`Resource`] discovered during a load, so
//! that provenance can reference a resource by index rather than by an
//! owning pointer. This is what spec.md's design notes call for to avoid
//! a resource/key-value reference cycle (a resource's `reference` points
//! at the key/value that declared it; that key/value's `meta.source`
//! points back at the resource that produced it).

use crate::error::{ChainLink, ResourceChain};
use crate::resource::ResourceNode;
use std::fmt;

/// Index into a [`ResourceArena`]. Cheap to copy, stable for the lifetime
/// of one load.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ResourceId(usize);

impl ResourceId {
    /// Sentinel used by tests that construct a [`crate::kv::KeyValue`]
    /// without a real arena.
    pub fn root() -> Self {
        Self(0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns every resource node discovered while loading, keyed by
/// [`ResourceId`].
#[derive(Debug, Default)]
pub struct ResourceArena {
    nodes: Vec<ResourceNode>,
}

impl ResourceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: ResourceNode) -> ResourceId {
        let id = ResourceId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: ResourceId) -> &ResourceNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: ResourceId) -> &mut ResourceNode {
        &mut self.nodes[id.0]
    }

    /// Walk from `id` up through declaring parents, producing the chain
    /// used in fatal error reports (this resource first, root last).
    pub fn chain(&self, id: ResourceId) -> ResourceChain {
        let mut links = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.get(cur);
            links.push(ChainLink {
                uri: node.resource.uri.clone(),
                name: Some(node.resource.name.clone()),
            });
            current = node.parent;
        }
        ResourceChain(links)
    }
}
