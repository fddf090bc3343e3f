//! C5 — the variables chain: an ordered fallback `String -> Option<String>`
//! lookup composed from maps, suppliers, and (at the scheduler level) the
//! growing accumulated result. Variables are consulted only during
//! interpolation; unlike the accumulator they never appear in the final
//! output (spec.md GLOSSARY).

use indexmap::IndexMap;
use std::sync::Arc;

/// One link in a [`VariablesChain`]: anything that can answer "what's the
/// value of this name, if any?"
pub trait VariableSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

impl VariableSource for IndexMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        IndexMap::get(self, name).cloned()
    }
}

impl<F> VariableSource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// An ordered fallback lookup: the first source with a binding for a name
/// wins.
#[derive(Clone, Default)]
pub struct VariablesChain {
    sources: Vec<Arc<dyn VariableSource>>,
}

impl VariablesChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source to the end of the chain (lowest precedence so far).
    pub fn push(&mut self, source: Arc<dyn VariableSource>) -> &mut Self {
        self.sources.push(source);
        self
    }

    pub fn with_map(mut self, map: IndexMap<String, String>) -> Self {
        self.push(Arc::new(map));
        self
    }

    pub fn with_source(mut self, source: Arc<dyn VariableSource>) -> Self {
        self.push(source);
        self
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.sources.iter().find_map(|source| source.get(name))
    }
}

impl std::fmt::Debug for VariablesChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VariablesChain({} sources)", self.sources.len())
    }
}
