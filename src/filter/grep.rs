use super::{Filter, Target};
use crate::error::{Error, Result, ResourceChain};
use crate::kv::KeyValue;
use regex::Regex;

/// Retains entries whose target matches a regular expression anywhere in
/// the text (spec.md §4.5).
pub struct GrepFilter;

impl Filter for GrepFilter {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn apply(
        &self,
        target: Target,
        expression: &str,
        entries: Vec<KeyValue>,
        resource_key_ignore: Option<&dyn Fn(&str) -> bool>,
        chain: &ResourceChain,
    ) -> Result<Vec<KeyValue>> {
        let re = Regex::new(expression).map_err(|err| Error::BadFilterExpression {
            filter_id: "grep".to_string(),
            reason: err.to_string(),
            chain: chain.clone(),
        })?;
        Ok(entries
            .into_iter()
            .filter(|kv| {
                if resource_key_ignore.is_some_and(|ignore| ignore(kv.key())) {
                    return true;
                }
                let text = match target {
                    Target::Key => kv.key(),
                    Target::Value => kv.expanded(),
                };
                re.is_match(text)
            })
            .collect())
    }
}
