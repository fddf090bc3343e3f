//! C4 — bash-style `${…}` interpolation.
//!
//! Grammar: `$$` is a literal `$`; `${name}` substitutes; `${name:-default}`
//! substitutes with a default (itself recursively expanded); names and
//! defaults may nest further `${…}`; everything else copies verbatim.

use crate::error::{Error, ResourceChain};
use crate::kv::KeyValue;
use crate::variables::VariablesChain;
use indexmap::IndexMap;

/// Default per spec.md §4.4: exceeding this nesting depth of `${…}` is an
/// `InterpolationLimit` error.
pub const MAX_DEPTH: u32 = 20;

#[derive(Debug)]
enum InterpolateError {
    Missing(String),
    Limit(String),
}

/// Expand `${…}` references in `text`, resolving names through `resolve`.
/// A reference with no binding and no default is a hard
/// [`Error::MissingVariable`].
pub fn expand(text: &str, resolve: &mut dyn FnMut(&str) -> Option<String>) -> Result<String, Error> {
    expand_mode(text, resolve, true)
}

/// Like [`expand`], but a reference with no binding and no default is
/// left in the output verbatim (`${name}`) instead of erroring. Used for
/// the scheduler's in-progress passes, where a name not yet resolvable
/// may become resolvable once a later resource loads (spec.md §8
/// Scenario A: a parent's reference to a child-defined name).
pub fn expand_lenient(text: &str, resolve: &mut dyn FnMut(&str) -> Option<String>) -> Result<String, Error> {
    expand_mode(text, resolve, false)
}

fn expand_mode(text: &str, resolve: &mut dyn FnMut(&str) -> Option<String>, strict: bool) -> Result<String, Error> {
    expand_checked(text, resolve, strict).map_err(|e| match e {
        InterpolateError::Missing(name) => Error::MissingVariable {
            name,
            chain: ResourceChain::default(),
        },
        InterpolateError::Limit(name) => Error::InterpolationLimit {
            name,
            limit: MAX_DEPTH,
        },
    })
}

fn expand_checked(
    text: &str,
    resolve: &mut dyn FnMut(&str) -> Option<String>,
    strict: bool,
) -> Result<String, InterpolateError> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    scan_text(&chars, &mut i, resolve, 0, strict)
}

/// Scan plain text (top-level or inside a default) until the chars run
/// out, substituting `${…}` as encountered. `$$` collapses to a literal
/// `$`; a lone `$` not followed by `{` or `$` copies verbatim.
fn scan_text(
    chars: &[char],
    i: &mut usize,
    resolve: &mut dyn FnMut(&str) -> Option<String>,
    depth: u32,
    strict: bool,
) -> Result<String, InterpolateError> {
    let mut out = String::new();
    while *i < chars.len() {
        match chars[*i] {
            '$' if chars.get(*i + 1) == Some(&'$') => {
                out.push('$');
                *i += 2;
            }
            '$' if chars.get(*i + 1) == Some(&'{') => {
                let start = *i;
                *i += 2;
                out.push_str(&substitute(chars, i, resolve, depth, strict, start)?);
            }
            c => {
                out.push(c);
                *i += 1;
            }
        }
    }
    Ok(out)
}

/// Read a reference body right after `${` has been consumed: a name,
/// optionally followed by `:-default`, terminated by `}`. Resolves the
/// reference and returns its substituted value. `start` is the index of
/// the opening `$`, used to recover the original text verbatim when a
/// missing reference is tolerated rather than an error.
fn substitute(
    chars: &[char],
    i: &mut usize,
    resolve: &mut dyn FnMut(&str) -> Option<String>,
    depth: u32,
    strict: bool,
    start: usize,
) -> Result<String, InterpolateError> {
    if depth >= MAX_DEPTH {
        return Err(InterpolateError::Limit(String::new()));
    }
    let mut name = String::new();
    loop {
        if *i >= chars.len() {
            // Unterminated reference; treat what we have as the name with
            // no default, mirroring a tolerant bash-style scan.
            break;
        }
        match chars[*i] {
            '$' if chars.get(*i + 1) == Some(&'{') => {
                let nested_start = *i;
                *i += 2;
                name.push_str(&substitute(chars, i, resolve, depth + 1, strict, nested_start)?);
            }
            '$' if chars.get(*i + 1) == Some(&'$') => {
                name.push('$');
                *i += 2;
            }
            ':' if chars.get(*i + 1) == Some(&'-') => {
                *i += 2;
                let default = scan_default(chars, i, resolve, depth + 1, strict)?;
                return resolve_or_default(resolve, &name, Some(default), strict, chars, start, *i);
            }
            '}' => {
                *i += 1;
                return resolve_or_default(resolve, &name, None, strict, chars, start, *i);
            }
            c => {
                name.push(c);
                *i += 1;
            }
        }
    }
    resolve_or_default(resolve, &name, None, strict, chars, start, *i)
}

/// Read a default value right after `:-` has been consumed, up to the
/// closing `}`. Nested references inside the default are substituted
/// eagerly, so the default itself is "recursively expanded".
fn scan_default(
    chars: &[char],
    i: &mut usize,
    resolve: &mut dyn FnMut(&str) -> Option<String>,
    depth: u32,
    strict: bool,
) -> Result<String, InterpolateError> {
    let mut out = String::new();
    loop {
        if *i >= chars.len() {
            return Ok(out);
        }
        match chars[*i] {
            '$' if chars.get(*i + 1) == Some(&'{') => {
                let start = *i;
                *i += 2;
                out.push_str(&substitute(chars, i, resolve, depth, strict, start)?);
            }
            '$' if chars.get(*i + 1) == Some(&'$') => {
                out.push('$');
                *i += 2;
            }
            '}' => {
                *i += 1;
                return Ok(out);
            }
            c => {
                out.push(c);
                *i += 1;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_or_default(
    resolve: &mut dyn FnMut(&str) -> Option<String>,
    name: &str,
    default: Option<String>,
    strict: bool,
    chars: &[char],
    start: usize,
    end: usize,
) -> Result<String, InterpolateError> {
    match resolve(name) {
        Some(value) => Ok(value),
        None => match default {
            Some(default) => Ok(default),
            None if strict => Err(InterpolateError::Missing(name.to_string())),
            None => Ok(chars[start..end].iter().collect()),
        },
    }
}

/// Expand an entire resource batch, applying the layered resolution order
/// of spec.md §4.4: already-resolved entries in this batch, then the raw
/// view of the whole batch (so forward references still see something),
/// then the caller-supplied chain.
///
/// `local` selects whether this is a same-resource interpolation pass
/// (sensitive entries are eligible) or a global re-interpolation pass
/// (sensitive entries are skipped and keep their current expanded value).
///
/// `strict` selects whether a reference with no binding and no default is
/// a hard [`Error::MissingVariable`] or is left verbatim for a later pass
/// to pick up. The scheduler's per-iteration passes (spec.md §4.8 steps 3
/// and 8) run lenient, since a name a resource references may only become
/// known once a not-yet-loaded sibling or child loads (spec.md §8 Scenario
/// A); only the final terminal pass after the stack empties is strict.
pub fn expand_batch(
    entries: &[KeyValue],
    vars: &VariablesChain,
    local: bool,
    strict: bool,
    chain: impl Fn() -> ResourceChain,
) -> Result<Vec<KeyValue>, Error> {
    let raw_all: IndexMap<String, String> = entries
        .iter()
        .map(|kv| (kv.key().to_string(), kv.raw().to_string()))
        .collect();
    let mut resolved: IndexMap<String, String> = IndexMap::new();
    let mut out = Vec::with_capacity(entries.len());

    for kv in entries {
        let new_kv = if kv.is_no_interpolation() {
            kv.with_expanded(kv.raw().to_string())
        } else if kv.is_sensitive() && !local {
            kv.clone()
        } else {
            let mut resolve = |name: &str| -> Option<String> {
                resolved
                    .get(name)
                    .cloned()
                    .or_else(|| raw_all.get(name).cloned())
                    .or_else(|| vars.get(name))
            };
            let expand_fn = if strict { expand } else { expand_lenient };
            let expanded = expand_fn(kv.raw(), &mut resolve).map_err(|err| match err {
                Error::MissingVariable { name, .. } => Error::MissingVariable {
                    name,
                    chain: chain(),
                },
                Error::InterpolationLimit { limit, .. } => Error::InterpolationLimit {
                    name: kv.key().to_string(),
                    limit,
                },
                other => other,
            })?;
            kv.with_expanded(expanded)
        };
        resolved.insert(new_kv.key().to_string(), new_kv.expanded().to_string());
        out.push(new_kv);
    }
    Ok(out)
}
