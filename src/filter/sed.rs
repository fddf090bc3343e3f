use super::{Filter, Target};
use crate::error::{Error, Result, ResourceChain};
use crate::kv::KeyValue;
use regex::Regex;

/// A tiny `sed` dialect: `s/pattern/replacement/flags` and `d`, each
/// optionally guarded by a leading `/addr/` regex (spec.md §4.5).
pub struct SedFilter;

enum Command {
    Substitute { pattern: Regex, replacement: String, global: bool },
    Delete,
}

impl Filter for SedFilter {
    fn name(&self) -> &'static str {
        "sed"
    }

    fn apply(
        &self,
        target: Target,
        expression: &str,
        entries: Vec<KeyValue>,
        resource_key_ignore: Option<&dyn Fn(&str) -> bool>,
        chain: &ResourceChain,
    ) -> Result<Vec<KeyValue>> {
        let (addr, command_text) = split_address(expression);
        let address = addr
            .map(|a| {
                Regex::new(a).map_err(|err| Error::BadFilterExpression {
                    filter_id: "sed".to_string(),
                    reason: format!("invalid address regex: {err}"),
                    chain: chain.clone(),
                })
            })
            .transpose()?;
        let command = parse_command(command_text, chain)?;

        let mut out = Vec::with_capacity(entries.len());
        for kv in entries {
            if resource_key_ignore.is_some_and(|ignore| ignore(kv.key())) {
                out.push(kv);
                continue;
            }
            let text = match target {
                Target::Key => kv.key(),
                Target::Value => kv.expanded(),
            };
            let matches = address.as_ref().map_or(true, |re| re.is_match(text));
            if !matches {
                out.push(kv);
                continue;
            }
            match &command {
                Command::Delete => continue,
                Command::Substitute { pattern, replacement, global } => {
                    let new_text = if *global {
                        pattern.replace_all(text, replacement.as_str()).into_owned()
                    } else {
                        pattern.replace(text, replacement.as_str()).into_owned()
                    };
                    let new_kv = match target {
                        Target::Key => kv.with_key(new_text),
                        Target::Value => kv.with_value(new_text),
                    };
                    out.push(new_kv);
                }
            }
        }
        Ok(out)
    }
}

/// Split a leading `/addr/` guard from the command, if present.
fn split_address(expression: &str) -> (Option<&str>, &str) {
    if let Some(rest) = expression.strip_prefix('/') {
        let parts = split_unescaped(rest, '/');
        if parts.len() >= 2 {
            let addr_len = parts[0].len();
            // +2 for the two '/' delimiters consumed.
            let command_start = 1 + addr_len + 1;
            return (Some(&expression[1..1 + addr_len]), expression[command_start..].trim_start());
        }
    }
    (None, expression.trim_start())
}

fn parse_command(command: &str, chain: &ResourceChain) -> Result<Command> {
    if command == "d" {
        return Ok(Command::Delete);
    }
    if let Some(rest) = command.strip_prefix('s') {
        let mut chars = rest.chars();
        let delimiter = chars.next().ok_or_else(|| Error::BadFilterExpression {
            filter_id: "sed".to_string(),
            reason: "`s` requires a delimiter".to_string(),
            chain: chain.clone(),
        })?;
        let body: String = chars.collect();
        let parts = split_unescaped(&body, delimiter);
        if parts.len() != 3 {
            return Err(Error::BadFilterExpression {
                filter_id: "sed".to_string(),
                reason: format!("expected `s{delimiter}pattern{delimiter}replacement{delimiter}flags`"),
                chain: chain.clone(),
            });
        }
        let global = parts[2].contains('g');
        let pattern = Regex::new(&parts[0]).map_err(|err| Error::BadFilterExpression {
            filter_id: "sed".to_string(),
            reason: err.to_string(),
            chain: chain.clone(),
        })?;
        return Ok(Command::Substitute {
            pattern,
            replacement: parts[1].clone(),
            global,
        });
    }
    Err(Error::BadFilterExpression {
        filter_id: "sed".to_string(),
        reason: format!("unsupported sed command `{command}`"),
        chain: chain.clone(),
    })
}

/// Split `s` on an unescaped `delim`, treating `\delim` as a literal
/// delimiter character inside a segment.
fn split_unescaped(s: &str, delim: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&delim) {
            current.push(delim);
            chars.next();
        } else if c == delim {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}
