//! The built-in flat properties-style media: key/value lines with
//! backslash-escape continuation, `=`/`:`/whitespace separators, `#`/`!`
//! comments, and Unicode escapes in both keys and values (spec.md §4.2,
//! §6).

use super::{Formatter, MediaEntry, Parser};
use crate::error::{Error, Result};
use crate::kv::KeyValue;
use std::sync::Arc;

pub struct PropertiesMedia;

impl PropertiesMedia {
    pub const MEDIA_TYPE: &'static str = "text/x-java-properties";

    pub fn entry() -> MediaEntry {
        MediaEntry {
            media_type: Self::MEDIA_TYPE,
            extensions: &["properties", "props"],
            parser: Arc::new(PropertiesParser),
            formatter: Arc::new(PropertiesFormatter),
        }
    }
}

pub struct PropertiesParser;

impl Parser for PropertiesParser {
    fn parse(&self, input: &str, emit: &mut dyn FnMut(String, String)) -> Result<()> {
        let mut lines = input.lines().peekable();
        while let Some(first) = lines.next() {
            let mut logical = first.to_string();
            // Join continuation lines: a trailing backslash, counted
            // after un-escaping, that is odd in count means "continue".
            while ends_with_odd_backslashes(&logical) {
                logical.pop(); // drop the trailing backslash
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let trimmed = logical.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            let (key, value) = split_key_value(trimmed);
            let key = unescape(&key).map_err(|reason| Error::MediaError {
                uri: "<properties>".to_string(),
                reason,
            })?;
            let value = unescape(&value).map_err(|reason| Error::MediaError {
                uri: "<properties>".to_string(),
                reason,
            })?;
            if !key.is_empty() {
                emit(key, value);
            }
        }
        Ok(())
    }
}

fn ends_with_odd_backslashes(line: &str) -> bool {
    let count = line.chars().rev().take_while(|&c| c == '\\').count();
    count % 2 == 1
}

/// Split a logical line (continuation already joined, leading whitespace
/// already trimmed) into key and value at the first unescaped `=`, `:`,
/// or whitespace.
fn split_key_value(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut key = String::new();
    let mut escaped = false;
    while i < chars.len() {
        let c = chars[i];
        if escaped {
            key.push('\\');
            key.push(c);
            escaped = false;
            i += 1;
            continue;
        }
        if c == '\\' {
            escaped = true;
            i += 1;
            continue;
        }
        if c == '=' || c == ':' || c.is_whitespace() {
            break;
        }
        key.push(c);
        i += 1;
    }
    // Skip whitespace, then at most one separator (= or :), then whitespace
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if i < chars.len() && (chars[i] == '=' || chars[i] == ':') {
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
    }
    let value: String = chars[i..].iter().collect();
    (key, value)
}

fn unescape(input: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                if hex.len() != 4 {
                    return Err(format!("truncated unicode escape `\\u{hex}`"));
                }
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid unicode escape `\\u{hex}`"))?;
                let ch = char::from_u32(code)
                    .ok_or_else(|| format!("invalid unicode escape `\\u{hex}`"))?;
                out.push(ch);
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Ok(out)
}

pub struct PropertiesFormatter;

impl Formatter for PropertiesFormatter {
    fn format(&self, entries: &[KeyValue]) -> Result<String> {
        let mut out = String::new();
        for kv in entries {
            out.push_str(&escape_key(kv.key()));
            out.push('=');
            out.push_str(&escape_value(kv.display_value(false)));
            out.push('\n');
        }
        Ok(out)
    }
}

fn escape_key(key: &str) -> String {
    escape_common(key, true)
}

fn escape_value(value: &str) -> String {
    escape_common(value, false)
}

fn escape_common(input: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, c) in input.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '=' => out.push_str("\\="),
            ':' => out.push_str("\\:"),
            '#' if i == 0 => out.push_str("\\#"),
            '!' if i == 0 => out.push_str("\\!"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ResourceId;
    use crate::flags::KvFlags;
    use crate::kv::{Meta, Source};

    fn parse(input: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        PropertiesParser.parse(input, &mut |k, v| out.push((k, v))).unwrap();
        out
    }

    #[test]
    fn test_basic_pairs() {
        assert_eq!(
            parse("a=1\nb:2\nc 3\n"),
            vec![
                ("a".into(), "1".into()),
                ("b".into(), "2".into()),
                ("c".into(), "3".into()),
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        assert_eq!(
            parse("# comment\n\n! also comment\nkey=value\n"),
            vec![("key".into(), "value".into())]
        );
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(
            parse("long=part one \\\n  part two\n"),
            vec![("long".into(), "part one part two".into())]
        );
    }

    #[test]
    fn test_unicode_escape() {
        assert_eq!(parse("smiley=\\u263A\n"), vec![("smiley".into(), "\u{263A}".into())]);
    }

    #[test]
    fn test_escaped_separator_in_key() {
        // A key containing a literal colon must be backslash-escaped,
        // otherwise it is treated as the separator.
        assert_eq!(
            parse("a\\:b=value\n"),
            vec![("a:b".into(), "value".into())]
        );
    }

    #[test]
    fn test_format_round_trip() {
        let kv = KeyValue::new(
            "a",
            "line1\nline2",
            Meta {
                original_key: "a".into(),
                source: Source {
                    resource: ResourceId::root(),
                    reference: None,
                    index: 1,
                },
                flags: KvFlags::default(),
            },
        );
        let formatted = PropertiesFormatter.format(&[kv]).unwrap();
        assert_eq!(formatted, "a=line1\\nline2\n");
    }
}
