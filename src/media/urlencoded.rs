//! The built-in URL-encoded media: `key=value&key=value` with
//! percent-decoding on both sides; blank keys are skipped; duplicate
//! keys are retained (spec.md §4.2, §6).

use super::{Formatter, MediaEntry, Parser};
use crate::error::Result;
use crate::kv::KeyValue;
use std::sync::Arc;
use url::form_urlencoded;

pub struct UrlEncodedMedia;

impl UrlEncodedMedia {
    pub const MEDIA_TYPE: &'static str = "application/x-www-form-urlencoded";

    pub fn entry() -> MediaEntry {
        MediaEntry {
            media_type: Self::MEDIA_TYPE,
            extensions: &["urlencoded"],
            parser: Arc::new(UrlEncodedParser),
            formatter: Arc::new(UrlEncodedFormatter),
        }
    }
}

pub struct UrlEncodedParser;

impl Parser for UrlEncodedParser {
    fn parse(&self, input: &str, emit: &mut dyn FnMut(String, String)) -> Result<()> {
        for (key, value) in form_urlencoded::parse(input.trim().as_bytes()) {
            if key.is_empty() {
                continue;
            }
            emit(key.into_owned(), value.into_owned());
        }
        Ok(())
    }
}

pub struct UrlEncodedFormatter;

impl Formatter for UrlEncodedFormatter {
    fn format(&self, entries: &[KeyValue]) -> Result<String> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for kv in entries {
            serializer.append_pair(kv.key(), kv.display_value(false));
        }
        Ok(serializer.finish())
    }
}
