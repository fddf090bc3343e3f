//! C3 — the media registry: parsers/formatters indexed by media-type
//! string and file extension, with the two built-in flat formats.
//!
//! External media (JSON5, XML, `.env`, …) plug into the same
//! [`Parser`]/[`Formatter`] traits; this crate ships only the two
//! built-ins spec.md §1 keeps in scope.

mod properties;
mod urlencoded;

pub use properties::PropertiesMedia;
pub use urlencoded::UrlEncodedMedia;

use crate::error::{Error, Result};
use crate::kv::KeyValue;
use std::sync::Arc;

/// Parses a document body into ordered key/value pairs.
pub trait Parser: Send + Sync {
    /// Parse `input`, calling `emit` once per pair in document order.
    fn parse(&self, input: &str, emit: &mut dyn FnMut(String, String)) -> Result<()>;
}

/// Formats an ordered list of [`KeyValue`]s back into a document.
pub trait Formatter: Send + Sync {
    fn format(&self, entries: &[KeyValue]) -> Result<String>;
}

/// One registered media kind: its canonical media-type string, the file
/// extensions that sniff to it, and its parser/formatter pair.
pub struct MediaEntry {
    pub media_type: &'static str,
    pub extensions: &'static [&'static str],
    pub parser: Arc<dyn Parser>,
    pub formatter: Arc<dyn Formatter>,
}

/// Finder registry, composed as an order-sorted list of entries (lower
/// `order` binds first), per spec.md §6 service-discovery semantics.
/// Built-ins register at order `-127`; user registrations default to `0`.
pub struct MediaRegistry {
    entries: Vec<(i32, MediaEntry)>,
}

impl MediaRegistry {
    pub const BUILTIN_ORDER: i32 = -127;
    pub const DEFAULT_ORDER: i32 = 0;

    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Registry pre-populated with the built-in flat-properties and
    /// URL-encoded media.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Self::BUILTIN_ORDER, PropertiesMedia::entry());
        registry.register(Self::BUILTIN_ORDER, UrlEncodedMedia::entry());
        registry
    }

    pub fn register(&mut self, order: i32, entry: MediaEntry) {
        self.entries.push((order, entry));
        self.entries.sort_by_key(|(order, _)| *order);
    }

    fn find_by_media_type(&self, media_type: &str) -> Option<&MediaEntry> {
        self.entries
            .iter()
            .map(|(_, entry)| entry)
            .find(|entry| entry.media_type.eq_ignore_ascii_case(media_type))
    }

    fn find_by_extension(&self, extension: &str) -> Option<&MediaEntry> {
        let extension = extension.trim_start_matches('.');
        self.entries.iter().map(|(_, entry)| entry).find(|entry| {
            entry
                .extensions
                .iter()
                .any(|ext| ext.eq_ignore_ascii_case(extension))
        })
    }

    /// Resolve a parser/formatter pair. Explicit `media_type` takes
    /// precedence; otherwise the URI's extension is sniffed; failing
    /// that, the flat-properties format is the default, mirroring the
    /// behavior of a bare `Properties`-style loader.
    pub fn resolve(&self, media_type: Option<&str>, uri: &str) -> Result<&MediaEntry> {
        if let Some(media_type) = media_type {
            return self.find_by_media_type(media_type).ok_or_else(|| Error::MediaError {
                uri: uri.to_string(),
                reason: format!("unknown media type `{media_type}`"),
            });
        }
        let extension = uri.rsplit_once('.').map(|(_, ext)| ext);
        if let Some(extension) = extension {
            if let Some(entry) = self.find_by_extension(extension) {
                return Ok(entry);
            }
        }
        self.find_by_media_type(PropertiesMedia::MEDIA_TYPE)
            .ok_or_else(|| Error::MediaError {
                uri: uri.to_string(),
                reason: "no default media registered".to_string(),
            })
    }
}

impl Default for MediaRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
