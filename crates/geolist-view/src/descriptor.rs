//! The shared navigation descriptor: a flat `key=value&key=value` fragment.
//!
//! Other surfaces read and write the same fragment, so parsing is lenient
//! and writing only escapes what would break the `&`/`=` framing.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use regex::Regex;

pub const MAP_KEY: &str = "map";
pub const ID_KEY: &str = "id";
pub const SEARCH_KEY: &str = "search";
pub const SUMMARIZE_KEY: &str = "summarize";
pub const DETAILS_KEY: &str = "details";

static COMMA_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s+").expect("valid regex"));

const KEY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const VALUE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'=');

fn decode(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(Cow::Borrowed(s)) => s.to_owned(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => percent_decode_str(raw).decode_utf8_lossy().into_owned(),
    }
}

/// Ordered key/value view state. Keys without a value are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewDescriptor {
    entries: Vec<(String, String)>,
}

impl ViewDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a fragment with or without its leading `#`. Keys and values
    /// are percent-decoded, spaces after commas are dropped, and pieces with
    /// an empty key or value are ignored. A repeated key keeps its last value.
    #[must_use]
    pub fn parse_fragment(fragment: &str) -> Self {
        let mut descriptor = Self::new();
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        for piece in fragment.split('&') {
            let (raw_key, raw_value) = piece.split_once('=').unwrap_or((piece, ""));
            let key = decode(raw_key);
            let value = COMMA_SPACE_RE.replace_all(&decode(raw_value), ",").into_owned();
            descriptor.set(key.trim(), value);
        }
        descriptor
    }

    /// Renders the fragment without the leading `#`.
    #[must_use]
    pub fn to_fragment(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, KEY_SET),
                    utf8_percent_encode(v, VALUE_SET)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key`, keeping its position if present. An empty value removes it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if key.is_empty() {
            return;
        }
        if value.is_empty() {
            self.remove(key);
            return;
        }
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key.to_owned(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn map(&self) -> Option<&str> {
        self.get(MAP_KEY)
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get(ID_KEY)
    }

    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.get(SEARCH_KEY)
    }

    #[must_use]
    pub fn summarize(&self) -> bool {
        self.get(SUMMARIZE_KEY) == Some("true")
    }

    /// Open sub-views, in the order listed.
    #[must_use]
    pub fn details(&self) -> Vec<String> {
        self.get(DETAILS_KEY)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_summarize(&mut self, on: bool) {
        self.set(SUMMARIZE_KEY, if on { "true" } else { "" });
    }

    pub fn set_details(&mut self, details: &[String]) {
        self.set(DETAILS_KEY, details.join(","));
    }
}

#[cfg(test)]
#[path = "descriptor_test.rs"]
mod tests;
