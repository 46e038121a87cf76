//! Flat location records.
//!
//! A [`Record`] is one row of a dataset: an ordered mapping of field name to a
//! scalar JSON value. Field order follows the source (CSV header order or JSON
//! key order) and survives every rewrite done by the normalizer and the merge
//! engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical latitude field name written by the schema normalizer.
pub const LATITUDE: &str = "latitude";
/// Canonical longitude field name written by the schema normalizer.
pub const LONGITUDE: &str = "longitude";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a record from `(field, text)` pairs, keeping their order.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String form of a field. Numbers and booleans are rendered, `null` is
    /// treated as absent.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(value_text)
    }

    /// `true` when the field exists and its string form is not blank.
    #[must_use]
    pub fn has_value(&self, field: &str) -> bool {
        self.text(field).is_some_and(|s| !s.trim().is_empty())
    }

    #[must_use]
    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Case-insensitive field lookup; returns the field name as stored.
    #[must_use]
    pub fn find_key_ci(&self, field: &str) -> Option<&str> {
        self.0
            .keys()
            .find(|k| k.eq_ignore_ascii_case(field))
            .map(String::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Removes a field without disturbing the order of the remaining fields.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        if !self.0.contains_key(field) {
            return None;
        }
        let mut removed = None;
        self.0 = std::mem::take(&mut self.0)
            .into_iter()
            .filter_map(|(k, v)| {
                if k == field {
                    removed = Some(v);
                    None
                } else {
                    Some((k, v))
                }
            })
            .collect();
        removed
    }

    /// Renames `from` to `to` in place. An existing `to` field is dropped.
    pub fn rename(&mut self, from: &str, to: &str) {
        if from == to || !self.0.contains_key(from) {
            return;
        }
        self.0 = std::mem::take(&mut self.0)
            .into_iter()
            .filter(|(k, _)| k != to)
            .map(|(k, v)| if k == from { (to.to_owned(), v) } else { (k, v) })
            .collect();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a field as a floating point number.
    #[must_use]
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.0.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.number(LATITUDE)
    }

    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.number(LONGITUDE)
    }

    /// `true` when both canonical coordinate fields hold numbers.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.latitude().is_some() && self.longitude().is_some()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// String form of a scalar JSON value; `null` is `None`.
#[must_use]
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
