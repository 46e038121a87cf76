//! Delimited-text and structured (JSON) parsing into [`Record`]s.
//!
//! The delimited parser accepts `\n`, `\r\n` and lone `\r` line endings,
//! double-quoted fields with `""` escapes and embedded newlines, and trims
//! every value. Rows whose quoting never closes are skipped.

use std::collections::HashSet;

use geolist_core::{value_text, DataFormat, Record};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// Parses delimited text. The first non-blank row is the header.
#[must_use]
pub fn parse_delimited(text: &str, delimiter: char) -> Vec<Record> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = split_rows(text, delimiter).into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let headers = dedupe_field_names(header);

    rows.map(|fields| {
        let mut fields = fields.into_iter();
        headers
            .iter()
            .map(|h| {
                let value = fields.next().unwrap_or_default();
                (h.clone(), Value::String(value))
            })
            .collect::<Record>()
    })
    .collect()
}

/// Converts a JSON document into records. An array yields one record per
/// object element, a single object yields one record, anything else yields
/// nothing. Nested arrays and objects are kept as their JSON text.
#[must_use]
pub fn parse_structured(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(flatten(map)),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![flatten(map)],
        _ => Vec::new(),
    }
}

/// Parses a fetched payload according to its format.
///
/// # Errors
///
/// Returns [`IngestError::Deserialize`] when a JSON payload is malformed.
pub fn parse_payload(text: &str, format: DataFormat, origin: &str) -> Result<Vec<Record>, IngestError> {
    match format {
        DataFormat::Csv => Ok(parse_delimited(text, ',')),
        DataFormat::Json => {
            let value: Value = serde_json::from_str(text).map_err(|e| IngestError::Deserialize {
                context: origin.to_owned(),
                source: e,
            })?;
            Ok(parse_structured(value))
        }
    }
}

/// Serializes records as comma-delimited text. The header is the union of
/// all field names in first-seen order, minus `omit`.
#[must_use]
pub fn write_delimited(records: &[Record], omit: &[String]) -> String {
    let mut seen = HashSet::new();
    let mut header: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !omit.iter().any(|o| o == key) && seen.insert(key) {
                header.push(key);
            }
        }
    }

    let mut out = String::new();
    push_row(&mut out, header.iter().map(|h| (*h).to_owned()));
    for record in records {
        push_row(
            &mut out,
            header.iter().map(|h| record.text(h).unwrap_or_default()),
        );
    }
    out
}

/// Makes header names unique and non-empty. Blank names become
/// `column_<n>` (1-based); repeats get a `_<k>` suffix.
#[must_use]
pub fn dedupe_field_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut used = HashSet::new();
    let mut out = Vec::new();
    for (idx, name) in names.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("column_{}", idx + 1)
        } else {
            name.trim().to_owned()
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while !used.insert(candidate.clone()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        out.push(candidate);
    }
    out
}

fn flatten(map: Map<String, Value>) -> Record {
    map.into_iter()
        .map(|(k, v)| match v {
            Value::Array(_) | Value::Object(_) => {
                let text = value_text(&v).unwrap_or_default();
                (k, Value::String(text))
            }
            other => (k, other),
        })
        .collect()
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        let needs_quotes = field.contains([',', '"', '\n', '\r'])
            || field.starts_with(char::is_whitespace)
            || field.ends_with(char::is_whitespace);
        if needs_quotes {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(&field);
        }
    }
    out.push('\n');
}

/// Splits text into rows of trimmed fields, dropping blank lines and any
/// row left open by an unterminated quote.
fn split_rows(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            c if c == delimiter => {
                row.push(field.trim().to_owned());
                field.clear();
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_row(&mut rows, &mut row, &mut field);
            }
            '\n' => end_row(&mut rows, &mut row, &mut field),
            other => field.push(other),
        }
    }

    if in_quotes {
        tracing::warn!(
            row = rows.len() + 1,
            "unterminated quoted field, skipping final row"
        );
    } else if !field.is_empty() || !row.is_empty() {
        end_row(&mut rows, &mut row, &mut field);
    }
    rows
}

fn end_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    row.push(field.trim().to_owned());
    field.clear();
    let fields = std::mem::take(row);
    if !(fields.len() == 1 && fields[0].is_empty()) {
        rows.push(fields);
    }
}

#[cfg(test)]
#[path = "tabular_test.rs"]
mod tests;
