//! Stable record ids for the `id` descriptor key.

use geolist_core::Record;

/// The record's id: its `id_field` value when populated, else its 1-based
/// position in the displayed subset.
#[must_use]
pub fn record_id(record: &Record, index: usize, id_field: Option<&str>) -> String {
    id_field
        .and_then(|f| record.text(f))
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| (index + 1).to_string())
}

/// Finds the record `record_id` would have named `id`. Explicit id values
/// are tried before positions.
#[must_use]
pub fn resolve_record<'a>(
    displayed: &'a [Record],
    id: &str,
    id_field: Option<&str>,
) -> Option<(usize, &'a Record)> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    if let Some(field) = id_field {
        let hit = displayed
            .iter()
            .enumerate()
            .find(|(_, r)| r.text(field).is_some_and(|v| v.trim() == id));
        if hit.is_some() {
            return hit;
        }
    }
    let position: usize = id.parse().ok()?;
    let index = position.checked_sub(1)?;
    displayed
        .get(index)
        .filter(|r| record_id(r, index, id_field) == id)
        .map(|r| (index, r))
}
