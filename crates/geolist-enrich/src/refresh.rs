//! Refresh-mode handling of records the merge could not locate.
//!
//! Every record still missing a coordinate is grouped by its place query;
//! queries are geocoded most-frequent first and each hit fills every record
//! in its group. A failed query is logged and skipped. When anything
//! changed, the whole set is handed to the [`Persister`]; a failed save is
//! logged and the in-memory enrichment is kept.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use geolist_core::{Record, LATITUDE, LONGITUDE};

use crate::geocoder::{GeoPoint, Geocoder};
use crate::merge::{split_place, MergeKey};
use crate::persist::Persister;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    /// Distinct queries sent to the geocoder.
    pub queried: usize,
    pub geocoded: usize,
    pub records_updated: usize,
    pub failed_queries: Vec<String>,
    pub persisted: bool,
    pub persist_error: Option<String>,
}

#[derive(Debug)]
struct QueryGroup {
    query: String,
    members: Vec<usize>,
}

/// Text sent to the geocoder for one record.
fn place_query(record: &Record, key: &MergeKey) -> Option<String> {
    let raw = record.text(key.field())?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(match key {
        MergeKey::Place { .. } => match split_place(raw) {
            Some(parts) => match parts.region {
                Some(region) => format!("{}, {region}", parts.locality),
                None => parts.locality,
            },
            None => raw.to_owned(),
        },
        MergeKey::Column { .. } => raw.to_owned(),
    })
}

/// Groups unlocated records by query, most frequent first (ties keep
/// first-seen order).
fn group_unlocated(records: &[Record], key: &MergeKey) -> Vec<QueryGroup> {
    let mut groups: Vec<QueryGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        if record.has_coordinates() {
            continue;
        }
        let Some(query) = place_query(record, key) else {
            continue;
        };
        let slot = query.to_lowercase();
        if let Some(&pos) = positions.get(&slot) {
            groups[pos].members.push(i);
        } else {
            positions.insert(slot, groups.len());
            groups.push(QueryGroup {
                query,
                members: vec![i],
            });
        }
    }
    groups.sort_by(|a, b| b.members.len().cmp(&a.members.len()));
    groups
}

/// Fills missing canonical coordinates; never replaces a populated one.
fn apply_point(record: &mut Record, point: GeoPoint) -> bool {
    let mut changed = false;
    if record.number(LATITUDE).is_none() {
        record.insert(LATITUDE, point.latitude);
        changed = true;
    }
    if record.number(LONGITUDE).is_none() {
        record.insert(LONGITUDE, point.longitude);
        changed = true;
    }
    changed
}

/// Geocodes every unlocated record in place. `pause` is slept between
/// consecutive geocoder calls.
pub async fn geocode_unlocated(
    records: &mut [Record],
    key: &MergeKey,
    geocoder: &dyn Geocoder,
    pause: Duration,
) -> RefreshReport {
    let groups = group_unlocated(records, key);
    let mut report = RefreshReport::default();

    for (n, group) in groups.iter().enumerate() {
        if n > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        report.queried += 1;
        match geocoder.geocode(&group.query).await {
            Ok(Some(point)) => {
                let point = point.rounded();
                report.geocoded += 1;
                for &i in &group.members {
                    if apply_point(&mut records[i], point) {
                        report.records_updated += 1;
                    }
                }
                tracing::debug!(
                    query = %group.query,
                    records = group.members.len(),
                    latitude = point.latitude,
                    longitude = point.longitude,
                    "geocoded"
                );
            }
            Ok(None) => {
                tracing::warn!(query = %group.query, "geocoder found no match");
                report.failed_queries.push(group.query.clone());
            }
            Err(e) => {
                tracing::warn!(query = %group.query, error = %e, "geocoding failed");
                report.failed_queries.push(group.query.clone());
            }
        }
    }

    tracing::info!(
        queried = report.queried,
        geocoded = report.geocoded,
        records_updated = report.records_updated,
        failed = report.failed_queries.len(),
        "geocoding pass complete"
    );
    report
}

/// Geocodes unlocated records, then persists the set to `target` when any
/// record changed.
pub async fn geocode_and_persist(
    records: &mut [Record],
    key: &MergeKey,
    geocoder: &dyn Geocoder,
    persister: &dyn Persister,
    target: Option<&Path>,
    omit: &[String],
    pause: Duration,
) -> RefreshReport {
    let mut report = geocode_unlocated(records, key, geocoder, pause).await;
    if report.records_updated == 0 {
        return report;
    }
    let Some(target) = target else {
        tracing::warn!("dataset is not a local file, geocoded coordinates kept in memory only");
        return report;
    };
    match persister.save(records, target, omit).await {
        Ok(()) => report.persisted = true,
        Err(e) => {
            tracing::error!(path = %target.display(), error = %e, "persist failed, keeping in-memory enrichment");
            report.persist_error = Some(e.to_string());
        }
    }
    report
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
