//! Geo merge: fills in coordinates from a reference geography table.
//!
//! Records that already carry both canonical coordinates are never touched.
//! For the rest, the merge key is looked up in a [`ReferenceIndex`] and every
//! field of the matched reference row that the record lacks (absent or
//! blank) is copied over. Misses are only counted here; geocoding them is
//! the job of [`crate::refresh`].

use std::collections::{HashMap, HashSet};

use geolist_core::regions::normalize_region;
use geolist_core::{Record, SourceDescriptor};

const LOCALITY_FIELDS: &[&str] = &["City", "CITY", "city"];
const REGION_FIELDS: &[&str] = &["State", "STATE", "STATE_CODE", "state"];

/// Field names added to place-keyed records when absent.
pub const DERIVED_LOCALITY: &str = "City";
pub const DERIVED_REGION: &str = "State";

/// How unmatched keys are handled after the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Unmatched keys are reported only.
    Ordinary,
    /// Unmatched keys are geocoded and the result persisted.
    Refresh,
}

/// `true` when at least one record lacks a canonical coordinate. The
/// reference table is not fetched otherwise.
#[must_use]
pub fn needs_merge(records: &[Record]) -> bool {
    records.iter().any(|r| !r.has_coordinates())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeKey {
    /// A combined `"Locality, Region"` field.
    Place { field: String },
    /// Any other field, matched by its lower-cased trimmed value.
    Column { field: String },
}

impl MergeKey {
    #[must_use]
    pub fn from_descriptor(descriptor: &SourceDescriptor) -> Option<Self> {
        let field = descriptor.merge_key()?.to_owned();
        Some(if descriptor.is_place_key() {
            MergeKey::Place { field }
        } else {
            MergeKey::Column { field }
        })
    }

    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            MergeKey::Place { field } | MergeKey::Column { field } => field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceParts {
    pub locality: String,
    /// Region code when the region is known, else the trimmed text.
    pub region: Option<String>,
}

/// Splits `"Athens, Georgia"` on the first comma into locality and region.
#[must_use]
pub fn split_place(value: &str) -> Option<PlaceParts> {
    let (locality, region) = match value.split_once(',') {
        Some((l, r)) => (l.trim(), Some(r.trim())),
        None => (value.trim(), None),
    };
    if locality.is_empty() {
        return None;
    }
    Some(PlaceParts {
        locality: locality.to_owned(),
        region: region.filter(|r| !r.is_empty()).map(normalize_region),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCount {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub total_records: usize,
    pub already_located: usize,
    pub newly_merged: usize,
    pub reference_size: usize,
    /// Keys with no reference row, most frequent first.
    pub unmatched: Vec<KeyCount>,
    /// Locality-only keys that exist in several regions; never merged.
    pub ambiguous: Vec<KeyCount>,
}

impl MergeReport {
    /// Report for a set that needed no merge at all.
    #[must_use]
    pub fn skipped(records: &[Record]) -> Self {
        Self {
            total_records: records.len(),
            already_located: records.iter().filter(|r| r.has_coordinates()).count(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn unmatched_count(&self, key: &str) -> usize {
        self.unmatched
            .iter()
            .find(|k| k.key == key)
            .map_or(0, |k| k.count)
    }

    #[must_use]
    pub fn unmatched_records(&self) -> usize {
        self.unmatched.iter().map(|k| k.count).sum()
    }
}

/// Counts keys in first-seen order.
#[derive(Debug, Default)]
struct KeyTally {
    order: Vec<KeyCount>,
    positions: HashMap<String, usize>,
}

impl KeyTally {
    fn add(&mut self, key: &str) {
        if let Some(&pos) = self.positions.get(key) {
            self.order[pos].count += 1;
        } else {
            self.positions.insert(key.to_owned(), self.order.len());
            self.order.push(KeyCount {
                key: key.to_owned(),
                count: 1,
            });
        }
    }

    /// Most frequent first; the sort is stable so ties keep first-seen order.
    fn into_sorted(self) -> Vec<KeyCount> {
        let mut out = self.order;
        out.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }
}

#[derive(Debug)]
struct LocalityEntry {
    row: usize,
    regions: HashSet<String>,
}

enum Lookup<'a> {
    Hit(&'a Record),
    Ambiguous,
    Miss,
}

/// Lookup table over a normalized reference set.
#[derive(Debug)]
pub struct ReferenceIndex {
    key: MergeKey,
    region_target: Option<String>,
    rows: Vec<Record>,
    by_composite: HashMap<String, usize>,
    by_locality: HashMap<String, LocalityEntry>,
    by_value: HashMap<String, usize>,
}

fn first_text(record: &Record, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| record.text(f))
        .map(|v| v.trim().to_owned())
        .find(|v| !v.is_empty())
}

fn field_variants(field: &str) -> [String; 3] {
    [field.to_owned(), field.to_uppercase(), field.to_lowercase()]
}

fn normalized_value(value: &str) -> String {
    value.trim().to_lowercase()
}

impl ReferenceIndex {
    /// Indexes `rows`. The first row wins when keys collide.
    #[must_use]
    pub fn build(rows: Vec<Record>, key: &MergeKey, region_target: Option<&str>) -> Self {
        let mut index = Self {
            key: key.clone(),
            region_target: region_target.map(str::to_owned),
            rows: Vec::new(),
            by_composite: HashMap::new(),
            by_locality: HashMap::new(),
            by_value: HashMap::new(),
        };

        for (i, row) in rows.iter().enumerate() {
            match key {
                MergeKey::Place { .. } => {
                    let Some(locality) = first_text(row, LOCALITY_FIELDS) else {
                        continue;
                    };
                    let locality = normalized_value(&locality);
                    let region = index
                        .reference_region(row)
                        .map(|r| normalize_region(&r).to_lowercase());

                    let entry = index
                        .by_locality
                        .entry(locality.clone())
                        .or_insert_with(|| LocalityEntry {
                            row: i,
                            regions: HashSet::new(),
                        });
                    if let Some(region) = region {
                        entry.regions.insert(region.clone());
                        index
                            .by_composite
                            .entry(format!("{locality}|{region}"))
                            .or_insert(i);
                    }
                }
                MergeKey::Column { field } => {
                    let value = row
                        .text(field)
                        .or_else(|| row.find_key_ci(field).and_then(|k| row.text(k)));
                    if let Some(value) = value.map(|v| normalized_value(&v)) {
                        if !value.is_empty() {
                            index.by_value.entry(value).or_insert(i);
                        }
                    }
                }
            }
        }

        index.rows = rows;
        tracing::debug!(
            rows = index.rows.len(),
            composite = index.by_composite.len(),
            localities = index.by_locality.len(),
            values = index.by_value.len(),
            "built reference index"
        );
        index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn reference_region(&self, row: &Record) -> Option<String> {
        match &self.region_target {
            Some(target) => {
                let variants = field_variants(target);
                let refs: Vec<&str> = variants.iter().map(String::as_str).collect();
                first_text(row, &refs)
            }
            None => first_text(row, REGION_FIELDS),
        }
    }

    fn lookup_place(&self, locality: &str, region: Option<&str>) -> Lookup<'_> {
        let locality = normalized_value(locality);
        if let Some(region) = region {
            let composite = format!("{locality}|{}", region.to_lowercase());
            if let Some(&i) = self.by_composite.get(&composite) {
                return Lookup::Hit(&self.rows[i]);
            }
        }
        match self.by_locality.get(&locality) {
            Some(entry) if entry.regions.len() > 1 => Lookup::Ambiguous,
            Some(entry) => Lookup::Hit(&self.rows[entry.row]),
            None => Lookup::Miss,
        }
    }

    fn lookup_value(&self, value: &str) -> Lookup<'_> {
        match self.by_value.get(&normalized_value(value)) {
            Some(&i) => Lookup::Hit(&self.rows[i]),
            None => Lookup::Miss,
        }
    }
}

/// Locality and region of a place-keyed record, taken from the key field
/// and falling back to existing `City`/`State` fields.
fn record_place(record: &Record, field: &str) -> Option<PlaceParts> {
    let from_key = record.text(field).and_then(|v| split_place(&v));
    let locality = from_key
        .as_ref()
        .map(|p| p.locality.clone())
        .or_else(|| first_text(record, LOCALITY_FIELDS))?;
    let region = from_key
        .and_then(|p| p.region)
        .or_else(|| first_text(record, REGION_FIELDS).map(|r| normalize_region(&r)));
    Some(PlaceParts { locality, region })
}

/// The key a record is reported under: its trimmed key value, else the
/// derived place.
fn report_key(record: &Record, key: &MergeKey) -> Option<String> {
    if let Some(value) = record.text(key.field()) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_owned());
        }
    }
    match key {
        MergeKey::Place { field } => record_place(record, field).map(|p| match p.region {
            Some(region) => format!("{}, {region}", p.locality),
            None => p.locality,
        }),
        MergeKey::Column { .. } => None,
    }
}

/// Adds `City` / `State` from the place key when the record lacks them.
fn add_derived_place_fields(record: &mut Record, field: &str) {
    let Some(parts) = record.text(field).and_then(|v| split_place(&v)) else {
        return;
    };
    if !record.has_value(DERIVED_LOCALITY) {
        record.insert(DERIVED_LOCALITY, parts.locality);
    }
    if let Some(region) = parts.region {
        if !record.has_value(DERIVED_REGION) {
            record.insert(DERIVED_REGION, region);
        }
    }
}

/// Copies every field of `reference` that is absent or blank on `record`.
fn fill_from(record: &mut Record, reference: &Record, region_target: Option<&str>) {
    for (field, value) in reference.iter() {
        if !record.has_value(field) {
            record.insert(field, value.clone());
        }
    }
    if let Some(target) = region_target {
        if !record.has_value(target) {
            let value = field_variants(target)
                .iter()
                .find_map(|v| reference.get(v).filter(|_| reference.has_value(v)))
                .cloned();
            if let Some(value) = value {
                record.insert(target, value);
            }
        }
    }
}

/// Merges reference fields into every record still missing a coordinate.
pub fn merge_records(records: &mut [Record], index: &ReferenceIndex) -> MergeReport {
    let mut report = MergeReport {
        total_records: records.len(),
        reference_size: index.len(),
        ..MergeReport::default()
    };
    let mut unmatched = KeyTally::default();
    let mut ambiguous = KeyTally::default();

    for record in records.iter_mut() {
        if let MergeKey::Place { field } = &index.key {
            add_derived_place_fields(record, field);
        }
        if record.has_coordinates() {
            report.already_located += 1;
            continue;
        }

        let lookup = match &index.key {
            MergeKey::Place { field } => match record_place(record, field) {
                Some(place) => index.lookup_place(&place.locality, place.region.as_deref()),
                None => continue,
            },
            MergeKey::Column { field } => match record.text(field) {
                Some(value) if !value.trim().is_empty() => index.lookup_value(&value),
                _ => continue,
            },
        };

        match lookup {
            Lookup::Hit(reference) => {
                fill_from(record, reference, index.region_target.as_deref());
                report.newly_merged += 1;
            }
            Lookup::Ambiguous => {
                if let Some(key) = report_key(record, &index.key) {
                    ambiguous.add(&key);
                }
            }
            Lookup::Miss => {
                if let Some(key) = report_key(record, &index.key) {
                    unmatched.add(&key);
                }
            }
        }
    }

    report.unmatched = unmatched.into_sorted();
    report.ambiguous = ambiguous.into_sorted();
    tracing::info!(
        total = report.total_records,
        already_located = report.already_located,
        merged = report.newly_merged,
        reference_size = report.reference_size,
        unmatched_keys = report.unmatched.len(),
        ambiguous_keys = report.ambiguous.len(),
        "geo merge complete"
    );
    if !report.unmatched.is_empty() {
        let keys: Vec<&str> = report.unmatched.iter().map(|k| k.key.as_str()).collect();
        tracing::debug!(keys = ?keys, "unmatched merge keys");
    }
    report
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
