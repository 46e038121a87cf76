//! Coordinate field normalization.
//!
//! Datasets name their coordinate columns inconsistently (`Lat`, `LATITUDE`,
//! `lon`, `x`, ...). [`normalize_records`] rewrites every record so that at
//! most one `latitude` and one `longitude` field remain, carrying the best
//! non-blank value among the aliases. Running it twice changes nothing.

use std::collections::HashMap;

use geolist_core::{Record, SourceDescriptor, LATITUDE, LONGITUDE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    #[must_use]
    pub fn canonical(self) -> &'static str {
        match self {
            Axis::Latitude => LATITUDE,
            Axis::Longitude => LONGITUDE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AliasRule {
    axis: Axis,
    /// Lower wins when several aliases carry a value.
    rank: u8,
    /// `x`/`y` only count as coordinates when they hold a number.
    numeric_only: bool,
}

// (alias, numeric_only), in preference order.
const LATITUDE_ALIASES: &[(&str, bool)] = &[("latitude", false), ("lat", false), ("y", true)];
const LONGITUDE_ALIASES: &[(&str, bool)] = &[
    ("longitude", false),
    ("lng", false),
    ("lon", false),
    ("long", false),
    ("x", true),
];

/// Decides which fields of a record are coordinate aliases.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    rules: HashMap<String, AliasRule>,
    /// Allowlist mode matches field names exactly instead of by case.
    exact: bool,
}

impl FieldResolver {
    /// Recognizes the common alias names in any letter case.
    #[must_use]
    pub fn sniffing() -> Self {
        let mut rules = HashMap::new();
        for (axis, aliases) in [
            (Axis::Latitude, LATITUDE_ALIASES),
            (Axis::Longitude, LONGITUDE_ALIASES),
        ] {
            for (rank, (alias, numeric_only)) in aliases.iter().enumerate() {
                rules.insert(
                    (*alias).to_owned(),
                    AliasRule {
                        axis,
                        rank: u8::try_from(rank).unwrap_or(u8::MAX),
                        numeric_only: *numeric_only,
                    },
                );
            }
        }
        Self {
            rules,
            exact: false,
        }
    }

    /// Only the listed fields (plus the canonical names) are treated as
    /// coordinates. A listed field counts when its lower-cased name is a
    /// known alias.
    #[must_use]
    pub fn from_allowlist(fields: &[String]) -> Self {
        let sniffing = Self::sniffing();
        let mut rules = HashMap::new();
        for axis in [Axis::Latitude, Axis::Longitude] {
            rules.insert(
                axis.canonical().to_owned(),
                AliasRule {
                    axis,
                    rank: 0,
                    numeric_only: false,
                },
            );
        }
        for field in fields {
            if let Some(rule) = sniffing.rules.get(&field.to_lowercase()) {
                rules.entry(field.clone()).or_insert(*rule);
            }
        }
        Self { rules, exact: true }
    }

    /// Allowlist from the descriptor's `allColumns` when set, sniffing
    /// otherwise.
    #[must_use]
    pub fn for_descriptor(descriptor: &SourceDescriptor) -> Self {
        match &descriptor.all_columns {
            Some(columns) => Self::from_allowlist(columns),
            None => Self::sniffing(),
        }
    }

    fn rule(&self, field: &str) -> Option<AliasRule> {
        if self.exact {
            self.rules.get(field).copied()
        } else {
            self.rules.get(&field.to_lowercase()).copied()
        }
    }

    /// Which axis a field stands for in this record, if any.
    #[must_use]
    pub fn resolve(&self, record: &Record, field: &str) -> Option<Axis> {
        let rule = self.rule(field)?;
        if rule.numeric_only && record.number(field).is_none() {
            return None;
        }
        Some(rule.axis)
    }
}

impl Default for FieldResolver {
    fn default() -> Self {
        Self::sniffing()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub records_seen: usize,
    pub records_rewritten: usize,
    /// Records that end up with no coordinate field at all.
    pub without_coordinates: usize,
}

/// Rewrites coordinate fields of every record in place.
pub fn normalize_records(records: &mut [Record], resolver: &FieldResolver) -> NormalizeStats {
    let mut stats = NormalizeStats {
        records_seen: records.len(),
        ..NormalizeStats::default()
    };
    for record in records.iter_mut() {
        if normalize_record(record, resolver) {
            stats.records_rewritten += 1;
        }
        if !record.contains_key(LATITUDE) && !record.contains_key(LONGITUDE) {
            stats.without_coordinates += 1;
        }
    }
    tracing::debug!(
        seen = stats.records_seen,
        rewritten = stats.records_rewritten,
        without_coordinates = stats.without_coordinates,
        "normalized coordinate fields"
    );
    stats
}

/// Returns `true` when the record changed.
fn normalize_record(record: &mut Record, resolver: &FieldResolver) -> bool {
    let mut changed = false;
    for axis in [Axis::Latitude, Axis::Longitude] {
        let aliases: Vec<(String, u8)> = record
            .keys()
            .filter(|k| resolver.resolve(record, k) == Some(axis))
            .filter_map(|k| resolver.rule(k).map(|r| (k.to_owned(), r.rank)))
            .collect();

        let canonical = axis.canonical();
        match aliases.as_slice() {
            [] => continue,
            [(only, _)] if only == canonical => continue,
            _ => {}
        }

        let chosen = aliases
            .iter()
            .filter(|(k, _)| record.has_value(k))
            .min_by_key(|(_, rank)| *rank)
            .or_else(|| aliases.first())
            .map(|(k, _)| k.clone());
        let Some(chosen) = chosen else { continue };
        let value = record.get(&chosen).cloned().unwrap_or_default();

        let (first, _) = &aliases[0];
        record.rename(first, canonical);
        record.insert(canonical, value);
        for (field, _) in &aliases[1..] {
            if field != canonical {
                record.remove(field);
            }
        }
        changed = true;
    }
    changed
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
