//! Row filters and ordering applied after the merge.

use std::sync::LazyLock;

use geolist_core::regions::{region_code, region_name, REGIONS};
use geolist_core::{Record, SourceDescriptor};
use regex::Regex;

static REGION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2}\b").expect("valid regex"));

static REGION_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    let mut names: Vec<&str> = REGIONS.iter().map(|(name, _)| *name).collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    let alternation = names
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid regex")
});

const COMMON_NAME_FIELDS: &[&str] = &[
    "name",
    "title",
    "organization",
    "organization name",
    "company",
    "city",
];

/// `true` for canonical integer text: `"12"`, `"-3"`, `"0"`; not `"012"`,
/// `"1.0"` or `""`.
#[must_use]
pub fn is_integer_literal(value: &str) -> bool {
    value
        .parse::<i64>()
        .is_ok_and(|n| n.to_string() == value)
}

/// Keeps rows whose `field` holds an integer literal. Returns the number
/// of rows dropped.
pub fn retain_integer_rows(records: &mut Vec<Record>, field: &str) -> usize {
    let before = records.len();
    records.retain(|r| r.text(field).is_some_and(|v| is_integer_literal(&v)));
    before - records.len()
}

/// A required region, matched against a row's state field or the region
/// names and codes that appear in its address.
#[derive(Debug, Clone)]
pub struct RegionRequirement {
    code: String,
    name: String,
    address_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionEvidence {
    Matches,
    Conflicts,
    Unknown,
}

impl RegionRequirement {
    #[must_use]
    pub fn new(required: &str, address_field: Option<&str>) -> Self {
        let required = required.trim();
        let code = region_code(required).map_or_else(|| required.to_uppercase(), str::to_owned);
        let name = region_name(&code).map_or_else(|| required.to_owned(), str::to_owned);
        Self {
            code,
            name,
            address_field: address_field.map(str::to_owned),
        }
    }

    fn judge(&self, value: &str) -> RegionEvidence {
        let value = value.trim();
        if value.eq_ignore_ascii_case(&self.code) || value.eq_ignore_ascii_case(&self.name) {
            return RegionEvidence::Matches;
        }
        match region_code(value) {
            Some(code) if code == self.code => RegionEvidence::Matches,
            Some(_) => RegionEvidence::Conflicts,
            None => RegionEvidence::Unknown,
        }
    }

    fn from_state_field(&self, record: &Record) -> RegionEvidence {
        record
            .find_key_ci("state")
            .and_then(|k| record.text(k))
            .filter(|v| !v.trim().is_empty())
            .map_or(RegionEvidence::Unknown, |v| self.judge(&v))
    }

    fn from_address(&self, record: &Record) -> RegionEvidence {
        let field = match &self.address_field {
            Some(f) if record.contains_key(f) => Some(f.as_str()),
            _ => record.find_key_ci("address"),
        };
        let Some(address) = field.and_then(|f| record.text(f)) else {
            return RegionEvidence::Unknown;
        };

        let mut evidence = RegionEvidence::Unknown;
        let tokens = REGION_CODE_RE
            .find_iter(&address)
            .chain(REGION_NAME_RE.find_iter(&address));
        for token in tokens {
            match self.judge(token.as_str()) {
                RegionEvidence::Matches => return RegionEvidence::Matches,
                RegionEvidence::Conflicts => evidence = RegionEvidence::Conflicts,
                RegionEvidence::Unknown => {}
            }
        }
        evidence
    }

    /// A row is dropped only when its region is known and differs.
    #[must_use]
    pub fn admits(&self, record: &Record) -> bool {
        let state = self.from_state_field(record);
        if state == RegionEvidence::Matches {
            return true;
        }
        match self.from_address(record) {
            RegionEvidence::Matches => true,
            RegionEvidence::Conflicts => false,
            RegionEvidence::Unknown => state != RegionEvidence::Conflicts,
        }
    }
}

/// Keeps rows admitted by `requirement`. Returns the number dropped.
pub fn retain_region_rows(records: &mut Vec<Record>, requirement: &RegionRequirement) -> usize {
    let before = records.len();
    records.retain(|r| requirement.admits(r));
    before - records.len()
}

/// Field the list is ordered by: name column, first featured column, a
/// common name-like field, else the first field.
#[must_use]
pub fn sort_field(records: &[Record], descriptor: &SourceDescriptor) -> Option<String> {
    let first = records.first()?;
    let exact = descriptor.all_columns.is_some();
    let configured = |wanted: &str| -> Option<String> {
        if exact {
            Some(wanted.to_owned())
        } else {
            first.find_key_ci(wanted).map(str::to_owned)
        }
    };

    descriptor
        .name_column
        .as_deref()
        .and_then(configured)
        .or_else(|| {
            descriptor
                .featured_columns
                .first()
                .and_then(|f| configured(f))
        })
        .or_else(|| {
            first
                .keys()
                .find(|k| {
                    let lower = k.to_lowercase();
                    COMMON_NAME_FIELDS.iter().any(|c| lower.contains(c))
                })
                .map(str::to_owned)
        })
        .or_else(|| first.keys().next().map(str::to_owned))
}

fn sort_value(record: &Record, field: &str) -> String {
    record
        .text(field)
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_default()
}

/// Stable sort, case-insensitive, blank values last.
pub fn sort_alphabetically(records: &mut [Record], descriptor: &SourceDescriptor) {
    let Some(field) = sort_field(records, descriptor) else {
        return;
    };
    records.sort_by_cached_key(|r| {
        let value = sort_value(r, &field);
        (value.is_empty(), value)
    });
    tracing::debug!(field = %field, count = records.len(), "sorted records");
}

#[cfg(test)]
#[path = "rows_test.rs"]
mod tests;
