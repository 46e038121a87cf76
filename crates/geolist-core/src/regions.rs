//! US region (state) names and two-letter codes.
//!
//! Used by the merge engine so that `"Georgia"` and `"GA"` key identically, and
//! by the `state_required` row filter.

use std::collections::HashMap;
use std::sync::LazyLock;

/// `(full name, code)` for the 50 states plus the District of Columbia.
pub const REGIONS: &[(&str, &str)] = &[
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
    ("District of Columbia", "DC"),
];

/// Lower-cased full name or code → code.
static CODE_BY_KEY: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    REGIONS
        .iter()
        .flat_map(|(name, code)| {
            [
                (name.to_ascii_lowercase(), *code),
                (code.to_ascii_lowercase(), *code),
            ]
        })
        .collect()
});

/// Lower-cased code → full name.
static NAME_BY_CODE: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    REGIONS
        .iter()
        .map(|(name, code)| (code.to_ascii_lowercase(), *name))
        .collect()
});

/// Returns the two-letter code for a full region name or an existing code,
/// case-insensitively.
#[must_use]
pub fn region_code(value: &str) -> Option<&'static str> {
    CODE_BY_KEY.get(&value.trim().to_ascii_lowercase()).copied()
}

/// Returns the full region name for a two-letter code.
#[must_use]
pub fn region_name(code: &str) -> Option<&'static str> {
    NAME_BY_CODE.get(&code.trim().to_ascii_lowercase()).copied()
}

/// Normalizes a region to its code when known, otherwise returns the trimmed
/// input unchanged.
#[must_use]
pub fn normalize_region(value: &str) -> String {
    region_code(value).map_or_else(|| value.trim().to_owned(), str::to_owned)
}
