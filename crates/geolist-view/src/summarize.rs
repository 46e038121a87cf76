//! Group-by summary rows and the on/off toggle that restores the prior subset.

use std::collections::HashMap;

use geolist_core::Record;
use serde_json::{Number, Value};

pub const COUNT_FIELD: &str = "count";
pub const AGGREGATE_FIELD: &str = "aggregate_total";

/// One row per distinct non-empty `group` value, as
/// `{<group>: value, count, aggregate_total?}`, sorted by count descending.
/// Ties keep first-seen order.
///
/// `aggregate_total` is present only when `aggregate` is given; values that
/// do not parse as numbers are skipped in the sum.
#[must_use]
pub fn summarize(records: &[Record], group: &str, aggregate: Option<&str>) -> Vec<Record> {
    struct Bucket {
        key: String,
        count: u64,
        total: f64,
    }

    let mut order: Vec<Bucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(key) = record.text(group).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push(Bucket {
                key,
                count: 0,
                total: 0.0,
            });
            order.len() - 1
        });
        let bucket = &mut order[slot];
        bucket.count += 1;
        if let Some(n) = aggregate.and_then(|f| record.number(f)) {
            bucket.total += n;
        }
    }

    order.sort_by(|a, b| b.count.cmp(&a.count));

    let rows: Vec<Record> = order
        .into_iter()
        .map(|bucket| {
            let mut row = Record::new();
            row.insert(group, bucket.key);
            row.insert(COUNT_FIELD, bucket.count);
            if aggregate.is_some() {
                row.insert(AGGREGATE_FIELD, total_value(bucket.total));
            }
            row
        })
        .collect();
    tracing::debug!(group, groups = rows.len(), "summarized records");
    rows
}

#[allow(clippy::cast_possible_truncation)]
fn total_value(total: f64) -> Value {
    if total.fract().abs() < f64::EPSILON && total.abs() < 9.0e15 {
        Value::from(total as i64)
    } else {
        Number::from_f64(total).map_or(Value::Null, Value::Number)
    }
}

/// Remembers the filtered subset that was showing when summarize turned on,
/// so turning it off restores exactly that subset.
#[derive(Debug, Clone, Default)]
pub struct SummaryToggle {
    saved: Option<Vec<Record>>,
}

impl SummaryToggle {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }

    /// Stores `displayed` and returns the summary rows. Calling it while
    /// already active recomputes the rows and keeps the first saved subset.
    pub fn activate(
        &mut self,
        canonical: &[Record],
        displayed: &[Record],
        group: &str,
        aggregate: Option<&str>,
    ) -> Vec<Record> {
        if self.saved.is_none() {
            self.saved = Some(displayed.to_vec());
        }
        summarize(canonical, group, aggregate)
    }

    /// Returns the subset saved by [`SummaryToggle::activate`], or `None`
    /// when summarize was not on.
    pub fn deactivate(&mut self) -> Option<Vec<Record>> {
        self.saved.take()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn visits() -> Vec<Record> {
        vec![
            Record::from_pairs([("Location", "Macon, GA"), ("Participants", "7")]),
            Record::from_pairs([("Location", "Athens, GA"), ("Participants", "12")]),
            Record::from_pairs([("Location", "Athens, GA"), ("Participants", "5")]),
            Record::from_pairs([("Location", ""), ("Participants", "2")]),
            Record::from_pairs([("Location", "Macon, GA"), ("Participants", "n/a")]),
            Record::from_pairs([("Location", "Rome, GA"), ("Participants", "1.5")]),
        ]
    }

    #[test]
    fn groups_by_count_descending_with_first_seen_ties() {
        let rows = summarize(&visits(), "Location", None);
        let keys: Vec<_> = rows.iter().filter_map(|r| r.text("Location")).collect();
        assert_eq!(keys, vec!["Macon, GA", "Athens, GA", "Rome, GA"]);
        assert_eq!(rows[0].get(COUNT_FIELD), Some(&json!(2)));
        assert!(!rows[0].contains_key(AGGREGATE_FIELD));
    }

    #[test]
    fn aggregate_skips_non_numeric_values() {
        let rows = summarize(&visits(), "Location", Some("Participants"));
        assert_eq!(rows[0].get(AGGREGATE_FIELD), Some(&json!(7)));
        assert_eq!(rows[1].get(AGGREGATE_FIELD), Some(&json!(17)));
        assert_eq!(rows[2].get(AGGREGATE_FIELD), Some(&json!(1.5)));
    }

    #[test]
    fn blank_groups_are_left_out() {
        let rows = summarize(&visits(), "Location", None);
        let total: u64 = rows
            .iter()
            .filter_map(|r| r.get(COUNT_FIELD).and_then(Value::as_u64))
            .sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn toggle_off_restores_the_prior_subset_exactly() {
        let canonical = visits();
        let displayed = vec![canonical[1].clone(), canonical[5].clone()];
        let mut toggle = SummaryToggle::default();

        let rows = toggle.activate(&canonical, &displayed, "Location", None);
        assert_eq!(rows.len(), 3);
        assert!(toggle.is_active());

        let again = toggle.activate(&canonical, &rows, "Location", None);
        assert_eq!(again, rows);

        assert_eq!(toggle.deactivate(), Some(displayed));
        assert!(!toggle.is_active());
        assert_eq!(toggle.deactivate(), None);
    }
}
