//! Free-text search over the canonical record set.

use geolist_core::{value_text, Record};

/// Search text plus the fields it applies to. No fields means every field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub text: String,
    pub fields: Vec<String>,
}

impl FilterState {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Case-insensitive substring match on the eligible fields.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let hit = |value: Option<String>| value.is_some_and(|v| v.to_lowercase().contains(&needle));
        if self.fields.is_empty() {
            record.iter().any(|(_, v)| hit(value_text(v)))
        } else {
            self.fields.iter().any(|f| hit(record.text(f)))
        }
    }
}

/// Records of `canonical` that match `filter`, in canonical order. The
/// input is never modified.
#[must_use]
pub fn search(canonical: &[Record], filter: &FilterState) -> Vec<Record> {
    if filter.is_empty() {
        return canonical.to_vec();
    }
    canonical
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities() -> Vec<Record> {
        vec![
            Record::from_pairs([("City", "Athens"), ("County", "Clarke")]),
            Record::from_pairs([("City", "Macon"), ("County", "Bibb")]),
            Record::from_pairs([("City", "Atlanta"), ("County", "Fulton")]),
        ]
    }

    #[test]
    fn empty_text_matches_everything() {
        let all = search(&cities(), &FilterState::new("  "));
        assert_eq!(all, cities());
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let hits = search(&cities(), &FilterState::new("AT"));
        let names: Vec<_> = hits.iter().filter_map(|r| r.text("City")).collect();
        assert_eq!(names, vec!["Athens", "Atlanta"]);
    }

    #[test]
    fn field_subset_limits_the_search() {
        let filter = FilterState::new("bibb").with_fields(vec!["City".to_owned()]);
        assert!(search(&cities(), &filter).is_empty());
        let filter = FilterState::new("bibb").with_fields(vec!["County".to_owned()]);
        assert_eq!(search(&cities(), &filter).len(), 1);
    }

    #[test]
    fn filtered_set_is_always_a_subset_of_the_unfiltered_set() {
        let canonical = cities();
        let everything = search(&canonical, &FilterState::new(""));
        for text in ["a", "x", "on", "Clarke", "zzz"] {
            let subset = search(&canonical, &FilterState::new(text));
            assert!(subset.iter().all(|r| everything.contains(r)), "text {text:?}");
        }
        assert_eq!(canonical, cities());
    }

    #[test]
    fn numbers_are_searched_by_their_text() {
        let mut record = Record::new();
        record.insert("Population", 127_064);
        assert!(FilterState::new("1270").matches(&record));
    }
}
