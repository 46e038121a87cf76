use super::*;

fn names(records: &[Record], field: &str) -> Vec<String> {
    records
        .iter()
        .map(|r| r.text(field).unwrap_or_default())
        .collect()
}

#[test]
fn integer_literals_must_round_trip() {
    assert!(is_integer_literal("12"));
    assert!(is_integer_literal("-3"));
    assert!(is_integer_literal("0"));
    assert!(!is_integer_literal("012"));
    assert!(!is_integer_literal("1.0"));
    assert!(!is_integer_literal(" 7"));
    assert!(!is_integer_literal(""));
}

#[test]
fn integer_filter_drops_non_integer_rows() {
    let mut records = vec![
        Record::from_pairs([("Year", "2024")]),
        Record::from_pairs([("Year", "n/a")]),
        Record::from_pairs([("Other", "1")]),
    ];
    let dropped = retain_integer_rows(&mut records, "Year");
    assert_eq!(dropped, 2);
    assert_eq!(names(&records, "Year"), vec!["2024"]);
}

#[test]
fn state_field_matches_by_code_or_name() {
    let req = RegionRequirement::new("GA", None);
    assert!(req.admits(&Record::from_pairs([("State", "Georgia")])));
    assert!(req.admits(&Record::from_pairs([("STATE", "ga")])));
    assert!(!req.admits(&Record::from_pairs([("state", "Ohio")])));
}

#[test]
fn address_tokens_decide_when_state_is_missing() {
    let req = RegionRequirement::new("Georgia", None);
    assert!(req.admits(&Record::from_pairs([("Address", "1 Main St, Macon, GA 31201")])));
    assert!(!req.admits(&Record::from_pairs([("Address", "9 Elm St, Toledo, OH 43604")])));
    assert!(req.admits(&Record::from_pairs([("Address", "Peachtree St, Atlanta, Georgia")])));
}

#[test]
fn region_names_do_not_match_inside_other_names() {
    let req = RegionRequirement::new("KS", None);
    assert!(!req.admits(&Record::from_pairs([("Address", "Little Rock, Arkansas")])));
    let wv = RegionRequirement::new("WV", None);
    assert!(wv.admits(&Record::from_pairs([("Address", "Charleston, West Virginia")])));
}

#[test]
fn rows_without_a_determinable_region_are_kept() {
    let req = RegionRequirement::new("GA", None);
    assert!(req.admits(&Record::from_pairs([("Name", "Remote team")])));
    assert!(req.admits(&Record::from_pairs([("Address", "somewhere quiet")])));
}

#[test]
fn configured_address_column_is_used() {
    let req = RegionRequirement::new("GA", Some("Street"));
    let mut records = vec![
        Record::from_pairs([("Street", "5 Oak Ave, Savannah, GA")]),
        Record::from_pairs([("Street", "5 Oak Ave, Mobile, AL")]),
    ];
    assert_eq!(retain_region_rows(&mut records, &req), 1);
    assert_eq!(records.len(), 1);
}

#[test]
fn sort_prefers_name_column_case_insensitively() {
    let descriptor = SourceDescriptor {
        name_column: Some("organization".to_owned()),
        ..SourceDescriptor::default()
    };
    let mut records = vec![
        Record::from_pairs([("Organization", "beta"), ("City", "A")]),
        Record::from_pairs([("Organization", ""), ("City", "B")]),
        Record::from_pairs([("Organization", "Alpha"), ("City", "C")]),
    ];
    sort_alphabetically(&mut records, &descriptor);
    assert_eq!(names(&records, "Organization"), vec!["Alpha", "beta", ""]);
}

#[test]
fn sort_falls_back_to_featured_then_common_then_first_field() {
    let featured = SourceDescriptor {
        featured_columns: vec!["Team".to_owned()],
        ..SourceDescriptor::default()
    };
    let records = vec![Record::from_pairs([("Team", "x"), ("Name", "y")])];
    assert_eq!(sort_field(&records, &featured).as_deref(), Some("Team"));

    let plain = SourceDescriptor::default();
    let records = vec![Record::from_pairs([("Id", "1"), ("Company Name", "y")])];
    assert_eq!(sort_field(&records, &plain).as_deref(), Some("Company Name"));

    let records = vec![Record::from_pairs([("Id", "1"), ("Code", "y")])];
    assert_eq!(sort_field(&records, &plain).as_deref(), Some("Id"));
    assert_eq!(sort_field(&[], &plain), None);
}
