use super::*;

fn texts(record: &Record) -> Vec<(String, String)> {
    record
        .iter()
        .map(|(k, _)| (k.to_owned(), record.text(k).unwrap_or_default()))
        .collect()
}

#[test]
fn header_defines_fields_and_values_are_trimmed() {
    let rows = parse_delimited("City , Population\n Athens , 127064 \n", ',');
    assert_eq!(rows.len(), 1);
    assert_eq!(
        texts(&rows[0]),
        vec![
            ("City".to_owned(), "Athens".to_owned()),
            ("Population".to_owned(), "127064".to_owned())
        ]
    );
}

#[test]
fn all_line_endings_terminate_rows() {
    let rows = parse_delimited("a,b\r\n1,2\r3,4\n5,6", ',');
    let firsts: Vec<_> = rows.iter().filter_map(|r| r.text("a")).collect();
    assert_eq!(firsts, vec!["1", "3", "5"]);
}

#[test]
fn quoted_fields_keep_delimiters_newlines_and_escaped_quotes() {
    let text = "name,note\n\"Smith, Jane\",\"said \"\"hi\"\"\nthen left\"\n";
    let rows = parse_delimited(text, ',');
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("name").as_deref(), Some("Smith, Jane"));
    assert_eq!(
        rows[0].text("note").as_deref(),
        Some("said \"hi\"\nthen left")
    );
}

#[test]
fn blank_lines_are_skipped_and_short_rows_padded() {
    let rows = parse_delimited("a,b,c\n\n1,2\n\n", ',');
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("c").as_deref(), Some(""));
}

#[test]
fn unterminated_quote_skips_only_the_open_row() {
    let rows = parse_delimited("a,b\n1,2\n3,\"open\n", ',');
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("a").as_deref(), Some("1"));
}

#[test]
fn byte_order_mark_is_ignored() {
    let rows = parse_delimited("\u{feff}City\nMacon\n", ',');
    assert_eq!(rows[0].text("City").as_deref(), Some("Macon"));
}

#[test]
fn empty_input_yields_no_records() {
    assert!(parse_delimited("", ',').is_empty());
    assert!(parse_delimited("only,header\n", ',').is_empty());
}

#[test]
fn duplicate_and_blank_headers_are_renamed() {
    let names = dedupe_field_names(vec![
        "City".to_owned(),
        String::new(),
        "City".to_owned(),
        "City".to_owned(),
    ]);
    assert_eq!(names, vec!["City", "column_2", "City_2", "City_3"]);
}

#[test]
fn structured_array_keeps_objects_only() {
    let value = serde_json::json!([
        {"City": "Athens", "Population": 127_064, "tags": ["a", "b"]},
        "skip me",
        {"City": "Macon"}
    ]);
    let rows = parse_structured(value);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].text("Population").as_deref(), Some("127064"));
    assert_eq!(rows[0].text("tags").as_deref(), Some(r#"["a","b"]"#));
}

#[test]
fn structured_single_object_becomes_one_record() {
    let rows = parse_structured(serde_json::json!({"City": "Athens"}));
    assert_eq!(rows.len(), 1);
    assert!(parse_structured(serde_json::json!(42)).is_empty());
}

#[test]
fn malformed_json_payload_is_a_deserialize_error() {
    let err = parse_payload("{not json", DataFormat::Json, "cities.json").unwrap_err();
    assert!(matches!(err, IngestError::Deserialize { ref context, .. } if context == "cities.json"));
}

#[test]
fn written_text_parses_back_to_the_same_values() {
    let records = vec![
        Record::from_pairs([("Name", "Smith, Jane"), ("Email", "j@x.org"), ("Note", "a \"b\"")]),
        Record::from_pairs([("Name", "Lee"), ("City", "Macon")]),
    ];
    let text = write_delimited(&records, &["Email".to_owned()]);
    assert!(text.starts_with("Name,Note,City\n"));

    let back = parse_delimited(&text, ',');
    assert_eq!(back[0].text("Name").as_deref(), Some("Smith, Jane"));
    assert_eq!(back[0].text("Note").as_deref(), Some("a \"b\""));
    assert!(!back[0].contains_key("Email"));
    assert_eq!(back[1].text("City").as_deref(), Some("Macon"));
}
