//! End-to-end tests for `Pipeline` over a temporary data directory.
//!
//! The data root is a `tempfile` directory; the fast API (when used) is a
//! `wiremock` server. Geocoding goes through an in-memory fake.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geolist_core::SourceDescriptor;
use geolist_enrich::{
    EnrichError, FilePersister, GeoPoint, Geocoder, LoadMode, Pipeline, PipelineOptions,
};
use geolist_ingest::{DatasetLoader, LoadWarning, LoaderOptions};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VISITS_CSV: &str = "\
Team,Location,Participants,Email
Ravens,\"Athens, Georgia\",12,r@x.org
Owls,\"Macon, GA\",7,o@x.org
Hawks,\"Nowhere, GA\",3,h@x.org
Doves,\"Athens, GA\",5,d@x.org
";

const CITIES_CSV: &str = "\
City,STATE,LATITUDE,LONGITUDE
Athens,GA,33.95,-83.37
Macon,GA,32.84,-83.63
";

struct FixedGeocoder;

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeoPoint>, EnrichError> {
        Ok((query == "Nowhere, GA").then_some(GeoPoint {
            latitude: 31.123_4,
            longitude: -84.567_8,
        }))
    }
}

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn pipeline(data_root: &Path, api_base: &str) -> Pipeline {
    let loader = DatasetLoader::new(LoaderOptions {
        data_root: data_root.to_str().unwrap().to_owned(),
        api_base: api_base.to_owned(),
        timeout_secs: 5,
        user_agent: "geolist-test/0.1".to_owned(),
        max_retries: 0,
        backoff_base_ms: 0,
        online: true,
    })
    .unwrap();
    Pipeline::new(
        loader,
        Arc::new(FixedGeocoder),
        Arc::new(FilePersister),
        PipelineOptions {
            region_filtering: true,
            geocode_pause: Duration::ZERO,
        },
    )
}

fn visits_view() -> SourceDescriptor {
    SourceDescriptor {
        dataset: Some("visits.csv".to_owned()),
        geo_dataset: Some("us-cities.csv".to_owned()),
        geo_columns: vec!["Location".to_owned()],
        featured_columns: vec!["Team".to_owned()],
        dataset_omit: Some("Email".to_owned()),
        ..SourceDescriptor::default()
    }
}

fn data_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "visits.csv", VISITS_CSV);
    write(dir.path(), "us-cities.csv", CITIES_CSV);
    dir
}

#[tokio::test]
async fn ordinary_load_merges_and_reports_misses() {
    let dir = data_dir();
    let outcome = pipeline(dir.path(), "http://unused.test")
        .load("visits", &visits_view(), LoadMode::Ordinary)
        .await
        .unwrap();

    let merge = outcome.merge.expect("merge report");
    assert_eq!(merge.total_records, 4);
    assert_eq!(merge.newly_merged, 3);
    assert_eq!(merge.reference_size, 2);
    assert_eq!(merge.unmatched_count("Nowhere, GA"), 1);
    assert!(outcome.refresh.is_none());

    let teams: Vec<_> = outcome.records.iter().filter_map(|r| r.text("Team")).collect();
    assert_eq!(teams, vec!["Doves", "Hawks", "Owls", "Ravens"]);
    let ravens = outcome.records.iter().find(|r| r.text("Team").as_deref() == Some("Ravens")).unwrap();
    assert_eq!(ravens.latitude(), Some(33.95));
    assert!(!ravens.contains_key("LATITUDE"));
}

#[tokio::test]
async fn refresh_load_geocodes_and_persists_without_omitted_fields() {
    let dir = data_dir();
    let outcome = pipeline(dir.path(), "http://unused.test")
        .load("visits", &visits_view(), LoadMode::Refresh)
        .await
        .unwrap();

    let refresh = outcome.refresh.expect("refresh report");
    assert_eq!(refresh.geocoded, 1);
    assert!(refresh.persisted);
    let hawks = outcome.records.iter().find(|r| r.text("Team").as_deref() == Some("Hawks")).unwrap();
    assert_eq!(hawks.latitude(), Some(31.12));
    assert_eq!(hawks.longitude(), Some(-84.57));

    let saved = std::fs::read_to_string(dir.path().join("visits.csv")).unwrap();
    assert!(saved.contains("31.12"));
    assert!(!saved.contains("Email"));
}

#[tokio::test]
async fn missing_reference_table_leaves_records_unmerged_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "visits.csv", VISITS_CSV);
    let outcome = pipeline(dir.path(), "http://unused.test")
        .load("visits", &visits_view(), LoadMode::Ordinary)
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 4);
    assert!(outcome.records.iter().all(|r| !r.has_coordinates()));
    assert!(matches!(
        outcome.warnings.as_slice(),
        [LoadWarning::ReferenceUnavailable { .. }]
    ));
}

#[tokio::test]
async fn row_filters_apply_after_merge() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "orgs.csv",
        "Name,State,Members,lat,lon\nA,GA,10,1,2\nB,OH,4,1,2\nC,Georgia,n/a,1,2\nD,,3,1,2\n",
    );
    let view = SourceDescriptor {
        dataset: Some("orgs.csv".to_owned()),
        state_required: Some("GA".to_owned()),
        int_required: Some("Members".to_owned()),
        ..SourceDescriptor::default()
    };
    let outcome = pipeline(dir.path(), "http://unused.test")
        .load("orgs", &view, LoadMode::Ordinary)
        .await
        .unwrap();

    let names: Vec<_> = outcome.records.iter().filter_map(|r| r.text("Name")).collect();
    assert_eq!(names, vec!["A", "D"]);
    assert_eq!(outcome.dropped_non_integer, 1);
    assert_eq!(outcome.dropped_other_region, 1);
    assert!(outcome.merge.is_none());
}

#[tokio::test]
async fn refresh_local_saves_api_rows_then_reloads() {
    let dir = data_dir();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {"Team": "Finches", "Location": "Macon, GA", "Participants": 9, "Email": "f@x.org"}
            ]
        })))
        .mount(&server)
        .await;

    let view = SourceDescriptor {
        dataset_api_slow: Some("/api/visits".to_owned()),
        ..visits_view()
    };
    let result = pipeline(dir.path(), &server.uri())
        .refresh_local("visits", &view)
        .await
        .unwrap();

    assert_eq!(result.saved_records, 1);
    assert_eq!(result.outcome.records.len(), 1);
    assert_eq!(result.outcome.records[0].latitude(), Some(32.84));
    let saved = std::fs::read_to_string(dir.path().join("visits.csv")).unwrap();
    assert!(saved.starts_with("Team,Location,Participants\n"));
}

#[tokio::test]
async fn refresh_local_requires_an_api() {
    let dir = data_dir();
    let err = pipeline(dir.path(), "http://unused.test")
        .refresh_local("visits", &visits_view())
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::RefreshUnavailable { .. }));
}
