//! Integration tests for `DatasetLoader`.
//!
//! A local `wiremock` server stands in for both the fast API and the data
//! root, so fallback paths can be exercised without real network traffic.

use std::io::Write as _;

use geolist_core::SourceDescriptor;
use geolist_ingest::{DataOrigin, DatasetLoader, IngestError, LoadWarning, LoaderOptions};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CITIES_CSV: &str = "City,State,Population\nAthens,GA,127064\nMacon,GA,157346\n";

fn test_loader(data_root: &str, api_base: &str, max_retries: u32) -> DatasetLoader {
    DatasetLoader::new(LoaderOptions {
        data_root: data_root.to_owned(),
        api_base: api_base.to_owned(),
        timeout_secs: 5,
        user_agent: "geolist-test/0.1".to_owned(),
        max_retries,
        backoff_base_ms: 0,
        online: true,
    })
    .expect("failed to build test loader")
}

fn api_view() -> SourceDescriptor {
    SourceDescriptor {
        dataset: Some("cities.csv".to_owned()),
        dataset_via_api: Some("/api/cities".to_owned()),
        ..SourceDescriptor::default()
    }
}

async fn mount_csv(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cities.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CITIES_CSV))
        .mount(server)
        .await;
}

#[tokio::test]
async fn api_success_is_used_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"City": "Athens", "State": "GA"}]
        })))
        .mount(&server)
        .await;

    let loader = test_loader(&server.uri(), &server.uri(), 0);
    let loaded = loader.load("cities", &api_view()).await.unwrap();

    assert_eq!(loaded.records.len(), 1);
    assert!(loaded.warnings.is_empty());
    assert!(matches!(loaded.origin, DataOrigin::Api { .. }));
}

#[tokio::test]
async fn api_server_error_falls_back_to_file_with_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cities"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
        .mount(&server)
        .await;
    mount_csv(&server).await;

    let loader = test_loader(&server.uri(), &server.uri(), 0);
    let loaded = loader.load("cities", &api_view()).await.unwrap();

    assert_eq!(loaded.records.len(), 2);
    assert!(matches!(loaded.origin, DataOrigin::File { .. }));
    match &loaded.warnings[..] {
        [LoadWarning::ApiFallback {
            status, message, fallback, ..
        }] => {
            assert_eq!(*status, Some(500));
            assert!(message.contains("db down"), "message was {message}");
            assert_eq!(fallback, "cities.csv");
        }
        other => panic!("expected one fallback warning, got {other:?}"),
    }
}

#[tokio::test]
async fn api_success_false_falls_back_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "not ready"
        })))
        .mount(&server)
        .await;
    mount_csv(&server).await;

    let loader = test_loader(&server.uri(), &server.uri(), 0);
    let loaded = loader.load("cities", &api_view()).await.unwrap();

    assert_eq!(loaded.records.len(), 2);
    assert_eq!(loaded.warnings.len(), 1);
    assert!(loaded.warnings[0].to_string().contains("not ready"));
}

#[tokio::test]
async fn api_empty_data_falls_back_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .mount(&server)
        .await;
    mount_csv(&server).await;

    let loader = test_loader(&server.uri(), &server.uri(), 0);
    let loaded = loader.load("cities", &api_view()).await.unwrap();
    assert_eq!(loaded.records.len(), 2);
    assert_eq!(loaded.warnings.len(), 1);
}

#[tokio::test]
async fn api_failure_without_file_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/only"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let descriptor = SourceDescriptor {
        dataset_via_api: Some("/api/only".to_owned()),
        ..SourceDescriptor::default()
    };
    let loader = test_loader(&server.uri(), &server.uri(), 0);
    let err = loader.load("only", &descriptor).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn transient_file_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities.csv"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_csv(&server).await;

    let descriptor = SourceDescriptor {
        dataset: Some("cities.csv".to_owned()),
        ..SourceDescriptor::default()
    };
    let loader = test_loader(&server.uri(), &server.uri(), 1);
    let loaded = loader.load("cities", &descriptor).await.unwrap();
    assert_eq!(loaded.records.len(), 2);
}

#[tokio::test]
async fn json_file_from_local_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("parks.json")).unwrap();
    write!(file, r#"[{{"Name": "Stone Mountain", "lat": 33.8, "lng": -84.1}}]"#).unwrap();

    let descriptor = SourceDescriptor {
        dataset: Some("parks.json".to_owned()),
        ..SourceDescriptor::default()
    };
    let loader = test_loader(dir.path().to_str().unwrap(), "http://unused.test", 0);
    let loaded = loader.load("parks", &descriptor).await.unwrap();
    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.records[0].number("lat"), Some(33.8));
}

#[tokio::test]
async fn missing_local_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = SourceDescriptor {
        dataset: Some("absent.csv".to_owned()),
        ..SourceDescriptor::default()
    };
    let loader = test_loader(dir.path().to_str().unwrap(), "http://unused.test", 0);
    let err = loader.load("absent", &descriptor).await.unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
}

#[tokio::test]
async fn offline_mode_reads_offline_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("snapshot.csv"), CITIES_CSV).unwrap();

    let descriptor = SourceDescriptor {
        dataset: Some("https://unreachable.invalid/live.csv".to_owned()),
        dataset_offline: Some("snapshot.csv".to_owned()),
        ..SourceDescriptor::default()
    };
    let loader = DatasetLoader::new(LoaderOptions {
        data_root: dir.path().to_str().unwrap().to_owned(),
        api_base: "http://unused.test".to_owned(),
        timeout_secs: 5,
        user_agent: "geolist-test/0.1".to_owned(),
        max_retries: 0,
        backoff_base_ms: 0,
        online: false,
    })
    .unwrap();
    let loaded = loader.load("cities", &descriptor).await.unwrap();
    assert_eq!(loaded.records.len(), 2);
}

#[tokio::test]
async fn view_without_sources_reports_no_source() {
    let loader = test_loader("./data", "http://unused.test", 0);
    let err = loader
        .load("ghost", &SourceDescriptor::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::NoSource { ref view } if view == "ghost"));
}
