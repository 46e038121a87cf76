//! Integration tests for `NominatimGeocoder` against a `wiremock` server.

use geolist_enrich::{EnrichError, Geocoder, NominatimGeocoder};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_geocoder(server: &MockServer) -> NominatimGeocoder {
    NominatimGeocoder::new(&server.uri(), 5, "geolist-test/0.1")
        .expect("failed to build test geocoder")
}

#[tokio::test]
async fn first_hit_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Athens, GA"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "33.9519347", "lon": "-83.357567", "display_name": "Athens, Georgia"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let point = test_geocoder(&server)
        .geocode("Athens, GA")
        .await
        .unwrap()
        .expect("expected a hit");
    assert!((point.latitude - 33.951_934_7).abs() < 1e-9);
    assert!((point.longitude + 83.357_567).abs() < 1e-9);
}

#[tokio::test]
async fn empty_result_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = test_geocoder(&server).geocode("Nowhere, GA").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_geocoder(&server).geocode("Macon, GA").await.unwrap_err();
    assert!(matches!(err, EnrichError::GeocoderStatus { status: 503, .. }));
}

#[tokio::test]
async fn non_numeric_coordinates_are_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"lat": "north", "lon": "1"}])))
        .mount(&server)
        .await;

    let err = test_geocoder(&server).geocode("x").await.unwrap_err();
    assert!(matches!(err, EnrichError::GeocoderResponse { .. }));
}
