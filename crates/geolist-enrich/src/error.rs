use geolist_ingest::IngestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder returned HTTP {status} for '{query}'")]
    GeocoderStatus { status: u16, query: String },

    #[error("geocoder response for '{query}' is malformed: {reason}")]
    GeocoderResponse { query: String, reason: String },

    #[error("failed to write {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error for {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot refresh view '{view}': {reason}")]
    RefreshUnavailable { view: String, reason: String },
}
