use geolist_enrich::EnrichError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] EnrichError),

    #[error("session cache I/O error at {path}: {source}")]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("session cache entry {path} is corrupt: {source}")]
    CacheFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no view is loaded")]
    NoActiveView,
}
