use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}: {message}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("API {endpoint} returned no usable data: {reason}")]
    ApiRejected { endpoint: String, reason: String },

    #[error("view '{view}' has no dataset source to load")]
    NoSource { view: String },
}

impl IngestError {
    /// HTTP status behind the error, when there was a response at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            IngestError::Http(e) => e.status().map(|s| s.as_u16()),
            IngestError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
