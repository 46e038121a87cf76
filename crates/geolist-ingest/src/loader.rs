//! Dataset loading from files, URLs and the fast API.
//!
//! Relative dataset paths resolve against the data root, which may be a
//! local directory or a base URL. Relative API endpoints resolve against
//! the API base. When a view's fast API fails (transport error, non-2xx,
//! `success: false`, or an empty `data` array) the loader falls back to the
//! view's file and reports the failure as a [`LoadWarning`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use geolist_core::{AppConfig, DataFormat, Record, SourceDescriptor};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::IngestError;
use crate::retry::retry_with_backoff;
use crate::tabular::{parse_payload, parse_structured};

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub data_root: String,
    pub api_base: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub online: bool,
}

impl From<&AppConfig> for LoaderOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            data_root: config.data_root.clone(),
            api_base: config.api_base.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            online: config.online_mode,
        }
    }
}

/// Where a loaded dataset actually came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    Api { endpoint: String },
    File { location: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    ApiFallback {
        endpoint: String,
        status: Option<u16>,
        message: String,
        fallback: String,
    },
    /// The reference table could not be loaded; records stay unmerged.
    ReferenceUnavailable { path: String, message: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::ApiFallback {
                endpoint,
                status,
                message,
                fallback,
            } => {
                write!(f, "API {endpoint} failed")?;
                if let Some(status) = status {
                    write!(f, " (HTTP {status})")?;
                }
                write!(f, ": {message}; showing {fallback} instead")
            }
            LoadWarning::ReferenceUnavailable { path, message } => {
                write!(f, "reference table {path} unavailable: {message}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub records: Vec<Record>,
    pub origin: DataOrigin,
    pub warnings: Vec<LoadWarning>,
}

/// A dataset location after resolution against the data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(String),
    File(PathBuf),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Url(url) => f.write_str(url),
            Location::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn is_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone)]
pub struct DatasetLoader {
    client: Client,
    data_root: String,
    api_base: String,
    max_retries: u32,
    backoff_base_ms: u64,
    online: bool,
}

impl DatasetLoader {
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built.
    pub fn new(options: LoaderOptions) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .user_agent(options.user_agent)
            .build()?;
        Ok(Self {
            client,
            data_root: options.data_root,
            api_base: options.api_base,
            max_retries: options.max_retries,
            backoff_base_ms: options.backoff_base_ms,
            online: options.online,
        })
    }

    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, IngestError> {
        Self::new(LoaderOptions::from(config))
    }

    #[must_use]
    pub fn online(&self) -> bool {
        self.online
    }

    #[must_use]
    pub fn resolve_location(&self, path: &str) -> Location {
        if is_url(path) {
            Location::Url(path.to_owned())
        } else if is_url(&self.data_root) {
            Location::Url(join_url(&self.data_root, path))
        } else {
            Location::File(PathBuf::from(&self.data_root).join(path))
        }
    }

    #[must_use]
    pub fn api_url(&self, endpoint: &str) -> String {
        if is_url(endpoint) {
            endpoint.to_owned()
        } else {
            join_url(&self.api_base, endpoint)
        }
    }

    /// Loads the records for one view, trying the fast API first.
    ///
    /// # Errors
    ///
    /// Returns the API error when there is no file to fall back to, the file
    /// error when the file cannot be loaded, and [`IngestError::NoSource`]
    /// when the view has neither.
    pub async fn load(
        &self,
        view: &str,
        descriptor: &SourceDescriptor,
    ) -> Result<LoadedDataset, IngestError> {
        let file = descriptor.file_path(self.online);

        let mut warnings = Vec::new();
        if let Some(endpoint) = descriptor.fast_api() {
            let endpoint = self.api_url(endpoint);
            match self.fetch_api_records(&endpoint).await {
                Ok(records) => {
                    tracing::info!(view, endpoint = %endpoint, count = records.len(), "loaded from API");
                    return Ok(LoadedDataset {
                        records,
                        origin: DataOrigin::Api { endpoint },
                        warnings,
                    });
                }
                Err(err) => {
                    let Some(path) = file else {
                        return Err(err);
                    };
                    let warning = LoadWarning::ApiFallback {
                        endpoint,
                        status: err.status(),
                        message: err.to_string(),
                        fallback: path.to_owned(),
                    };
                    tracing::warn!(view, warning = %warning, "API load failed, using file");
                    warnings.push(warning);
                }
            }
        }

        let Some(path) = file else {
            return Err(IngestError::NoSource {
                view: view.to_owned(),
            });
        };
        let location = self.resolve_location(path);
        let records = self
            .fetch_location(&location, descriptor.file_format(path))
            .await?;
        tracing::info!(view, location = %location, count = records.len(), "loaded from file");
        Ok(LoadedDataset {
            records,
            origin: DataOrigin::File {
                location: location.to_string(),
            },
            warnings,
        })
    }

    /// Loads a reference geography table; format follows the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or parsed.
    pub async fn fetch_reference(&self, path: &str) -> Result<Vec<Record>, IngestError> {
        let location = self.resolve_location(path);
        self.fetch_location(&location, DataFormat::from_path(path))
            .await
    }

    /// Reads a file or URL and parses it as `format`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Io`] for unreadable files, HTTP errors for
    /// URLs, and [`IngestError::Deserialize`] for malformed JSON.
    pub async fn fetch_location(
        &self,
        location: &Location,
        format: DataFormat,
    ) -> Result<Vec<Record>, IngestError> {
        let origin = location.to_string();
        let text = match location {
            Location::Url(url) => self.get_text(url).await?,
            Location::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| IngestError::Io {
                        path: origin.clone(),
                        source: e,
                    })?
            }
        };
        parse_payload(&text, format, &origin)
    }

    /// Fetches an API endpoint answering `{"success": bool, "data": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ApiRejected`] when `success` is false or `data`
    /// holds no records, and the transport error otherwise.
    pub async fn fetch_api_records(&self, endpoint: &str) -> Result<Vec<Record>, IngestError> {
        let text = self.get_text(endpoint).await?;
        let envelope: ApiEnvelope =
            serde_json::from_str(&text).map_err(|e| IngestError::Deserialize {
                context: endpoint.to_owned(),
                source: e,
            })?;
        if !envelope.success {
            return Err(IngestError::ApiRejected {
                endpoint: endpoint.to_owned(),
                reason: envelope
                    .error
                    .unwrap_or_else(|| "response reported success=false".to_owned()),
            });
        }
        let records = parse_structured(envelope.data);
        if records.is_empty() {
            return Err(IngestError::ApiRejected {
                endpoint: endpoint.to_owned(),
                reason: "response contained no records".to_owned(),
            });
        }
        Ok(records)
    }

    async fn get_text(&self, url: &str) -> Result<String, IngestError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(IngestError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                    message: error_detail(&body),
                });
            }
            Ok(response.text().await?)
        })
        .await
    }
}

/// Pulls `error`/`message` out of a JSON error body, else a short excerpt.
fn error_detail(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(detail) = parsed.error.or(parsed.message) {
            return detail;
        }
    }
    body.chars().take(200).collect()
}
