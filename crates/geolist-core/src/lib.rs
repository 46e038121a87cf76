pub mod app_config;
pub mod config;
pub mod record;
pub mod regions;
pub mod views;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use record::{value_text, Record, LATITUDE, LONGITUDE};
pub use views::{
    load_views, load_views_or_embedded, AlwaysLoad, DataFormat, Resolution, SourceDescriptor, ViewCatalog,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read view catalog {path}: {source}")]
    ViewsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse view catalog {path}: {reason}")]
    ViewsFileParse { path: String, reason: String },

    #[error("view catalog validation failed: {0}")]
    Validation(String),
}
