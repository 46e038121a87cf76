use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub views_path: PathBuf,
    /// Directory or base URL that relative dataset paths resolve against.
    pub data_root: String,
    /// Base URL that relative fast-API endpoints resolve against.
    pub api_base: String,
    pub geocoder_url: String,
    pub cache_dir: PathBuf,
    pub cache_namespace: String,
    pub page_size: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Pause between geocoder calls during a refresh.
    pub geocode_delay_ms: u64,
    pub online_mode: bool,
    pub always_load: bool,
    pub region_filtering: bool,
}
