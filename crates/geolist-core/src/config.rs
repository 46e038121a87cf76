use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        parse_flag(&or_default(var, default)).ok_or_else(|| {
            invalid(
                var,
                "expected one of true/false/1/0/yes/no/on/off".to_string(),
            )
        })
    };

    let env = parse_environment(&or_default("GEOLIST_ENV", "development"))?;
    let log_level = or_default("GEOLIST_LOG_LEVEL", "info");
    let views_path = PathBuf::from(or_default("GEOLIST_VIEWS_PATH", "./config/views.json"));
    let data_root = or_default("GEOLIST_DATA_ROOT", "./data");
    let api_base = or_default("GEOLIST_API_BASE", "http://localhost:8081");
    let geocoder_url = or_default(
        "GEOLIST_GEOCODER_URL",
        "https://nominatim.openstreetmap.org",
    );
    let cache_dir = PathBuf::from(or_default("GEOLIST_CACHE_DIR", "./.geolist-cache"));
    let cache_namespace = or_default("GEOLIST_CACHE_NAMESPACE", "default");

    let page_size = or_default("GEOLIST_PAGE_SIZE", "500")
        .parse::<usize>()
        .map_err(|e| invalid("GEOLIST_PAGE_SIZE", e.to_string()))?;
    if page_size == 0 {
        return Err(invalid("GEOLIST_PAGE_SIZE", "must be at least 1".to_string()));
    }

    let request_timeout_secs = parse_u64("GEOLIST_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("GEOLIST_USER_AGENT", "geolist/0.1 (location-lists)");
    let max_retries = parse_u32("GEOLIST_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("GEOLIST_RETRY_BACKOFF_BASE_MS", "500")?;
    let geocode_delay_ms = parse_u64("GEOLIST_GEOCODE_DELAY_MS", "1000")?;
    let online_mode = parse_bool("GEOLIST_ONLINE_MODE", "true")?;
    let always_load = parse_bool("GEOLIST_ALWAYS_LOAD", "true")?;
    let region_filtering = parse_bool("GEOLIST_REGION_FILTERING", "true")?;

    Ok(AppConfig {
        env,
        log_level,
        views_path,
        data_root,
        api_base,
        geocoder_url,
        cache_dir,
        cache_namespace,
        page_size,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        geocode_delay_ms,
        online_mode,
        always_load,
        region_filtering,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GEOLIST_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
