//! Configuration loader
//!
//! Loads the client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If a credential variable is unset, falls back to a config file; an
//!    invalid optional variable is an error, not a reason to fall back
//! 3. Probes the working directory and its parents for that file
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `NAMECHEAP_API_USER`: API user (required)
//! - `NAMECHEAP_API_KEY`: API key (required)
//! - `NAMECHEAP_USERNAME`: Account the calls act on (required)
//! - `NAMECHEAP_CLIENT_IP`: Whitelisted client IP (required)
//! - `NAMECHEAP_SANDBOX`: Use the sandbox endpoint (true/false)
//! - `NAMECHEAP_BASE_URL`: Endpoint override
//! - `NAMECHEAP_RATE_LIMIT_RPS`: Token refill rate per second
//! - `NAMECHEAP_RATE_LIMIT_BURST`: Token bucket capacity
//!
//! Every other setting keeps its default when loading from the environment.
//!
//! ## File Locations
//! `registrar.toml` then `registrar.json`, in the current working directory
//! and then in each of its two parents.

use std::path::{Path, PathBuf};

use registrar_domain::{ClientConfig, Credentials, RegistrarError, Result};

pub const CONFIG_FILE_NAMES: [&str; 2] = ["registrar.toml", "registrar.json"];

const PROBE_DEPTH: usize = 3;

/// Load configuration with automatic fallback strategy
///
/// The result is validated before it is returned.
///
/// # Errors
/// Returns `RegistrarError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A field fails validation
pub fn load() -> Result<ClientConfig> {
    let config = match env_credentials() {
        Some(credentials) => {
            let config = config_from_env(credentials)?;
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        None => {
            tracing::debug!("Credential variables incomplete, trying config file");
            load_from_file(None)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `RegistrarError::Config` if a credential variable is missing or
/// an optional variable has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let credentials = Credentials::new(
        env_var("NAMECHEAP_API_USER")?,
        env_var("NAMECHEAP_API_KEY")?,
        env_var("NAMECHEAP_USERNAME")?,
        env_var("NAMECHEAP_CLIENT_IP")?,
    );
    config_from_env(credentials)
}

/// Credentials when all four variables are set.
fn env_credentials() -> Option<Credentials> {
    Some(Credentials::new(
        optional_env("NAMECHEAP_API_USER")?,
        optional_env("NAMECHEAP_API_KEY")?,
        optional_env("NAMECHEAP_USERNAME")?,
        optional_env("NAMECHEAP_CLIENT_IP")?,
    ))
}

fn config_from_env(credentials: Credentials) -> Result<ClientConfig> {
    let mut config = ClientConfig::new(credentials);

    config.endpoint.sandbox = env_bool("NAMECHEAP_SANDBOX", false);
    config.endpoint.base_url = optional_env("NAMECHEAP_BASE_URL");

    if let Some(rate) = optional_env("NAMECHEAP_RATE_LIMIT_RPS") {
        config.rate_limit.requests_per_second = rate.parse::<f64>().map_err(|e| {
            RegistrarError::Config(format!("Invalid NAMECHEAP_RATE_LIMIT_RPS: {e}"))
        })?;
    }
    if let Some(burst) = optional_env("NAMECHEAP_RATE_LIMIT_BURST") {
        config.rate_limit.burst = burst.parse::<u32>().map_err(|e| {
            RegistrarError::Config(format!("Invalid NAMECHEAP_RATE_LIMIT_BURST: {e}"))
        })?;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations with
/// [`probe_config_paths`]. The format is picked by file extension.
///
/// # Errors
/// Returns `RegistrarError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RegistrarError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            RegistrarError::Config(format!(
                "No {} found in the working directory or its parents",
                CONFIG_FILE_NAMES.join(" or ")
            ))
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RegistrarError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration text; `.toml` and `.json` are understood.
pub fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RegistrarError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RegistrarError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RegistrarError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file, starting at the working directory.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    probe_from(&cwd)
}

/// First existing config file in `start` or one of its parents.
pub fn probe_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(PROBE_DEPTH)
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        RegistrarError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Unset and blank variables both read as `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: [&str; 8] = [
        "NAMECHEAP_API_USER",
        "NAMECHEAP_API_KEY",
        "NAMECHEAP_USERNAME",
        "NAMECHEAP_CLIENT_IP",
        "NAMECHEAP_SANDBOX",
        "NAMECHEAP_BASE_URL",
        "NAMECHEAP_RATE_LIMIT_RPS",
        "NAMECHEAP_RATE_LIMIT_BURST",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn set_credentials() {
        std::env::set_var("NAMECHEAP_API_USER", "apiuser");
        std::env::set_var("NAMECHEAP_API_KEY", "secret");
        std::env::set_var("NAMECHEAP_USERNAME", "owner");
        std::env::set_var("NAMECHEAP_CLIENT_IP", "203.0.113.7");
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TEST_REGISTRAR_BOOL_ON", "ON");
        std::env::set_var("TEST_REGISTRAR_BOOL_OFF", "off");
        std::env::remove_var("TEST_REGISTRAR_BOOL_MISSING");

        assert!(env_bool("TEST_REGISTRAR_BOOL_ON", false));
        assert!(!env_bool("TEST_REGISTRAR_BOOL_OFF", true));
        assert!(env_bool("TEST_REGISTRAR_BOOL_MISSING", true));

        std::env::remove_var("TEST_REGISTRAR_BOOL_ON");
        std::env::remove_var("TEST_REGISTRAR_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_credentials();
        std::env::set_var("NAMECHEAP_SANDBOX", "true");
        std::env::set_var("NAMECHEAP_RATE_LIMIT_RPS", "0.5");
        std::env::set_var("NAMECHEAP_RATE_LIMIT_BURST", "2");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.credentials.api_key, "secret");
        assert_eq!(config.credentials.client_ip, "203.0.113.7");
        assert!(config.endpoint.sandbox);
        assert_eq!(config.endpoint.base_url, None);
        assert_eq!(config.rate_limit.requests_per_second, 0.5);
        assert_eq!(config.rate_limit.burst, 2);
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_credentials();
        std::env::remove_var("NAMECHEAP_API_KEY");

        let result = load_from_env();
        clear_env();

        match result {
            Err(RegistrarError::Config(message)) => assert!(message.contains("NAMECHEAP_API_KEY")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_credentials();
        std::env::set_var("NAMECHEAP_RATE_LIMIT_BURST", "many");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(RegistrarError::Config(_))));
    }

    #[test]
    fn test_load_reports_invalid_optional_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_credentials();
        std::env::set_var("NAMECHEAP_RATE_LIMIT_RPS", "fast");

        let result = load();
        clear_env();

        match result {
            Err(RegistrarError::Config(message)) => {
                assert!(message.contains("NAMECHEAP_RATE_LIMIT_RPS"), "got {message}");
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_validates_env_config() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_credentials();
        std::env::set_var("NAMECHEAP_RATE_LIMIT_RPS", "1e-20");

        let result = load();
        clear_env();

        match result {
            Err(RegistrarError::Config(message)) => {
                assert!(message.contains("requests_per_second"), "got {message}");
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_env_credentials_need_all_four() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_credentials();
        assert!(env_credentials().is_some());

        std::env::set_var("NAMECHEAP_CLIENT_IP", "  ");
        let partial = env_credentials();
        clear_env();

        assert!(partial.is_none());
    }

    #[test]
    fn test_parse_config_toml_with_defaults() {
        let toml_content = r#"
[credentials]
api_user = "apiuser"
api_key = "secret"
username = "owner"
client_ip = "203.0.113.7"

[rate_limit]
requests_per_second = 1.0
"#;
        let config =
            parse_config(toml_content, Path::new("registrar.toml")).expect("valid TOML");

        assert_eq!(config.credentials.username, "owner");
        assert_eq!(config.rate_limit.requests_per_second, 1.0);
        assert_eq!(config.rate_limit.burst, 5);
        assert_eq!(config.circuit_breaker.max_failures, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_json() {
        let json_content = r#"{
            "credentials": {
                "api_user": "apiuser",
                "api_key": "secret",
                "username": "owner",
                "client_ip": "203.0.113.7"
            },
            "endpoint": { "sandbox": true },
            "retry": { "max_attempts": 2 }
        }"#;
        let config =
            parse_config(json_content, Path::new("registrar.json")).expect("valid JSON");

        assert!(config.endpoint.sandbox);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 100);
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("credentials: {}", Path::new("registrar.yaml"));
        assert!(matches!(result, Err(RegistrarError::Config(_))));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/registrar.toml")));
        assert!(matches!(result, Err(RegistrarError::Config(_))));
    }

    #[test]
    fn test_probe_finds_file_in_parent() {
        let root = TempDir::new().expect("temp dir");
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("nested dirs");
        std::fs::write(root.path().join("a").join("registrar.json"), "{}").expect("write");

        let found = probe_from(&nested).expect("config found");
        assert_eq!(found, root.path().join("a").join("registrar.json"));
    }

    #[test]
    fn test_probe_prefers_toml() {
        let root = TempDir::new().expect("temp dir");
        std::fs::write(root.path().join("registrar.json"), "{}").expect("write");
        std::fs::write(root.path().join("registrar.toml"), "").expect("write");

        assert_eq!(probe_from(root.path()), Some(root.path().join("registrar.toml")));
    }
}
