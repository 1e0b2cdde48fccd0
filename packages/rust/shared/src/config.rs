//! Application configuration for hirepipe.
//!
//! User config lives at `~/.hirepipe/hirepipe.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HirePipeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "hirepipe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".hirepipe";

/// Base URL used when neither flag, environment nor config file sets one.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

// ---------------------------------------------------------------------------
// Config structs (matching hirepipe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend endpoint settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Stage store location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session naming.
    #[serde(default)]
    pub session: SessionConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the recruitment backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var that overrides `base_url` at startup.
    #[serde(default = "default_base_url_env")]
    pub base_url_env: String,

    /// Optional per-request timeout. Unset means the transport decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            base_url_env: default_base_url_env(),
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.into()
}
fn default_base_url_env() -> String {
    "HIREPIPE_API_BASE_URL".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the stage store database. A leading `~/` expands to home.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.hirepipe/stage-store.db".into()
}

/// `[session]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session used by the CLI when `--session` is not given.
    #[serde(default = "default_session_name")]
    pub default_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_name: default_session_name(),
        }
    }
}

fn default_session_name() -> String {
    "default".into()
}

// ---------------------------------------------------------------------------
// API settings (runtime, merged from config + env + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime settings for the remote operation client.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Parsed base URL every endpoint path is joined onto.
    pub base_url: Url,
    /// Per-request timeout, if any.
    pub timeout: Option<Duration>,
}

impl ApiSettings {
    /// Build settings for a known base URL with no timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout: None,
        })
    }

    /// Merge flag, environment value and config file, in that precedence.
    pub fn resolve(
        config: &AppConfig,
        flag: Option<&str>,
        env_value: Option<&str>,
    ) -> Result<Self> {
        let raw = flag
            .filter(|v| !v.trim().is_empty())
            .or(env_value.filter(|v| !v.trim().is_empty()))
            .unwrap_or(config.api.base_url.as_str());

        Ok(Self {
            base_url: parse_base_url(raw)?,
            timeout: config.api.request_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Resolve at startup, reading the environment variable named in the config.
    pub fn from_env(config: &AppConfig, flag: Option<&str>) -> Result<Self> {
        let env_value = std::env::var(&config.api.base_url_env).ok();
        let settings = Self::resolve(config, flag, env_value.as_deref())?;
        tracing::debug!(base_url = %settings.base_url, "resolved API base URL");
        Ok(settings)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| HirePipeError::config(format!("invalid API base URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HirePipeError::config(format!(
            "invalid API base URL '{raw}': unsupported scheme '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.hirepipe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HirePipeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.hirepipe/hirepipe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HirePipeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| HirePipeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HirePipeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HirePipeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HirePipeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| HirePipeError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("HIREPIPE_API_BASE_URL"));
        assert!(!toml_str.contains("request_timeout_secs"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[api]
base_url = "https://recruit.example.com"
request_timeout_secs = 45
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.api.base_url, "https://recruit.example.com");
        assert_eq!(config.api.base_url_env, "HIREPIPE_API_BASE_URL");
        assert_eq!(config.session.default_name, "default");
        assert!(config.storage.db_path.ends_with("stage-store.db"));
    }

    #[test]
    fn resolve_falls_back_to_localhost() {
        let settings = ApiSettings::resolve(&AppConfig::default(), None, None).unwrap();
        assert_eq!(settings.base_url.as_str(), "http://localhost:8000/");
        assert!(settings.timeout.is_none());
    }

    #[test]
    fn resolve_precedence() {
        let mut config = AppConfig::default();
        config.api.base_url = "http://config.local:9000".into();
        config.api.request_timeout_secs = Some(5);

        let from_env = ApiSettings::resolve(&config, None, Some("http://env.local:7000")).unwrap();
        assert_eq!(from_env.base_url.host_str(), Some("env.local"));
        assert_eq!(from_env.timeout, Some(Duration::from_secs(5)));

        let from_flag = ApiSettings::resolve(
            &config,
            Some("http://flag.local:1234"),
            Some("http://env.local:7000"),
        )
        .unwrap();
        assert_eq!(from_flag.base_url.host_str(), Some("flag.local"));

        let blank_env = ApiSettings::resolve(&config, None, Some("  ")).unwrap();
        assert_eq!(blank_env.base_url.host_str(), Some("config.local"));
    }

    #[test]
    fn resolve_rejects_bad_urls() {
        let err = ApiSettings::resolve(&AppConfig::default(), Some("not a url"), None).unwrap_err();
        assert!(err.to_string().contains("invalid API base URL"));

        let err = ApiSettings::new("ftp://files.example.com").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/tmp/store.db").unwrap(), PathBuf::from("/tmp/store.db"));
        let expanded = expand_home("~/x.db").unwrap();
        assert!(expanded.ends_with("x.db"));
        assert!(expanded.is_absolute());
    }
}
