//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/taskmirror/config.toml)
//! 3. Environment variables (TASKMIRROR_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::sync::HttpTransport;

/// Environment variable prefix
const ENV_PREFIX: &str = "TASKMIRROR";

/// Root of the public sync API
pub const DEFAULT_BASE_URL: &str = "https://api.todoist.com/sync/v9/";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API root; the sync endpoint is resolved relative to it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Personal API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Directory for data storage (snapshot, debug log)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log file (defaults to {data_dir}/debug.log)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            data_dir: default_data_dir(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TASKMIRROR_API_TOKEN, TASKMIRROR_BASE_URL,
    ///    TASKMIRROR_DATA_DIR, TASKMIRROR_LOG_FILE)
    /// 2. Config file (~/.config/taskmirror/config.toml or TASKMIRROR_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit path when given, otherwise from the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // TASKMIRROR_BASE_URL
        if let Ok(val) = std::env::var(format!("{}_BASE_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.base_url = val;
            }
        }

        // TASKMIRROR_API_TOKEN
        if let Ok(val) = std::env::var(format!("{}_API_TOKEN", ENV_PREFIX)) {
            self.api_token = if val.is_empty() { None } else { Some(val) };
        }

        // TASKMIRROR_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // TASKMIRROR_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() { None } else { Some(PathBuf::from(val)) };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TASKMIRROR_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskmirror")
            .join("config.toml")
    }

    /// Get the path to the persisted snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("snapshot.json")
    }

    /// Get the path of the debug log
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }

    /// Full URL of the sync endpoint
    pub fn sync_endpoint(&self) -> Result<Url> {
        if !self.base_url.ends_with('/') {
            bail!(
                "base_url must have a trailing slash, but '{}' does not",
                self.base_url
            );
        }
        let base = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.base_url))?;
        base.join("sync")
            .with_context(|| format!("Invalid base_url: {}", self.base_url))
    }

    /// Build an authenticated transport for the configured API
    pub fn transport(&self) -> Result<HttpTransport> {
        let token = match self.api_token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => bail!(
                "No API token configured. Set {}_API_TOKEN or run `taskmirror config set api_token <token>`.",
                ENV_PREFIX
            ),
        };
        let transport = HttpTransport::new(&self.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.base_url))?;
        Ok(transport.with_auth_token(token))
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskmirror")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            // Clear all the vars
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "TASKMIRROR_BASE_URL",
        "TASKMIRROR_API_TOKEN",
        "TASKMIRROR_DATA_DIR",
        "TASKMIRROR_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_token.is_none());
        assert!(config.data_dir.ends_with("taskmirror"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config {
            data_dir: PathBuf::from("/data/tm"),
            ..Config::default()
        };
        assert_eq!(config.snapshot_path(), PathBuf::from("/data/tm/snapshot.json"));
        assert_eq!(config.log_path(), PathBuf::from("/data/tm/debug.log"));

        let config = Config {
            log_file: Some(PathBuf::from("/var/log/tm.log")),
            ..config
        };
        assert_eq!(config.log_path(), PathBuf::from("/var/log/tm.log"));
    }

    #[test]
    fn test_sync_endpoint() {
        let config = Config::default();
        assert_eq!(
            config.sync_endpoint().unwrap().as_str(),
            "https://api.todoist.com/sync/v9/sync"
        );

        let config = Config {
            base_url: "https://api.todoist.com/sync/v9".to_string(),
            ..Config::default()
        };
        let err = config.sync_endpoint().unwrap_err();
        assert!(err.to_string().contains("trailing slash"));
    }

    #[test]
    fn test_transport_requires_token() {
        let config = Config::default();
        assert!(config.transport().is_err());

        let config = Config {
            api_token: Some("secret".to_string()),
            ..Config::default()
        };
        let transport = config.transport().unwrap();
        assert_eq!(
            transport.endpoint().as_str(),
            "https://api.todoist.com/sync/v9/sync"
        );
    }

    #[test]
    fn test_env_override_token_and_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("TASKMIRROR_API_TOKEN", "abc123");
        env::set_var("TASKMIRROR_BASE_URL", "http://localhost:8080/");
        config.apply_env_overrides();
        assert_eq!(config.api_token.as_deref(), Some("abc123"));
        assert_eq!(config.base_url, "http://localhost:8080/");

        // Empty token clears it
        env::set_var("TASKMIRROR_API_TOKEN", "");
        config.apply_env_overrides();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_env_override_data_dir_and_log() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("TASKMIRROR_DATA_DIR", "/tmp/taskmirror-test");
        env::set_var("TASKMIRROR_LOG_FILE", "/tmp/tm.log");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/taskmirror-test"));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/tm.log")));
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            base_url = "http://example.com/api/"
            api_token = "t0k3n"
            data_dir = "/custom/data"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.base_url, "http://example.com/api/");
        assert_eq!(config.api_token.as_deref(), Some("t0k3n"));
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            api_token: Some("secret".to_string()),
            data_dir: temp_dir.path().join("data"),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.api_token.as_deref(), Some("secret"));
        assert_eq!(loaded.data_dir, temp_dir.path().join("data"));
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("TASKMIRROR_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_token.is_none());
    }
}
