//! Configuration management for the wreckvault application.
//!
//! This module handles loading and validating configuration settings from environment
//! variables, with sensible defaults.
//!
//! # Environment Variables
//!
//! - `WRECKVAULT_SERVER`: Base URL of the vault API (defaults to http://localhost:5000/api)
//! - `WRECKVAULT_DIR`: Directory for durable settings (defaults to ~/.config/wreckvault)
//! - `WRECKVAULT_SESSION_DIR`: Directory for the session snapshot; must be volatile storage
//! - `WRECKVAULT_LOG_FORMAT`: `text` or `json`
//! - `HOME`: Used for expanding the default settings directory path

use crate::constants::{
    DEFAULT_CONFIG_SUBDIR, DEFAULT_SERVER_URL, ENV_VAR_DIR, ENV_VAR_HOME, ENV_VAR_LOG_FORMAT,
    ENV_VAR_SERVER, ENV_VAR_SESSION_DIR, LOG_FORMAT_JSON, LOG_FORMAT_TEXT,
};
use crate::crypto::volatile_session_dir;
use crate::errors::{AppError, AppResult};
use reqwest::Url;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Configuration for the wreckvault application.
///
/// # Examples
///
/// Creating a configuration manually:
/// ```
/// use wreckvault::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     server_url: "https://vault.example.com/api".to_string(),
///     data_dir: PathBuf::from("/home/alice/.config/wreckvault"),
///     session_dir: None,
///     log_format: "text".to_string(),
/// };
/// assert!(config.validate().is_ok());
/// ```
pub struct Config {
    /// Base URL of the remote vault API, without a trailing slash.
    pub server_url: String,

    /// Durable directory for user preferences. Never holds secrets.
    pub data_dir: PathBuf,

    /// Volatile directory for the session snapshot.
    ///
    /// `None` disables session restoration; every command then needs a login.
    pub session_dir: Option<PathBuf>,

    /// Log output format: `text` or `json`.
    pub log_format: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url)
            .field("data_dir", &"[REDACTED_PATH]")
            .field("session_dir", &self.session_dir.as_ref().map(|_| "[REDACTED_PATH]"))
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_url: DEFAULT_SERVER_URL.to_string(),
            data_dir: PathBuf::from(""),
            session_dir: None,
            log_format: LOG_FORMAT_TEXT.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// Paths are expanded with `shellexpand`, so `~` and `$VAR` references work.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if path expansion fails or the result does
    /// not pass [`validate`](Self::validate).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wreckvault::Config;
    ///
    /// match Config::load() {
    ///     Ok(config) => println!("Using vault server {}", config.server_url),
    ///     Err(err) => eprintln!("Failed to load config: {}", err),
    /// }
    /// ```
    pub fn load() -> AppResult<Self> {
        let server_url = env::var(ENV_VAR_SERVER)
            .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let data_dir_str = env::var(ENV_VAR_DIR).unwrap_or_else(|_| {
            let home = env::var(ENV_VAR_HOME).unwrap_or_default();
            format!("{}/{}", home, DEFAULT_CONFIG_SUBDIR)
        });
        let data_dir = expand_path(&data_dir_str)?;

        let session_dir = match env::var(ENV_VAR_SESSION_DIR) {
            Ok(dir) if !dir.trim().is_empty() => Some(expand_path(&dir)?),
            _ => volatile_session_dir(),
        };

        let log_format = env::var(ENV_VAR_LOG_FORMAT)
            .map(|format| format.trim().to_lowercase())
            .unwrap_or_else(|_| LOG_FORMAT_TEXT.to_string());

        let config = Config {
            server_url,
            data_dir,
            session_dir,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the server URL is not an `http`/`https`
    /// URL, a directory is empty or relative, or the log format is unknown.
    pub fn validate(&self) -> AppResult<()> {
        let url = Url::parse(&self.server_url).map_err(|e| {
            AppError::Config(format!("Invalid server URL '{}': {}", self.server_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AppError::Config(format!(
                "Server URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Data directory path is empty".to_string()));
        }
        if !self.data_dir.is_absolute() {
            return Err(AppError::Config(
                "Data directory must be an absolute path".to_string(),
            ));
        }

        if let Some(session_dir) = &self.session_dir {
            if !session_dir.is_absolute() {
                return Err(AppError::Config(
                    "Session directory must be an absolute path".to_string(),
                ));
            }
        }

        if self.log_format != LOG_FORMAT_TEXT && self.log_format != LOG_FORMAT_JSON {
            return Err(AppError::Config(format!(
                "Unknown log format '{}'; expected '{}' or '{}'",
                self.log_format, LOG_FORMAT_TEXT, LOG_FORMAT_JSON
            )));
        }

        Ok(())
    }
}

fn expand_path(raw: &str) -> AppResult<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn valid() -> Config {
        Config {
            server_url: "http://localhost:5000/api".to_string(),
            data_dir: PathBuf::from("/tmp/wreckvault"),
            session_dir: None,
            log_format: LOG_FORMAT_TEXT.to_string(),
        }
    }

    fn clear_env() {
        for var in [ENV_VAR_SERVER, ENV_VAR_DIR, ENV_VAR_SESSION_DIR, ENV_VAR_LOG_FORMAT] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_debug_impl_redacts_paths() {
        let mut config = valid();
        config.data_dir = PathBuf::from("/home/username/private/vault");
        config.session_dir = Some(PathBuf::from("/run/user/1000/wreckvault"));

        let debug_output = format!("{:?}", config);
        assert!(debug_output.contains("[REDACTED_PATH]"));
        assert!(!debug_output.contains("/home/username/private/vault"));
        assert!(!debug_output.contains("/run/user/1000"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.server_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.server_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.data_dir = PathBuf::from("relative/path");
        assert!(config.validate().is_err());

        let mut config = valid();
        config.log_format = "yaml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        clear_env();

        let config = Config::load().expect("defaults should load");
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert!(config.data_dir.ends_with(DEFAULT_CONFIG_SUBDIR));
        assert_eq!(config.log_format, LOG_FORMAT_TEXT);
    }

    #[test]
    #[serial]
    fn test_load_with_overrides() {
        clear_env();
        let temp = tempdir().expect("tempdir");
        let data = temp.path().join("data");
        let session = temp.path().join("session");

        env::set_var(ENV_VAR_SERVER, "https://vault.example.com/api/");
        env::set_var(ENV_VAR_DIR, &data);
        env::set_var(ENV_VAR_SESSION_DIR, &session);
        env::set_var(ENV_VAR_LOG_FORMAT, "JSON");

        let config = Config::load();
        clear_env();

        let config = config.expect("overrides should load");
        assert_eq!(config.server_url, "https://vault.example.com/api");
        assert_eq!(config.data_dir, data);
        assert_eq!(config.session_dir, Some(session));
        assert_eq!(config.log_format, LOG_FORMAT_JSON);
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_server() {
        clear_env();
        env::set_var(ENV_VAR_SERVER, "localhost:5000");

        let result = Config::load();
        clear_env();

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
