//! # tb-config
//!
//! Runtime settings for the threadboard binary.
//!
//! Precedence, lowest first: built-in defaults, `threadboard.toml` (optional),
//! `THREADBOARD__*` environment variables. A `.env` file is read into the
//! environment before anything else.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "threadboard";
pub const ENV_PREFIX: &str = "THREADBOARD";
pub const ENV_FILE: &str = ".env";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Shape of the merged sources before secrets are wrapped.
#[derive(Debug, Deserialize)]
struct RawSettings {
    bind_address: String,
    port: u16,
    database_url: String,
    json_logs: bool,
}

pub struct Settings {
    pub bind_address: String,
    pub port: u16,
    /// May carry credentials for networked backends, so it is never logged.
    pub database_url: SecretString,
    /// Structured JSON log lines instead of human-readable ones.
    pub json_logs: bool,
    /// The `.env` file that was read, if any. Loading happens before logging
    /// is set up, so the binary reports it afterwards.
    pub env_file: Option<PathBuf>,
}

impl Settings {
    /// Loads `.env`, then the layered sources.
    pub fn load() -> Result<Self, ConfigError> {
        let env_file = load_env_file(ENV_FILE)?;
        let mut settings = Self::from_sources(
            DEFAULT_CONFIG_FILE,
            Environment::with_prefix(ENV_PREFIX).separator("__"),
        )?;
        settings.env_file = env_file;
        Ok(settings)
    }

    /// Builds settings from a named config file (extension optional) and an
    /// environment source.
    pub fn from_sources(file: &str, env: Environment) -> Result<Self, ConfigError> {
        let raw: RawSettings = Config::builder()
            .set_default("bind_address", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("database_url", "sqlite://threadboard.db")?
            .set_default("json_logs", false)?
            .add_source(File::with_name(file).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()?;

        if raw.database_url.is_empty() {
            return Err(ConfigError::Invalid("database_url must not be empty".into()));
        }

        Ok(Self {
            bind_address: raw.bind_address,
            port: raw.port,
            database_url: SecretString::from(raw.database_url),
            json_logs: raw.json_logs,
            env_file: None,
        })
    }
}

/// Reads `path` into the process environment. A missing file is not an
/// error; the path comes back only when something was read.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<Option<PathBuf>, ConfigError> {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => Ok(Some(path.to_path_buf())),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::Invalid(format!("{}: {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("TBTEST")
            .separator("__")
            .source(Some(source))
    }

    #[test]
    fn defaults_apply_without_sources() {
        let settings = Settings::from_sources("does-not-exist", env(&[])).unwrap();
        assert_eq!(settings.bind_address, "127.0.0.1");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.database_url.expose_secret(), "sqlite://threadboard.db");
        assert!(!settings.json_logs);
        assert!(settings.env_file.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_sources(
            "does-not-exist",
            env(&[
                ("TBTEST__PORT", "9000"),
                ("TBTEST__DATABASE_URL", "sqlite::memory:"),
                ("TBTEST__JSON_LOGS", "true"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.database_url.expose_secret(), "sqlite::memory:");
        assert!(settings.json_logs);
    }

    #[test]
    fn env_file_path_is_reported_back() {
        let path = std::env::temp_dir().join(format!("tb-config-{}.env", std::process::id()));
        std::fs::write(&path, "TB_CONFIG_ENV_FILE_MARKER=loaded\n").unwrap();

        let loaded = load_env_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.as_deref(), Some(path.as_path()));
        assert_eq!(std::env::var("TB_CONFIG_ENV_FILE_MARKER").unwrap(), "loaded");
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let path = std::env::temp_dir().join("tb-config-no-such-file.env");
        assert!(load_env_file(&path).unwrap().is_none());
    }

    #[test]
    fn empty_database_url_is_rejected() {
        let result = Settings::from_sources("does-not-exist", env(&[("TBTEST__DATABASE_URL", "")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
