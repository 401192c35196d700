//! Application configuration.
//!
//! Layering: built-in defaults, then an optional TOML file, then `PACKTRACK_*`
//! environment variables.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "PACKTRACK_";

/// SQLite file next to the working directory, created on first use.
pub const DEFAULT_CACHE_URL: &str = "sqlite://packtrack.db?mode=rwc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Listen address for the HTTP ingress.
    pub bind: String,
    /// Primary (remote) Postgres store. When unset the cache is the only store.
    pub database_url: Option<String>,
    /// Local SQLite cache used as fallback. Must outlive the process so
    /// one-shot commands and restarts see earlier writes.
    pub cache_url: String,
    /// Shared passcode unlocking protected routes. Unset disables auth.
    pub passcode: Option<String>,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            database_url: None,
            cache_url: DEFAULT_CACHE_URL.to_string(),
            passcode: None,
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `packtrack_db=debug,info`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(CoreError::Config(format!("unknown log format: {other}"))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> CoreResult<Self> {
        toml::from_str(raw).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load defaults, the optional file at `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    CoreError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Override fields from `PACKTRACK_*` variables. An empty value clears an
    /// optional field.
    pub fn apply_env<I>(&mut self, vars: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "BIND" => self.bind = value,
                "DATABASE_URL" => self.database_url = optional(value),
                "CACHE_URL" => self.cache_url = value,
                "PASSCODE" => self.passcode = optional(value),
                "LOG_LEVEL" => self.log.level = value,
                "LOG_FORMAT" => self.log.format = value.parse()?,
                _ => {}
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> CoreResult<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| CoreError::Config(format!("invalid bind address {:?}: {e}", self.bind)))
    }
}

fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_file_values_override_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            bind = "0.0.0.0:8080"
            passcode = "open-sesame"

            [log]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.passcode.as_deref(), Some("open-sesame"));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.cache_url, DEFAULT_CACHE_URL);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(AppConfig::from_toml_str("bnd = \"x\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig {
            passcode: Some("from-file".into()),
            ..AppConfig::default()
        };
        config
            .apply_env(vars(&[
                ("PACKTRACK_DATABASE_URL", "postgres://db/ops"),
                ("PACKTRACK_PASSCODE", ""),
                ("PACKTRACK_LOG_FORMAT", "JSON"),
                ("HOME", "/root"),
            ]))
            .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://db/ops"));
        assert_eq!(config.passcode, None);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_env(vars(&[("PACKTRACK_LOG_FORMAT", "xml")]))
            .is_err());

        config.bind = "not an address".into();
        assert!(matches!(config.bind_addr(), Err(CoreError::Config(_))));
    }
}
