use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{provider::openweather::DEFAULT_FORECAST_URL, response::ResponseFormat};

pub const DEFAULT_BIND: &str = "0.0.0.0:5050";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// OpenWeather credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_FORECAST_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OpenWeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub format: ResponseFormat,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// log_level = "info"
///
/// [openweather]
/// api_key = "..."
///
/// [server]
/// bind = "0.0.0.0:5050"
///
/// [response]
/// format = "rich"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub openweather: OpenWeatherConfig,
    pub server: ServerConfig,
    pub response: ResponseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            openweather: OpenWeatherConfig::default(),
            server: ServerConfig::default(),
            response: ResponseConfig::default(),
        }
    }
}

impl Config {
    /// Load config from `path` (or the platform default), or return defaults
    /// if the file doesn't exist yet. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        let mut cfg = Self::load_file(&path)?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Read `path` alone, without environment overrides.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// `OWM_KEY`, `OWM_BASE_URL`, `WEBHOOK_BIND`, `RESPONSE_FORMAT`, `RUST_LOG`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("OWM_KEY") {
            self.openweather.api_key = Some(key);
        }
        if let Some(url) = lookup("OWM_BASE_URL") {
            self.openweather.base_url = url;
        }
        if let Some(bind) = lookup("WEBHOOK_BIND") {
            self.server.bind = bind;
        }
        if let Some(format) = lookup("RESPONSE_FORMAT") {
            self.response.format = ResponseFormat::try_from(format.as_str())
                .context("Invalid RESPONSE_FORMAT environment variable")?;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = level;
        }

        Ok(())
    }

    /// Save config to `path` (or the platform default), creating parent
    /// directories as needed. Returns the path written.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-fulfillment", "weather-webhook")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather.api_key = Some(api_key);
    }

    /// Returns the OpenWeather API key, if present and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.openweather
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn is_provider_configured(&self) -> bool {
        self.api_key().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_openweather() {
        let cfg = Config::default();

        assert_eq!(cfg.openweather.base_url, DEFAULT_FORECAST_URL);
        assert_eq!(cfg.server.bind, DEFAULT_BIND);
        assert_eq!(cfg.response.format, ResponseFormat::Text);
        assert!(!cfg.is_provider_configured());
    }

    #[test]
    fn set_api_key_configures_provider() {
        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());

        assert_eq!(cfg.api_key(), Some("OPEN_KEY"));
        assert!(cfg.is_provider_configured());
    }

    #[test]
    fn blank_api_key_is_not_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("   ".into());

        assert_eq!(cfg.api_key(), None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [openweather]
            api_key = "FILE_KEY"

            [response]
            format = "rich"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.api_key(), Some("FILE_KEY"));
        assert_eq!(cfg.openweather.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.response.format, ResponseFormat::Rich);
        assert_eq!(cfg.server.bind, DEFAULT_BIND);
        assert_eq!(cfg.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());

        cfg.apply_env_overrides(env(&[
            ("OWM_KEY", "ENV_KEY"),
            ("WEBHOOK_BIND", "127.0.0.1:8080"),
            ("RESPONSE_FORMAT", "Rich"),
            ("RUST_LOG", "debug"),
            ("OWM_BASE_URL", ""),
        ]))
        .unwrap();

        assert_eq!(cfg.api_key(), Some("ENV_KEY"));
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.response.format, ResponseFormat::Rich);
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.openweather.base_url, DEFAULT_FORECAST_URL);
    }

    #[test]
    fn invalid_response_format_env_is_an_error() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env_overrides(env(&[("RESPONSE_FORMAT", "html")]))
            .unwrap_err();

        assert!(err.to_string().contains("RESPONSE_FORMAT"));
    }

    #[test]
    fn save_and_load_roundtrip_through_file() {
        let dir = std::env::temp_dir().join(format!("weather-webhook-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("SAVED".into());
        cfg.response.format = ResponseFormat::Rich;
        let written = cfg.save(Some(&path)).unwrap();
        assert_eq!(written, path);

        let loaded = Config::load_file(&path).unwrap();
        assert_eq!(loaded.api_key(), Some("SAVED"));
        assert_eq!(loaded.response.format, ResponseFormat::Rich);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("weather-webhook-does-not-exist.toml");
        let cfg = Config::load_file(&path).unwrap();
        assert!(!cfg.is_provider_configured());
    }
}
