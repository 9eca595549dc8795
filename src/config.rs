use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BASE_URL_ENV: &str = "ECONEWS_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub news: NewsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Knobs for the term polling session started when an article is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
    /// Polling ends once at least this many terms have been observed.
    pub term_threshold: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_attempts: 10,
            term_threshold: 2,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub page_size: u32,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self { page_size: 12 }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("econews").join("config.toml"))
    }

    /// Loads the config from `path`, or from the default location when no
    /// path is given. A missing default file yields the built-in defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => {
                    Self::from_toml_str(&std::fs::read_to_string(path)?)?
                }
                _ => Self::default(),
            },
        };

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.override_base_url(Some(url));
        }

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn override_base_url(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.polling.interval(), Duration::from_millis(2000));
        assert_eq!(config.polling.max_attempts, 10);
        assert_eq!(config.polling.term_threshold, 2);
        assert_eq!(config.news.page_size, 12);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [api]
            base_url = "https://news.example.com"

            [polling]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://news.example.com");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.polling.max_attempts, 3);
        assert_eq!(config.polling.interval_ms, 2000);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[api\nbase_url = 1").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_override_base_url_ignores_blank() {
        let mut config = Config::default();
        config.override_base_url(Some("   ".to_string()));
        assert_eq!(config.api.base_url, "http://localhost:8080");

        config.override_base_url(Some(" http://10.0.0.1:8080 ".to_string()));
        assert_eq!(config.api.base_url, "http://10.0.0.1:8080");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[news]\npage_size = 20\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.news.page_size, 20);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
