//! Configuration module
//!
//! Handles loading and managing configuration.

pub mod env;
mod file;

use anyhow::{Context, Result};
use http::Uri;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use env::EnvConfig;
use file::find_config;

use crate::http::TransportSettings;
use crate::models::split_tags;
use crate::output::OutputFormat;

/// Default benchmark target
pub const DEFAULT_URL: &str = "https://http-evolution-benchmark.zjkung1123.workers.dev/api/protocol";

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Target URL
    pub url: String,

    /// Requests per protocol
    pub requests: usize,

    /// Maximum in-flight requests
    pub concurrency: usize,

    /// Protocol tags to benchmark, in order
    pub protocols: Vec<String>,

    /// Directory for saved reports
    pub output_dir: Option<PathBuf>,

    /// Output format (table, json, json-pretty, csv)
    pub format: String,

    /// Log level when not running verbose
    pub log_level: String,

    /// Transport tuning
    pub transport: TransportSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            requests: 100,
            concurrency: 10,
            protocols: vec!["h1".to_string(), "h2".to_string(), "h3".to_string()],
            output_dir: None,
            format: "table".to_string(),
            log_level: "info".to_string(),
            transport: TransportSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        Ok(config)
    }

    /// Resolve configuration: explicit path, then `HTTPBENCH_CONFIG`, then
    /// the standard locations, then defaults. Environment overrides are
    /// applied on top.
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let mut config = match find_config(explicit, env.config_file.as_deref()) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(env);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Override fields set in the environment
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.url {
            self.url = url.clone();
        }
        if let Some(requests) = env.requests {
            self.requests = requests;
        }
        if let Some(concurrency) = env.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(protocols) = &env.protocols {
            self.protocols = split_tags(protocols);
        }
        if let Some(output) = &env.output_dir {
            self.output_dir = Some(PathBuf::from(output));
        }
        if let Some(format) = &env.format {
            self.format = format.clone();
        }
        if let Some(timeout) = env.timeout {
            self.transport.request_timeout_secs = timeout;
        }
        if let Some(insecure) = env.insecure {
            self.transport.insecure = insecure;
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
    }

    /// Parsed target URL
    pub fn target(&self) -> Result<Uri> {
        let uri: Uri = self
            .url
            .parse()
            .with_context(|| format!("Invalid URL: {}", self.url))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            _ => anyhow::bail!("URL must use http or https: {}", self.url),
        }
        if uri.host().is_none() {
            anyhow::bail!("URL has no host: {}", self.url);
        }
        Ok(uri)
    }

    /// Parsed output format
    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.target()?;
        self.output_format()?;

        if self.requests == 0 {
            anyhow::bail!("requests must be greater than 0");
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be greater than 0");
        }
        if self.protocols.is_empty() {
            anyhow::bail!("at least one protocol is required");
        }
        if self.transport.request_timeout_secs == 0 {
            anyhow::bail!("request timeout must be greater than 0");
        }
        self.log_level
            .parse::<crate::utils::logger::LogLevel>()
            .map_err(|e| anyhow::anyhow!(e))?;

        Ok(())
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.requests, 100);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.protocols, vec!["h1", "h2", "h3"]);
        assert_eq!(config.transport.request_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("httpbench.yaml");

        let mut config = AppConfig::default();
        config.requests = 42;
        config.protocols = vec!["h2".to_string()];
        config.transport.insecure = true;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("httpbench.json");
        std::fs::write(&path, r#"{"concurrency": 3, "transport": {"insecure": true}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.requests, 100);
        assert!(config.transport.insecure);
        assert_eq!(config.transport.max_idle_per_host, 100);
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "requests: [not, a, number]").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }

    #[test]
    fn test_env_overrides_file() {
        let env = EnvConfig {
            url: Some("http://127.0.0.1:8080/".to_string()),
            requests: Some(7),
            protocols: Some("h3, h1".to_string()),
            timeout: Some(5),
            insecure: Some(true),
            ..Default::default()
        };

        let mut config = AppConfig::default();
        config.apply_env(&env);

        assert_eq!(config.url, "http://127.0.0.1:8080/");
        assert_eq!(config.requests, 7);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.protocols, vec!["h3", "h1"]);
        assert_eq!(config.transport.request_timeout_secs, 5);
        assert!(config.transport.insecure);
    }

    #[test]
    fn test_resolve_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yml");
        std::fs::write(&path, "requests: 5\nformat: csv\n").unwrap();

        let env = EnvConfig {
            requests: Some(9),
            ..Default::default()
        };
        let config = AppConfig::resolve(Some(&path), &env).unwrap();

        assert_eq!(config.requests, 9);
        assert_eq!(config.format, "csv");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.requests = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.url = "ftp://example.com/file".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.transport.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.protocols.clear();
        assert!(config.validate().is_err());
    }
}
