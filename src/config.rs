/// Configuration module for mdrag.
///
/// Handles loading, validating, and providing default configuration values.
/// The config is constructed once at startup and passed by `Arc`; there is
/// no module-level mutable state.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_documents_dir() -> String {
    "./md_documents".to_string()
}

fn default_persist_dir() -> String {
    "./vector_store".to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_web_bind() -> String {
    "127.0.0.1:7860".to_string()
}

fn default_max_depth() -> usize {
    2
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("mdrag/{}", env!("CARGO_PKG_VERSION"))
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Managed directory of `*.md` source files.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,

    /// Directory owned by the index for its persisted state.
    #[serde(default = "default_persist_dir")]
    pub persist_dir: String,

    /// Number of source nodes retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Bind address for the chat web UI.
    #[serde(default = "default_web_bind")]
    pub web_bind: String,

    #[serde(default)]
    pub crawler: CrawlerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CrawlerConfig {
    /// Default traversal depth when a crawl request does not specify one.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            persist_dir: default_persist_dir(),
            top_k: default_top_k(),
            web_bind: default_web_bind(),
            crawler: CrawlerConfig::default(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        // Check if config file exists
        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        // Read existing config
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        // Parse with defaults
        let cfg: Config =
            serde_json::from_str(&data).with_context(|| format!("invalid JSON in {path}"))?;

        info!("Loaded configuration from {path}");

        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values. Failures here are fatal at startup.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.documents_dir.is_empty(),
            "documents_dir must be specified"
        );
        anyhow::ensure!(!self.persist_dir.is_empty(), "persist_dir must be specified");
        anyhow::ensure!(self.top_k > 0, "top_k must be positive");
        anyhow::ensure!(
            self.crawler.timeout_secs > 0,
            "crawler.timeout_secs must be positive"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.documents_dir, "./md_documents");
        assert_eq!(config.persist_dir, "./vector_store");
        assert_eq!(config.top_k, 3);
        assert_eq!(config.crawler.max_depth, 2);
        assert_eq!(config.crawler.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"top_k": 5, "documents_dir": "./docs"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.documents_dir, "./docs");
        // Other fields should have defaults
        assert_eq!(config.persist_dir, "./vector_store");
        assert_eq!(config.crawler.max_depth, 2);
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_top_k() {
        let mut config = Config::default();
        config.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_documents_dir() {
        let mut config = Config::default();
        config.documents_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_crawler_config() {
        let json = r#"{"crawler": {"max_depth": 4}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.crawler.max_depth, 4);
        // Sibling crawler fields keep defaults
        assert_eq!(config.crawler.timeout_secs, 30);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.documents_dir, config.documents_dir);
        assert_eq!(parsed.persist_dir, config.persist_dir);
        assert_eq!(parsed.crawler.user_agent, config.crawler.user_agent);
    }
}
