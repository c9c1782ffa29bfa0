//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// The site being reconciled
    #[serde(default)]
    pub site: SiteConfig,

    /// Reconciliation behavior settings
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.site.title.trim().is_empty() {
            return Err(AppError::validation("site.title is empty"));
        }
        if !self.site.url.is_empty() {
            Url::parse(&self.site.url)?;
        }
        if self.site.storage_root.as_os_str().is_empty() {
            return Err(AppError::validation("site.storage_root is empty"));
        }
        if self.reconcile.max_concurrent == 0 {
            return Err(AppError::validation("reconcile.max_concurrent must be > 0"));
        }
        Ok(())
    }
}

/// Identity and storage location of one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title (e.g., "crystal.cafe")
    #[serde(default = "defaults::site_title")]
    pub title: String,

    /// Site root URL
    #[serde(default)]
    pub url: String,

    /// Directory holding the site's thread folders
    #[serde(default = "defaults::storage_root")]
    pub storage_root: PathBuf,

    /// Copied into the site meta
    #[serde(default)]
    pub description: String,

    /// Copied into the site meta
    #[serde(default)]
    pub keywords: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: defaults::site_title(),
            url: String::new(),
            storage_root: defaults::storage_root(),
            description: String::new(),
            keywords: String::new(),
        }
    }
}

/// Reconciliation behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Threads reconciled at the same time
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Rebuild snapshot metas even when one is already stored
    #[serde(default)]
    pub regenerate_snapshot_meta: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            regenerate_snapshot_meta: false,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn site_title() -> String {
        "site".into()
    }
    pub fn storage_root() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn max_concurrent() -> usize {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_title() {
        let mut config = Config::default();
        config.site.title = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.reconcile.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = Config::default();
        config.site.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(AppError::Url(_))));
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [site]
            title = "crystal.cafe"
            url = "https://crystal.cafe"
            storage_root = "data/crystal.cafe"
            "#,
        )
        .unwrap();
        assert_eq!(config.site.title, "crystal.cafe");
        assert_eq!(config.site.storage_root, PathBuf::from("data/crystal.cafe"));
        assert_eq!(config.reconcile.max_concurrent, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/definitely/not/here.toml");
        assert_eq!(config.site.title, "site");
    }
}
