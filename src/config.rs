//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config PATH`, or `config.toml` in the platform
//!    config directory)
//! 3. `ASSET_PRELOAD_*` environment variables
//! 4. CLI flags (applied by [`Config::with_overrides`])
//!
//! A config file that fails to parse is logged and ignored.

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::DiscoveryArgs;
use crate::manifest::{DiscoveryConfig, DEFAULT_EXTENSIONS, DEFAULT_URL_PREFIX};
use crate::pool::DEFAULT_CONCURRENCY;
use crate::preload::PreloadConfig;

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "ASSET_PRELOAD_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of images loaded at once.
    pub concurrency: usize,
    /// File extensions treated as images.
    pub extensions: Vec<String>,
    /// Gitignore-style patterns excluded from discovery.
    pub ignore_patterns: Vec<String>,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Follow symbolic links during discovery.
    pub follow_symlinks: bool,
    /// Skip images larger than this many bytes.
    pub max_size: Option<u64>,
    /// URL prefix under which the asset directory is served.
    pub url_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            ignore_patterns: Vec::new(),
            skip_hidden: false,
            follow_symlinks: false,
            max_size: None,
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, or from the platform config file
    /// when no path is given. Environment variables are applied on top.
    #[must_use]
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| Self::default_path().ok().filter(|p| p.exists()));
        Self::load_layers(path.as_deref())
    }

    /// Load configuration from a specific TOML file plus the environment.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        Self::load_layers(Some(path.as_ref()))
    }

    fn load_layers(path: Option<&Path>) -> Self {
        match Self::figment(path).extract::<Self>() {
            Ok(config) => config.validated(),
            Err(e) => {
                log::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// The figment stack: defaults, then the optional file, then env vars.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            log::debug!("Reading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn validated(mut self) -> Self {
        if self.concurrency == 0 {
            log::warn!("concurrency must be at least 1, using 1");
            self.concurrency = 1;
        }
        self
    }

    /// Apply CLI flags on top of the loaded configuration.
    #[must_use]
    pub fn with_overrides(mut self, args: &DiscoveryArgs) -> Self {
        if let Some(concurrency) = args.concurrency {
            self.concurrency = concurrency.max(1);
        }
        if !args.extensions.is_empty() {
            self.extensions.clone_from(&args.extensions);
        }
        self.ignore_patterns.extend(args.ignore_patterns.iter().cloned());
        self.skip_hidden |= args.skip_hidden;
        self.follow_symlinks |= args.follow_symlinks;
        if args.max_size.is_some() {
            self.max_size = args.max_size;
        }
        if let Some(prefix) = &args.url_prefix {
            self.url_prefix.clone_from(prefix);
        }
        self
    }

    /// Discovery settings derived from this configuration.
    #[must_use]
    pub fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            max_size: self.max_size,
            ignore_patterns: self.ignore_patterns.clone(),
            extensions: self.extensions.clone(),
            url_prefix: self.url_prefix.clone(),
        }
    }

    /// Preload run settings derived from this configuration.
    #[must_use]
    pub fn preload(&self) -> PreloadConfig {
        PreloadConfig::default().with_concurrency(self.concurrency)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Platform-specific default config file location.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "asset-preload", "asset-preload")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_clamps_concurrency() {
        let config = Config {
            concurrency: 0,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_overrides() {
        let args = DiscoveryArgs {
            concurrency: Some(4),
            extensions: vec!["svg".to_string()],
            ignore_patterns: vec!["drafts/".to_string()],
            skip_hidden: true,
            follow_symlinks: false,
            max_size: Some(500_000),
            url_prefix: Some("/img".to_string()),
        };
        let config = Config::default().with_overrides(&args);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.extensions, vec!["svg".to_string()]);
        assert_eq!(config.ignore_patterns, vec!["drafts/".to_string()]);
        assert!(config.skip_hidden);
        assert_eq!(config.max_size, Some(500_000));
        assert_eq!(config.url_prefix, "/img");
        assert_eq!(config.preload().concurrency, 4);
        assert_eq!(config.discovery().url_prefix, "/img");
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let config = Config::default().with_overrides(&DiscoveryArgs::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_to_toml_round_trips_through_figment() {
        let config = Config {
            concurrency: 3,
            ..Default::default()
        };
        let rendered = config.to_toml().unwrap();
        let parsed: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(&rendered))
            .extract()
            .unwrap();
        assert_eq!(parsed, config);
    }
}
