//! Application configuration.
//!
//! Resolution order: built-in defaults, then a TOML file, then environment
//! variables prefixed `FOLIO_RISK__` (e.g. `FOLIO_RISK__SERVER__PORT=8080`).
//! The configuration is built once by the caller and passed explicitly to the
//! market data client and the server; nothing below reads the environment on
//! its own.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisOptions;
use crate::{Error, Result};

/// Environment prefix for configuration overrides.
pub const ENV_PREFIX: &str = "FOLIO_RISK";

/// Legacy variable holding the RapidAPI key.
pub const LEGACY_API_KEY_VAR: &str = "RAPIDAPI_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub market_data: MarketDataConfig,
    pub analysis: AnalysisOptions,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Market data provider settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketDataConfig {
    /// RapidAPI key; required to fetch live data
    pub api_key: Option<String>,
    /// Value sent as `X-RapidAPI-Host`
    pub host: String,
    /// Base URL of the provider
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: "yh-finance.p.rapidapi.com".to_string(),
            base_url: "https://yh-finance.p.rapidapi.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for MarketDataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (Some(p.to_path_buf()), true),
            None => (Self::default_path(), false),
        };

        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                config::File::from(file)
                    .format(config::FileFormat::Toml)
                    .required(required),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let mut loaded: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;

        if loaded.market_data.api_key.is_none() {
            loaded.market_data.api_key = env::var(LEGACY_API_KEY_VAR)
                .ok()
                .filter(|k| !k.trim().is_empty());
        }

        loaded.validate()?;
        Ok(loaded)
    }

    /// Default config file: `<platform config dir>/folio-risk/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "folio-risk")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject settings no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.periods_per_year == 0 {
            return Err(Error::Config(
                "analysis.periods_per_year must be positive".to_string(),
            ));
        }
        if self.market_data.timeout_secs == 0 {
            return Err(Error::Config(
                "market_data.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
