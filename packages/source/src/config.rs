//! Run configuration loaded from TOML.
//!
//! A default configuration is embedded at compile time from
//! `config/default.toml`; a `heatmap.toml` in the working directory (or an
//! explicit `--config` path) replaces it. Client credentials are read from
//! `HEATMAP_CLIENT_ID` / `HEATMAP_CLIENT_SECRET` first and fall back to the
//! `[api]` table.

use std::path::{Path, PathBuf};

use heatmap_density_models::DateRange;
use serde::Deserialize;

use crate::auth::Credentials;
use crate::query::TileListStyle;
use crate::{SourceError, TileSampling};

/// Environment variable holding the OAuth2 client id.
pub const CLIENT_ID_ENV: &str = "HEATMAP_CLIENT_ID";

/// Environment variable holding the OAuth2 client secret.
pub const CLIENT_SECRET_ENV: &str = "HEATMAP_CLIENT_SECRET";

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "heatmap.toml";

const EMBEDDED_DEFAULT: &str = include_str!("../config/default.toml");

/// Complete configuration for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct HeatmapConfig {
    /// Remote service settings.
    pub api: ApiConfig,
    /// What to query.
    pub query: QueryConfig,
    /// Historical window the weekday baseline is computed from.
    pub baseline: DateRange,
    /// Range the variation series is computed for.
    pub target: DateRange,
}

/// Remote service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API base URL, e.g. `https://api.swisscom.com/layer/heatmaps/standard`.
    pub base_url: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
    /// Value of the `scs-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// How tile ids are encoded in density queries.
    #[serde(default)]
    pub tile_list_style: TileListStyle,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Client id, if not supplied through the environment.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Client secret, if not supplied through the environment.
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// What to query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Postal code whose tiles are sampled.
    pub postal_code: String,
    /// Maximum tiles per density request.
    #[serde(default = "default_max_tiles")]
    pub max_tiles: usize,
    /// Seed for reproducible tile sampling.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Number of density requests in flight at once (1 = sequential).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl QueryConfig {
    /// Sampling parameters for the postal-code lookup.
    #[must_use]
    pub const fn sampling(&self) -> TileSampling {
        TileSampling {
            max_count: self.max_tiles,
            seed: self.seed,
        }
    }
}

fn default_api_version() -> String {
    "2".to_string()
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_max_tiles() -> usize {
    100
}

const fn default_concurrency() -> usize {
    1
}

impl HeatmapConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Toml`] if the text is malformed or a
    /// required key is missing, and [`SourceError::Config`] if a value is
    /// out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, SourceError> {
        let config: Self = toml::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The configuration compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the embedded file does not parse.
    pub fn embedded_default() -> Result<Self, SourceError> {
        Self::from_toml_str(EMBEDDED_DEFAULT)
    }

    /// Loads the configuration for a run.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`]
    /// is used if present, otherwise the embedded default.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, SourceError> {
        let path: Option<PathBuf> = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };

        match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                let text = std::fs::read_to_string(&path)?;
                Self::from_toml_str(&text)
            }
            None => {
                log::info!("No {DEFAULT_CONFIG_FILE} found, using built-in defaults");
                Self::embedded_default()
            }
        }
    }

    /// Checks value ranges. Called by the parsers; call it again after
    /// overriding fields by hand.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.query.max_tiles == 0 {
            return Err(SourceError::Config {
                message: "query.max_tiles must be at least 1".to_string(),
            });
        }
        if self.query.concurrency == 0 {
            return Err(SourceError::Config {
                message: "query.concurrency must be at least 1".to_string(),
            });
        }
        if self.baseline.days == 0 {
            return Err(SourceError::Config {
                message: "baseline.days must be at least 1".to_string(),
            });
        }
        if self.baseline.days < 7 {
            log::warn!(
                "baseline.days = {} does not cover every weekday; variation lookups \
                 on unsampled weekdays will fail",
                self.baseline.days
            );
        }
        Ok(())
    }
}

impl ApiConfig {
    /// Resolves client credentials, preferring the environment over the
    /// config file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if either value is missing.
    pub fn credentials(&self) -> Result<Credentials, SourceError> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    /// Like [`Self::credentials`], reading variables through `env`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if either value is missing.
    pub fn credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, SourceError> {
        let pick = |key: &str, field: &str, fallback: Option<&String>| {
            env(key)
                .or_else(|| fallback.cloned())
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SourceError::Config {
                    message: format!(
                        "no {field} configured: set the {key} environment variable \
                         or `{field}` in the [api] table"
                    ),
                })
        };

        Ok(Credentials {
            client_id: pick(CLIENT_ID_ENV, "client_id", self.client_id.as_ref())?,
            client_secret: pick(CLIENT_SECRET_ENV, "client_secret", self.client_secret.as_ref())?,
        })
    }
}
