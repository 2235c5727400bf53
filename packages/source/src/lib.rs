#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Heatmap density source and its HTTP implementation.
//!
//! The analytics layer only depends on the [`DensitySource`] trait: fetch
//! the aggregate density of a [`TileSet`] for one time bucket, and resolve
//! the tiles covering a postal code. [`client::HeatmapClient`] implements it
//! against the remote heatmap API, authenticating with an OAuth2
//! client-credentials token from [`auth`].

pub mod auth;
pub mod client;
pub mod config;
pub mod progress;
pub mod query;
pub mod sampling;

#[cfg(test)]
mod test_support;

use async_trait::async_trait;
use heatmap_density_models::{TileSet, TimeBucket};

/// Errors that can occur while talking to the heatmap service.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (config file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for the expected shape.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The service answered with a non-success status code.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// Token acquisition failed.
    #[error("Authentication error: {message}")]
    Auth {
        /// Description of what went wrong.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// Missing or invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// How many tiles to keep when resolving a postal code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSampling {
    /// Upper bound on the number of tiles returned.
    pub max_count: usize,
    /// Seed for a reproducible sample. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

/// Provider of heatmap density values.
///
/// Implementations must be `Send + Sync` so a single source can serve
/// concurrent fetches within one computation.
#[async_trait]
pub trait DensitySource: Send + Sync {
    /// Returns the summed density score of `tiles` for the bucket `at`
    /// (daily or hourly, depending on the bucket variant).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the response cannot
    /// be parsed.
    async fn observe_density(&self, tiles: &TileSet, at: TimeBucket) -> Result<f64, SourceError>;

    /// Returns a random sample of at most `sampling.max_count` distinct
    /// tiles covering `postal_code`.
    ///
    /// Repeated calls may return different tile sets unless a seed is
    /// given, so callers resolve once per run.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the lookup fails or the response cannot
    /// be parsed.
    async fn resolve_tiles_for_postal_code(
        &self,
        postal_code: &str,
        sampling: TileSampling,
    ) -> Result<TileSet, SourceError>;
}
