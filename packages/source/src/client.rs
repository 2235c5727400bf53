//! HTTP implementation of [`DensitySource`] for the heatmap API.

use std::time::Duration;

use async_trait::async_trait;
use heatmap_density_models::{TileSet, TimeBucket};

use crate::auth::{Credentials, TokenProvider};
use crate::config::ApiConfig;
use crate::query::{self, TileListStyle};
use crate::sampling::sample_tiles;
use crate::{DensitySource, SourceError, TileSampling};

/// Header carrying the API version.
const API_VERSION_HEADER: &str = "scs-version";

/// Authenticated session against the heatmap API.
///
/// Created once per run with [`HeatmapClient::connect`] and passed to the
/// analytics functions. Dropping it releases the connection pool.
pub struct HeatmapClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    tile_list_style: TileListStyle,
    tokens: TokenProvider,
}

impl HeatmapClient {
    /// Builds the HTTP client and acquires the first access token.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP client cannot be built or the
    /// token request fails.
    pub async fn connect(api: &ApiConfig, credentials: Credentials) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;

        let tokens = TokenProvider::connect(http.clone(), &api.token_url, credentials).await?;

        Ok(Self {
            http,
            base_url: api.base_url.clone(),
            api_version: api.api_version.clone(),
            tile_list_style: api.tile_list_style,
            tokens,
        })
    }

    async fn get_json(&self, url: reqwest::Url) -> Result<serde_json::Value, SourceError> {
        log::debug!("GET {url}");
        let bearer = self.tokens.bearer().await?;

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(bearer)
            .header(API_VERSION_HEADER, &self.api_version)
            .send()
            .await?;

        ensure_success(response.status(), &url)?;
        Ok(response.json().await?)
    }
}

/// Maps any non-2xx status to [`SourceError::Status`].
fn ensure_success(status: reqwest::StatusCode, url: &reqwest::Url) -> Result<(), SourceError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SourceError::Status {
            status,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl DensitySource for HeatmapClient {
    async fn observe_density(&self, tiles: &TileSet, at: TimeBucket) -> Result<f64, SourceError> {
        let url = query::density_url(&self.base_url, &at, tiles, self.tile_list_style)?;
        let body = self.get_json(url).await?;
        let density = query::parse_density_response(&body)?;
        log::debug!("{at}: density {density} over {} tiles", tiles.len());
        Ok(density)
    }

    async fn resolve_tiles_for_postal_code(
        &self,
        postal_code: &str,
        sampling: TileSampling,
    ) -> Result<TileSet, SourceError> {
        let url = query::postal_code_url(&self.base_url, postal_code)?;
        let body = self.get_json(url).await?;
        let ids = query::parse_tile_ids(&body)?;
        let available = ids.len();
        if available == 0 {
            return Err(SourceError::Parse {
                message: format!("no tiles found for postal code {postal_code}"),
            });
        }

        let tiles = sample_tiles(ids, sampling.max_count, sampling.seed);
        log::info!(
            "Postal code {postal_code}: sampled {} of {available} tiles",
            tiles.len()
        );
        Ok(tiles)
    }
}
