//! OAuth2 client-credentials authentication.
//!
//! The heatmap API expects a bearer token obtained from the provider's
//! token endpoint with the `client_credentials` grant. [`TokenProvider`]
//! acquires one eagerly and transparently re-acquires it when it is about
//! to expire.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::SourceError;

/// Tokens this close to expiry are replaced before use.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// Client id and secret issued by the API marketplace.
#[derive(Clone)]
pub struct Credentials {
    /// Customer key.
    pub client_id: String,
    /// Customer secret.
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    /// The raw token to send in the `Authorization` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// Whether the token is still usable at `now`, keeping a safety margin.
    #[must_use]
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now + EXPIRY_MARGIN
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Parses a token endpoint response received at `now`.
///
/// # Errors
///
/// Returns [`SourceError::Auth`] if the body has no `access_token` or
/// announces a token type other than `bearer`.
pub fn parse_token_response(
    body: &serde_json::Value,
    now: Instant,
) -> Result<AccessToken, SourceError> {
    let response: TokenResponse =
        serde_json::from_value(body.clone()).map_err(|e| SourceError::Auth {
            message: format!("unexpected token response: {e}"),
        })?;

    if let Some(kind) = &response.token_type
        && !kind.eq_ignore_ascii_case("bearer")
    {
        return Err(SourceError::Auth {
            message: format!("unsupported token type {kind:?}"),
        });
    }

    let lifetime = response.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS);
    Ok(AccessToken {
        value: response.access_token,
        expires_at: now + Duration::from_secs(lifetime),
    })
}

/// Acquires and caches client-credentials tokens.
pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    credentials: Credentials,
    current: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    /// Creates a provider and immediately fetches the first token, so bad
    /// credentials surface before any density request is made.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the token request fails.
    pub async fn connect(
        http: reqwest::Client,
        token_url: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, SourceError> {
        let provider = Self {
            http,
            token_url: token_url.into(),
            credentials,
            current: Mutex::new(None),
        };
        provider.bearer().await?;
        Ok(provider)
    }

    /// Returns a valid bearer token, fetching a new one if the cached one
    /// is missing or about to expire.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if a new token is needed and the request
    /// fails.
    pub async fn bearer(&self) -> Result<String, SourceError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Ok(token.secret().to_string());
        }

        let token = self.fetch().await?;
        let secret = token.secret().to_string();
        *current = Some(token);
        Ok(secret)
    }

    async fn fetch(&self) -> Result<AccessToken, SourceError> {
        log::info!(
            "Requesting access token from {} for client {}",
            self.token_url,
            self.credentials.client_id
        );

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth {
                message: format!("token endpoint returned HTTP {status}: {detail}"),
            });
        }

        let body: serde_json::Value = response.json().await?;
        let token = parse_token_response(&body, Instant::now())?;
        log::debug!(
            "Access token acquired, valid for {:?}",
            token.expires_at.saturating_duration_since(Instant::now())
        );
        Ok(token)
    }
}
