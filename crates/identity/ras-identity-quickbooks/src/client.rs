//! Token endpoint client with PKCE support.

use crate::error::{QuickBooksError, QuickBooksResult};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, thread_rng};
use ras_identity_core::TokenSet;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// PKCE code challenge and verifier
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

impl PkceChallenge {
    /// Generate a new PKCE challenge
    pub fn new() -> Self {
        Self::from_verifier(Self::generate_code_verifier())
    }

    /// Rebuild the challenge for a verifier kept from an earlier request
    pub fn from_verifier(code_verifier: String) -> Self {
        let code_challenge = Self::generate_code_challenge(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: "S256".to_string(),
        }
    }

    fn generate_code_verifier() -> String {
        let mut rng = thread_rng();
        let bytes: Vec<u8> = (0..64).map(|_| rng.r#gen::<u8>()).collect();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn generate_code_challenge(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

/// Raw body of a successful token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    token_type: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

/// Instant `secs` seconds from now, or `None` when it is out of range
pub(crate) fn expires_after(secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|ttl| Utc::now().checked_add_signed(ttl))
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        let expires_at = response
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(|secs| {
                let expires_at = expires_after(secs);
                if expires_at.is_none() {
                    warn!("Ignoring out of range expires_in: {}", secs);
                }
                expires_at
            });

        TokenSet {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            extra: response.extra,
        }
    }
}

/// Posts grants to the token endpoint, authenticating with HTTP Basic client credentials.
#[derive(Clone)]
pub struct TokenClient {
    http_client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl TokenClient {
    pub fn new(
        http_client: Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
        }
    }

    pub(crate) fn set_http_client(&mut self, http_client: Client) {
        self.http_client = http_client;
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> QuickBooksResult<TokenSet> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        if let Some(verifier) = code_verifier {
            params.push(("code_verifier", verifier));
        }

        self.request_token(&params).await
    }

    /// Obtain a new access token with a refresh token.
    ///
    /// When the response carries no refresh token the one sent is kept.
    pub async fn refresh(&self, refresh_token: &str) -> QuickBooksResult<TokenSet> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let mut token = self.request_token(&params).await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> QuickBooksResult<TokenSet> {
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Token request failed with status {}: {}", status, body);
            return Err(QuickBooksError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| QuickBooksError::InvalidTokenResponse(e.to_string()))?;

        if token_response.access_token.is_empty() {
            return Err(QuickBooksError::InvalidTokenResponse(
                "server response missing access_token".to_string(),
            ));
        }

        debug!("Token endpoint returned a new access token");
        Ok(token_response.into())
    }
}
