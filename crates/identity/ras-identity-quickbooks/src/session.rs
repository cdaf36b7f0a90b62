//! Per-login session state.

use crate::client::expires_after;
use crate::error::{QuickBooksError, QuickBooksResult};
use crate::jwt::parse_id_token;
use crate::provider::QuickBooksProvider;
use crate::types::IdTokenClaims;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ras_identity_core::{AuthSession, Params};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// State of one QuickBooks login attempt.
///
/// Created by [`QuickBooksProvider::begin_auth`] holding only the
/// authorization URL, then filled in by [`Session::authorize`]. Tokens are
/// tied to the QuickBooks realm (company) the user picked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub auth_url: String,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Raw compact ID token, empty when none was issued
    pub id_token: String,
    /// Claims of `id_token`, when its payload could be parsed
    pub parsed_id_token: Option<IdTokenClaims>,
}

impl Session {
    pub(crate) fn new(auth_url: String) -> Self {
        Self {
            auth_url,
            ..Default::default()
        }
    }

    pub fn auth_url(&self) -> QuickBooksResult<&str> {
        if self.auth_url.is_empty() {
            return Err(QuickBooksError::NoAuthUrl);
        }
        Ok(&self.auth_url)
    }

    /// Exchanges the `code` callback parameter for tokens and returns the
    /// access token.
    ///
    /// A `code_verifier` parameter is forwarded for PKCE. A malformed ID token
    /// fails the call even though the tokens were already stored.
    pub async fn authorize(
        &mut self,
        provider: &QuickBooksProvider,
        params: &dyn Params,
    ) -> QuickBooksResult<String> {
        let code = params
            .get("code")
            .filter(|code| !code.is_empty())
            .ok_or(QuickBooksError::MissingAuthorizationCode)?;
        let code_verifier = params.get("code_verifier").filter(|v| !v.is_empty());

        let token = provider
            .token_client()
            .exchange_code(code, provider.redirect_uri(), code_verifier)
            .await?;

        self.access_token = token.access_token.clone();
        self.refresh_token = token.refresh_token.clone().unwrap_or_default();
        self.access_token_expires_at = token.expires_at;

        if let Some(id_token) = token.extra("id_token") {
            match id_token.as_str() {
                Some(raw) => {
                    self.id_token = raw.to_string();
                    if !raw.is_empty() {
                        self.parsed_id_token = parse_id_token(raw)?;
                    }
                }
                None => warn!("Ignoring non-string id_token in token response"),
            }
        }

        if let Some(expires_in) = token.extra("x_refresh_token_expires_in") {
            match expires_in.as_f64() {
                Some(secs) => match expires_after(secs as i64) {
                    Some(expires_at) => self.refresh_token_expires_at = Some(expires_at),
                    None => warn!("Ignoring out of range x_refresh_token_expires_in: {}", secs),
                },
                None => debug!("Ignoring non-numeric x_refresh_token_expires_in"),
            }
        }

        info!(
            "Authorized session for provider {} (id token: {})",
            provider.name(),
            self.parsed_id_token.is_some()
        );

        Ok(token.access_token)
    }

    /// Serializes the session to JSON
    pub fn marshal(&self) -> String {
        serde_json::to_string(self).expect("session is always serializable")
    }

    pub fn unmarshal(data: &str) -> QuickBooksResult<Self> {
        serde_json::from_str(data).map_err(QuickBooksError::MalformedSessionData)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marshal())
    }
}

#[async_trait]
impl AuthSession for Session {
    type Provider = QuickBooksProvider;
    type Error = QuickBooksError;

    fn auth_url(&self) -> QuickBooksResult<&str> {
        Session::auth_url(self)
    }

    async fn authorize(
        &mut self,
        provider: &QuickBooksProvider,
        params: &dyn Params,
    ) -> QuickBooksResult<String> {
        Session::authorize(self, provider, params).await
    }

    fn marshal(&self) -> String {
        Session::marshal(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn authorized_session() -> Session {
        let claims: IdTokenClaims = serde_json::from_value(serde_json::json!({
            "sub": "user-1",
            "aud": ["client"],
            "realmid": "9130",
            "email": "owner@example.com",
            "email_verified": true,
            "address": {"street_address": "1 Main St", "country": "US"}
        }))
        .unwrap();

        Session {
            auth_url: "https://appcenter.intuit.com/connect/oauth2?state=abc".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            access_token_expires_at: Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()),
            refresh_token_expires_at: Some(Utc::now()),
            id_token: "h.p.s".to_string(),
            parsed_id_token: Some(claims),
        }
    }

    #[test]
    fn test_auth_url_missing() {
        let session = Session::default();
        assert!(matches!(session.auth_url(), Err(QuickBooksError::NoAuthUrl)));
    }

    #[test]
    fn test_marshal_round_trip() {
        let session = authorized_session();
        let restored = Session::unmarshal(&session.marshal()).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_marshal_round_trip_without_claims() {
        let session = Session::new("https://appcenter.intuit.com/connect/oauth2".to_string());
        let restored = Session::unmarshal(&session.to_string()).unwrap();

        assert_eq!(restored, session);
        assert!(restored.parsed_id_token.is_none());
        assert_eq!(restored.auth_url().unwrap(), session.auth_url);
    }

    #[test]
    fn test_unmarshal_malformed_data() {
        for data in ["", "not json", "[1, 2]", r#"{"access_token": 5}"#] {
            assert!(matches!(
                Session::unmarshal(data),
                Err(QuickBooksError::MalformedSessionData(_))
            ));
        }
    }

    #[test]
    fn test_unmarshal_fills_missing_fields() {
        let session = Session::unmarshal(r#"{"auth_url": "https://example.com"}"#).unwrap();
        assert_eq!(session.auth_url, "https://example.com");
        assert!(session.access_token.is_empty());
        assert!(session.refresh_token_expires_at.is_none());
    }
}
