//! QuickBooks identity provider implementation.

use crate::client::{PkceChallenge, TokenClient};
use crate::config::{Endpoints, QuickBooksConfig};
use crate::error::{QuickBooksError, QuickBooksResult};
use crate::session::Session;
use async_trait::async_trait;
use ras_identity_core::{AuthProvider, TokenSet, User};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

/// Default display name of the provider
pub const PROVIDER_NAME: &str = "quickbooks";

/// QuickBooks provider, built once per process and shared between requests
#[derive(Clone)]
pub struct QuickBooksProvider {
    config: QuickBooksConfig,
    endpoints: Endpoints,
    provider_name: String,
    token_client: TokenClient,
}

impl QuickBooksProvider {
    /// Creates a production provider. An empty `scopes` slice requests
    /// [`crate::DEFAULT_SCOPES`].
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
        scopes: &[&str],
    ) -> Self {
        let config = QuickBooksConfig::new(client_id, client_secret, callback_url)
            .with_scopes(scopes.iter().copied());
        Self::from_config(config)
    }

    pub fn from_config(mut config: QuickBooksConfig) -> Self {
        config.scopes = config.effective_scopes();
        let endpoints = config.resolved_endpoints();

        let token_client = TokenClient::new(
            Client::new(),
            config.client_id.clone(),
            config.client_secret.clone(),
            endpoints.token_url.clone(),
        );

        debug!(
            client_id = %config.client_id,
            environment = ?config.environment,
            auth_url = %endpoints.auth_url,
            token_url = %endpoints.token_url,
            scopes = ?config.scopes,
            "Configured QuickBooks provider"
        );

        Self {
            config,
            endpoints,
            provider_name: PROVIDER_NAME.to_string(),
            token_client,
        }
    }

    /// Use a preconfigured HTTP client, e.g. one with a request timeout
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.token_client.set_http_client(http_client);
        self
    }

    pub fn name(&self) -> &str {
        &self.provider_name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.provider_name = name.into();
    }

    pub fn config(&self) -> &QuickBooksConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn scopes(&self) -> &[String] {
        &self.config.scopes
    }

    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    pub(crate) fn token_client(&self) -> &TokenClient {
        &self.token_client
    }

    /// Starts a login; the returned session only holds the authorization URL.
    pub fn begin_auth(&self, state: &str) -> QuickBooksResult<Session> {
        let auth_url = self.authorization_url(state, None)?;
        Ok(Session::new(auth_url))
    }

    /// Starts a login bound to a PKCE challenge. The verifier must be passed
    /// back as `code_verifier` when the session is authorized.
    pub fn begin_auth_with_pkce(
        &self,
        state: &str,
        pkce: &PkceChallenge,
    ) -> QuickBooksResult<Session> {
        let auth_url = self.authorization_url(state, Some(pkce))?;
        Ok(Session::new(auth_url))
    }

    fn authorization_url(
        &self,
        state: &str,
        pkce: Option<&PkceChallenge>,
    ) -> QuickBooksResult<String> {
        let mut url = Url::parse(&self.endpoints.auth_url)?;

        let mut params = url.query_pairs_mut();
        params.append_pair("response_type", "code");
        params.append_pair("client_id", &self.config.client_id);
        params.append_pair("redirect_uri", &self.config.redirect_uri);
        params.append_pair("scope", &self.config.scopes.join(" "));
        params.append_pair("state", state);

        if let Some(pkce) = pkce {
            params.append_pair("code_challenge", &pkce.code_challenge);
            params.append_pair("code_challenge_method", &pkce.code_challenge_method);
        }

        drop(params);

        debug!("Generated authorization URL for provider {}", self.provider_name);
        Ok(url.to_string())
    }

    /// Projects an authorized session into a [`User`].
    pub fn fetch_user(&self, session: &Session) -> QuickBooksResult<User> {
        if session.access_token.is_empty() {
            return Err(QuickBooksError::IncompleteSession {
                provider: self.provider_name.clone(),
            });
        }

        let mut user = User {
            provider: self.provider_name.clone(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.access_token_expires_at,
            ..Default::default()
        };

        if let Some(claims) = &session.parsed_id_token {
            user.user_id = claims.sub.clone();
            user.email = claims.email.clone();
            user.first_name = claims.given_name.clone();
            user.last_name = claims.family_name.clone();
            user.raw_data = serde_json::to_value(claims).ok();
        }

        Ok(user)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> QuickBooksResult<TokenSet> {
        let token = self.token_client.refresh(refresh_token).await?;
        info!("Refreshed access token for provider {}", self.provider_name);
        Ok(token)
    }

    /// QuickBooks always issues refresh tokens.
    pub fn refresh_token_available(&self) -> bool {
        true
    }

    pub fn unmarshal_session(&self, data: &str) -> QuickBooksResult<Session> {
        Session::unmarshal(data)
    }
}

#[async_trait]
impl AuthProvider for QuickBooksProvider {
    type Session = Session;
    type Error = QuickBooksError;

    fn name(&self) -> &str {
        QuickBooksProvider::name(self)
    }

    fn set_name(&mut self, name: String) {
        QuickBooksProvider::set_name(self, name)
    }

    fn begin_auth(&self, state: &str) -> QuickBooksResult<Session> {
        QuickBooksProvider::begin_auth(self, state)
    }

    async fn fetch_user(&self, session: &Session) -> QuickBooksResult<User> {
        QuickBooksProvider::fetch_user(self, session)
    }

    async fn refresh_token(&self, refresh_token: &str) -> QuickBooksResult<TokenSet> {
        QuickBooksProvider::refresh_token(self, refresh_token).await
    }

    fn refresh_token_available(&self) -> bool {
        QuickBooksProvider::refresh_token_available(self)
    }

    fn unmarshal_session(&self, data: &str) -> QuickBooksResult<Session> {
        QuickBooksProvider::unmarshal_session(self, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, PRODUCTION_AUTH_URL};
    use crate::scopes::{SCOPE_ACCOUNTING, SCOPE_OPENID};
    use crate::types::IdTokenClaims;
    use std::collections::HashMap;

    fn create_test_provider() -> QuickBooksProvider {
        QuickBooksProvider::new(
            "test_client_id",
            "test_secret",
            "http://localhost:3000/quickbooks/callback",
            &[SCOPE_ACCOUNTING, SCOPE_OPENID],
        )
    }

    fn query_params(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_default_scopes_when_none_given() {
        let provider = QuickBooksProvider::new("id", "secret", "http://localhost/cb", &[]);
        assert_eq!(provider.scopes(), ["openid", "profile", "email", "phone"]);
        assert_eq!(provider.name(), PROVIDER_NAME);
    }

    #[test]
    fn test_explicit_scopes_are_kept() {
        let provider = create_test_provider();
        assert_eq!(
            provider.scopes(),
            ["com.intuit.quickbooks.accounting", "openid"]
        );
    }

    #[test]
    fn test_environment_is_resolved_at_construction() {
        let config = QuickBooksConfig::new("id", "secret", "http://localhost/cb")
            .with_environment(Environment::Sandbox);
        let mut provider = QuickBooksProvider::from_config(config);
        assert_eq!(provider.config().environment, Environment::Sandbox);

        let endpoints = provider.endpoints().clone();
        provider.set_name("quickbooks-sandbox");
        assert_eq!(provider.endpoints(), &endpoints);
        assert_eq!(provider.name(), "quickbooks-sandbox");
    }

    #[test]
    fn test_begin_auth_builds_authorization_url() {
        let provider = create_test_provider();

        let session = provider.begin_auth("xyz").unwrap();
        let auth_url = session.auth_url().unwrap();
        assert!(auth_url.starts_with(PRODUCTION_AUTH_URL));

        let params = query_params(auth_url);
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "test_client_id");
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:3000/quickbooks/callback"
        );
        assert_eq!(params["scope"], "com.intuit.quickbooks.accounting openid");
        assert_eq!(params["state"], "xyz");
        assert!(!params.contains_key("code_challenge"));

        assert!(session.access_token.is_empty());
        assert!(session.parsed_id_token.is_none());
    }

    #[test]
    fn test_begin_auth_with_pkce() {
        let provider = create_test_provider();
        let pkce = PkceChallenge::new();

        let session = provider.begin_auth_with_pkce("state-1", &pkce).unwrap();
        let params = query_params(session.auth_url().unwrap());

        assert_eq!(params["code_challenge"], pkce.code_challenge);
        assert_eq!(params["code_challenge_method"], "S256");
        assert!(!params.contains_key("code_verifier"));
    }

    #[test]
    fn test_begin_auth_with_invalid_endpoint_override() {
        let config = QuickBooksConfig::new("id", "secret", "http://localhost/cb")
            .with_endpoints(Endpoints::new("not a url", "http://localhost/token"));
        let provider = QuickBooksProvider::from_config(config);

        assert!(matches!(
            provider.begin_auth("s"),
            Err(QuickBooksError::UrlError(_))
        ));
    }

    #[test]
    fn test_fetch_user_requires_access_token() {
        let provider = create_test_provider();
        let session = provider.begin_auth("xyz").unwrap();

        let err = provider.fetch_user(&session).unwrap_err();
        assert!(matches!(err, QuickBooksError::IncompleteSession { .. }));
        assert_eq!(
            err.to_string(),
            "quickbooks cannot get user information without accessToken"
        );
    }

    #[test]
    fn test_fetch_user_projects_session() {
        let provider = create_test_provider();
        let session = Session {
            access_token: "tok123".to_string(),
            refresh_token: "ref456".to_string(),
            ..Default::default()
        };

        let user = provider.fetch_user(&session).unwrap();
        assert_eq!(user.access_token, "tok123");
        assert_eq!(user.refresh_token, "ref456");
        assert_eq!(user.provider, "quickbooks");
        assert!(user.user_id.is_empty());
        assert!(user.raw_data.is_none());
    }

    #[test]
    fn test_fetch_user_uses_id_token_claims() {
        let provider = create_test_provider();
        let claims: IdTokenClaims = serde_json::from_value(serde_json::json!({
            "sub": "user-1",
            "email": "owner@example.com",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "realmid": "9130"
        }))
        .unwrap();

        let session = Session {
            access_token: "tok".to_string(),
            parsed_id_token: Some(claims),
            ..Default::default()
        };

        let user = provider.fetch_user(&session).unwrap();
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.email.as_deref(), Some("owner@example.com"));
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(user.raw_data.unwrap()["realmid"], "9130");
    }

    #[test]
    fn test_refresh_token_available() {
        assert!(create_test_provider().refresh_token_available());
    }
}
