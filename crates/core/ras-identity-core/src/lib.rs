//! Core identity provider traits and types.
//!
//! An OAuth2 login is driven across two HTTP requests. A provider builds an
//! authorization URL and hands back a session, the host persists that session
//! as a string, and on the callback the session is restored, authorized with
//! the returned code and projected into a [`User`].
//!
//! Providers implement [`AuthProvider`] and [`AuthSession`] with their own
//! concrete session and error types. Hosts that juggle several providers use
//! [`DynProvider`], which every [`AuthProvider`] implements and which only ever
//! exchanges sessions as serialized strings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Session error: {0}")]
    SessionError(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity record produced once a login has completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub provider: String,
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Provider specific claims, as received.
    pub raw_data: Option<serde_json::Value>,
}

/// Tokens returned by a code exchange or a refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Every other field of the token response, e.g. `id_token`.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenSet {
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }
}

/// Query parameters of a callback request.
pub trait Params: Send + Sync {
    fn get(&self, key: &str) -> Option<&str>;
}

impl Params for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

/// State of a single login attempt.
#[async_trait]
pub trait AuthSession: Send + Sync + Sized {
    type Provider: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    fn auth_url(&self) -> Result<&str, Self::Error>;

    /// Completes the exchange and returns the access token.
    async fn authorize(
        &mut self,
        provider: &Self::Provider,
        params: &dyn Params,
    ) -> Result<String, Self::Error>;

    fn marshal(&self) -> String;
}

/// A configured identity provider, shared read-only between requests.
#[async_trait]
pub trait AuthProvider: Send + Sync + Sized {
    type Session: AuthSession<Provider = Self, Error = Self::Error>;
    type Error: std::error::Error + Send + Sync + 'static;

    fn name(&self) -> &str;

    /// Renames the provider, for hosts registering several instances of one provider type.
    fn set_name(&mut self, name: String);

    fn begin_auth(&self, state: &str) -> Result<Self::Session, Self::Error>;

    async fn fetch_user(&self, session: &Self::Session) -> Result<User, Self::Error>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, Self::Error>;

    fn refresh_token_available(&self) -> bool;

    fn unmarshal_session(&self, data: &str) -> Result<Self::Session, Self::Error>;
}

/// Object-safe view of an [`AuthProvider`] that passes sessions as strings.
#[async_trait]
pub trait DynProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Starts a login and returns the serialized session.
    fn begin_flow(&self, state: &str) -> IdentityResult<String>;

    fn auth_url(&self, session_data: &str) -> IdentityResult<String>;

    /// Authorizes a stored session with the callback parameters. Returns the
    /// user and the updated serialized session.
    async fn complete_flow(
        &self,
        session_data: &str,
        params: &dyn Params,
    ) -> IdentityResult<(User, String)>;

    async fn refresh(&self, refresh_token: &str) -> IdentityResult<TokenSet>;

    fn refresh_available(&self) -> bool;
}

fn provider_error(err: impl std::error::Error) -> IdentityError {
    IdentityError::ProviderError(err.to_string())
}

fn session_error(err: impl std::error::Error) -> IdentityError {
    IdentityError::SessionError(err.to_string())
}

#[async_trait]
impl<P> DynProvider for P
where
    P: AuthProvider,
{
    fn provider_id(&self) -> &str {
        AuthProvider::name(self)
    }

    fn begin_flow(&self, state: &str) -> IdentityResult<String> {
        let session = AuthProvider::begin_auth(self, state).map_err(provider_error)?;
        Ok(session.marshal())
    }

    fn auth_url(&self, session_data: &str) -> IdentityResult<String> {
        let session = self.unmarshal_session(session_data).map_err(session_error)?;
        let auth_url = session.auth_url().map_err(session_error)?;
        Ok(auth_url.to_string())
    }

    async fn complete_flow(
        &self,
        session_data: &str,
        params: &dyn Params,
    ) -> IdentityResult<(User, String)> {
        let mut session = self.unmarshal_session(session_data).map_err(session_error)?;
        session
            .authorize(self, params)
            .await
            .map_err(provider_error)?;
        let user = AuthProvider::fetch_user(self, &session)
            .await
            .map_err(provider_error)?;

        debug!(provider = AuthProvider::name(self), "Completed login flow");

        Ok((user, session.marshal()))
    }

    async fn refresh(&self, refresh_token: &str) -> IdentityResult<TokenSet> {
        AuthProvider::refresh_token(self, refresh_token)
            .await
            .map_err(provider_error)
    }

    fn refresh_available(&self) -> bool {
        AuthProvider::refresh_token_available(self)
    }
}
