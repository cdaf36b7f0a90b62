//! QuickBooks (Intuit) identity provider.
//!
//! Implements the OAuth2 Authorization Code flow with optional PKCE against
//! Intuit's sandbox or production endpoints. The ID token returned alongside
//! the access token is decoded, without signature verification, into
//! [`IdTokenClaims`]. Sessions serialize to JSON so hosts can keep them
//! between the redirect and the callback.

mod client;
mod config;
mod error;
mod jwt;
mod provider;
mod scopes;
mod session;
mod types;


pub use client::{PkceChallenge, TokenClient};
pub use config::{
    Endpoints, Environment, PRODUCTION_AUTH_URL, PRODUCTION_TOKEN_URL, QuickBooksConfig,
    REVOCATION_URL, SANDBOX_AUTH_URL, SANDBOX_TOKEN_URL,
};
pub use error::{QuickBooksError, QuickBooksResult};
pub use jwt::{decode_jwt_part, parse_id_token};
pub use provider::{PROVIDER_NAME, QuickBooksProvider};
pub use scopes::{
    DEFAULT_SCOPES, SCOPE_ACCOUNTING, SCOPE_ADDRESS, SCOPE_EMAIL, SCOPE_OPENID, SCOPE_PAYMENT,
    SCOPE_PHONE, SCOPE_PROFILE, default_scopes,
};
pub use session::Session;
pub use types::{Address, Audience, IdTokenClaims};

// Re-export common types for convenience
pub use ras_identity_core::{AuthProvider, AuthSession, DynProvider, Params, TokenSet, User};
