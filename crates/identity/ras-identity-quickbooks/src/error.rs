//! QuickBooks provider error types.

use thiserror::Error;

pub type QuickBooksResult<T> = Result<T, QuickBooksError>;

#[derive(Debug, Error)]
pub enum QuickBooksError {
    #[error("an AuthURL has not been set")]
    NoAuthUrl,

    #[error("{provider} cannot get user information without accessToken")]
    IncompleteSession { provider: String },

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("invalid JWT ID token format. Expected format: header.payload.signature")]
    InvalidIdTokenFormat,

    #[error("failed to decode JWT ID token: {0}")]
    IdTokenDecode(#[from] base64::DecodeError),

    #[error("Malformed session data: {0}")]
    MalformedSessionData(#[source] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Token exchange failed with status {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}
