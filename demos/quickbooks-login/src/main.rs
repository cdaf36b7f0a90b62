//! QuickBooks login demo
//!
//! `GET /quickbooks/start` redirects to Intuit with a fresh state and PKCE
//! challenge. `GET /quickbooks/callback` completes the exchange and returns
//! the identity of the user that signed in.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use dashmap::DashMap;
use ras_identity_quickbooks::{PkceChallenge, QuickBooksError, QuickBooksProvider};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

/// A login that has been started but not yet completed
struct PendingLogin {
    session: String,
    code_verifier: String,
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    provider: Arc<QuickBooksProvider>,
    // Keyed by the OAuth2 state parameter
    pending: Arc<DashMap<String, PendingLogin>>,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    provider: String,
    user_id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    realm_id: Option<String>,
    expires_at: Option<String>,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("Unknown or already used state parameter")]
    UnknownState,

    #[error("Authorization was denied: {0}")]
    Denied(String),

    #[error(transparent)]
    Provider(#[from] QuickBooksError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::UnknownState => StatusCode::BAD_REQUEST,
            AppError::Denied(_) => StatusCode::UNAUTHORIZED,
            AppError::Provider(QuickBooksError::MissingAuthorizationCode) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Provider(
                QuickBooksError::HttpError(_)
                | QuickBooksError::TokenExchangeFailed { .. }
                | QuickBooksError::InvalidTokenResponse(_)
                | QuickBooksError::InvalidIdTokenFormat
                | QuickBooksError::IdTokenDecode(_),
            ) => StatusCode::BAD_GATEWAY,
            AppError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Login failed: {}", self);
        } else {
            warn!("Login rejected: {}", self);
        }

        (status, self.to_string()).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ras_identity_quickbooks=debug")),
        )
        .init();

    let config = config::Config::load()?;

    let state = AppState {
        provider: Arc::new(QuickBooksProvider::from_config(config.quickbooks.clone())),
        pending: Arc::new(DashMap::new()),
    };

    let app = Router::new()
        .route("/quickbooks/start", get(start_login))
        .route("/quickbooks/callback", get(complete_login))
        .with_state(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Open http://{}/quickbooks/start to sign in", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn start_login(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let csrf_state = uuid::Uuid::new_v4().to_string();
    let pkce = PkceChallenge::new();

    let session = state.provider.begin_auth_with_pkce(&csrf_state, &pkce)?;
    let auth_url = session.auth_url()?.to_string();

    state.pending.insert(
        csrf_state,
        PendingLogin {
            session: session.marshal(),
            code_verifier: pkce.code_verifier,
        },
    );

    Ok(Redirect::to(&auth_url))
}

async fn complete_login(
    State(state): State<AppState>,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<Json<LoginResponse>, AppError> {
    let csrf_state = params.get("state").cloned().unwrap_or_default();
    let (_, pending) = state
        .pending
        .remove(&csrf_state)
        .ok_or(AppError::UnknownState)?;

    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(String::as_str)
            .unwrap_or("No description");
        return Err(AppError::Denied(format!("{}: {}", error, description)));
    }

    let realm_id = params.get("realmId").cloned();
    info!("Callback received for realm {:?}", realm_id);

    params.insert("code_verifier".to_string(), pending.code_verifier);

    let mut session = state.provider.unmarshal_session(&pending.session)?;
    session.authorize(&state.provider, &params).await?;
    let user = state.provider.fetch_user(&session)?;

    info!("User {} signed in with {}", user.user_id, user.provider);

    Ok(Json(LoginResponse {
        provider: user.provider,
        user_id: user.user_id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        realm_id,
        expires_at: user.expires_at.map(|at| at.to_rfc3339()),
    }))
}
