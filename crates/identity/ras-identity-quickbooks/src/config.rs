//! QuickBooks provider configuration types.

use crate::scopes::default_scopes;
use serde::{Deserialize, Serialize};

// Intuit currently serves both environments from the same OAuth2 endpoints.
pub const SANDBOX_AUTH_URL: &str = "https://appcenter.intuit.com/connect/oauth2";
pub const SANDBOX_TOKEN_URL: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";
pub const PRODUCTION_AUTH_URL: &str = "https://appcenter.intuit.com/connect/oauth2";
pub const PRODUCTION_TOKEN_URL: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";
pub const REVOCATION_URL: &str = "https://developer.api.intuit.com/v2/oauth2/tokens/revoke";

/// Intuit environment the provider talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    #[default]
    Production,
}

impl Environment {
    pub fn endpoints(self) -> Endpoints {
        match self {
            Environment::Sandbox => Endpoints::new(SANDBOX_AUTH_URL, SANDBOX_TOKEN_URL),
            Environment::Production => Endpoints::new(PRODUCTION_AUTH_URL, PRODUCTION_TOKEN_URL),
        }
    }
}

/// Authorization and token endpoint pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
}

impl Endpoints {
    pub fn new(auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            token_url: token_url.into(),
        }
    }
}

/// QuickBooks provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickBooksConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub environment: Environment,
    /// Requested scopes; empty means [`crate::DEFAULT_SCOPES`]
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Overrides the endpoints derived from `environment`
    #[serde(default)]
    pub endpoints: Option<Endpoints>,
}

impl QuickBooksConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            environment: Environment::default(),
            scopes: Vec::new(),
            endpoints: None,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn resolved_endpoints(&self) -> Endpoints {
        self.endpoints
            .clone()
            .unwrap_or_else(|| self.environment.endpoints())
    }

    pub fn effective_scopes(&self) -> Vec<String> {
        if self.scopes.is_empty() {
            default_scopes()
        } else {
            self.scopes.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_endpoints() {
        let sandbox = Environment::Sandbox.endpoints();
        assert_eq!(sandbox.auth_url, SANDBOX_AUTH_URL);
        assert_eq!(sandbox.token_url, SANDBOX_TOKEN_URL);

        let production = Environment::Production.endpoints();
        assert_eq!(production.auth_url, PRODUCTION_AUTH_URL);
        assert_eq!(production.token_url, PRODUCTION_TOKEN_URL);

        assert_eq!(Environment::default(), Environment::Production);
    }

    #[test]
    fn test_endpoint_override_wins() {
        let config = QuickBooksConfig::new("id", "secret", "http://localhost/cb")
            .with_environment(Environment::Sandbox)
            .with_endpoints(Endpoints::new("http://mock/auth", "http://mock/token"));

        let endpoints = config.resolved_endpoints();
        assert_eq!(endpoints.auth_url, "http://mock/auth");
        assert_eq!(endpoints.token_url, "http://mock/token");
    }

    #[test]
    fn test_effective_scopes() {
        let config = QuickBooksConfig::new("id", "secret", "http://localhost/cb");
        assert_eq!(config.effective_scopes(), vec!["openid", "profile", "email", "phone"]);

        let config = config.with_scopes(["com.intuit.quickbooks.accounting"]);
        assert_eq!(config.effective_scopes(), vec!["com.intuit.quickbooks.accounting"]);
    }

    #[test]
    fn test_deserialize_minimal_config() {
        let config: QuickBooksConfig = serde_json::from_value(serde_json::json!({
            "client_id": "id",
            "client_secret": "secret",
            "redirect_uri": "http://localhost:3000/quickbooks/callback",
            "environment": "sandbox"
        }))
        .unwrap();

        assert_eq!(config.environment, Environment::Sandbox);
        assert!(config.scopes.is_empty());
        assert!(config.endpoints.is_none());
    }
}
