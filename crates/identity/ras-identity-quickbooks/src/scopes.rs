//! Permission scopes understood by the QuickBooks authorization server.

// QuickBooks API scopes
pub const SCOPE_ACCOUNTING: &str = "com.intuit.quickbooks.accounting";
pub const SCOPE_PAYMENT: &str = "com.intuit.quickbooks.payment";

// OpenID Connect scopes
pub const SCOPE_OPENID: &str = "openid";
pub const SCOPE_PROFILE: &str = "profile";
pub const SCOPE_EMAIL: &str = "email";
pub const SCOPE_PHONE: &str = "phone";
pub const SCOPE_ADDRESS: &str = "address";

/// Requested when a provider is configured without any scopes.
pub const DEFAULT_SCOPES: [&str; 4] = [SCOPE_OPENID, SCOPE_PROFILE, SCOPE_EMAIL, SCOPE_PHONE];

pub fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}
