//! OpenID Connect claim types carried by the QuickBooks ID token.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `aud` claim, which may be a single client id or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

/// Structured `address` claim.
///
/// Intuit's userinfo endpoint spells these fields in camelCase while the ID
/// token follows the OpenID Connect names, so both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, alias = "streetAddress")]
    pub street_address: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, alias = "postalCode")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Decoded payload of a QuickBooks ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Empty when the token carries no subject
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    /// QuickBooks company the token was issued for
    #[serde(default)]
    pub realmid: Option<String>,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "emailVerified")]
    pub email_verified: Option<bool>,
    #[serde(default, alias = "givenName")]
    pub given_name: Option<String>,
    #[serde(default, alias = "familyName")]
    pub family_name: Option<String>,
    #[serde(default, alias = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(default, alias = "phoneNumberVerified")]
    pub phone_number_verified: Option<bool>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(flatten)]
    pub additional_claims: HashMap<String, serde_json::Value>,
}
