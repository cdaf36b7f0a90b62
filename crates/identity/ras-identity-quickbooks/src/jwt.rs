//! Unverified decoding of compact ID tokens.
//!
//! The signature is not checked; the token arrives directly from the token
//! endpoint over TLS and is only used to surface identity claims.

use crate::error::{QuickBooksError, QuickBooksResult};
use crate::types::IdTokenClaims;
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::warn;

/// Decodes one base64url segment of a compact token, with or without padding.
pub fn decode_jwt_part(part: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut segment = part.replace('-', "+").replace('_', "/");

    let remainder = segment.len() % 4;
    if remainder != 0 {
        segment.push_str(&"=".repeat(4 - remainder));
    }

    STANDARD.decode(segment)
}

/// Extracts the claims of a `header.payload.signature` token.
///
/// Framing problems are errors. A payload that decodes but is not a claim set
/// yields `Ok(None)`.
pub fn parse_id_token(id_token: &str) -> QuickBooksResult<Option<IdTokenClaims>> {
    let parts: Vec<&str> = id_token.split('.').collect();
    if parts.len() != 3 {
        return Err(QuickBooksError::InvalidIdTokenFormat);
    }

    let payload = decode_jwt_part(parts[1])?;

    match serde_json::from_slice::<IdTokenClaims>(&payload) {
        Ok(claims) => Ok(Some(claims)),
        Err(e) => {
            warn!("Ignoring unparsable ID token claims: {}", e);
            Ok(None)
        }
    }
}
