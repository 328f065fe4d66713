//! Compact JWS codec for HS256 tokens
//!
//! Tokens are three base64url (no padding) segments joined by `.`:
//! `header.payload.signature`, where the signature is HMAC-SHA256 over
//! `header.payload` keyed with the shared secret.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::Claims;
use crate::error::{AuthError, TokenError};

type HmacSha256 = Hmac<Sha256>;

/// The only supported algorithm
pub const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    alg: String,
}

/// HS256 token encoder/decoder bound to one secret
///
/// Encoding and decoding are pure functions of the claims (or token) and the
/// secret. Every decode failure is reported as [`TokenError::Invalid`].
#[derive(Clone)]
pub struct TokenCodec {
    secret: Arc<Secret<Vec<u8>>>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec for the given shared secret
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(Secret::new(secret.into())),
        }
    }

    /// Encode and sign a claim set
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the claims cannot be serialized.
    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        let header = Header {
            typ: Some("JWT".to_string()),
            alg: ALGORITHM.to_string(),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| AuthError::Signing(e.to_string()))?;
        let payload_json =
            serde_json::to_vec(claims).map_err(|e| AuthError::Signing(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(payload_json)
        );
        let signature = self
            .sign(signing_input.as_bytes())
            .ok_or_else(|| AuthError::Signing("invalid HMAC key".to_string()))?;

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Decode a token and verify its signature
    ///
    /// Only the structure, algorithm and signature are checked here; time and
    /// issuer checks belong to [`crate::ClaimValidator`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] for any malformed or forged token.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Invalid);
        };

        let header: Header =
            serde_json::from_slice(&b64_decode(header_b64)?).map_err(|_| TokenError::Invalid)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Invalid);
        }

        let payload: Value =
            serde_json::from_slice(&b64_decode(payload_b64)?).map_err(|_| TokenError::Invalid)?;
        let Value::Object(map) = payload else {
            return Err(TokenError::Invalid);
        };

        let provided = b64_decode(signature_b64)?;
        let signing_input = format!("{header_b64}.{payload_b64}");
        let expected = self
            .sign(signing_input.as_bytes())
            .ok_or(TokenError::Invalid)?;

        if provided.as_slice().ct_eq(expected.as_slice()).unwrap_u8() != 1 {
            return Err(TokenError::Invalid);
        }

        Ok(Claims::from_map(map))
    }

    fn sign(&self, input: &[u8]) -> Option<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret()).ok()?;
        mac.update(input);
        Some(mac.finalize().into_bytes().to_vec())
    }
}

fn b64_decode(segment: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Invalid)
}
