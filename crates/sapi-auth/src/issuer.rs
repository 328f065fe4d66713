//! Token issuing.
//!
//! [`TokenIssuer`] fills in the standard claims a caller left out and signs the
//! result with [`TokenCodec`]. Claims the caller supplied are kept as given,
//! except `scopes`, which is normalized to a list.

use serde_json::Value;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::jwt::{CLAIM_EXP, CLAIM_IAT, CLAIM_ISS, CLAIM_SCOPES, CLAIM_SUB, Claims, TokenCodec};
use crate::scopes;

/// Builds and signs claim sets
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    config: AuthConfig,
}

impl TokenIssuer {
    /// Create an issuer for the given configuration
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// The configuration in use
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Issue a signed token for `principal`
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingSecret`] when no secret is configured
    /// - [`AuthError::MissingSubject`] when `principal` is blank
    /// - [`AuthError::Signing`] if the claims cannot be encoded
    pub fn issue(
        &self,
        principal: &str,
        extra: Claims,
        ttl_override: Option<i64>,
    ) -> Result<String, AuthError> {
        self.issue_at(principal, extra, ttl_override, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now`
    ///
    /// # Errors
    ///
    /// Same as [`TokenIssuer::issue`].
    pub fn issue_at(
        &self,
        principal: &str,
        extra: Claims,
        ttl_override: Option<i64>,
        now: i64,
    ) -> Result<String, AuthError> {
        let codec = self.config.codec()?;
        let claims = self.build_claims(principal, extra, ttl_override, now)?;
        let token = codec.encode(&claims)?;
        debug!(sub = %principal, exp = ?claims.exp(), "token issued");
        Ok(token)
    }

    /// Apply claim defaults without signing
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingSubject`] when `principal` is blank and
    /// [`AuthError::ExpiryOutOfRange`] when the derived `exp` overflows.
    pub fn build_claims(
        &self,
        principal: &str,
        mut claims: Claims,
        ttl_override: Option<i64>,
        now: i64,
    ) -> Result<Claims, AuthError> {
        let principal = principal.trim();
        if principal.is_empty() {
            return Err(AuthError::MissingSubject);
        }
        claims.insert(CLAIM_SUB, principal);

        claims.insert_default(CLAIM_IAT, || Value::from(now));
        let iat = claims.iat().unwrap_or(now);
        let ttl = self.config.effective_ttl(ttl_override);
        if !claims.contains(CLAIM_EXP) {
            let exp = iat.checked_add(ttl).ok_or(AuthError::ExpiryOutOfRange)?;
            claims.insert(CLAIM_EXP, exp);
        }

        let scopes = match claims.get(CLAIM_SCOPES) {
            Some(value) => scopes::for_issue(Some(value)),
            None => self.config.default_scopes(),
        };
        claims.insert(CLAIM_SCOPES, scopes);

        if let Some(iss) = self.config.issuer() {
            let iss = iss.to_string();
            claims.insert_default(CLAIM_ISS, || Value::String(iss));
        }

        Ok(claims)
    }

    /// Codec for verifying tokens produced by this issuer
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingSecret`] when no secret is configured.
    pub fn codec(&self) -> Result<TokenCodec, AuthError> {
        self.config.codec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(AuthConfig::builder().secret("k").ttl_seconds(60).build())
    }

    #[test]
    fn test_defaults_applied() {
        let claims = issuer().build_claims("alice", Claims::new(), None, NOW).unwrap();
        assert_eq!(claims.sub(), Some("alice"));
        assert_eq!(claims.iat(), Some(NOW));
        assert_eq!(claims.exp(), Some(NOW + 60));
        assert_eq!(claims.get("scopes"), Some(&json!(["*"])));
        assert!(!claims.contains("iss"));
    }

    #[test]
    fn test_caller_claims_preserved() {
        let extra = Claims::new()
            .with("iat", 10)
            .with("exp", 20)
            .with("iss", "custom")
            .with("role", 1);
        let config = AuthConfig::builder().secret("k").issuer("evo").build();
        let claims = TokenIssuer::new(config)
            .build_claims("bob", extra, None, NOW)
            .unwrap();

        assert_eq!(claims.iat(), Some(10));
        assert_eq!(claims.exp(), Some(20));
        assert_eq!(claims.iss(), Some("custom"));
        assert_eq!(claims.get("role"), Some(&json!(1)));
    }

    #[test]
    fn test_exp_derived_from_supplied_iat() {
        let claims = issuer()
            .build_claims("a", Claims::new().with("iat", 100), Some(5), NOW)
            .unwrap();
        assert_eq!(claims.exp(), Some(105));
    }

    #[test]
    fn test_non_positive_override_uses_default_ttl() {
        let claims = issuer()
            .build_claims("a", Claims::new(), Some(0), NOW)
            .unwrap();
        assert_eq!(claims.exp(), Some(NOW + 3600));
    }

    #[test]
    fn test_scopes_normalized() {
        let claims = issuer()
            .build_claims("a", Claims::new().with("scopes", "read, write"), None, NOW)
            .unwrap();
        assert_eq!(claims.get("scopes"), Some(&json!(["read", "write"])));

        let claims = issuer()
            .build_claims("a", Claims::new().with("scopes", json!([])), None, NOW)
            .unwrap();
        assert_eq!(claims.get("scopes"), Some(&json!(["*"])));
    }

    #[test]
    fn test_configured_issuer_added() {
        let config = AuthConfig::builder().secret("k").issuer("evo").build();
        let claims = TokenIssuer::new(config)
            .build_claims("a", Claims::new(), None, NOW)
            .unwrap();
        assert_eq!(claims.iss(), Some("evo"));
    }

    #[test]
    fn test_missing_secret_is_surfaced() {
        let issuer = TokenIssuer::new(AuthConfig::default());
        assert_eq!(
            issuer.issue("alice", Claims::new(), None),
            Err(AuthError::MissingSecret)
        );
    }

    #[test]
    fn test_blank_subject_rejected() {
        assert_eq!(
            issuer().issue("  ", Claims::new(), None),
            Err(AuthError::MissingSubject)
        );
    }

    #[test]
    fn test_overflowing_expiry_rejected() {
        assert_eq!(
            issuer().build_claims("a", Claims::new(), Some(i64::MAX), NOW),
            Err(AuthError::ExpiryOutOfRange)
        );
        assert_eq!(
            issuer().build_claims("a", Claims::new().with("iat", i64::MAX), None, NOW),
            Err(AuthError::ExpiryOutOfRange)
        );

        // An explicit exp never needs the sum
        let claims = issuer()
            .build_claims(
                "a",
                Claims::new().with("iat", i64::MAX).with("exp", 5),
                Some(i64::MAX),
                NOW,
            )
            .unwrap();
        assert_eq!(claims.exp(), Some(5));
    }
}
