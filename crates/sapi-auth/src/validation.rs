//! Claim validation against a policy.
//!
//! Runs after [`crate::TokenCodec::decode`] has verified the signature. Checks
//! are performed in a fixed order: `nbf`, `exp`, `iss`.

use subtle::ConstantTimeEq;

use crate::error::{AuthError, TokenError};
use crate::jwt::{CLAIM_EXP, CLAIM_NBF, Claims};
use crate::scopes;

/// What a valid token must look like
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Expected `iss`; `None` accepts any issuer, including none
    pub expected_issuer: Option<String>,
}

impl ValidationPolicy {
    /// Policy with no issuer requirement
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a specific issuer (blank strings are ignored)
    #[must_use]
    pub fn expected_issuer(mut self, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        self.expected_issuer = if issuer.trim().is_empty() {
            None
        } else {
            Some(issuer)
        };
        self
    }
}

/// Validates time and issuer claims, and checks scopes
#[derive(Debug, Clone, Default)]
pub struct ClaimValidator {
    policy: ValidationPolicy,
}

impl ClaimValidator {
    /// Create a validator for the given policy
    #[must_use]
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// The active policy
    #[must_use]
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate against the current wall clock
    ///
    /// # Errors
    ///
    /// See [`ClaimValidator::validate_at`].
    pub fn validate(&self, claims: &Claims) -> Result<(), AuthError> {
        self.validate_at(claims, chrono::Utc::now().timestamp())
    }

    /// Validate against an explicit `now` (unix seconds)
    ///
    /// # Errors
    ///
    /// - [`AuthError::Token`] if `nbf` or `exp` is present but not a number
    /// - [`AuthError::NotYetValid`] if `nbf > now`
    /// - [`AuthError::Expired`] if `exp < now`
    /// - [`AuthError::IssuerMismatch`] if an issuer is expected and `iss` is
    ///   missing, empty or different
    pub fn validate_at(&self, claims: &Claims, now: i64) -> Result<(), AuthError> {
        if let Some(nbf) = claims.time_claim(CLAIM_NBF)?
            && nbf > now
        {
            return Err(AuthError::NotYetValid);
        }

        if let Some(exp) = claims.time_claim(CLAIM_EXP)?
            && exp < now
        {
            return Err(AuthError::Expired);
        }

        if let Some(expected) = self.policy.expected_issuer.as_deref() {
            let actual = claims.iss().ok_or(AuthError::IssuerMismatch)?;
            if actual.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
                return Err(AuthError::IssuerMismatch);
            }
        }

        Ok(())
    }

    /// Check that the token's scopes cover `required`
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InsufficientScope`] when [`scopes::allow`] fails.
    pub fn authorize<R: AsRef<str>>(&self, claims: &Claims, required: &[R]) -> Result<(), AuthError> {
        if scopes::allow(claims.scopes().as_slice(), required) {
            Ok(())
        } else {
            Err(AuthError::InsufficientScope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn validator() -> ClaimValidator {
        ClaimValidator::default()
    }

    #[test]
    fn test_valid_window() {
        let claims = Claims::new().with("nbf", NOW).with("exp", NOW);
        assert!(validator().validate_at(&claims, NOW).is_ok());
    }

    #[test]
    fn test_expired() {
        let claims = Claims::new().with("exp", NOW - 1);
        assert_eq!(validator().validate_at(&claims, NOW), Err(AuthError::Expired));
    }

    #[test]
    fn test_not_yet_valid() {
        let claims = Claims::new().with("nbf", NOW + 10);
        assert_eq!(
            validator().validate_at(&claims, NOW),
            Err(AuthError::NotYetValid)
        );
    }

    #[test]
    fn test_unparseable_time_claims_rejected() {
        for claims in [
            Claims::new().with("exp", "never"),
            Claims::new().with("exp", true),
            Claims::new().with("nbf", "soon"),
            Claims::new().with("exp", 1e300),
        ] {
            assert_eq!(
                validator().validate_at(&claims, NOW),
                Err(AuthError::Token(TokenError::Invalid)),
                "{claims:?}"
            );
        }
    }

    #[test]
    fn test_missing_time_claims_are_accepted() {
        assert!(validator().validate_at(&Claims::new(), NOW).is_ok());
    }

    #[test]
    fn test_issuer_required_when_configured() {
        let v = ClaimValidator::new(ValidationPolicy::new().expected_issuer("evo"));
        assert_eq!(v.validate_at(&Claims::new(), NOW), Err(AuthError::IssuerMismatch));
        assert_eq!(
            v.validate_at(&Claims::new().with("iss", ""), NOW),
            Err(AuthError::IssuerMismatch)
        );
        assert_eq!(
            v.validate_at(&Claims::new().with("iss", "other"), NOW),
            Err(AuthError::IssuerMismatch)
        );
        assert!(v.validate_at(&Claims::new().with("iss", "evo"), NOW).is_ok());
    }

    #[test]
    fn test_any_issuer_without_policy() {
        assert!(validator().validate_at(&Claims::new().with("iss", "x"), NOW).is_ok());
    }

    #[test]
    fn test_missing_scopes_mean_no_scopes() {
        let v = validator();
        let none: [&str; 0] = [];
        assert!(v.authorize(&Claims::new(), &none).is_ok());
        assert_eq!(
            v.authorize(&Claims::new(), &["read"]),
            Err(AuthError::InsufficientScope)
        );
        assert!(v.authorize(&Claims::new().with("scopes", "*"), &["read"]).is_ok());
    }
}
