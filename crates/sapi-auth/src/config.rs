//! Authentication configuration
//!
//! Use [`AuthConfigBuilder`] for ergonomic construction in code; the server
//! deserializes the same struct from its layered configuration.

use secrecy::{ExposeSecret, Secret, SecretString};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::AuthError;
use crate::jwt::TokenCodec;
use crate::policy::PolicyConfig;
use crate::scopes;
use crate::validation::ValidationPolicy;

/// Token lifetime used when none (or a non-positive one) is configured
pub const DEFAULT_TTL_SECONDS: i64 = 3600;

/// Signing and claim-default configuration
///
/// # Example
///
/// ```rust
/// use sapi_auth::AuthConfig;
///
/// let config = AuthConfig::builder()
///     .secret("s3cr3t")
///     .ttl_seconds(0)
///     .issuer("evo")
///     .build();
///
/// assert_eq!(config.effective_ttl(None), 3600);
/// assert_eq!(config.issuer(), Some("evo"));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HS256 secret; required to issue or verify
    pub secret: Option<SecretString>,
    /// Token lifetime in seconds; values `<= 0` fall back to 3600
    #[serde(alias = "ttl")]
    pub ttl_seconds: i64,
    /// Scopes granted when the caller supplies none
    #[serde(deserialize_with = "deserialize_scopes")]
    pub scopes: Vec<String>,
    /// Expected and issued `iss` claim; empty means "not configured"
    #[serde(alias = "iss")]
    pub issuer: Option<String>,
    /// Who may obtain tokens from the token endpoint
    pub token_policy: PolicyConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            scopes: vec![scopes::WILDCARD_SCOPE.to_string()],
            issuer: None,
            token_policy: PolicyConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Secret bytes, or `None` when unset or empty
    #[must_use]
    pub fn secret_bytes(&self) -> Option<Vec<u8>> {
        self.secret
            .as_ref()
            .map(|s| s.expose_secret().as_bytes().to_vec())
            .filter(|bytes| !bytes.is_empty())
    }

    /// Whether a usable secret is configured
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty())
    }

    /// Codec bound to the configured secret
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingSecret`] when no secret is configured.
    pub fn codec(&self) -> Result<TokenCodec, AuthError> {
        self.secret_bytes()
            .map(TokenCodec::new)
            .ok_or(AuthError::MissingSecret)
    }

    /// Lifetime to apply, preferring a positive override
    #[must_use]
    pub fn effective_ttl(&self, ttl_override: Option<i64>) -> i64 {
        let ttl = ttl_override.unwrap_or(self.ttl_seconds);
        if ttl < 1 { DEFAULT_TTL_SECONDS } else { ttl }
    }

    /// Default scopes, never empty
    #[must_use]
    pub fn default_scopes(&self) -> Vec<String> {
        let value = Value::Array(self.scopes.iter().cloned().map(Value::String).collect());
        scopes::for_issue(Some(&value))
    }

    /// Configured issuer if non-empty
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Validation policy derived from this configuration
    #[must_use]
    pub fn validation_policy(&self) -> ValidationPolicy {
        match self.issuer() {
            Some(iss) => ValidationPolicy::new().expected_issuer(iss),
            None => ValidationPolicy::new(),
        }
    }
}

/// Builder for [`AuthConfig`]
#[derive(Debug, Clone, Default)]
pub struct AuthConfigBuilder {
    secret: Option<String>,
    ttl_seconds: Option<i64>,
    scopes: Option<Vec<String>>,
    issuer: Option<String>,
    token_policy: Option<PolicyConfig>,
}

impl AuthConfigBuilder {
    /// Set the signing secret
    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set the token lifetime
    #[must_use]
    pub fn ttl_seconds(mut self, ttl: i64) -> Self {
        self.ttl_seconds = Some(ttl);
        self
    }

    /// Set the default scopes
    #[must_use]
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Set the issuer
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the token endpoint access policy
    #[must_use]
    pub fn token_policy(mut self, policy: PolicyConfig) -> Self {
        self.token_policy = Some(policy);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> AuthConfig {
        let defaults = AuthConfig::default();

        AuthConfig {
            secret: self.secret.map(Secret::new).or(defaults.secret),
            ttl_seconds: self.ttl_seconds.unwrap_or(defaults.ttl_seconds),
            scopes: self.scopes.unwrap_or(defaults.scopes),
            issuer: self.issuer.or(defaults.issuer),
            token_policy: self.token_policy.unwrap_or(defaults.token_policy),
        }
    }
}

fn deserialize_scopes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scopes::from_value(&value))
}
