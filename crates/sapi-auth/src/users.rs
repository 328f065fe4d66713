//! User lookup and credential verification.
//!
//! Password storage is owned by the host application; the gateway only needs a
//! lookup and a `verify(username, password) -> bool` capability.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// A user known to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable user identifier
    pub id: String,
    /// Login name
    pub username: String,
    /// Role id, if the backing store has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<i64>,
}

/// Credential capability used by the token endpoint
#[async_trait]
pub trait UserProvider: Send + Sync {
    /// Look up a user by login name
    async fn find(&self, username: &str) -> Option<UserRecord>;

    /// Check a password for a login name
    async fn verify(&self, username: &str, password: &str) -> bool;
}

/// A user entry in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Login name
    pub username: String,
    /// User id; defaults to the username
    #[serde(default)]
    pub id: Option<String>,
    /// Role id
    #[serde(default)]
    pub role: Option<i64>,
    /// Lowercase hex SHA-256 digest of the password
    pub password_sha256: String,
}

/// Users read from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticUserProvider {
    users: HashMap<String, (UserRecord, String)>,
}

impl StaticUserProvider {
    /// Build from configured entries; later duplicates replace earlier ones
    pub fn new(entries: impl IntoIterator<Item = UserConfig>) -> Self {
        let users = entries
            .into_iter()
            .filter(|entry| !entry.username.trim().is_empty())
            .map(|entry| {
                let username = entry.username.trim().to_string();
                let record = UserRecord {
                    id: entry.id.unwrap_or_else(|| username.clone()),
                    username: username.clone(),
                    role: entry.role,
                };
                let digest = entry.password_sha256.trim().to_ascii_lowercase();
                (username, (record, digest))
            })
            .collect();
        Self { users }
    }

    /// Number of configured users
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no users are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserProvider for StaticUserProvider {
    async fn find(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).map(|(record, _)| record.clone())
    }

    async fn verify(&self, username: &str, password: &str) -> bool {
        let Some((_, expected)) = self.users.get(username) else {
            return false;
        };
        let actual = sha256_hex(password);
        actual.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

/// Lowercase hex SHA-256 of `input`
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
