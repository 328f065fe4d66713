//! Token endpoint access policies.
//!
//! Deciding who may obtain a token is a strategy: by role, by username
//! allowlist, or open to any authenticated user. [`PolicyConfig`] selects one
//! from configuration.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::users::UserRecord;

/// Role id granted access by default
pub const DEFAULT_ALLOWED_ROLE: i64 = 1;

/// Decides whether a verified user may be issued a token
pub trait AccessPolicy: Send + Sync + std::fmt::Debug {
    /// Whether `user` is permitted
    fn permits(&self, user: &UserRecord) -> bool;

    /// Short strategy name for logging
    fn name(&self) -> &'static str;
}

/// Permit users whose role is in a fixed set
#[derive(Debug, Clone)]
pub struct RolePolicy {
    roles: HashSet<i64>,
}

impl RolePolicy {
    /// Create a policy for the given role ids
    pub fn new(roles: impl IntoIterator<Item = i64>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::new([DEFAULT_ALLOWED_ROLE])
    }
}

impl AccessPolicy for RolePolicy {
    fn permits(&self, user: &UserRecord) -> bool {
        user.role.is_some_and(|role| self.roles.contains(&role))
    }

    fn name(&self) -> &'static str {
        "by_role"
    }
}

/// Permit an explicit list of usernames (case-insensitive)
#[derive(Debug, Clone, Default)]
pub struct AllowlistPolicy {
    usernames: HashSet<String>,
}

impl AllowlistPolicy {
    /// Create a policy for the given usernames
    pub fn new<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            usernames: usernames
                .into_iter()
                .map(|u| u.as_ref().trim().to_lowercase())
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }
}

impl AccessPolicy for AllowlistPolicy {
    fn permits(&self, user: &UserRecord) -> bool {
        self.usernames.contains(&user.username.to_lowercase())
    }

    fn name(&self) -> &'static str {
        "allowlist"
    }
}

/// Permit every verified user
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenPolicy;

impl AccessPolicy for OpenPolicy {
    fn permits(&self, _user: &UserRecord) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "open"
    }
}

/// Policy selection as it appears in configuration
///
/// ```toml
/// [auth.token_policy]
/// strategy = "allowlist"
/// usernames = ["admin", "deploy"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// Allow listed role ids
    ByRole {
        /// Permitted role ids
        #[serde(default = "default_roles")]
        roles: Vec<i64>,
    },
    /// Allow listed usernames
    Allowlist {
        /// Permitted usernames
        #[serde(default)]
        usernames: Vec<String>,
    },
    /// Allow everyone with valid credentials
    Open,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::ByRole {
            roles: default_roles(),
        }
    }
}

impl PolicyConfig {
    /// Instantiate the configured strategy
    #[must_use]
    pub fn build(&self) -> Arc<dyn AccessPolicy> {
        match self {
            Self::ByRole { roles } => Arc::new(RolePolicy::new(roles.iter().copied())),
            Self::Allowlist { usernames } => Arc::new(AllowlistPolicy::new(usernames)),
            Self::Open => Arc::new(OpenPolicy),
        }
    }
}

fn default_roles() -> Vec<i64> {
    vec![DEFAULT_ALLOWED_ROLE]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(name: &str, role: Option<i64>) -> UserRecord {
        UserRecord {
            id: "7".into(),
            username: name.into(),
            role,
        }
    }

    #[test]
    fn test_role_policy() {
        let policy = RolePolicy::default();
        assert!(policy.permits(&user("a", Some(1))));
        assert!(!policy.permits(&user("a", Some(2))));
        assert!(!policy.permits(&user("a", None)));
    }

    #[test]
    fn test_allowlist_is_case_insensitive() {
        let policy = AllowlistPolicy::new(["Admin", " "]);
        assert!(policy.permits(&user("admin", None)));
        assert!(policy.permits(&user("ADMIN", None)));
        assert!(!policy.permits(&user("bob", Some(1))));
    }

    #[test]
    fn test_open_policy() {
        assert!(OpenPolicy.permits(&user("anyone", None)));
    }

    #[test]
    fn test_config_selects_strategy() {
        let cfg: PolicyConfig =
            serde_json::from_value(json!({"strategy": "allowlist", "usernames": ["ops"]})).unwrap();
        let policy = cfg.build();
        assert_eq!(policy.name(), "allowlist");
        assert!(policy.permits(&user("ops", None)));

        let cfg: PolicyConfig = serde_json::from_value(json!({"strategy": "by_role"})).unwrap();
        assert_eq!(cfg, PolicyConfig::default());

        let cfg: PolicyConfig = serde_json::from_value(json!({"strategy": "open"})).unwrap();
        assert_eq!(cfg.build().name(), "open");
    }
}
