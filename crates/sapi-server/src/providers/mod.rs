//! Route providers and their registry
//!
//! A discovered descriptor names a provider class. The [`ProviderRegistry`]
//! maps class ids to factories registered at startup; the router asks each
//! resolved provider for the routes to mount under the descriptor's path.

mod whoami;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::Router;

pub use whoami::{WHOAMI_CLASS, WhoamiProvider};

use crate::discovery::RouteDescriptor;

/// Where a provider's routes live
#[derive(Debug, Clone)]
pub struct RouteMount {
    path: String,
    descriptor: RouteDescriptor,
}

impl RouteMount {
    /// Mount `descriptor` at `path`
    #[must_use]
    pub fn new(path: impl Into<String>, descriptor: RouteDescriptor) -> Self {
        Self {
            path: path.into(),
            descriptor,
        }
    }

    /// Absolute mount path, e.g. `/api/v1/orders`
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `suffix` under the mount path
    #[must_use]
    pub fn join(&self, suffix: &str) -> String {
        let suffix = suffix.trim_matches('/');
        if suffix.is_empty() {
            self.path.clone()
        } else {
            format!("{}/{}", self.path.trim_end_matches('/'), suffix)
        }
    }

    /// The descriptor being mounted
    #[must_use]
    pub fn descriptor(&self) -> &RouteDescriptor {
        &self.descriptor
    }
}

/// A package of routes mounted behind the auth gateway
pub trait RouteProvider: Send + Sync {
    /// Routes for this mount; paths must lie under [`RouteMount::path`]
    fn routes(&self, mount: &RouteMount) -> Router;

    /// Scopes every route of this provider requires
    fn required_scopes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Constructs a provider instance
pub type ProviderFactory = Arc<dyn Fn() -> Arc<dyn RouteProvider> + Send + Sync>;

/// Class id to provider factory
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes = self.classes();
        classes.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("classes", &classes)
            .finish()
    }
}

impl ProviderRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers
    #[must_use]
    pub fn with_builtin() -> Self {
        Self::new().with(WHOAMI_CLASS, || Arc::new(WhoamiProvider) as Arc<dyn RouteProvider>)
    }

    /// Register `factory` for `class`, replacing any previous one
    pub fn register<F>(&mut self, class: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn RouteProvider> + Send + Sync + 'static,
    {
        self.factories.insert(class.into(), Arc::new(factory));
    }

    /// Builder form of [`ProviderRegistry::register`]
    #[must_use]
    pub fn with<F>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn RouteProvider> + Send + Sync + 'static,
    {
        self.register(class, factory);
        self
    }

    /// Instantiate the provider for `class`
    #[must_use]
    pub fn resolve(&self, class: &str) -> Option<Arc<dyn RouteProvider>> {
        self.factories.get(class).map(|factory| factory())
    }

    /// Whether `class` is registered
    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Registered class ids
    #[must_use]
    pub fn classes(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DescriptorSource;

    fn mount(path: &str) -> RouteMount {
        RouteMount::new(
            path,
            RouteDescriptor {
                class: WHOAMI_CLASS.into(),
                endpoint: "whoami".into(),
                version: "v1".into(),
                source: DescriptorSource::Vendor,
            },
        )
    }

    #[test]
    fn test_mount_join() {
        let m = mount("/api/v1/orders");
        assert_eq!(m.join(""), "/api/v1/orders");
        assert_eq!(m.join("/{id}"), "/api/v1/orders/{id}");
        assert_eq!(m.descriptor().endpoint, "whoami");
    }

    #[test]
    fn test_registry_resolution() {
        let registry = ProviderRegistry::with_builtin();
        assert!(registry.contains(WHOAMI_CLASS));
        assert!(registry.resolve(WHOAMI_CLASS).is_some());
        assert!(registry.resolve("Vendor\\Missing").is_none());
        assert_eq!(registry.classes(), vec![WHOAMI_CLASS]);
    }
}
