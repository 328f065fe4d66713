//! # Route Provider Discovery
//!
//! Turns provider declarations in manifest files into a route table:
//!
//! 1. Fingerprint the base and override manifests (mtime + size)
//! 2. Return the cached table when fingerprints, global version and base path
//!    all match the cache
//! 3. Otherwise read both manifests, normalize every declaration and merge
//!    them; override declarations replace base declarations with the same key
//! 4. Persist the new table atomically
//!
//! Unreadable or malformed manifests contribute nothing. A cache that cannot
//! be written is logged and the freshly built table is used anyway.

pub mod cache;
pub mod manifest;
mod normalize;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use cache::{CacheEntry, CacheMeta, Fingerprint};
pub use normalize::{normalize_descriptor, normalize_endpoint, normalize_version};

use crate::config::ApiConfig;

/// Resolved descriptors by key (`version/endpoint` or bare `endpoint`)
pub type RouteTable = BTreeMap<String, RouteDescriptor>;

/// Where a descriptor was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorSource {
    /// Base (lock) manifest
    Vendor,
    /// Override manifest
    Custom,
}

impl DescriptorSource {
    /// Lowercase label, as serialized
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Custom => "custom",
        }
    }
}

/// A provider mount point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Provider class id, resolved through the provider registry
    pub class: String,
    /// Lower-case path-safe endpoint segment
    pub endpoint: String,
    /// Path-safe version segment; empty when unversioned
    pub version: String,
    /// Declaring manifest
    pub source: DescriptorSource,
}

impl RouteDescriptor {
    /// Table key
    #[must_use]
    pub fn key(&self) -> String {
        if self.version.is_empty() {
            self.endpoint.clone()
        } else {
            format!("{}/{}", self.version, self.endpoint)
        }
    }

    /// Route name recorded on the request context, e.g. `sapi.orders.v1`
    #[must_use]
    pub fn route_name(&self) -> String {
        if self.version.is_empty() {
            format!("sapi.{}", self.endpoint)
        } else {
            format!("sapi.{}.{}", self.endpoint, self.version)
        }
    }
}

/// Manifest and cache locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Lock-style manifest listing installed packages
    pub base_manifest: PathBuf,
    /// Manifest whose declarations take precedence
    pub override_manifest: PathBuf,
    /// Cache file
    pub cache_path: PathBuf,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            base_manifest: PathBuf::from("composer.lock"),
            override_manifest: PathBuf::from("custom/composer.json"),
            cache_path: PathBuf::from("storage/cache/sapi_routes.json"),
        }
    }
}

/// Discovery failures; handled inside [`RouteDiscovery`]
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// File system failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Affected path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Cache content could not be (de)serialized
    #[error("invalid cache content: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads the route table, using the cache when it is current
#[derive(Debug, Clone)]
pub struct RouteDiscovery {
    config: DiscoveryConfig,
    global_version: String,
    base_path: String,
}

impl RouteDiscovery {
    /// Discovery for the given API layout
    #[must_use]
    pub fn new(config: DiscoveryConfig, api: &ApiConfig) -> Self {
        Self::with_settings(config, &api.version, api.base_path())
    }

    /// Discovery with explicit version and base path
    #[must_use]
    pub fn with_settings(config: DiscoveryConfig, global_version: &str, base_path: &str) -> Self {
        Self {
            config,
            global_version: normalize_version(global_version),
            base_path: base_path.trim().trim_matches('/').to_string(),
        }
    }

    /// Locations in use
    #[must_use]
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Resolve the route table
    #[must_use]
    pub fn load_route_table(&self) -> RouteTable {
        let meta = self.current_meta();

        if let Some(routes) = self.cached(&meta) {
            debug!(routes = routes.len(), "route table served from cache");
            return routes;
        }

        let entry = CacheEntry {
            meta,
            routes: self.build_table(),
        };
        info!(routes = entry.routes.len(), "route table rebuilt");

        if let Err(e) = cache::write_atomic(&self.config.cache_path, &entry) {
            warn!(path = %self.config.cache_path.display(), error = %e, "failed to write route cache");
        }
        entry.routes
    }

    /// Fingerprints and settings as they are now
    #[must_use]
    pub fn current_meta(&self) -> CacheMeta {
        CacheMeta::new(
            Fingerprint::of(&self.config.base_manifest),
            Fingerprint::of(&self.config.override_manifest),
            &self.global_version,
            &self.base_path,
        )
    }

    /// The cached table, if it was built from `meta`
    fn cached(&self, meta: &CacheMeta) -> Option<RouteTable> {
        if !self.config.base_manifest.is_file() {
            return None;
        }
        let entry = match cache::read(&self.config.cache_path) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "route cache unavailable");
                return None;
            }
        };
        (entry.meta == *meta).then_some(entry.routes)
    }

    /// Read both manifests and merge their declarations
    #[must_use]
    pub fn build_table(&self) -> RouteTable {
        let vendor = read_source(&self.config.base_manifest, |m| {
            manifest::collect(manifest::base_entries(m), &self.global_version, DescriptorSource::Vendor)
        });
        let custom = read_source(&self.config.override_manifest, |m| {
            manifest::collect(manifest::override_entries(m), &self.global_version, DescriptorSource::Custom)
        });

        let mut table = vendor;
        table.extend(custom);
        table
    }
}

fn read_source(path: &Path, collect: impl FnOnce(&serde_json::Value) -> RouteTable) -> RouteTable {
    manifest::read_manifest(path)
        .map(|m| collect(&m))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(version: &str) -> RouteDescriptor {
        RouteDescriptor {
            class: "sapi.whoami".into(),
            endpoint: "whoami".into(),
            version: version.into(),
            source: DescriptorSource::Vendor,
        }
    }

    #[test]
    fn test_key_and_route_name() {
        assert_eq!(descriptor("v1").key(), "v1/whoami");
        assert_eq!(descriptor("").key(), "whoami");
        assert_eq!(descriptor("v1").route_name(), "sapi.whoami.v1");
        assert_eq!(descriptor("").route_name(), "sapi.whoami");
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let value = serde_json::to_value(descriptor("v1")).unwrap();
        assert_eq!(value["source"], "vendor");
    }

    #[test]
    fn test_settings_are_normalized() {
        let discovery = RouteDiscovery::with_settings(DiscoveryConfig::default(), " /v2/ ", "/api/");
        let meta = discovery.current_meta();
        assert_eq!(meta.global_version, "v2");
        assert_eq!(meta.base_path, "api");
    }
}
