//! On-disk route table cache
//!
//! The cache is keyed by fingerprints of both manifests plus the global version
//! and base path. Writes go to a unique temporary file that is synced and then
//! renamed over the cache, so readers see either the old or the new file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use super::{DiscoveryError, RouteTable};

/// Modification time and size of a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Modification time, unix seconds
    pub mtime: i64,
    /// Size in bytes
    pub size: u64,
}

impl Fingerprint {
    /// Fingerprint `path`; a missing or unreadable file is `(0, 0)`
    #[must_use]
    pub fn of(path: &Path) -> Self {
        let Ok(metadata) = fs::metadata(path) else {
            return Self::default();
        };
        if !metadata.is_file() {
            return Self::default();
        }
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs() as i64);
        Self {
            mtime,
            size: metadata.len(),
        }
    }
}

/// Values a cached table was built from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// Base manifest modification time
    pub base_mtime: i64,
    /// Base manifest size
    pub base_size: u64,
    /// Override manifest modification time
    pub override_mtime: i64,
    /// Override manifest size
    pub override_size: u64,
    /// Normalized global version
    pub global_version: String,
    /// Normalized base path
    pub base_path: String,
}

impl CacheMeta {
    /// Assemble from source fingerprints and settings
    #[must_use]
    pub fn new(base: Fingerprint, over: Fingerprint, global_version: &str, base_path: &str) -> Self {
        Self {
            base_mtime: base.mtime,
            base_size: base.size,
            override_mtime: over.mtime,
            override_size: over.size,
            global_version: global_version.to_string(),
            base_path: base_path.to_string(),
        }
    }
}

/// A cached route table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Build inputs
    pub meta: CacheMeta,
    /// Resolved descriptors by key
    pub routes: RouteTable,
}

/// Read and parse the cache file
///
/// # Errors
///
/// Returns [`DiscoveryError`] if the file cannot be read or parsed.
pub fn read(path: &Path) -> Result<CacheEntry, DiscoveryError> {
    let bytes = fs::read(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Atomically replace the cache file with `entry`
///
/// # Errors
///
/// Returns [`DiscoveryError`] if any step fails; the temporary file is removed.
pub fn write_atomic(path: &Path, entry: &CacheEntry) -> Result<(), DiscoveryError> {
    let payload = serde_json::to_vec_pretty(entry)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let temp_path = temp_path_for(path);
    let result = write_and_rename(&temp_path, path, &payload);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(temp_path: &Path, path: &Path, payload: &[u8]) -> Result<(), DiscoveryError> {
    let io_err = |p: &Path| {
        let p = p.to_path_buf();
        move |source: std::io::Error| DiscoveryError::Io { path: p, source }
    };

    let mut file = File::create(temp_path).map_err(io_err(temp_path))?;
    file.write_all(payload).map_err(io_err(temp_path))?;
    file.sync_all().map_err(io_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, path).map_err(io_err(path))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fingerprint() {
        assert_eq!(
            Fingerprint::of(Path::new("/nonexistent/composer.lock")),
            Fingerprint::default()
        );
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let temp = temp_path_for(Path::new("/var/cache/routes.json"));
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert_eq!(temp.parent(), Some(Path::new("/var/cache")));
        assert!(name.starts_with("routes.json."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn test_meta_serializes_flat() {
        let meta = CacheMeta::new(
            Fingerprint { mtime: 5, size: 10 },
            Fingerprint::default(),
            "v1",
            "api",
        );
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "base_mtime": 5, "base_size": 10,
                "override_mtime": 0, "override_size": 0,
                "global_version": "v1", "base_path": "api"
            })
        );
    }
}
