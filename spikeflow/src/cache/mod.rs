//! Per-node cache policy and artifact persistence.
//!
//! Every cache-bearing node owns a [`Cacher`]. Before a node computes, the
//! cacher decides whether a persisted artifact can stand in for the
//! computation; after a compute, the fresh result is persisted so later
//! `Auto` runs can reuse it.

use crate::core::Payload;
use crate::errors::{ConfigurationError, SpikeflowError};
use crate::utils::iso_timestamp;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Cache behavior for a node across pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Reuse a persisted artifact when present and valid.
    Auto,
    /// Always recompute; the fresh artifact still overwrites any stale one.
    Off,
    /// Reserved forced-hit mode. Never set by the executor; behaves as `Auto`.
    On,
}

/// A persisted cache entry: envelope plus payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheArtifact {
    /// Fingerprint the payload was computed under.
    pub fingerprint: String,
    /// Tag of the producing node.
    pub tag: String,
    /// When the artifact was written (RFC3339).
    pub created_at: String,
    /// The cached value.
    pub payload: Payload,
}

/// Per-node cache controller.
///
/// The policy is flipped by the executor before each run; the cache
/// directory is resolved from the run's save path on first use.
#[derive(Debug)]
pub struct Cacher {
    policy: RwLock<CachePolicy>,
    cache_dir: RwLock<Option<PathBuf>>,
    index: Mutex<HashMap<String, PathBuf>>,
}

impl Default for Cacher {
    fn default() -> Self {
        Self {
            policy: RwLock::new(CachePolicy::Auto),
            cache_dir: RwLock::new(None),
            index: Mutex::new(HashMap::new()),
        }
    }
}

impl Cacher {
    /// Creates a cacher with the `Auto` policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current cache policy.
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        *self.policy.read()
    }

    /// Sets the cache policy for subsequent runs.
    pub fn set_policy(&self, policy: CachePolicy) {
        *self.policy.write() = policy;
    }

    /// Resolves and creates this node's cache directory under `save_path`.
    ///
    /// The directory is scoped by node tag; tags must therefore be unique
    /// within a pipeline.
    pub fn configure(&self, save_path: &Path, tag: &str) -> Result<(), ConfigurationError> {
        let dir = save_path.join(tag);
        fs::create_dir_all(&dir).map_err(|e| {
            ConfigurationError::new(dir.clone(), format!("cannot create cache directory: {e}"))
        })?;
        *self.cache_dir.write() = Some(dir);
        Ok(())
    }

    fn artifact_path(&self, fingerprint: &str) -> Option<PathBuf> {
        self.cache_dir
            .read()
            .as_ref()
            .map(|dir| dir.join(format!("cache_{fingerprint}.json")))
    }

    /// Loads the artifact persisted for `fingerprint`, if any.
    ///
    /// Any read or decode failure is a cache miss: the caller recomputes.
    #[must_use]
    pub fn load(&self, fingerprint: &str) -> Option<Payload> {
        let path = self.artifact_path(fingerprint)?;
        let bytes = fs::read(&path).ok()?;
        let artifact: CacheArtifact = match serde_json::from_slice(&bytes) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "discarding unreadable cache artifact");
                return None;
            }
        };
        if artifact.fingerprint != fingerprint {
            tracing::debug!(path = %path.display(), "discarding cache artifact with stale fingerprint");
            return None;
        }
        self.index.lock().insert(fingerprint.to_string(), path);
        Some(artifact.payload)
    }

    /// Persists `payload` under `fingerprint`, overwriting any stale artifact.
    pub fn store(
        &self,
        tag: &str,
        fingerprint: &str,
        payload: &Payload,
    ) -> Result<PathBuf, SpikeflowError> {
        let path = self.artifact_path(fingerprint).ok_or_else(|| {
            ConfigurationError::new(PathBuf::new(), "cache directory not configured")
        })?;
        let artifact = CacheArtifact {
            fingerprint: fingerprint.to_string(),
            tag: tag.to_string(),
            created_at: iso_timestamp(),
            payload: payload.clone(),
        };
        let bytes = serde_json::to_vec(&artifact)
            .map_err(|e| SpikeflowError::Serialization(e.to_string()))?;
        fs::write(&path, bytes).map_err(|e| {
            ConfigurationError::new(path.clone(), format!("cannot write cache artifact: {e}"))
        })?;
        self.index.lock().insert(fingerprint.to_string(), path.clone());
        Ok(path)
    }
}

/// Derives a cache fingerprint from identity components.
#[must_use]
pub fn fingerprint(components: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(components.join(":").as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Hashes operator parameters for inclusion in a fingerprint.
#[must_use]
pub fn hash_params(params: &serde_json::Value) -> String {
    let json = serde_json::to_string(params).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Spikestamps;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint(&["detect", "p1", "loader"]);
        let b = fingerprint(&["detect", "p1", "loader"]);
        let c = fingerprint(&["detect", "p2", "loader"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_hash_params_tracks_values() {
        let p1 = serde_json::json!({"cutoff": 5.0});
        let p2 = serde_json::json!({"cutoff": 3.5});

        assert_eq!(hash_params(&p1), hash_params(&p1));
        assert_ne!(hash_params(&p1), hash_params(&p2));
    }

    #[test]
    fn test_store_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cacher = Cacher::new();
        cacher.configure(dir.path(), "detect").unwrap();

        let payload = Payload::Spikestamps(Spikestamps::new(vec![vec![0.25, 0.5]]));
        let path = cacher.store("detect", "abc123", &payload).unwrap();
        assert!(path.exists());

        let loaded = cacher.load("abc123").unwrap();
        assert_eq!(loaded, payload);
    }

    #[test]
    fn test_load_missing_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cacher = Cacher::new();
        cacher.configure(dir.path(), "detect").unwrap();

        assert!(cacher.load("nope").is_none());
    }

    #[test]
    fn test_load_corrupt_artifact_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cacher = Cacher::new();
        cacher.configure(dir.path(), "detect").unwrap();

        fs::write(dir.path().join("detect/cache_bad.json"), b"{not json").unwrap();
        assert!(cacher.load("bad").is_none());
    }

    #[test]
    fn test_store_overwrites_stale_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let cacher = Cacher::new();
        cacher.configure(dir.path(), "detect").unwrap();

        let stale = Payload::Spikestamps(Spikestamps::new(vec![vec![0.1]]));
        let fresh = Payload::Spikestamps(Spikestamps::new(vec![vec![0.9]]));
        cacher.store("detect", "fp", &stale).unwrap();
        cacher.store("detect", "fp", &fresh).unwrap();

        assert_eq!(cacher.load("fp"), Some(fresh));
    }

    #[test]
    fn test_store_requires_configuration() {
        let cacher = Cacher::new();
        let result = cacher.store("detect", "fp", &Payload::Empty);
        assert!(matches!(result, Err(SpikeflowError::Configuration(_))));
    }

    #[test]
    fn test_policy_flip() {
        let cacher = Cacher::new();
        assert_eq!(cacher.policy(), CachePolicy::Auto);
        cacher.set_policy(CachePolicy::Off);
        assert_eq!(cacher.policy(), CachePolicy::Off);
    }
}
