//! Memoizes provider answers per rounded coordinate so that observations made
//! close to each other cost a single external lookup.

use crate::cache::error::CacheError;
use crate::types::coordinate_key::CoordinateKey;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;

/// Mapping from [`CoordinateKey`] to a previously observed provider answer.
///
/// Lookups are pure: they round the query coordinates and consult memory only.
/// The durable store is a JSON object keyed by the `"lat,lon"` text encoding of
/// each key and is always rewritten as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityCache {
    precision: u8,
    entries: HashMap<CoordinateKey, f64>,
}

impl ProximityCache {
    pub fn new(precision: u8) -> Self {
        Self {
            precision,
            entries: HashMap::new(),
        }
    }

    /// Reads the cache store at `path`, or returns an empty cache when the file
    /// does not exist yet.
    ///
    /// Stored keys are re-rounded to `precision`. Keys that cannot be parsed are
    /// skipped with a warning rather than failing the whole load.
    pub async fn load(path: &Path, precision: u8) -> Result<Self, CacheError> {
        if !path.exists() {
            info!(
                "No cache store at {}, starting with an empty cache",
                path.display()
            );
            return Ok(Self::new(precision));
        }

        let path_clone = path.to_path_buf();
        let cache =
            task::spawn_blocking(move || Self::read_store(&path_clone, precision)).await??;
        info!(
            "Loaded {} cached coordinates from {}",
            cache.len(),
            path.display()
        );
        Ok(cache)
    }

    fn read_store(path: &Path, precision: u8) -> Result<Self, CacheError> {
        let bytes =
            std::fs::read(path).map_err(|e| CacheError::CacheRead(path.to_path_buf(), e))?;
        let stored: BTreeMap<String, Option<f64>> = serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::CacheDecode(path.to_path_buf(), e))?;

        let mut cache = Self::new(precision);
        for (raw_key, value) in stored {
            let Some(value) = value.filter(|v| v.is_finite()) else {
                warn!("Skipping cache entry {} without a value in {}", raw_key, path.display());
                continue;
            };
            match CoordinateKey::parse_with_precision(&raw_key, precision) {
                Ok(key) => {
                    cache.entries.insert(key, value);
                }
                Err(e) => warn!("Skipping cache entry in {}: {}", path.display(), e),
            }
        }
        Ok(cache)
    }

    /// Rounds the coordinates to this cache's precision.
    pub fn key(&self, latitude: f64, longitude: f64) -> CoordinateKey {
        CoordinateKey::new(latitude, longitude, self.precision)
    }

    pub fn lookup(&self, latitude: f64, longitude: f64) -> Option<f64> {
        self.get(&self.key(latitude, longitude))
    }

    pub fn get(&self, key: &CoordinateKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Records an answer, replacing any previous one for the same key.
    ///
    /// NaN and infinities have no JSON representation and are not stored.
    pub fn insert(&mut self, latitude: f64, longitude: f64, value: f64) -> Option<f64> {
        if !value.is_finite() {
            warn!(
                "Not caching non-finite value {} for ({}, {})",
                value, latitude, longitude
            );
            return None;
        }
        let key = self.key(latitude, longitude);
        self.entries.insert(key, value)
    }

    /// Union of both caches; entries of `newer` win on key collisions.
    ///
    /// Keys of `newer` are re-rounded if it was built with another precision.
    pub fn merge(mut self, newer: ProximityCache) -> Self {
        for (key, value) in newer.entries {
            let key = if key.precision() == self.precision {
                key
            } else {
                CoordinateKey::new(key.latitude(), key.longitude(), self.precision)
            };
            self.entries.insert(key, value);
        }
        self
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Atomically replaces the store at `path` with the current content.
    ///
    /// The JSON is written to a temporary file next to `path` and renamed over
    /// it, so readers never observe a partially written store.
    pub async fn save(&self, path: &Path) -> Result<(), CacheError> {
        let stored: BTreeMap<String, f64> = self
            .entries
            .iter()
            .filter(|(_, value)| value.is_finite())
            .map(|(key, value)| (key.to_string(), *value))
            .collect();
        let path_buf = path.to_path_buf();

        let written = task::spawn_blocking(move || Self::write_store(&path_buf, &stored)).await??;
        info!(
            "Wrote {} cached coordinates ({} bytes) to {}",
            self.len(),
            written,
            path.display()
        );
        Ok(())
    }

    fn write_store(path: &Path, stored: &BTreeMap<String, f64>) -> Result<usize, CacheError> {
        let json = serde_json::to_vec_pretty(stored).map_err(CacheError::CacheEncode)?;
        let dir = Self::parent_dir(path)?;
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::CacheWrite(path.to_path_buf(), e))?;

        let mut temp_file =
            NamedTempFile::new_in(&dir).map_err(|e| CacheError::CacheWrite(path.to_path_buf(), e))?;
        temp_file
            .write_all(&json)
            .map_err(|e| CacheError::CacheWrite(path.to_path_buf(), e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| CacheError::CacheWrite(path.to_path_buf(), e))?;
        temp_file
            .persist(path)
            .map_err(|e| CacheError::CacheWrite(path.to_path_buf(), e.error))?;
        Ok(json.len())
    }

    fn parent_dir(path: &Path) -> Result<PathBuf, CacheError> {
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Ok(PathBuf::from(".")),
            Some(parent) => Ok(parent.to_path_buf()),
            None => Err(CacheError::NoParentDirectory(path.to_path_buf())),
        }
    }
}
