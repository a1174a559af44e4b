//! Load and save path resolution for (optionally) versioned datasets
//!
//! A versioned dataset at `path` stores each version at
//! `path/<version>/<basename(path)>`.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::application::ports::FileSystem;
use crate::domain::errors::DatasetError;
use crate::domain::value_objects::{generate_timestamp, DatasetPath, Version};

#[derive(Debug, Default)]
struct VersionCache {
    load: Option<String>,
    save: Option<String>,
}

/// Resolves the concrete load and save paths of one dataset
#[derive(Debug)]
pub struct VersionedPath {
    path: DatasetPath,
    version: Option<Version>,
    /// Used in error messages
    label: String,
    cache: Mutex<VersionCache>,
}

impl VersionedPath {
    pub fn new(path: DatasetPath, version: Option<Version>, label: impl Into<String>) -> Self {
        Self {
            path,
            version,
            label: label.into(),
            cache: Mutex::new(VersionCache::default()),
        }
    }

    pub fn dataset_path(&self) -> &DatasetPath {
        &self.path
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }

    /// Unversioned filesystem path of the dataset
    pub fn base_path(&self) -> String {
        self.path.filesystem_path(self.path.path())
    }

    /// Filesystem path of `version`
    pub fn versioned_path(&self, version: &str) -> String {
        let path = format!(
            "{}/{}/{}",
            self.path.path().trim_end_matches('/'),
            version,
            self.path.basename()
        );
        self.path.filesystem_path(&path)
    }

    /// Version to load, resolving and caching the latest when none is pinned
    pub fn resolve_load_version(&self, fs: &dyn FileSystem) -> Result<Option<String>, DatasetError> {
        let Some(version) = &self.version else {
            return Ok(None);
        };
        if let Some(load) = &version.load {
            return Ok(Some(load.clone()));
        }

        let mut cache = self.cache.lock();
        if let Some(load) = &cache.load {
            return Ok(Some(load.clone()));
        }
        let latest = self.fetch_latest_load_version(fs)?;
        cache.load = Some(latest.clone());
        Ok(Some(latest))
    }

    /// Version to save, generating (and caching) a timestamp when none is pinned
    pub fn resolve_save_version(&self) -> Option<String> {
        let version = self.version.as_ref()?;
        if let Some(save) = &version.save {
            return Some(save.clone());
        }
        let mut cache = self.cache.lock();
        Some(cache.save.get_or_insert_with(generate_timestamp).clone())
    }

    pub fn load_path(&self, fs: &dyn FileSystem) -> Result<String, DatasetError> {
        match self.resolve_load_version(fs)? {
            Some(version) => Ok(self.versioned_path(&version)),
            None => Ok(self.base_path()),
        }
    }

    /// Path to save to; a versioned path must not exist yet
    pub fn save_path(&self, fs: &dyn FileSystem) -> Result<String, DatasetError> {
        let Some(version) = self.resolve_save_version() else {
            return Ok(self.base_path());
        };

        let path = self.versioned_path(&version);
        if fs.exists(&path)? {
            return Err(DatasetError::Versioning(format!(
                "Save path '{}' for {} must not exist if versioning is enabled.",
                path, self.label
            )));
        }
        Ok(path)
    }

    /// Forget resolved versions so the next load/save resolves afresh
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        cache.load = None;
        cache.save = None;
    }

    /// Warn when a save is followed by a load of a different version
    pub fn check_consistency(&self, fs: &dyn FileSystem) -> Result<(), DatasetError> {
        let Some(save_version) = self.resolve_save_version() else {
            return Ok(());
        };
        let load_version = self.resolve_load_version(fs)?;
        if load_version.as_deref() != Some(save_version.as_str()) {
            warn!(
                dataset = %self.label,
                save_version = %save_version,
                load_version = ?load_version,
                "Save version does not match load version; loads will not return the saved data"
            );
        }
        Ok(())
    }

    fn fetch_latest_load_version(&self, fs: &dyn FileSystem) -> Result<String, DatasetError> {
        let pattern = self.versioned_path("*");
        let mut candidates = fs.glob(&pattern)?;
        candidates.sort_unstable_by(|a, b| b.cmp(a));
        debug!(pattern = %pattern, found = candidates.len(), "Resolving latest version");

        for candidate in candidates {
            if !fs.exists(&candidate)? {
                continue;
            }
            if let Some(version) = parent_name(&candidate) {
                return Ok(version.to_string());
            }
        }

        Err(DatasetError::PathResolution(format!(
            "Did not find any versions for {}",
            self.label
        )))
    }
}

fn parent_name(path: &str) -> Option<&str> {
    let mut segments = path.trim_end_matches('/').rsplit('/');
    segments.next()?;
    segments.next().filter(|name| !name.is_empty())
}
