use std::io::{Read, Write};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::application::ports::{FileSystem, OpenArgs};
use crate::application::VersionedPath;
use crate::config::FsArgs;
use crate::domain::errors::DatasetError;
use crate::domain::value_objects::{DatasetPath, Version};

/// Path, version and filesystem plumbing shared by the file-backed datasets
pub struct DatasetStorage {
    versioned: VersionedPath,
    fs: Arc<dyn FileSystem>,
    open_args_load: OpenArgs,
    open_args_save: OpenArgs,
}

impl DatasetStorage {
    /// `default_save_mode` applies when `fs_args.open_args_save` names no mode
    pub fn new(
        type_name: &str,
        path: DatasetPath,
        version: Option<Version>,
        fs: Arc<dyn FileSystem>,
        fs_args: &FsArgs,
        default_save_mode: &str,
    ) -> Self {
        let label = format!("{}(filepath={})", type_name, path);
        Self {
            versioned: VersionedPath::new(path, version, label),
            fs,
            open_args_load: fs_args.open_args_load.clone(),
            open_args_save: fs_args
                .open_args_save
                .clone()
                .with_default_mode(default_save_mode),
        }
    }

    pub fn dataset_path(&self) -> &DatasetPath {
        self.versioned.dataset_path()
    }

    pub fn open_args_load(&self) -> &OpenArgs {
        &self.open_args_load
    }

    pub fn open_args_save(&self) -> &OpenArgs {
        &self.open_args_save
    }

    pub fn load_path(&self) -> Result<String, DatasetError> {
        self.versioned.load_path(self.fs.as_ref())
    }

    /// Whole content of the current load path
    pub fn read_bytes(&self) -> Result<Vec<u8>, DatasetError> {
        let path = self.load_path()?;
        debug!(path = %path, "Loading");

        let mut reader = self.fs.open_read(&path, &self.open_args_load)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Write `bytes` to a fresh save path
    ///
    /// Resolved versions are forgotten first, so every call to a versioned
    /// dataset gets its own save version.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<(), DatasetError> {
        self.versioned.clear_cache();
        let path = self.versioned.save_path(self.fs.as_ref())?;
        debug!(path = %path, bytes = bytes.len(), "Saving");

        let mut writer = self.fs.open_write(&path, &self.open_args_save)?;
        writer.write_all(bytes)?;
        writer.flush()?;
        drop(writer);

        self.fs.invalidate_cache(&self.versioned.base_path());
        // Data is committed; a failed check only warns
        if let Err(err) = self.versioned.check_consistency(self.fs.as_ref()) {
            warn!(path = %path, error = %err, "Consistency check failed after save");
        }
        Ok(())
    }

    /// Whether the load path exists; an unresolvable load path is missing
    pub fn exists(&self) -> Result<bool, DatasetError> {
        let path = match self.load_path() {
            Ok(path) => path,
            Err(err) if err.is_path_resolution() => {
                debug!(error = %err, "Load path unresolved; dataset does not exist");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        Ok(self.fs.exists(&path)?)
    }

    pub fn release(&self) {
        self.versioned.clear_cache();
        self.fs.invalidate_cache(&self.versioned.base_path());
    }

    /// Base description: filepath and protocol, then `args`, then version
    pub fn describe(&self, args: Map<String, Value>) -> Map<String, Value> {
        let path = self.dataset_path();
        let mut description = Map::new();
        description.insert("filepath".to_string(), json!(path.path()));
        description.insert("protocol".to_string(), json!(path.protocol().as_str()));
        description.extend(args);
        description.insert(
            "version".to_string(),
            serde_json::to_value(self.versioned.version()).unwrap_or(Value::Null),
        );
        description
    }
}
