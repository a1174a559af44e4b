use std::fmt;

use hdf5::File;
use serde_json::{Map, Value};

use super::DatasetStorage;
use crate::application::codecs::{BinaryContainerCodec, ContainerLoadArgs, ContainerSaveArgs};
use crate::application::{display_description, Dataset};
use crate::domain::errors::DatasetError;

/// HDF5 file stored as one blob
///
/// Loading reads the whole file and opens it as an in-memory image; saving
/// copies every top-level member of the handle into a fresh image.
pub struct HierarchicalContainerDataset {
    storage: DatasetStorage,
    codec: BinaryContainerCodec,
    load_args: ContainerLoadArgs,
    save_args: ContainerSaveArgs,
}

impl HierarchicalContainerDataset {
    pub const TYPE_NAME: &'static str = "HierarchicalContainerDataset";
    pub const DEFAULT_SAVE_MODE: &'static str = "wb";

    pub fn new(
        storage: DatasetStorage,
        codec: BinaryContainerCodec,
        load_args: ContainerLoadArgs,
        save_args: ContainerSaveArgs,
    ) -> Self {
        Self {
            storage,
            codec,
            load_args,
            save_args,
        }
    }

    pub fn storage(&self) -> &DatasetStorage {
        &self.storage
    }

    pub fn codec(&self) -> &BinaryContainerCodec {
        &self.codec
    }
}

impl Dataset for HierarchicalContainerDataset {
    type LoadOutput = File;
    type SaveInput = File;

    fn load(&self) -> Result<File, DatasetError> {
        let bytes = self.storage.read_bytes()?;
        self.codec.decode(&bytes, &self.load_args)
    }

    fn save(&self, data: &File) -> Result<(), DatasetError> {
        let bytes = self.codec.encode(data, &self.save_args)?;
        self.storage.write_bytes(&bytes)
    }

    fn exists(&self) -> Result<bool, DatasetError> {
        self.storage.exists()
    }

    fn describe(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert(
            "load_args".to_string(),
            serde_json::to_value(&self.load_args).unwrap_or(Value::Null),
        );
        args.insert(
            "save_args".to_string(),
            serde_json::to_value(&self.save_args).unwrap_or(Value::Null),
        );
        self.storage.describe(args)
    }

    fn release(&self) -> Result<(), DatasetError> {
        self.storage.release();
        Ok(())
    }
}

impl fmt::Display for HierarchicalContainerDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_description(Self::TYPE_NAME, &self.describe()))
    }
}
