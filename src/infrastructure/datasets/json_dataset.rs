use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::DatasetStorage;
use crate::application::codecs::{JsonLoadArgs, JsonSaveArgs};
use crate::application::{display_description, Dataset};
use crate::domain::errors::DatasetError;

/// Any serde type stored as a JSON document
pub struct JsonDataset<T> {
    storage: DatasetStorage,
    load_args: JsonLoadArgs,
    save_args: JsonSaveArgs,
    type_name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDataset<T> {
    pub const TYPE_NAME: &'static str = "JsonDataset";
    pub const DEFAULT_SAVE_MODE: &'static str = "w";

    pub fn new(storage: DatasetStorage, load_args: JsonLoadArgs, save_args: JsonSaveArgs) -> Self {
        Self::named(Self::TYPE_NAME, storage, load_args, save_args)
    }

    /// Same dataset reported under another type name
    pub(crate) fn named(
        type_name: &'static str,
        storage: DatasetStorage,
        load_args: JsonLoadArgs,
        save_args: JsonSaveArgs,
    ) -> Self {
        Self {
            storage,
            load_args,
            save_args,
            type_name,
            _marker: PhantomData,
        }
    }

    pub fn storage(&self) -> &DatasetStorage {
        &self.storage
    }
}

impl<T: Serialize + DeserializeOwned> Dataset for JsonDataset<T> {
    type LoadOutput = T;
    type SaveInput = T;

    fn load(&self) -> Result<T, DatasetError> {
        let bytes = self.storage.read_bytes()?;
        self.load_args.codec().decode(&bytes)
    }

    fn save(&self, data: &T) -> Result<(), DatasetError> {
        let bytes = self.save_args.codec().encode(data)?;
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

impl<T: Serialize + DeserializeOwned> fmt::Display for JsonDataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_description(self.type_name, &self.describe()))
    }
}
