use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::DatasetError;

/// Structured-text codec for any serde type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec {
    pub pretty: bool,
}

impl JsonCodec {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, DatasetError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DatasetError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonLoadArgs {
    /// Kept for `describe()`; not interpreted
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JsonLoadArgs {
    /// Decoding never depends on layout, so loads always use a compact codec
    pub fn codec(&self) -> JsonCodec {
        JsonCodec::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonSaveArgs {
    #[serde(default)]
    pub pretty: bool,
    /// Kept for `describe()`; not interpreted
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JsonSaveArgs {
    pub fn codec(&self) -> JsonCodec {
        JsonCodec::new(self.pretty)
    }
}
