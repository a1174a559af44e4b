use thiserror::Error;

use crate::application::ports::FsError;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Path resolution failed: {0}")]
    PathResolution(String),

    #[error("Failed to decode HDF5 image: {0}")]
    Decode(#[source] hdf5::Error),

    #[error("Failed to encode HDF5 image: {0}")]
    Encode(#[source] hdf5::Error),

    #[error("Unsupported chart kind: {0}")]
    UnsupportedChartKind(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Versioning error: {0}")]
    Versioning(String),

    #[error("Storage error: {0}")]
    Storage(#[from] FsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DatasetError {
    /// Whether this error came from resolving a load path; `exists()`
    /// reports these as a missing dataset.
    pub fn is_path_resolution(&self) -> bool {
        matches!(self, DatasetError::PathResolution(_))
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        DatasetError::Storage(FsError::Io(err))
    }
}

impl From<validator::ValidationErrors> for DatasetError {
    fn from(err: validator::ValidationErrors) -> Self {
        DatasetError::InvalidArguments(err.to_string())
    }
}
