use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::{LocalFileSystem, MemoryFileSystem};
use crate::application::ports::FileSystem;
use crate::domain::errors::DatasetError;
use crate::domain::value_objects::Protocol;

/// Filesystem for `protocol`
///
/// `fs_args` holds constructor options; the local filesystem understands
/// `auto_mkdir` (default true) and `durable_writes` (default false).
pub fn filesystem_for(
    protocol: &Protocol,
    credentials: &Map<String, Value>,
    fs_args: &Map<String, Value>,
) -> Result<Arc<dyn FileSystem>, DatasetError> {
    if !credentials.is_empty() {
        debug!(
            protocol = %protocol,
            "Ignoring credentials; {} needs none",
            protocol
        );
    }

    match protocol.as_str() {
        Protocol::FILE => {
            let auto_mkdir = bool_arg(fs_args, "auto_mkdir", true)?;
            let durable_writes = bool_arg(fs_args, "durable_writes", false)?;
            Ok(Arc::new(LocalFileSystem::with_durability(
                auto_mkdir,
                durable_writes,
            )))
        }
        Protocol::MEMORY => Ok(Arc::new(MemoryFileSystem::shared())),
        other => Err(DatasetError::UnsupportedProtocol(format!(
            "No filesystem available for protocol '{}'. Supported: {}, {}",
            other,
            Protocol::FILE,
            Protocol::MEMORY
        ))),
    }
}

fn bool_arg(args: &Map<String, Value>, key: &str, default: bool) -> Result<bool, DatasetError> {
    match args.get(key) {
        None => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(DatasetError::InvalidArguments(format!(
            "fs_args.{} must be a boolean, got {}",
            key, other
        ))),
    }
}
