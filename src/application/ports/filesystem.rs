use std::io::{Read, Write};

#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Arguments for opening a file, forwarded from `fs_args.open_args_*`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenArgs {
    /// `r`/`rb` for reading; `w`/`wb` truncate, `a`/`ab` append, `x`/`xb`
    /// fail if the file exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OpenArgs {
    pub fn with_mode(mode: impl Into<String>) -> Self {
        Self {
            mode: Some(mode.into()),
            extra: Map::new(),
        }
    }

    /// Keep an explicit mode, otherwise use `mode`
    pub fn with_default_mode(mut self, mode: &str) -> Self {
        self.mode.get_or_insert_with(|| mode.to_string());
        self
    }

    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }
}

/// How a writer treats an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
    Append,
    CreateNew,
}

impl WriteMode {
    pub fn from_args(args: &OpenArgs) -> Result<Self, FsError> {
        match args.mode().unwrap_or("wb") {
            "w" | "wb" | "w+" | "wb+" => Ok(WriteMode::Truncate),
            "a" | "ab" | "a+" | "ab+" => Ok(WriteMode::Append),
            "x" | "xb" => Ok(WriteMode::CreateNew),
            other => Err(FsError::Unsupported(format!(
                "Mode '{}' cannot be used for writing",
                other
            ))),
        }
    }
}

/// Reject modes that do not read
pub fn check_read_mode(args: &OpenArgs) -> Result<(), FsError> {
    match args.mode().unwrap_or("rb") {
        "r" | "rb" | "r+" | "rb+" => Ok(()),
        other => Err(FsError::Unsupported(format!(
            "Mode '{}' cannot be used for reading",
            other
        ))),
    }
}

/// Port for the filesystem a dataset reads from and writes to
///
/// Writers commit on `flush()`; a writer dropped without flushing discards
/// what was written.
#[cfg_attr(test, automock)]
pub trait FileSystem: Send + Sync {
    /// Open `path` for reading
    fn open_read(&self, path: &str, args: &OpenArgs) -> Result<Box<dyn Read + Send>, FsError>;

    /// Open `path` for writing
    fn open_write(&self, path: &str, args: &OpenArgs) -> Result<Box<dyn Write + Send>, FsError>;

    fn exists(&self, path: &str) -> Result<bool, FsError>;

    /// Paths matching `pattern`; `*` matches within one path segment
    fn glob(&self, pattern: &str) -> Result<Vec<String>, FsError>;

    /// Drop anything cached for `path`
    fn invalidate_cache(&self, path: &str);
}
