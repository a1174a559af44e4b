use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of generated save versions, e.g. `2026-10-19T08.15.30.123Z`
pub const VERSION_FORMAT: &str = "%Y-%m-%dT%H.%M.%S%.3fZ";

/// Load and save version of a versioned dataset
///
/// `load: None` loads the latest existing version; `save: None` generates a
/// timestamp when saving.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub load: Option<String>,
    #[serde(default)]
    pub save: Option<String>,
}

impl Version {
    pub fn new(load: Option<String>, save: Option<String>) -> Self {
        Self { load, save }
    }

    /// Same explicit version for loading and saving
    pub fn pinned(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            load: Some(version.clone()),
            save: Some(version),
        }
    }
}

/// Save version for the current time
pub fn generate_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(VERSION_FORMAT).to_string()
}
