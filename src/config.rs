use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::application::codecs::ChartSpec;
use crate::application::ports::OpenArgs;
use crate::domain::errors::DatasetError;
use crate::domain::value_objects::Version;

/// Filesystem options of a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FsArgs {
    #[serde(default)]
    pub open_args_load: OpenArgs,
    #[serde(default)]
    pub open_args_save: OpenArgs,
    /// Filesystem constructor options, e.g. `auto_mkdir`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Everything needed to construct a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub filepath: String,
    #[serde(default)]
    pub load_args: Map<String, Value>,
    #[serde(default)]
    pub save_args: Map<String, Value>,
    /// Explicit load/save versions; implies `versioned`
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub versioned: bool,
    #[serde(default)]
    pub credentials: Map<String, Value>,
    #[serde(default)]
    pub fs_args: FsArgs,
}

impl DatasetConfig {
    pub fn new(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_load_args(mut self, args: Map<String, Value>) -> Self {
        self.load_args = args;
        self
    }

    pub fn with_save_args(mut self, args: Map<String, Value>) -> Self {
        self.save_args = args;
        self
    }

    pub fn with_fs_args(mut self, fs_args: FsArgs) -> Self {
        self.fs_args = fs_args;
        self
    }

    /// Version to use; `versioned: true` without explicit versions means
    /// "latest on load, timestamp on save"
    pub fn effective_version(&self) -> Option<Version> {
        self.version
            .clone()
            .or_else(|| self.versioned.then(Version::default))
    }

    /// Deserialize `load_args` into a typed record
    pub fn typed_load_args<T: serde::de::DeserializeOwned>(&self) -> Result<T, DatasetError> {
        typed_args("load_args", &self.load_args)
    }

    /// Deserialize `save_args` into a typed record
    pub fn typed_save_args<T: serde::de::DeserializeOwned>(&self) -> Result<T, DatasetError> {
        typed_args("save_args", &self.save_args)
    }
}

fn typed_args<T: serde::de::DeserializeOwned>(
    name: &str,
    args: &Map<String, Value>,
) -> Result<T, DatasetError> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| DatasetError::InvalidArguments(format!("{}: {}", name, e)))
}

/// A catalog entry: dataset kind plus its configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogEntry {
    Container(DatasetConfig),
    Json(DatasetConfig),
    Chart {
        #[serde(flatten)]
        config: DatasetConfig,
        plotly_args: ChartSpec,
    },
}

impl CatalogEntry {
    pub fn config(&self) -> &DatasetConfig {
        match self {
            CatalogEntry::Container(config) | CatalogEntry::Json(config) => config,
            CatalogEntry::Chart { config, .. } => config,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CatalogEntry::Container(_) => "container",
            CatalogEntry::Json(_) => "json",
            CatalogEntry::Chart { .. } => "chart",
        }
    }

    /// Parse `content` in the format implied by `extension`
    pub fn parse(content: &str, extension: &str) -> Result<Self, DatasetError> {
        match extension {
            "yml" | "yaml" => serde_yaml::from_str(content)
                .map_err(|e| DatasetError::Config(format!("Invalid YAML catalog entry: {}", e))),
            "toml" => toml::from_str(content)
                .map_err(|e| DatasetError::Config(format!("Invalid TOML catalog entry: {}", e))),
            "json" => serde_json::from_str(content)
                .map_err(|e| DatasetError::Config(format!("Invalid JSON catalog entry: {}", e))),
            other => Err(DatasetError::Config(format!(
                "Unsupported catalog format '{}'; use .yml, .yaml, .toml or .json",
                other
            ))),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatasetError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content, &extension)
    }
}

/// Logging settings for the binary
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives
    pub filter: String,
    /// `text` or `json`
    pub format: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            filter: std::env::var("DATASETS_LOG").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("DATASETS_LOG_FORMAT")
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_else(|_| "text".to_string()),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.filter.trim().is_empty() {
            return Err("DATASETS_LOG cannot be empty".to_string());
        }

        if self.format != "text" && self.format != "json" {
            return Err(format!(
                "DATASETS_LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.format
            ));
        }

        Ok(())
    }
}
