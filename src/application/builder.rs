use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::application::codecs::{
    BinaryContainerCodec, ChartArtifactBuilder, ChartSpec, ContainerLoadArgs, ContainerSaveArgs,
    JsonLoadArgs, JsonSaveArgs,
};
use crate::application::ports::FileSystem;
use crate::application::Dataset;
use crate::config::{CatalogEntry, DatasetConfig};
use crate::domain::errors::DatasetError;
use crate::domain::value_objects::DatasetPath;
use crate::infrastructure::datasets::{
    ChartDataset, DatasetStorage, HierarchicalContainerDataset, JsonDataset,
};
use crate::infrastructure::storage::filesystem_for;

/// Builds datasets from their configuration
///
/// Anything not injected is resolved from the configuration: the filesystem
/// from the filepath's protocol, the container codec is the process-wide one.
pub struct DatasetBuilder {
    config: DatasetConfig,
    filesystem: Option<Arc<dyn FileSystem>>,
    container_codec: Option<BinaryContainerCodec>,
    chart_builder: Option<ChartArtifactBuilder>,
}

impl DatasetBuilder {
    pub fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            filesystem: None,
            container_codec: None,
            chart_builder: None,
        }
    }

    pub fn with_filesystem(mut self, filesystem: Arc<dyn FileSystem>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    pub fn with_container_codec(mut self, codec: BinaryContainerCodec) -> Self {
        self.container_codec = Some(codec);
        self
    }

    pub fn with_chart_builder(mut self, builder: ChartArtifactBuilder) -> Self {
        self.chart_builder = Some(builder);
        self
    }

    fn storage(&self, type_name: &str, default_save_mode: &str) -> Result<DatasetStorage, DatasetError> {
        let version = self.config.effective_version();
        let path = DatasetPath::parse(&self.config.filepath, version.is_some())?;

        let filesystem = match &self.filesystem {
            Some(filesystem) => filesystem.clone(),
            None => filesystem_for(
                path.protocol(),
                &self.config.credentials,
                &self.config.fs_args.extra,
            )?,
        };
        debug!(
            dataset = type_name,
            protocol = %path.protocol(),
            versioned = version.is_some(),
            "Building dataset"
        );

        Ok(DatasetStorage::new(
            type_name,
            path,
            version,
            filesystem,
            &self.config.fs_args,
            default_save_mode,
        ))
    }

    pub fn build_container(self) -> Result<HierarchicalContainerDataset, DatasetError> {
        let load_args: ContainerLoadArgs = self.config.typed_load_args()?;
        let save_args: ContainerSaveArgs = self.config.typed_save_args()?;
        let storage = self.storage(
            HierarchicalContainerDataset::TYPE_NAME,
            HierarchicalContainerDataset::DEFAULT_SAVE_MODE,
        )?;
        let codec = self
            .container_codec
            .unwrap_or_else(BinaryContainerCodec::shared);
        Ok(HierarchicalContainerDataset::new(
            storage, codec, load_args, save_args,
        ))
    }

    pub fn build_json<T: Serialize + DeserializeOwned>(self) -> Result<JsonDataset<T>, DatasetError> {
        let load_args: JsonLoadArgs = self.config.typed_load_args()?;
        let save_args: JsonSaveArgs = self.config.typed_save_args()?;
        let storage = self.storage(
            JsonDataset::<T>::TYPE_NAME,
            JsonDataset::<T>::DEFAULT_SAVE_MODE,
        )?;
        Ok(JsonDataset::new(storage, load_args, save_args))
    }

    pub fn build_chart(self, plotly_args: ChartSpec) -> Result<ChartDataset, DatasetError> {
        let load_args: JsonLoadArgs = self.config.typed_load_args()?;
        let save_args: JsonSaveArgs = self.config.typed_save_args()?;
        let storage = self.storage(ChartDataset::TYPE_NAME, ChartDataset::DEFAULT_SAVE_MODE)?;
        let builder = self.chart_builder.unwrap_or_default();
        Ok(ChartDataset::new(
            storage,
            plotly_args,
            builder,
            load_args,
            save_args,
        ))
    }

    /// Build whichever dataset `entry` names
    pub fn from_entry(entry: CatalogEntry) -> Result<CatalogDataset, DatasetError> {
        match entry {
            CatalogEntry::Container(config) => Ok(CatalogDataset::Container(
                DatasetBuilder::new(config).build_container()?,
            )),
            CatalogEntry::Json(config) => Ok(CatalogDataset::Json(
                DatasetBuilder::new(config).build_json()?,
            )),
            CatalogEntry::Chart {
                config,
                plotly_args,
            } => Ok(CatalogDataset::Chart(
                DatasetBuilder::new(config).build_chart(plotly_args)?,
            )),
        }
    }
}

/// A dataset of any catalog type
pub enum CatalogDataset {
    Container(HierarchicalContainerDataset),
    Json(JsonDataset<Value>),
    Chart(ChartDataset),
}

impl CatalogDataset {
    pub fn exists(&self) -> Result<bool, DatasetError> {
        match self {
            CatalogDataset::Container(dataset) => dataset.exists(),
            CatalogDataset::Json(dataset) => dataset.exists(),
            CatalogDataset::Chart(dataset) => dataset.exists(),
        }
    }

    pub fn describe(&self) -> Map<String, Value> {
        match self {
            CatalogDataset::Container(dataset) => dataset.describe(),
            CatalogDataset::Json(dataset) => dataset.describe(),
            CatalogDataset::Chart(dataset) => dataset.describe(),
        }
    }

    pub fn release(&self) -> Result<(), DatasetError> {
        match self {
            CatalogDataset::Container(dataset) => dataset.release(),
            CatalogDataset::Json(dataset) => dataset.release(),
            CatalogDataset::Chart(dataset) => dataset.release(),
        }
    }
}

impl std::fmt::Display for CatalogDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogDataset::Container(dataset) => write!(f, "{}", dataset),
            CatalogDataset::Json(dataset) => write!(f, "{}", dataset),
            CatalogDataset::Chart(dataset) => write!(f, "{}", dataset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFileSystem;
    use crate::domain::value_objects::Version;
    use serde_json::json;

    #[test]
    fn test_unknown_protocol_without_injection() {
        let result = DatasetBuilder::new(DatasetConfig::new("s3://bucket/a.h5")).build_container();
        assert!(matches!(result, Err(DatasetError::UnsupportedProtocol(_))));
    }

    #[test]
    fn test_injected_filesystem_accepts_any_protocol() {
        let dataset = DatasetBuilder::new(DatasetConfig::new("s3://bucket/a.h5"))
            .with_filesystem(Arc::new(MockFileSystem::new()))
            .build_container()
            .unwrap();
        assert_eq!(dataset.describe()["protocol"], "s3");
        assert_eq!(dataset.describe()["filepath"], "bucket/a.h5");
    }

    #[test]
    fn test_versioned_http_is_rejected() {
        let config = DatasetConfig::new("https://example.com/a.json").with_version(Version::default());
        let result = DatasetBuilder::new(config)
            .with_filesystem(Arc::new(MockFileSystem::new()))
            .build_json::<Value>();
        assert!(matches!(result, Err(DatasetError::PathResolution(_))));
    }

    #[test]
    fn test_invalid_save_args() {
        let config = DatasetConfig::new("a.h5")
            .with_save_args(json!({"userblock_size": "big"}).as_object().unwrap().clone());
        assert!(matches!(
            DatasetBuilder::new(config).build_container(),
            Err(DatasetError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_codec_injection() {
        let codec = BinaryContainerCodec::new();
        let dataset = DatasetBuilder::new(DatasetConfig::new("memory://a.h5"))
            .with_container_codec(codec.clone())
            .build_container()
            .unwrap();
        assert!(dataset.codec().shares_lock_with(&codec));

        let default = DatasetBuilder::new(DatasetConfig::new("memory://b.h5"))
            .build_container()
            .unwrap();
        assert!(default.codec().shares_lock_with(&BinaryContainerCodec::shared()));
    }

    #[test]
    fn test_from_entry() {
        let entry = CatalogEntry::parse(
            "type: json\nfilepath: memory://builder-test/metrics.json\nsave_args:\n  pretty: true\n",
            "yaml",
        )
        .unwrap();
        let dataset = DatasetBuilder::from_entry(entry).unwrap();
        assert!(matches!(dataset, CatalogDataset::Json(_)));
        assert_eq!(dataset.describe()["save_args"]["pretty"], true);
        assert!(!dataset.exists().unwrap());
    }
}
