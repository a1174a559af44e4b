use std::fmt;

use serde_json::{Map, Value};
use tracing::info;

use super::{DatasetStorage, JsonDataset};
use crate::application::codecs::{ChartArtifactBuilder, ChartSpec, JsonLoadArgs, JsonSaveArgs};
use crate::application::{display_description, Dataset};
use crate::domain::entities::{Figure, TabularData};
use crate::domain::errors::DatasetError;

/// Chart built from tabular data and stored as a figure JSON document
///
/// Saving takes the table, builds the figure described by `plotly_args` and
/// writes it; loading returns the stored figure.
pub struct ChartDataset {
    json: JsonDataset<Figure>,
    plotly_args: ChartSpec,
    builder: ChartArtifactBuilder,
}

impl ChartDataset {
    pub const TYPE_NAME: &'static str = "ChartDataset";
    pub const DEFAULT_SAVE_MODE: &'static str = "w";

    pub fn new(
        storage: DatasetStorage,
        plotly_args: ChartSpec,
        builder: ChartArtifactBuilder,
        load_args: JsonLoadArgs,
        save_args: JsonSaveArgs,
    ) -> Self {
        Self {
            json: JsonDataset::named(Self::TYPE_NAME, storage, load_args, save_args),
            plotly_args,
            builder,
        }
    }

    pub fn plotly_args(&self) -> &ChartSpec {
        &self.plotly_args
    }

    /// Figure that `save(data)` would write
    pub fn build(&self, data: &TabularData) -> Result<Figure, DatasetError> {
        self.builder.build(data, &self.plotly_args)
    }
}

impl Dataset for ChartDataset {
    type LoadOutput = Figure;
    type SaveInput = TabularData;

    fn load(&self) -> Result<Figure, DatasetError> {
        self.json.load()
    }

    fn save(&self, data: &TabularData) -> Result<(), DatasetError> {
        let figure = self.build(data)?;
        self.json.save(&figure)?;
        info!(
            chart = %self.plotly_args.kind,
            path = %self.json.storage().dataset_path(),
            "Saved chart"
        );
        Ok(())
    }

    fn exists(&self) -> Result<bool, DatasetError> {
        self.json.exists()
    }

    fn describe(&self) -> Map<String, Value> {
        let mut description = self.json.describe();
        description.insert(
            "plotly_args".to_string(),
            serde_json::to_value(&self.plotly_args).unwrap_or(Value::Null),
        );
        description
    }

    fn release(&self) -> Result<(), DatasetError> {
        self.json.release()
    }
}

impl fmt::Display for ChartDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_description(Self::TYPE_NAME, &self.describe()))
    }
}
