mod chart_dataset;
mod container_dataset;
mod json_dataset;
mod storage;

pub use chart_dataset::ChartDataset;
pub use container_dataset::HierarchicalContainerDataset;
pub use json_dataset::JsonDataset;
pub use storage::DatasetStorage;
