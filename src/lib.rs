//! # pipeline_datasets - Dataset adapters for data pipelines
//!
//! Datasets move in-memory values to and from storage addressed by a
//! `protocol://path` filepath, with optional versioning.
//!
//! ## Architecture Layers
//!
//! - **Domain**: errors, value objects (protocol, dataset path, version,
//!   chart kind) and entities (tabular data, chart figures)
//! - **Application**: the `Dataset` trait, codecs, version resolution, the
//!   filesystem port and the dataset builder
//! - **Infrastructure**: local and in-memory filesystems, concrete datasets
//!
//! ## Datasets
//!
//! - `HierarchicalContainerDataset`: HDF5 files (`hdf5::File`), encoded
//!   through an in-memory image under a process-wide lock
//! - `JsonDataset<T>`: any serde type as a JSON document
//! - `ChartDataset`: builds a chart figure from tabular data and stores it
//!   as JSON
//!
//! ## Example Usage
//!
//! ```no_run
//! use pipeline_datasets::application::{builder::DatasetBuilder, Dataset};
//! use pipeline_datasets::application::codecs::BinaryContainerCodec;
//! use pipeline_datasets::config::DatasetConfig;
//! use pipeline_datasets::domain::value_objects::Version;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatasetConfig::new("data/01_raw/measurements.h5").with_version(Version::default());
//! let dataset = DatasetBuilder::new(config).build_container()?;
//!
//! let file = BinaryContainerCodec::shared().create_memory_file()?;
//! file.create_group("run-1")?;
//! dataset.save(&file)?;
//!
//! let loaded = dataset.load()?;
//! assert!(loaded.link_exists("run-1"));
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{builder::DatasetBuilder, ports, Dataset};
pub use config::{CatalogEntry, DatasetConfig};
pub use domain::errors::DatasetError;
pub use domain::{entities, value_objects};
