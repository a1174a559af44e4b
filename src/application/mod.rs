pub mod builder;
pub mod codecs;
pub mod dataset;
pub mod ports;
pub mod versioning;

pub use dataset::{display_description, Dataset};
pub use versioning::VersionedPath;
