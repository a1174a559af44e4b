mod chart_kind;
mod dataset_path;
mod protocol;
mod version;

pub use chart_kind::ChartKind;
pub use dataset_path::DatasetPath;
pub use protocol::Protocol;
pub use version::{format_timestamp, generate_timestamp, Version, VERSION_FORMAT};
