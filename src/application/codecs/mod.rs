mod chart_builder;
mod container_codec;
mod json_codec;
mod themes;

pub use chart_builder::{ChartArtifactBuilder, ChartParams, ChartSpec, CHART_BUILDERS};
pub use container_codec::{
    BinaryContainerCodec, CodecStats, ContainerLoadArgs, ContainerSaveArgs, Member,
};
pub use json_codec::{JsonCodec, JsonLoadArgs, JsonSaveArgs};
pub use themes::{template as theme_template, DEFAULT_THEME, THEMES};
