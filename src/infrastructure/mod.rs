pub mod datasets;
pub mod storage;
