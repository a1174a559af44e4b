mod filesystem;

pub use filesystem::{check_read_mode, FileSystem, FsError, OpenArgs, WriteMode};

#[cfg(test)]
pub use filesystem::MockFileSystem;
