mod factory;
mod local_filesystem;
mod memory_filesystem;

pub use factory::filesystem_for;
pub use local_filesystem::LocalFileSystem;
pub use memory_filesystem::MemoryFileSystem;
