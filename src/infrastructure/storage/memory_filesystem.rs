use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::trace;

use super::local_filesystem::{has_wildcard, segment_regex};
use crate::application::ports::{check_read_mode, FileSystem, FsError, OpenArgs, WriteMode};

static SHARED_STORE: Lazy<Arc<DashMap<String, Bytes>>> = Lazy::new(|| Arc::new(DashMap::new()));

/// In-memory filesystem keyed by path
///
/// [`MemoryFileSystem::shared`] instances see the same process-wide store.
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    store: Arc<DashMap<String, Bytes>>,
}

impl MemoryFileSystem {
    /// Filesystem with its own empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Self {
        Self {
            store: SHARED_STORE.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn remove(&self, path: &str) -> Option<Bytes> {
        self.store.remove(&normalize(path)).map(|(_, bytes)| bytes)
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

impl FileSystem for MemoryFileSystem {
    fn open_read(&self, path: &str, args: &OpenArgs) -> Result<Box<dyn Read + Send>, FsError> {
        check_read_mode(args)?;
        let bytes = self
            .store
            .get(&normalize(path))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn open_write(&self, path: &str, args: &OpenArgs) -> Result<Box<dyn Write + Send>, FsError> {
        let mode = WriteMode::from_args(args)?;
        let key = normalize(path);
        if mode == WriteMode::CreateNew && self.store.contains_key(&key) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path),
            )));
        }
        Ok(Box::new(MemoryWriter {
            store: self.store.clone(),
            key,
            mode,
            buffer: Vec::new(),
        }))
    }

    fn exists(&self, path: &str) -> Result<bool, FsError> {
        let key = normalize(path);
        if self.store.contains_key(&key) {
            return Ok(true);
        }
        // Directories exist implicitly when something lives below them
        let prefix = format!("{}/", key.trim_end_matches('/'));
        Ok(self.store.iter().any(|entry| entry.key().starts_with(&prefix)))
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, FsError> {
        let pattern = normalize(pattern);
        let segments: Vec<&str> = pattern.split('/').collect();
        let matchers = segments
            .iter()
            .map(|segment| {
                if has_wildcard(segment) {
                    segment_regex(segment).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut found: Vec<String> = self
            .store
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| {
                let parts: Vec<&str> = key.split('/').collect();
                parts.len() == segments.len()
                    && parts.iter().zip(&segments).zip(&matchers).all(
                        |((part, segment), matcher)| match matcher {
                            Some(regex) => regex.is_match(part),
                            None => part == segment,
                        },
                    )
            })
            .collect();
        found.sort();
        Ok(found)
    }

    fn invalidate_cache(&self, path: &str) {
        trace!(path, "Memory filesystem has no cache to invalidate");
    }
}

/// Buffers writes and publishes them on flush
struct MemoryWriter {
    store: Arc<DashMap<String, Bytes>>,
    key: String,
    mode: WriteMode,
    buffer: Vec<u8>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let written = std::mem::take(&mut self.buffer);
        match self.mode {
            WriteMode::Append => {
                let mut entry = self.store.entry(self.key.clone()).or_default();
                let mut combined = Vec::with_capacity(entry.len() + written.len());
                combined.extend_from_slice(&entry);
                combined.extend_from_slice(&written);
                *entry = Bytes::from(combined);
            }
            WriteMode::Truncate | WriteMode::CreateNew => {
                self.store.insert(self.key.clone(), Bytes::from(written));
                // Later flushes extend what was just written
                self.mode = WriteMode::Append;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(fs: &MemoryFileSystem, path: &str, mode: &str, content: &[u8]) {
        let mut writer = fs.open_write(path, &OpenArgs::with_mode(mode)).unwrap();
        writer.write_all(content).unwrap();
        writer.flush().unwrap();
    }

    fn read(fs: &MemoryFileSystem, path: &str) -> Vec<u8> {
        let mut buffer = Vec::new();
        fs.open_read(path, &OpenArgs::default())
            .unwrap()
            .read_to_end(&mut buffer)
            .unwrap();
        buffer
    }

    #[test]
    fn test_write_commits_on_flush() {
        let fs = MemoryFileSystem::new();
        let mut writer = fs.open_write("a/b.bin", &OpenArgs::default()).unwrap();
        writer.write_all(b"abc").unwrap();
        assert!(!fs.exists("a/b.bin").unwrap());

        writer.flush().unwrap();
        assert!(fs.exists("a/b.bin").unwrap());
        assert!(fs.exists("a").unwrap());
        assert_eq!(read(&fs, "/a/b.bin"), b"abc");
    }

    #[test]
    fn test_modes() {
        let fs = MemoryFileSystem::new();
        write(&fs, "log", "w", b"one");
        write(&fs, "log", "a", b"two");
        assert_eq!(read(&fs, "log"), b"onetwo");

        assert!(fs.open_write("log", &OpenArgs::with_mode("x")).is_err());
        assert!(matches!(
            fs.open_read("log", &OpenArgs::with_mode("w")),
            Err(FsError::Unsupported(_))
        ));
        assert!(matches!(
            fs.open_read("missing", &OpenArgs::default()),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_glob() {
        let fs = MemoryFileSystem::new();
        write(&fs, "d/v1/d", "w", b"1");
        write(&fs, "d/v2/d", "w", b"2");
        write(&fs, "d/v2/x/d", "w", b"3");
        write(&fs, "e/v1/d", "w", b"4");

        assert_eq!(fs.glob("d/*/d").unwrap(), vec!["d/v1/d", "d/v2/d"]);
        assert_eq!(fs.glob("/d/v?/d").unwrap(), vec!["d/v1/d", "d/v2/d"]);
    }

    #[test]
    fn test_shared_instances_see_each_other() {
        let path = format!("shared-test/{}", uuid::Uuid::new_v4());
        write(&MemoryFileSystem::shared(), &path, "wb", b"x");
        assert!(MemoryFileSystem::shared().exists(&path).unwrap());
        assert!(!MemoryFileSystem::new().exists(&path).unwrap());
        MemoryFileSystem::shared().remove(&path);
    }
}
