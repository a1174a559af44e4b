use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::ports::{check_read_mode, FileSystem, FsError, OpenArgs, WriteMode};

/// Parent directories already created by this filesystem
#[derive(Clone, Default)]
struct DirectoryCache(Arc<RwLock<HashSet<PathBuf>>>);

impl DirectoryCache {
    fn contains(&self, path: &Path) -> bool {
        self.0.read().contains(path)
    }

    fn insert(&self, path: PathBuf) {
        self.0.write().insert(path);
    }

    /// Forget `path` and every cached directory below it
    fn invalidate(&self, path: &Path) {
        self.0.write().retain(|dir| !dir.starts_with(path));
    }
}

/// Local disk filesystem
///
/// Truncating writes go to a temp file next to the target and are renamed
/// into place on `flush()`, so readers never observe a partial file.
#[derive(Clone)]
pub struct LocalFileSystem {
    auto_mkdir: bool,
    durable_writes: bool,
    created_dirs: DirectoryCache,
}

impl LocalFileSystem {
    pub fn new(auto_mkdir: bool) -> Self {
        Self::with_durability(auto_mkdir, false)
    }

    /// `durable_writes` fsyncs files and their parent directory on commit
    pub fn with_durability(auto_mkdir: bool, durable_writes: bool) -> Self {
        Self {
            auto_mkdir,
            durable_writes,
            created_dirs: DirectoryCache::default(),
        }
    }

    pub fn auto_mkdir(&self) -> bool {
        self.auto_mkdir
    }

    fn ensure_parent(&self, path: &Path) -> Result<(), FsError> {
        let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        if self.created_dirs.contains(parent) || parent.is_dir() {
            return Ok(());
        }
        if !self.auto_mkdir {
            return Err(FsError::NotFound(parent.display().to_string()));
        }

        debug!("Creating directory {:?}", parent);
        fs::create_dir_all(parent)?;
        self.created_dirs.insert(parent.to_path_buf());
        Ok(())
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FileSystem for LocalFileSystem {
    fn open_read(&self, path: &str, args: &OpenArgs) -> Result<Box<dyn Read + Send>, FsError> {
        check_read_mode(args)?;
        let file = File::open(path).map_err(|e| not_found(e, path))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&self, path: &str, args: &OpenArgs) -> Result<Box<dyn Write + Send>, FsError> {
        let mode = WriteMode::from_args(args)?;
        let final_path = PathBuf::from(path);
        self.ensure_parent(&final_path)?;

        match mode {
            WriteMode::Append => {
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&final_path)?;
                Ok(Box::new(AppendWriter {
                    inner: BufWriter::new(file),
                    durable: self.durable_writes,
                }))
            }
            WriteMode::Truncate | WriteMode::CreateNew => {
                if mode == WriteMode::CreateNew && final_path.exists() {
                    return Err(FsError::Io(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} already exists", path),
                    )));
                }
                let temp_path = temp_path_for(&final_path);
                let file = File::create(&temp_path)?;
                Ok(Box::new(AtomicWriter {
                    inner: Some(BufWriter::new(file)),
                    temp_path,
                    final_path,
                    create_new: mode == WriteMode::CreateNew,
                    durable: self.durable_writes,
                }))
            }
        }
    }

    fn exists(&self, path: &str) -> Result<bool, FsError> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, FsError> {
        let root = if pattern.starts_with('/') {
            PathBuf::from("/")
        } else {
            PathBuf::new()
        };
        let mut candidates = vec![root];

        for segment in pattern.split('/').filter(|s| !s.is_empty() && *s != ".") {
            let mut next = Vec::new();
            if has_wildcard(segment) {
                let matcher = segment_regex(segment)?;
                for base in &candidates {
                    let dir = if base.as_os_str().is_empty() {
                        Path::new(".")
                    } else {
                        base.as_path()
                    };
                    if !dir.is_dir() {
                        continue;
                    }
                    for entry in fs::read_dir(dir)? {
                        let entry = entry?;
                        let name = entry.file_name();
                        if let Some(name) = name.to_str() {
                            if matcher.is_match(name) {
                                next.push(base.join(name));
                            }
                        }
                    }
                }
            } else {
                next.extend(
                    candidates
                        .iter()
                        .map(|base| base.join(segment))
                        .filter(|path| path.exists()),
                );
            }
            next.sort();
            candidates = next;
        }

        Ok(candidates
            .into_iter()
            .filter(|path| !path.as_os_str().is_empty())
            .filter_map(|path| path.to_str().map(str::to_string))
            .collect())
    }

    fn invalidate_cache(&self, path: &str) {
        self.created_dirs.invalidate(Path::new(path));
    }
}

fn not_found(error: io::Error, path: &str) -> FsError {
    if error.kind() == io::ErrorKind::NotFound {
        FsError::NotFound(path.to_string())
    } else {
        FsError::Io(error)
    }
}

fn temp_path_for(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("data");
    final_path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

pub(crate) fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

/// Anchored regex for one glob segment; `*` and `?` never match `/`
pub(crate) fn segment_regex(segment: &str) -> Result<Regex, FsError> {
    let mut pattern = String::from("^");
    let mut literal = String::new();
    for ch in segment.chars() {
        match ch {
            '*' | '?' => {
                pattern.push_str(&regex::escape(&literal));
                literal.clear();
                pattern.push_str(if ch == '*' { "[^/]*" } else { "[^/]" });
            }
            other => literal.push(other),
        }
    }
    pattern.push_str(&regex::escape(&literal));
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| FsError::Unsupported(format!("Invalid glob '{}': {}", segment, e)))
}

/// Writes to a temp file and renames it over the target on flush
struct AtomicWriter {
    inner: Option<BufWriter<File>>,
    temp_path: PathBuf,
    final_path: PathBuf,
    create_new: bool,
    durable: bool,
}

impl AtomicWriter {
    fn commit(&mut self, mut inner: BufWriter<File>) -> io::Result<()> {
        inner.flush()?;
        let file = inner.into_inner().map_err(|e| e.into_error())?;
        if self.durable {
            file.sync_all()?;
        }
        drop(file);

        if self.create_new && self.final_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", self.final_path.display()),
            ));
        }
        fs::rename(&self.temp_path, &self.final_path)?;

        if self.durable {
            if let Some(parent) = self.final_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
                    warn!("Failed to sync parent directory after rename: {}", e);
                }
            }
        }
        debug!("Committed {:?}", self.final_path);
        Ok(())
    }
}

impl Write for AtomicWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(inner) => inner.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "writer already committed",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let Some(inner) = self.inner.take() else {
            return Ok(());
        };
        let result = self.commit(inner);
        if result.is_err() {
            let _ = fs::remove_file(&self.temp_path);
        }
        result
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

struct AppendWriter {
    inner: BufWriter<File>,
    durable: bool,
}

impl Write for AppendWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()?;
        if self.durable {
            self.inner.get_ref().sync_all()?;
        }
        Ok(())
    }
}
