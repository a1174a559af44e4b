//! Byte buffer <-> in-memory HDF5 file conversion
//!
//! Files are opened and created through the HDF5 core driver with no backing
//! store, so images never touch disk. The library is not reentrant: every
//! call the codec makes into it runs under the codec lock and the `hdf5`
//! crate's global lock. Cloned codecs share the codec lock;
//! [`BinaryContainerCodec::shared`] is the process-wide instance.

use std::collections::BTreeMap;
use std::ffi::{c_void, CString};
use std::ptr;
use std::sync::Arc;

use hdf5::plist::FileAccess;
use hdf5::{File, Group};
use hdf5_sys::h5::H5open;
use hdf5_sys::h5f::{H5Fclose, H5Fget_file_image, H5Fopen, H5F_ACC_RDONLY};
use hdf5_sys::h5o::{
    H5Ocopy, H5O_COPY_EXPAND_EXT_LINK_FLAG, H5O_COPY_EXPAND_REFERENCE_FLAG,
    H5O_COPY_EXPAND_SOFT_LINK_FLAG,
};
use hdf5_sys::h5p::{
    H5Pclose, H5Pcreate, H5Pset_copy_object, H5Pset_file_image, H5P_CLS_OBJECT_COPY, H5P_DEFAULT,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::domain::errors::DatasetError;

static SHARED: Lazy<BinaryContainerCodec> = Lazy::new(BinaryContainerCodec::new);

/// HDF5 defaults for the raw-data chunk cache
const DEFAULT_RDCC_NSLOTS: usize = 521;
const DEFAULT_RDCC_NBYTES: usize = 1024 * 1024;
const DEFAULT_RDCC_W0: f64 = 0.75;

/// Options applied when opening an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContainerLoadArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdcc_nslots: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdcc_nbytes: Option<usize>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdcc_w0: Option<f64>,
    /// Options the codec does not understand end up here and are rejected
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerLoadArgs {
    fn check(&self) -> Result<(), DatasetError> {
        self.validate()?;
        reject_unknown(&self.extra)
    }

    fn has_chunk_cache(&self) -> bool {
        self.rdcc_nslots.is_some() || self.rdcc_nbytes.is_some() || self.rdcc_w0.is_some()
    }

    fn file_access(&self) -> hdf5::Result<FileAccess> {
        let mut builder = FileAccess::build();
        builder.core_filebacked(false);
        if self.has_chunk_cache() {
            builder.chunk_cache(
                self.rdcc_nslots.unwrap_or(DEFAULT_RDCC_NSLOTS),
                self.rdcc_nbytes.unwrap_or(DEFAULT_RDCC_NBYTES),
                self.rdcc_w0.unwrap_or(DEFAULT_RDCC_W0),
            );
        }
        builder.finish()
    }
}

/// Options applied when creating an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSaveArgs {
    /// Earliest file-format version objects may use: `earliest` or `latest`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libver: Option<String>,
    /// Bytes reserved before the superblock; 0 or a power of two >= 512
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userblock_size: Option<u64>,
    /// Options the codec does not understand end up here and are rejected
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerSaveArgs {
    fn check(&self) -> Result<(), DatasetError> {
        if let Some(libver) = &self.libver {
            if libver != "earliest" && libver != "latest" {
                return Err(DatasetError::InvalidArguments(format!(
                    "libver must be 'earliest' or 'latest', got '{}'",
                    libver
                )));
            }
        }
        if let Some(size) = self.userblock_size {
            if size != 0 && (size < 512 || !size.is_power_of_two()) {
                return Err(DatasetError::InvalidArguments(format!(
                    "userblock_size must be 0 or a power of two >= 512, got {}",
                    size
                )));
            }
        }
        reject_unknown(&self.extra)
    }

    fn create_memory_file(&self) -> hdf5::Result<File> {
        let mut builder = File::with_options();
        builder.with_fapl(|fapl| fapl.core_filebacked(false));
        if self.libver.as_deref() == Some("latest") {
            builder.with_fapl(|fapl| fapl.libver_latest());
        }
        if let Some(size) = self.userblock_size {
            builder.with_fcpl(|fcpl| fcpl.userblock(size));
        }
        builder.create(image_name())
    }
}

fn reject_unknown(extra: &Map<String, Value>) -> Result<(), DatasetError> {
    if extra.is_empty() {
        return Ok(());
    }
    let keys: Vec<&str> = extra.keys().map(String::as_str).collect();
    Err(DatasetError::InvalidArguments(format!(
        "Unsupported HDF5 options: {}",
        keys.join(", ")
    )))
}

/// Unique name for an in-memory image; the core driver refuses to open two
/// files under the same name
fn image_name() -> String {
    format!("image-{}.h5", Uuid::new_v4().simple())
}

/// Counters kept under the codec lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CodecStats {
    pub images_opened: u64,
    pub images_created: u64,
    pub open_failures: u64,
}

/// Layout of a decoded file: groups with their members, datasets with
/// type and shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Member {
    Group { members: BTreeMap<String, Member> },
    Dataset { dtype: String, shape: Vec<usize> },
}

impl Member {
    fn collect(group: &Group) -> hdf5::Result<Self> {
        let mut members = BTreeMap::new();
        for name in group.member_names()? {
            let member = match group.group(&name) {
                Ok(child) => Self::collect(&child)?,
                Err(_) => {
                    let dataset = group.dataset(&name)?;
                    Member::Dataset {
                        dtype: format!("{:?}", dataset.dtype()?.to_descriptor()?),
                        shape: dataset.shape(),
                    }
                }
            };
            members.insert(name, member);
        }
        Ok(Member::Group { members })
    }
}

/// Converts between raw bytes and in-memory HDF5 files
#[derive(Clone)]
pub struct BinaryContainerCodec {
    lock: Arc<Mutex<CodecStats>>,
}

impl BinaryContainerCodec {
    /// Codec with its own lock
    pub fn new() -> Self {
        Self {
            lock: Arc::new(Mutex::new(CodecStats::default())),
        }
    }

    /// Process-wide codec; lives as long as the process
    pub fn shared() -> Self {
        SHARED.clone()
    }

    /// Open `bytes` as a read-only in-memory file
    pub fn decode(&self, bytes: &[u8], args: &ContainerLoadArgs) -> Result<File, DatasetError> {
        args.check()?;

        let mut stats = self.lock.lock();
        let opened = hdf5::sync::sync(|| open_image(bytes, args));
        match opened {
            Ok(file) => {
                stats.images_opened += 1;
                drop(stats);
                debug!(bytes = bytes.len(), "Decoded HDF5 image");
                Ok(file)
            }
            Err(err) => {
                stats.open_failures += 1;
                Err(DatasetError::Decode(err))
            }
        }
    }

    /// Decode `bytes` and run `visit` on the file without releasing the
    /// lock; the file is closed before the lock is released
    pub fn with_decoded<R, F>(
        &self,
        bytes: &[u8],
        args: &ContainerLoadArgs,
        visit: F,
    ) -> Result<R, DatasetError>
    where
        F: FnOnce(&File) -> hdf5::Result<R>,
    {
        args.check()?;

        let mut stats = self.lock.lock();
        hdf5::sync::sync(|| {
            let file = match open_image(bytes, args) {
                Ok(file) => file,
                Err(err) => {
                    stats.open_failures += 1;
                    return Err(DatasetError::Decode(err));
                }
            };
            stats.images_opened += 1;
            visit(&file).map_err(DatasetError::Decode)
        })
    }

    /// Decode `bytes` once and collect its layout under the lock
    pub fn layout(&self, bytes: &[u8], args: &ContainerLoadArgs) -> Result<Member, DatasetError> {
        self.with_decoded(bytes, args, |file| Member::collect(file))
    }

    /// Copy every top-level member of `file` into a fresh in-memory file and
    /// return its image
    ///
    /// Soft links, external links and object references are expanded, so
    /// the image does not depend on anything outside itself.
    pub fn encode(&self, file: &File, args: &ContainerSaveArgs) -> Result<Vec<u8>, DatasetError> {
        args.check()?;

        let mut stats = self.lock.lock();
        let (members, bytes) =
            hdf5::sync::sync(|| encode_image(file, args)).map_err(DatasetError::Encode)?;
        stats.images_created += 1;
        drop(stats);

        debug!(members, bytes = bytes.len(), "Encoded HDF5 image");
        Ok(bytes)
    }

    /// Empty writable in-memory file for building data to save
    pub fn create_memory_file(&self) -> Result<File, DatasetError> {
        let _stats = self.lock.lock();
        hdf5::sync::sync(|| ContainerSaveArgs::default().create_memory_file())
            .map_err(DatasetError::Encode)
    }

    pub fn stats(&self) -> CodecStats {
        *self.lock.lock()
    }

    /// Whether both codecs serialise through the same lock
    pub fn shares_lock_with(&self, other: &BinaryContainerCodec) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

impl Default for BinaryContainerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BinaryContainerCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryContainerCodec").finish_non_exhaustive()
    }
}

fn open_image(bytes: &[u8], args: &ContainerLoadArgs) -> hdf5::Result<File> {
    if bytes.is_empty() {
        return Err("empty image".into());
    }
    let fapl = args.file_access()?;
    let name = CString::new(image_name()).map_err(|e| hdf5::Error::from(e.to_string()))?;

    // The property list keeps its own copy of the buffer
    let file_id = unsafe {
        H5open();
        if H5Pset_file_image(fapl.id(), bytes.as_ptr() as *mut c_void, bytes.len()) < 0 {
            return Err("unable to attach file image".into());
        }
        H5Fopen(name.as_ptr(), H5F_ACC_RDONLY, fapl.id())
    };
    if file_id < 0 {
        return Err("not a readable HDF5 image".into());
    }

    unsafe { hdf5::from_id::<File>(file_id) }.map_err(|err| {
        unsafe {
            H5Fclose(file_id);
        }
        err
    })
}

fn encode_image(file: &File, args: &ContainerSaveArgs) -> hdf5::Result<(usize, Vec<u8>)> {
    let members = file.member_names()?;
    let target = args.create_memory_file()?;

    let names = members
        .iter()
        .map(|name| CString::new(name.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| hdf5::Error::from(e.to_string()))?;
    copy_expanded(file, &target, &names)?;

    target.flush()?;
    let bytes = file_image(&target)?;
    Ok((members.len(), bytes))
}

/// `H5Ocopy` each member with soft, external and reference expansion
fn copy_expanded(source: &File, target: &File, names: &[CString]) -> hdf5::Result<()> {
    let flags = H5O_COPY_EXPAND_SOFT_LINK_FLAG
        | H5O_COPY_EXPAND_EXT_LINK_FLAG
        | H5O_COPY_EXPAND_REFERENCE_FLAG;

    unsafe {
        let copy_plist = H5Pcreate(*H5P_CLS_OBJECT_COPY);
        if copy_plist < 0 {
            return Err("unable to create object copy property list".into());
        }
        if H5Pset_copy_object(copy_plist, flags) < 0 {
            H5Pclose(copy_plist);
            return Err("unable to set object copy flags".into());
        }

        for name in names {
            let status = H5Ocopy(
                source.id(),
                name.as_ptr(),
                target.id(),
                name.as_ptr(),
                copy_plist,
                H5P_DEFAULT,
            );
            if status < 0 {
                H5Pclose(copy_plist);
                return Err(format!("unable to copy '{}'", name.to_string_lossy()).into());
            }
        }
        H5Pclose(copy_plist);
    }
    Ok(())
}

fn file_image(file: &File) -> hdf5::Result<Vec<u8>> {
    let size = unsafe { H5Fget_file_image(file.id(), ptr::null_mut(), 0) };
    if size < 0 {
        return Err("unable to size file image".into());
    }

    let mut bytes = vec![0u8; size as usize];
    let written =
        unsafe { H5Fget_file_image(file.id(), bytes.as_mut_ptr() as *mut c_void, bytes.len()) };
    if written < 0 {
        return Err("unable to read file image".into());
    }
    bytes.truncate(written as usize);
    Ok(bytes)
}
