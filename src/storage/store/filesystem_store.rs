//! A filesystem store.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use thiserror::Error;
use walkdir::WalkDir;

use crate::{
    byte_range::{ByteRange, InvalidByteRangeError},
    storage::{
        store_lock::{DefaultStoreLocks, StoreKeyMutex, StoreLocks},
        Bytes, ListableStorageTraits, MaybeBytes, ReadableStorageTraits,
        ReadableWritableStorageTraits, StorageError, StoreKey, StoreKeyError, StoreKeys,
        StoreKeysPrefixes, StorePrefix, WritableStorageTraits,
    },
};

/// Files with this prefix are in-flight writes and are never listed.
const TEMPORARY_FILE_PREFIX: &str = ".chunkarray-tmp";

/// Map a missing file or directory to [`None`].
fn ignore_not_found<T>(result: std::io::Result<T>) -> std::io::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Whether new entries can be created below `path`, judged by its nearest existing ancestor.
///
/// Returns [`None`] if that ancestor is not a directory.
fn ancestor_writable(path: &Path) -> std::io::Result<Option<bool>> {
    for ancestor in path.ancestors().skip(1) {
        let ancestor = if ancestor.as_os_str().is_empty() {
            Path::new(".")
        } else {
            ancestor
        };
        if let Some(metadata) = ignore_not_found(std::fs::metadata(ancestor))? {
            return Ok(metadata
                .is_dir()
                .then(|| !metadata.permissions().readonly()));
        }
    }
    Ok(Some(true))
}

fn is_temporary(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with(TEMPORARY_FILE_PREFIX)
}

/// A file system store.
///
/// Each key is a file at the same relative path below the base directory.
/// A value is written to a temporary file in the destination directory and renamed over the destination,
/// so a reader sees either the old or the new value, never a partial one.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    readonly: bool,
    /// Held shared by key operations and exclusively by [`WritableStorageTraits::erase_prefix`].
    tree: RwLock<()>,
    locks: StoreLocks,
}

impl FilesystemStore {
    /// Create a file system store rooted at `base_path`.
    ///
    /// The directory is created on the first write if it does not exist.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_path` is not valid UTF-8, or it or its nearest existing ancestor is a file.
    /// Nothing is created on the filesystem.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        Self::new_with_locks(base_path, Arc::new(DefaultStoreLocks::default()))
    }

    /// Create a file system store rooted at `base_path` with `store_locks` guarding chunk updates.
    ///
    /// # Errors
    /// See [`FilesystemStore::new`].
    pub fn new_with_locks<P: AsRef<Path>>(
        base_path: P,
        store_locks: StoreLocks,
    ) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }
        let readonly = match ignore_not_found(std::fs::metadata(&base_path))? {
            Some(metadata) if metadata.is_dir() => metadata.permissions().readonly(),
            Some(_) => return Err(FilesystemStoreCreateError::InvalidBasePath(base_path)),
            None => match ancestor_writable(&base_path)? {
                Some(writable) => !writable,
                None => return Err(FilesystemStoreCreateError::InvalidBasePath(base_path)),
            },
        };
        log::debug!("filesystem store at {} (readonly: {readonly})", base_path.display());
        Ok(Self {
            base_path,
            readonly,
            tree: RwLock::default(),
            locks: store_locks,
        })
    }

    /// Returns true if the base directory is read only.
    #[must_use]
    pub const fn readonly(&self) -> bool {
        self.readonly
    }

    /// Returns the path of the file holding `key`.
    #[must_use]
    pub fn key_path(&self, key: &StoreKey) -> PathBuf {
        self.base_path.join(key.as_str())
    }

    fn prefix_path(&self, prefix: &StorePrefix) -> PathBuf {
        self.base_path.join(prefix.as_str())
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.readonly {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn path_key(&self, path: &Path) -> Result<StoreKey, StoreKeyError> {
        let relative = pathdiff::diff_paths(path, &self.base_path)
            .ok_or_else(|| StoreKeyError::from(path.to_string_lossy().to_string()))?;
        StoreKey::new(relative.to_string_lossy().replace('\\', "/"))
    }

    /// All keys below `directory`, in lexicographical order.
    ///
    /// A missing `directory` has no keys.
    fn keys_below(&self, directory: &Path) -> Result<StoreKeys, StorageError> {
        let mut keys = StoreKeys::new();
        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err)
                    if err
                        .io_error()
                        .is_some_and(|err| err.kind() == std::io::ErrorKind::NotFound) =>
                {
                    continue
                }
                Err(err) => return Err(std::io::Error::from(err).into()),
            };
            if entry.file_type().is_file() && !is_temporary(entry.file_name()) {
                keys.push(self.path_key(entry.path())?);
            }
        }
        Ok(keys)
    }
}

impl ReadableStorageTraits for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let _tree = self.tree.read();
        Ok(ignore_not_found(std::fs::read(self.key_path(key)))?.map(Bytes::from))
    }

    fn get_partial_values_key(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Bytes>>, StorageError> {
        let _tree = self.tree.read();
        let Some(mut file) = ignore_not_found(File::open(self.key_path(key)))? else {
            return Ok(None);
        };
        let size = file.metadata()?.len();
        let mut values = Vec::with_capacity(byte_ranges.len());
        for byte_range in byte_ranges {
            if !byte_range.is_within(size) {
                return Err(InvalidByteRangeError::new(*byte_range, size).into());
            }
            file.seek(SeekFrom::Start(byte_range.start(size)))?;
            #[allow(clippy::cast_possible_truncation)]
            let mut value = vec![0; byte_range.length(size) as usize];
            file.read_exact(&mut value)?;
            values.push(Bytes::from(value));
        }
        Ok(Some(values))
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let metadata = ignore_not_found(std::fs::metadata(self.key_path(key)))?;
        Ok(metadata
            .filter(std::fs::Metadata::is_file)
            .map(|metadata| metadata.len()))
    }
}

impl WritableStorageTraits for FilesystemStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        self.check_writable()?;
        let _tree = self.tree.read();

        let path = self.key_path(key);
        let directory = path.parent().unwrap_or(&self.base_path);
        std::fs::create_dir_all(directory)?;
        let mut temporary = tempfile::Builder::new()
            .prefix(TEMPORARY_FILE_PREFIX)
            .tempfile_in(directory)?;
        temporary.write_all(&value)?;
        temporary.as_file().sync_data()?;
        temporary.persist(&path).map_err(|err| err.error)?;
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        self.check_writable()?;
        let _tree = self.tree.read();
        Ok(ignore_not_found(std::fs::remove_file(self.key_path(key)))?.is_some())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError> {
        self.check_writable()?;
        let _tree = self.tree.write();

        let directory = self.prefix_path(prefix);
        let had_keys = !self.keys_below(&directory)?.is_empty();
        Ok(ignore_not_found(std::fs::remove_dir_all(directory))?.is_some() && had_keys)
    }
}

impl ReadableWritableStorageTraits for FilesystemStore {
    fn mutex(&self, key: &StoreKey) -> Result<StoreKeyMutex, StorageError> {
        Ok(self.locks.mutex(key))
    }
}

impl ListableStorageTraits for FilesystemStore {
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        self.keys_below(&self.prefix_path(prefix))
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys = StoreKeys::new();
        let mut prefixes = Vec::new();
        let Some(entries) = ignore_not_found(std::fs::read_dir(self.prefix_path(prefix)))? else {
            return Ok(StoreKeysPrefixes::new(keys, prefixes));
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let child = format!("{}{}", prefix.as_str(), name.to_string_lossy());
            if entry.file_type()?.is_dir() {
                prefixes.push(StorePrefix::new(child + "/")?);
            } else if !is_temporary(&name) {
                keys.push(StoreKey::new(child)?);
            }
        }
        keys.sort();
        prefixes.sort();
        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }

    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        self.list_prefix(prefix)?
            .iter()
            .try_fold(0, |total, key| Ok(total + self.size_key(key)?.unwrap_or(0)))
    }
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The path is not valid UTF-8, or it or its nearest existing ancestor is not a directory.
    #[error("base path {0} is not valid")]
    InvalidBasePath(PathBuf),
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        super::super::store_test::check_store(&store)
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_overwrite_leaves_no_temporary_files() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        let key: StoreKey = "array/c/0/0".try_into()?;
        store.set(&key, vec![0; 16].into())?;
        store.set(&key, vec![1; 4].into())?;
        assert_eq!(store.get(&key)?.unwrap(), vec![1; 4]);
        assert_eq!(store.list()?, &[key.clone()]);
        assert_eq!(store.key_path(&key), path.path().join("array/c/0/0"));
        assert_eq!(std::fs::read_dir(path.path().join("array/c/0"))?.count(), 1);
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_missing_directories() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path().join("not/yet"))?;
        assert!(!store.readonly());
        assert!(!path.path().join("not").exists());
        assert_eq!(store.get(&"a".try_into()?)?, None);
        assert!(store.list_dir(&StorePrefix::root())?.keys().is_empty());
        assert!(!store.erase_prefix(&"b/".try_into()?)?);
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_base_path_is_file() -> Result<(), Box<dyn Error>> {
        let file = tempfile::NamedTempFile::new()?;
        assert!(matches!(
            FilesystemStore::new(file.path()),
            Err(FilesystemStoreCreateError::InvalidBasePath(_))
        ));
        assert!(matches!(
            FilesystemStore::new(file.path().join("below")),
            Err(FilesystemStoreCreateError::InvalidBasePath(_))
        ));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_readonly_parent() -> Result<(), Box<dyn Error>> {
        use std::os::unix::fs::PermissionsExt;

        let path = tempfile::TempDir::new()?;
        let parent = path.path().join("parent");
        std::fs::create_dir(&parent)?;
        std::fs::set_permissions(&parent, std::fs::Permissions::from_mode(0o555))?;
        let store = FilesystemStore::new(parent.join("store"))?;
        assert!(store.readonly());
        assert!(!parent.join("store").exists());
        assert!(matches!(
            store.set(&"a".try_into()?, vec![0].into()),
            Err(StorageError::ReadOnly)
        ));
        std::fs::set_permissions(&parent, std::fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_list_unreadable_directory() -> Result<(), Box<dyn Error>> {
        use std::os::unix::fs::PermissionsExt;

        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        store.set(&"array/c/0".try_into()?, vec![0].into())?;
        let directory = path.path().join("array/c");
        std::fs::set_permissions(&directory, std::fs::Permissions::from_mode(0o000))?;
        let unreadable = std::fs::read_dir(&directory).is_err();
        let listed = store.list_prefix(&"array/".try_into()?);
        let erased = store.erase_prefix(&"array/".try_into()?);
        if directory.exists() {
            std::fs::set_permissions(&directory, std::fs::Permissions::from_mode(0o755))?;
        }
        // privileged users can read the directory regardless
        if unreadable {
            assert!(matches!(listed, Err(StorageError::IOError(_))));
            assert!(matches!(erased, Err(StorageError::IOError(_))));
        } else {
            assert_eq!(listed?, &[StoreKey::new("array/c/0")?]);
        }
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_keys_stay_below_base_path() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let base_path = path.path().join("store");
        let store = Arc::new(FilesystemStore::new(&base_path)?);
        assert!(StoreKey::new("../escaped").is_err());
        assert!(StorePrefix::new("../").is_err());
        let err = crate::array::ArrayBuilder::new(
            vec![4],
            crate::array::DataType::UInt8,
            vec![2].try_into()?,
            crate::array::FillValue::from(0u8),
        )
        .build(store, "/../escaped")
        .unwrap_err();
        assert!(matches!(err, crate::array::ArrayCreateError::NodePathError(_)));
        assert!(!path.path().join("escaped").exists());
        Ok(())
    }
}
