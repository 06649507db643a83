use crate::{
    byte_range::{ByteRange, InvalidByteRangeError},
    node::NodePath,
};

use super::{
    store_lock::StoreKeyMutex, Bytes, MaybeBytes, StorageError, StoreKey, StoreKeys,
    StoreKeysPrefixes, StorePrefix,
};

/// Read access to a store.
///
/// All methods return a [`StorageError`] if the underlying store fails.
/// An absent key is not an error.
pub trait ReadableStorageTraits: Send + Sync {
    /// Returns the value at `key`, or [`None`] if there is no value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Returns the length in bytes of the value at `key`, or [`None`] if there is no value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError>;

    /// Returns the `byte_ranges` of the value at `key`, or [`None`] if there is no value.
    ///
    /// The default implementation retrieves the whole value.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidByteRangeError`] if a byte range reaches beyond the value,
    /// or a [`StorageError`] if the store fails.
    fn get_partial_values_key(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Bytes>>, StorageError> {
        let Some(value) = self.get(key)? else {
            return Ok(None);
        };
        let size = value.len() as u64;
        byte_ranges
            .iter()
            .map(|byte_range| {
                if byte_range.is_within(size) {
                    #[allow(clippy::cast_possible_truncation)]
                    let range =
                        byte_range.start(size) as usize..byte_range.end(size) as usize;
                    Ok(value.slice(range))
                } else {
                    Err(InvalidByteRangeError::new(*byte_range, size).into())
                }
            })
            .collect::<Result<Vec<_>, StorageError>>()
            .map(Some)
    }

    /// Returns true if there is a value at `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        self.size_key(key).map(|size| size.is_some())
    }
}

/// Enumeration of the keys of a store.
///
/// Keys are returned in lexicographical order.
pub trait ListableStorageTraits: Send + Sync {
    /// Returns every key in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn list(&self) -> Result<StoreKeys, StorageError> {
        self.list_prefix(&StorePrefix::root())
    }

    /// Returns every key that starts with `prefix`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError>;

    /// Returns the keys and prefixes one level below `prefix`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError>;

    /// Returns the summed length in bytes of the values under `prefix`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError>;

    /// Returns the summed length in bytes of every value in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn size(&self) -> Result<u64, StorageError> {
        self.size_prefix(&StorePrefix::root())
    }
}

/// Write access to a store.
pub trait WritableStorageTraits: Send + Sync {
    /// Write `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the value could not be written.
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError>;

    /// Remove the value at `key`. Returns false if there was no value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError>;

    /// Remove the values at `keys`. Returns true only if every key had a value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails. Keys before the failing key stay erased.
    fn erase_values(&self, keys: &[StoreKey]) -> Result<bool, StorageError> {
        keys.iter()
            .try_fold(true, |all_erased, key| Ok(self.erase(key)? && all_erased))
    }

    /// Remove every value under `prefix`. Returns false if there was none.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store fails.
    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError>;
}

/// Read and write access to a store, with per-key mutual exclusion for read-modify-write updates.
pub trait ReadableWritableStorageTraits: ReadableStorageTraits + WritableStorageTraits {
    /// Returns the mutex guarding the value at `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store cannot provide a mutex.
    fn mutex(&self, key: &StoreKey) -> Result<StoreKeyMutex, StorageError>;
}

/// Read and list access to a store.
pub trait ReadableListableStorageTraits: ReadableStorageTraits + ListableStorageTraits {}

impl<T: ReadableStorageTraits + ListableStorageTraits> ReadableListableStorageTraits for T {}

/// Read, write and list access to a store.
pub trait ReadableWritableListableStorageTraits:
    ReadableWritableStorageTraits + ListableStorageTraits
{
}

impl<T> ReadableWritableListableStorageTraits for T where
    T: ReadableWritableStorageTraits + ListableStorageTraits
{
}

/// Erase a node and every key beneath it.
///
/// Returns false if the node had no keys.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn erase_node<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<bool, StorageError> {
    storage.erase_prefix(&path.into())
}
