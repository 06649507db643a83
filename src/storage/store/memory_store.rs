//! An in-memory store.

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Bound,
    sync::Arc,
};

use parking_lot::RwLock;

use crate::storage::{
    store_lock::{DefaultStoreLocks, StoreKeyMutex, StoreLocks},
    Bytes, ListableStorageTraits, MaybeBytes, ReadableStorageTraits,
    ReadableWritableStorageTraits, StorageError, StoreKey, StoreKeys, StoreKeysPrefixes,
    StorePrefix, WritableStorageTraits,
};

/// A store that keeps values in an ordered map in memory.
///
/// Values are reference counted [`Bytes`], so a read does not copy the value.
#[derive(Debug)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<StoreKey, Bytes>>,
    locks: StoreLocks,
}

impl MemoryStore {
    /// Create an empty memory store with [`DefaultStoreLocks`].
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_locks(Arc::new(DefaultStoreLocks::default()))
    }

    /// Create an empty memory store with `store_locks`.
    #[must_use]
    pub fn new_with_locks(store_locks: StoreLocks) -> Self {
        Self {
            values: RwLock::default(),
            locks: store_locks,
        }
    }

    /// Apply `f` to every key and value under `prefix`, in key order.
    fn for_each_under<F: FnMut(&StoreKey, &Bytes)>(&self, prefix: &StorePrefix, mut f: F) {
        let values = self.values.read();
        // Keys under a prefix are contiguous in key order
        values
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(key, _)| key.has_prefix(prefix))
            .for_each(|(key, value)| f(key, value));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let values = self.values.read();
        Ok(values.get(key).map(|value| value.len() as u64))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        self.values.write().insert(key.clone(), value);
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.values.write().remove(key).is_some())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError> {
        let mut values = self.values.write();
        let count = values.len();
        values.retain(|key, _| !key.has_prefix(prefix));
        Ok(values.len() < count)
    }
}

impl ReadableWritableStorageTraits for MemoryStore {
    fn mutex(&self, key: &StoreKey) -> Result<StoreKeyMutex, StorageError> {
        Ok(self.locks.mutex(key))
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        Ok(self.values.read().keys().cloned().collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let mut keys = StoreKeys::new();
        self.for_each_under(prefix, |key, _| keys.push(key.clone()));
        Ok(keys)
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys = StoreKeys::new();
        let mut children = BTreeSet::new();
        self.for_each_under(prefix, |key, _| {
            match key.as_str()[prefix.as_str().len()..].split_once('/') {
                Some((child, _)) => {
                    children.insert(format!("{}{child}/", prefix.as_str()));
                }
                None => keys.push(key.clone()),
            }
        });
        let prefixes = children
            .into_iter()
            .map(StorePrefix::new)
            .collect::<Result<_, _>>()?;
        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }

    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        let mut size = 0;
        self.for_each_under(prefix, |_, value| size += value.len() as u64);
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn memory() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        super::super::store_test::check_store(&store)
    }

    #[test]
    fn memory_values_are_shared() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        let key = StoreKey::new("array/c/0")?;
        let value = Bytes::from(vec![7u8; 16]);
        store.set(&key, value.clone())?;
        let read = store.get(&key)?.unwrap();
        assert_eq!(read.as_ptr(), value.as_ptr());
        assert_eq!(store.size_key(&key)?, Some(16));
        // a key is not a prefix of itself
        assert!(store.get(&StoreKey::new("array/c")?)?.is_none());
        Ok(())
    }

    #[test]
    fn memory_list_dir_nested() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        for key in [
            "array/zarr.json",
            "array/c/0/0",
            "array/c/0/1",
            "array/c/1/0",
            "other/zarr.json",
        ] {
            store.set(&StoreKey::new(key)?, Bytes::from_static(b"x"))?;
        }

        let level = store.list_dir(&StorePrefix::new("array/")?)?;
        assert_eq!(level.keys(), &[StoreKey::new("array/zarr.json")?]);
        assert_eq!(level.prefixes(), &[StorePrefix::new("array/c/")?]);

        let level = store.list_dir(&StorePrefix::new("array/c/")?)?;
        assert!(level.keys().is_empty());
        assert_eq!(
            level.prefixes(),
            &[StorePrefix::new("array/c/0/")?, StorePrefix::new("array/c/1/")?]
        );

        assert!(store.erase_prefix(&StorePrefix::new("array/c/")?)?);
        assert_eq!(store.list()?.len(), 2);
        assert_eq!(store.size_prefix(&StorePrefix::root())?, 2);
        Ok(())
    }
}
