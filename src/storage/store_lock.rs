//! Per-key locks that serialise read-modify-write updates of store values.
//!
//! A store hands out a [`StoreKeyMutex`] for a [`StoreKey`] through its [`StoreLocks`].
//! A partial chunk write holds the guard of the chunk key from reading the existing chunk until the merged chunk is written.
//!
//! [`DefaultStoreLocks`] keeps a table of [`parking_lot::Mutex`]es in the current process.
//! [`DisabledStoreLocks`] hands out mutexes that never block, so concurrent partial writes to one chunk can lose updates.

use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, MutexGuard};

use super::StoreKey;

/// Shared lock manager of a store.
pub type StoreLocks = Arc<dyn StoreLocksTraits>;

/// Hands out a mutex per store key.
pub trait StoreLocksTraits: Send + Sync + core::fmt::Debug {
    /// Returns the mutex for the store value at `key`.
    ///
    /// Mutexes returned for equal keys exclude each other.
    #[must_use]
    fn mutex(&self, key: &StoreKey) -> StoreKeyMutex;
}

/// A boxed store key mutex.
pub type StoreKeyMutex = Box<dyn StoreKeyMutexTraits>;

/// A mutex guarding one store key.
pub trait StoreKeyMutexTraits {
    /// Block until the mutex is acquired. It is released when the guard is dropped.
    #[must_use]
    fn lock(&self) -> StoreKeyMutexGuard<'_>;
}

/// A boxed store key mutex guard.
pub type StoreKeyMutexGuard<'a> = Box<dyn StoreKeyMutexGuardTraits + 'a>;

/// Marker trait of store key mutex guards.
pub trait StoreKeyMutexGuardTraits {}

impl StoreKeyMutexGuardTraits for MutexGuard<'_, ()> {}

impl StoreKeyMutexGuardTraits for () {}

/// Process local store locks.
///
/// Entries of the lock table that no [`DefaultStoreMutex`] refers to are pruned whenever a mutex is requested.
#[derive(Debug, Default)]
pub struct DefaultStoreLocks {
    table: Mutex<HashMap<StoreKey, Arc<Mutex<()>>>>,
}

/// A mutex from [`DefaultStoreLocks`].
#[derive(Debug)]
pub struct DefaultStoreMutex(Arc<Mutex<()>>);

impl StoreKeyMutexTraits for DefaultStoreMutex {
    fn lock(&self) -> StoreKeyMutexGuard<'_> {
        Box::new(self.0.lock())
    }
}

impl StoreLocksTraits for DefaultStoreLocks {
    fn mutex(&self, key: &StoreKey) -> StoreKeyMutex {
        let mut table = self.table.lock();
        table.retain(|held_key, mutex| held_key == key || Arc::strong_count(mutex) > 1);
        let mutex = Arc::clone(table.entry(key.clone()).or_default());
        Box::new(DefaultStoreMutex(mutex))
    }
}

/// Store locks that never block.
#[derive(Debug, Default)]
pub struct DisabledStoreLocks;

/// A mutex from [`DisabledStoreLocks`].
#[derive(Debug)]
pub struct DisabledStoreMutex;

impl StoreKeyMutexTraits for DisabledStoreMutex {
    fn lock(&self) -> StoreKeyMutexGuard<'_> {
        Box::new(())
    }
}

impl StoreLocksTraits for DisabledStoreLocks {
    fn mutex(&self, _key: &StoreKey) -> StoreKeyMutex {
        Box::new(DisabledStoreMutex)
    }
}
