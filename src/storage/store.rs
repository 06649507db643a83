//! Array stores.
//!
//! - [`MemoryStore`]: a store held in memory.
//! - [`FilesystemStore`]: a store in a directory of a filesystem, with one file per key.

mod filesystem_store;
mod memory_store;

pub use filesystem_store::{FilesystemStore, FilesystemStoreCreateError};
pub use memory_store::MemoryStore;
