//! `chunkarray` is a storage engine for chunked N-dimensional arrays.
//!
//! An [`Array`](crate::array::Array) is partitioned into fixed-size rectangular chunks by a [chunk grid](crate::array::chunk_grid).
//! Each chunk is encoded by a [codec pipeline](crate::array::codec::CodecChain) and stored under its own key in a [store](crate::storage::store).
//! The array metadata is persisted as a JSON side-car document (`zarr.json`) under the array path.
//!
//! Subsets of an array that do not align with chunk boundaries can be read and written.
//! A write that only partially covers a chunk retrieves the chunk, merges the new elements, then re-encodes and stores it.
//! This read-modify-write cycle holds a per-chunk lock supplied by the store (see [`storage::store_lock`]).
//! Chunks that have never been written read back as the array fill value.
//!
//! Arrays may be organised below [groups](crate::group), nodes that only hold attributes.
//!
//! ## Getting Started
//! ```rust
//! # use std::sync::Arc;
//! use chunkarray::array::{ArrayBuilder, DataType, FillValue};
//! use chunkarray::array_subset::ArraySubset;
//! use chunkarray::storage::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let array = ArrayBuilder::new(
//!     vec![4, 4],      // array shape
//!     DataType::Float32,
//!     vec![2, 2].try_into()?, // regular chunk shape
//!     FillValue::from(0.0f32),
//! )
//! .build(store, "/array")?;
//! array.store_metadata()?;
//!
//! array.store_array_subset_elements::<f32>(
//!     &ArraySubset::new_with_ranges(&[1..3, 1..3]),
//!     vec![-1.0, -2.0, -3.0, -4.0],
//! )?;
//! assert_eq!(
//!     array.retrieve_chunk_elements::<f32>(&[0, 0])?,
//!     vec![0.0, 0.0, 0.0, -1.0]
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! The following crate features are enabled by default:
//!  - `gzip`, `zstd`, `crc32c`: enable the respective codecs,
//!  - `sharding`: enables the `sharding_indexed` codec and the sharded read extensions,
//!  - `ndarray`: adds [`ndarray`] utility functions to [`Array`](crate::array::Array).
//!
//! ## Logging
//! This crate emits diagnostics through the [`log`] facade and does not install a logger.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod array_subset;
pub mod byte_range;
pub mod config;
pub mod group;
pub mod metadata;
pub mod node;
pub mod plugin;
pub mod storage;
pub mod version;
