//! Node paths.
//!
//! A node path identifies the root key namespace of an array within a store.
//! For example, the metadata of an array at `/a/b` is stored at the key `a/b/zarr.json`.

mod node_path;

pub use node_path::{NodePath, NodePathError};
