//! Array to bytes codecs.

#[cfg(feature = "sharding")]
pub mod sharding;
