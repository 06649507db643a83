//! Library version information.

/// The crate major version.
#[must_use]
pub fn version_major() -> u32 {
    env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>().unwrap_or_default()
}

/// The crate minor version.
#[must_use]
pub fn version_minor() -> u32 {
    env!("CARGO_PKG_VERSION_MINOR").parse::<u32>().unwrap_or_default()
}

/// The crate patch version.
#[must_use]
pub fn version_patch() -> u32 {
    env!("CARGO_PKG_VERSION_PATCH").parse::<u32>().unwrap_or_default()
}

/// The crate version packed into a [`u32`].
///
/// Encoded as `(version_major() << 22) | (version_minor() << 12) | version_patch()`.
#[must_use]
pub fn version() -> u32 {
    (version_major() << 22) | (version_minor() << 12) | version_patch()
}
