use derive_more::{Display, From};
use thiserror::Error;

use super::StorePrefix;

/// The name of a value in a store, e.g. `array/c/0/1`.
///
/// Keys are non-empty and have neither a leading nor a trailing `/`.
/// No `/` separated component is empty, `.` or `..`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StoreKey(String);

/// A string that is not a valid [`StoreKey`].
#[derive(Debug, From, Error)]
#[error("invalid store key {0}")]
pub struct StoreKeyError(String);

/// A list of [`StoreKey`].
pub type StoreKeys = Vec<StoreKey>;

fn is_valid_key(key: &str) -> bool {
    key.split('/')
        .all(|component| !matches!(component, "" | "." | ".."))
}

impl std::borrow::Borrow<str> for StoreKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl StoreKey {
    /// Parse `key`.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if `key` is empty, starts or ends with `/`, or has an empty, `.` or `..` component.
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key: String = key.into();
        if is_valid_key(&key) {
            Ok(Self(key))
        } else {
            Err(key.into())
        }
    }

    pub(crate) fn new_unchecked(key: String) -> Self {
        debug_assert!(is_valid_key(&key), "{key}");
        Self(key)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key lies under `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &StorePrefix) -> bool {
        self.0.starts_with(prefix.as_str())
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = StoreKeyError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}
