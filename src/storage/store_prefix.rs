use derive_more::{Display, From};
use thiserror::Error;

use crate::node::NodePath;

/// The common leading part of a group of [`StoreKey`](super::StoreKey)s.
///
/// The root prefix is the empty string. Any other prefix ends in `/` and has no leading `/`, e.g. `array/c/`.
/// No component is empty, `.` or `..`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StorePrefix(String);

/// A string that is not a valid [`StorePrefix`].
#[derive(Debug, Error, From)]
#[error("invalid store prefix {0}")]
pub struct StorePrefixError(String);

/// A list of [`StorePrefix`].
pub type StorePrefixes = Vec<StorePrefix>;

fn is_valid_prefix(prefix: &str) -> bool {
    match prefix.strip_suffix('/') {
        Some(body) => body
            .split('/')
            .all(|component| !matches!(component, "" | "." | "..")),
        None => prefix.is_empty(),
    }
}

impl StorePrefix {
    /// Parse `prefix`.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] unless `prefix` is empty or a `/` terminated relative path.
    pub fn new(prefix: impl Into<String>) -> Result<Self, StorePrefixError> {
        let prefix: String = prefix.into();
        if is_valid_prefix(&prefix) {
            Ok(Self(prefix))
        } else {
            Err(prefix.into())
        }
    }

    pub(crate) fn new_unchecked(prefix: String) -> Self {
        debug_assert!(is_valid_prefix(&prefix), "{prefix}");
        Self(prefix)
    }

    /// The empty prefix, under which every key lies.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// The prefix as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for StorePrefix {
    type Error = StorePrefixError;

    fn try_from(prefix: &str) -> Result<Self, Self::Error> {
        Self::new(prefix)
    }
}

impl From<&NodePath> for StorePrefix {
    fn from(path: &NodePath) -> Self {
        match path.as_str().trim_start_matches('/') {
            "" => Self::root(),
            relative => Self::new_unchecked(format!("{relative}/")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_prefix_parse() {
        for valid in ["", "a/", "a/b/", "c/0/"] {
            assert_eq!(StorePrefix::new(valid).unwrap().as_str(), valid);
        }
        for invalid in ["a", "a/b", "/a/", "/", "//", "../", "a/../", "./"] {
            assert!(StorePrefix::new(invalid).is_err(), "{invalid}");
        }
        assert_eq!(
            StorePrefix::try_from("x/y").unwrap_err().to_string(),
            "invalid store prefix x/y"
        );
    }

    #[test]
    fn store_prefix_of_node_path() {
        assert_eq!(
            StorePrefix::from(&NodePath::new("/a/b").unwrap()).as_str(),
            "a/b/"
        );
        assert_eq!(StorePrefix::from(&NodePath::root()), StorePrefix::root());
    }
}
