use derive_more::Display;
use thiserror::Error;

/// The absolute path of a node (an array or a group) within a store, e.g. `/group/array`.
///
/// Paths start with `/`, have no empty components and, except for the root `/`, no trailing `/`.
/// The components `.` and `..` are not allowed.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct NodePath(String);

/// A string that is not a valid [`NodePath`].
#[derive(Debug, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

fn is_valid_path(path: &str) -> bool {
    match path.strip_prefix('/') {
        Some("") => true,
        Some(relative) => relative
            .split('/')
            .all(|component| !matches!(component, "" | "." | "..")),
        None => false,
    }
}

impl NodePath {
    /// Parse `path`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `path` is relative, has a trailing `/`, or has an empty, `.` or `..` component.
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if is_valid_path(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// The path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}
