//! Icon references attached to nodes.

use crate::model::node::NodeType;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::path::PathBuf;

/// Prefix of icons bundled with the application.
pub const BUILTIN_PREFIX: &str = ":/";

const COLLECTION_ICON: &str = ":/icons/bx-book.svg";
const OBJECT_ICON: &str = ":/icons/bx-cube.svg";
const LINK_ICON: &str = ":/icons/bx-link.svg";
const UNLINKED_ICON: &str = ":/icons/bx-unlink.svg";

/// Opaque icon reference: a bundled resource path or a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconRef(String);

impl IconRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_builtin(&self) -> bool {
        self.0.starts_with(BUILTIN_PREFIX)
    }

    /// Last path segment, used in summaries.
    pub fn name(&self) -> &str {
        self.0
            .rsplit(['/', '\\'])
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(&self.0)
    }

    /// Icon shown for a variant without a custom icon.
    pub fn generic(node_type: NodeType) -> Option<Self> {
        match node_type {
            NodeType::Root => None,
            NodeType::Collection => Some(Self::new(COLLECTION_ICON)),
            NodeType::Object => Some(Self::new(OBJECT_ICON)),
            NodeType::Link => Some(Self::new(LINK_ICON)),
        }
    }

    /// Icon shown for a link without a resolvable target.
    pub fn unlinked() -> Self {
        Self::new(UNLINKED_ICON)
    }

    /// Checks that the icon source can be read.
    ///
    /// Bundled resources are always considered readable.
    pub fn check_readable(&self) -> Result<(), IconError> {
        if self.0.trim().is_empty() {
            return Err(IconError::Empty);
        }
        if self.is_builtin() {
            return Ok(());
        }
        File::open(&self.0)
            .map(|_| ())
            .map_err(|source| IconError::Unreadable {
                path: PathBuf::from(&self.0),
                source,
            })
    }
}

impl Display for IconRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub enum IconError {
    Empty,
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for IconError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "icon reference is empty"),
            Self::Unreadable { path, source } => {
                write!(f, "icon `{}` is not readable: {source}", path.display())
            }
        }
    }
}

impl Error for IconError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Empty => None,
            Self::Unreadable { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IconError, IconRef};

    #[test]
    fn name_is_last_segment() {
        assert_eq!(IconRef::new(":/icons/bx-cube.svg").name(), "bx-cube.svg");
        assert_eq!(IconRef::new("plain.png").name(), "plain.png");
    }

    #[test]
    fn builtin_icons_are_readable_without_filesystem() {
        IconRef::new(":/user-icons/star.svg")
            .check_readable()
            .unwrap();
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.svg");
        let err = IconRef::new(path.to_string_lossy())
            .check_readable()
            .unwrap_err();
        assert!(matches!(err, IconError::Unreadable { .. }));
    }
}
