//! Library facade error taxonomy.
//!
//! # Invariants
//! - Every user-operation error names the attempted action, the node
//!   identities involved and the underlying cause.
//! - A returned error means the in-memory library is unchanged.

use crate::format::FormatError;
use crate::model::icon::IconError;
use crate::model::link::ResolveError;
use crate::model::node::{NodeError, NodeId, NodeType};
use crate::model::tree::TreeError;
use crate::repo::library_file::{FileAccess, LibraryFileError};
use crate::service::drag::DragError;
use log::error;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type LibraryResult<T> = Result<T, LibraryError>;

/// Causes of a failed field change.
#[derive(Debug)]
pub enum ChangeError {
    Node(NodeError),
    Icon(IconError),
    /// Name is blank after trim.
    BlankName,
    /// Root and root collection keep their fixed names.
    FixedNode(NodeId),
}

impl Display for ChangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(err) => write!(f, "{err}"),
            Self::Icon(err) => write!(f, "{err}"),
            Self::BlankName => write!(f, "name must not be blank"),
            Self::FixedNode(id) => write!(f, "node {id} cannot be changed"),
        }
    }
}

impl Error for ChangeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Node(err) => Some(err),
            Self::Icon(err) => Some(err),
            Self::BlankName | Self::FixedNode(_) => None,
        }
    }
}

impl From<NodeError> for ChangeError {
    fn from(value: NodeError) -> Self {
        Self::Node(value)
    }
}

impl From<IconError> for ChangeError {
    fn from(value: IconError) -> Self {
        Self::Icon(value)
    }
}

/// Causes of a failed link or unlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    NotALink(NodeType),
    /// Target UUID is not part of this library.
    TargetNotFound(NodeId),
    /// Root and Link nodes, the link itself included, cannot be link targets.
    InvalidTargetType(NodeType),
    /// Target contains the link, which would make its projection endless.
    TargetIsAncestor(NodeId),
    Node(NodeError),
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotALink(node_type) => write!(f, "cannot set link on node type {node_type}"),
            Self::TargetNotFound(id) => write!(f, "no node with UUID {id}"),
            Self::InvalidTargetType(node_type) => {
                write!(f, "node type {node_type} cannot be a link target")
            }
            Self::TargetIsAncestor(id) => write!(f, "target {id} contains the link"),
            Self::Node(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Node(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NodeError> for LinkError {
    fn from(value: NodeError) -> Self {
        Self::Node(value)
    }
}

/// Causes of a failed move or drop.
#[derive(Debug)]
pub enum MoveError {
    Tree(TreeError),
    Drag(DragError),
    /// Dropped node belongs to another library.
    NotInLibrary(NodeId),
    /// The move would put `link` below its own `target`.
    WouldNestLinkTarget { link: NodeId, target: NodeId },
}

impl Display for MoveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Drag(err) => write!(f, "{err}"),
            Self::NotInLibrary(id) => {
                write!(f, "dropped node {id} does not belong to this library")
            }
            Self::WouldNestLinkTarget { link, target } => write!(
                f,
                "link {link} would end up inside its own target {target}"
            ),
        }
    }
}

impl Error for MoveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Drag(err) => Some(err),
            Self::NotInLibrary(_) | Self::WouldNestLinkTarget { .. } => None,
        }
    }
}

/// Errors surfaced by the library facade.
#[derive(Debug)]
pub enum LibraryError {
    CreateFailed {
        parent: NodeId,
        node_type: NodeType,
        cause: TreeError,
    },
    DeleteFailed {
        node: NodeId,
        cause: TreeError,
    },
    LinkFailed {
        source: NodeId,
        target: Option<NodeId>,
        cause: LinkError,
    },
    ChangeFailed {
        node: NodeId,
        action: &'static str,
        cause: ChangeError,
    },
    MoveFailed {
        node: Option<NodeId>,
        parent: NodeId,
        cause: MoveError,
    },
    Drag(DragError),
    Resolve(ResolveError),
    Io {
        path: PathBuf,
        access: FileAccess,
        source: std::io::Error,
    },
    Format {
        path: PathBuf,
        cause: FormatError,
    },
    NoNodeWithUuid(NodeId),
}

impl LibraryError {
    /// Short title for a UI message box.
    pub fn title(&self) -> &'static str {
        match self {
            Self::CreateFailed { .. } => "Create failed",
            Self::DeleteFailed { .. } => "Delete failed",
            Self::LinkFailed { .. } => "Linking failed",
            Self::ChangeFailed { .. } => "Change failed",
            Self::MoveFailed { .. } => "Move failed",
            Self::Drag(_) => "Drag failed",
            Self::Resolve(_) => "Link resolution failed",
            Self::Io {
                access: FileAccess::Write,
                ..
            } => "Could not save tags library",
            Self::Io { .. } | Self::Format { .. } => "Could not load tags library",
            Self::NoNodeWithUuid(_) => "Element not found",
        }
    }
}

impl Display for LibraryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateFailed {
                parent,
                node_type,
                cause,
            } => write!(
                f,
                "could not create a new {} under {parent}: {cause}",
                node_type.label()
            ),
            Self::DeleteFailed { node, cause } => write!(f, "could not delete {node}: {cause}"),
            Self::LinkFailed {
                source,
                target,
                cause,
            } => match target {
                Some(target) => write!(f, "could not link {source} to {target}: {cause}"),
                None => write!(f, "could not unlink {source}: {cause}"),
            },
            Self::ChangeFailed {
                node,
                action,
                cause,
            } => write!(f, "could not {action} of {node}: {cause}"),
            Self::MoveFailed {
                node,
                parent,
                cause,
            } => match node {
                Some(node) => write!(f, "could not move {node} under {parent}: {cause}"),
                None => write!(f, "could not drop under {parent}: {cause}"),
            },
            Self::Drag(err) => write!(f, "{err}"),
            Self::Resolve(err) => write!(f, "{err}"),
            Self::Io {
                path,
                access,
                source,
            } => write!(f, "cannot open `{}` for {access}: {source}", path.display()),
            Self::Format { path, cause } => {
                write!(f, "loading from file `{}` failed: {cause}", path.display())
            }
            Self::NoNodeWithUuid(id) => write!(f, "no node with UUID {id}"),
        }
    }
}

impl Error for LibraryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateFailed { cause, .. } | Self::DeleteFailed { cause, .. } => Some(cause),
            Self::LinkFailed { cause, .. } => Some(cause),
            Self::ChangeFailed { cause, .. } => Some(cause),
            Self::MoveFailed { cause, .. } => Some(cause),
            Self::Drag(err) => Some(err),
            Self::Resolve(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Format { cause, .. } => Some(cause),
            Self::NoNodeWithUuid(_) => None,
        }
    }
}

impl From<LibraryFileError> for LibraryError {
    fn from(value: LibraryFileError) -> Self {
        Self::Io {
            path: value.path,
            access: value.access,
            source: value.source,
        }
    }
}

impl From<DragError> for LibraryError {
    fn from(value: DragError) -> Self {
        Self::Drag(value)
    }
}

impl From<ResolveError> for LibraryError {
    fn from(value: ResolveError) -> Self {
        Self::Resolve(checked_resolve(value))
    }
}

/// Logs tree-invariant violations and stops debug builds.
///
/// Other errors pass through untouched.
pub(crate) fn checked_tree(err: TreeError) -> TreeError {
    if let TreeError::ChildNotFound { child, parent } = &err {
        error!(
            "event=tree_invariant module=library status=error kind=child_not_found child={} parent={}",
            child, parent
        );
        debug_assert!(false, "tree invariant violated: {err}");
    }
    err
}

/// Resolver counterpart of [`checked_tree`].
pub(crate) fn checked_resolve(err: ResolveError) -> ResolveError {
    match &err {
        ResolveError::ShadowChildNotFound { link, position, .. } => {
            error!(
                "event=tree_invariant module=library status=error kind=shadow_child_not_found link={} position={}",
                link, position
            );
            debug_assert!(false, "shadow invariant violated: {err}");
        }
        ResolveError::Tree(tree_err) => {
            checked_tree(tree_err.clone());
        }
        _ => {}
    }
    err
}
