//! Tag library node model.
//!
//! # Responsibility
//! - Define the node variants stored in a tag library tree.
//! - Keep shared identity fields apart from the variant payload.
//!
//! # Invariants
//! - `uuid` is assigned once at creation and never reassigned.
//! - Only `NodeKind::Link` carries a link target.
//! - Object tag values are never empty strings.

use crate::model::icon::IconRef;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable node identifier, unique within one library.
pub type NodeId = Uuid;

/// Discriminant selecting the node variant.
///
/// Numeric values are part of the persisted format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Library singleton owning the root collection.
    Root,
    /// Ordered container of arbitrary nodes.
    Collection,
    /// Assignable tag, may own sub-tags.
    Object,
    /// Reference to another node by UUID.
    Link,
}

impl NodeType {
    /// Persisted integer discriminant.
    pub fn discriminant(self) -> i64 {
        match self {
            Self::Root => 1,
            Self::Collection => 2,
            Self::Object => 3,
            Self::Link => 4,
        }
    }

    /// Maps a persisted discriminant back to a variant.
    pub fn from_discriminant(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Root),
            2 => Some(Self::Collection),
            3 => Some(Self::Object),
            4 => Some(Self::Link),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Collection => "Collection",
            Self::Object => "Object",
            Self::Link => "Link",
        }
    }

    /// Name prefix given to freshly created nodes.
    ///
    /// Links start unnamed and display their target instead.
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Collection => "New collection",
            Self::Object => "New object",
            Self::Link => "",
        }
    }

    /// Whether nodes of this type own real children.
    pub fn is_container(self) -> bool {
        !matches!(self, Self::Link)
    }

    /// Child-type rules for real (owned) children.
    ///
    /// Root additionally accepts at most one child; the tree enforces that.
    pub fn accepts_child(self, child: NodeType) -> bool {
        match self {
            Self::Root => child == Self::Collection,
            Self::Collection => matches!(child, Self::Collection | Self::Object | Self::Link),
            Self::Object => matches!(child, Self::Object | Self::Link),
            Self::Link => false,
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.discriminant())
    }
}

/// Variant-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Collection,
    Object {
        /// Custom icon; `None` falls back to the generic object icon.
        icon: Option<IconRef>,
        /// Raw tag values, possibly containing parent templates.
        tags: Vec<String>,
        /// Runtime selection state, never persisted.
        active: bool,
    },
    Link {
        /// `None` means "no linked element".
        target: Option<NodeId>,
        /// Runtime selection state, never persisted.
        active: bool,
    },
}

impl NodeKind {
    fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Root => Self::Root,
            NodeType::Collection => Self::Collection,
            NodeType::Object => Self::Object {
                icon: None,
                tags: Vec::new(),
                active: false,
            },
            NodeType::Link => Self::Link {
                target: None,
                active: false,
            },
        }
    }
}

/// Errors from single-node field mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Operation is only meaningful for other variants.
    UnsupportedOperation {
        operation: &'static str,
        node_type: NodeType,
    },
    /// Tag list contains an empty value.
    EmptyTag,
    /// Node has no tags, so it cannot be activated.
    NoTags(NodeId),
}

impl Display for NodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedOperation {
                operation,
                node_type,
            } => write!(f, "cannot {operation} on node type {node_type}"),
            Self::EmptyTag => write!(f, "cannot set empty tag"),
            Self::NoTags(id) => write!(f, "node has no tags: {id}"),
        }
    }
}

impl Error for NodeError {}

/// One element of the tag library tree.
///
/// Parent/child structure lives in [`crate::model::tree::Tree`]; this type
/// only holds identity and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    uuid: NodeId,
    name: String,
    comment: String,
    hidden: bool,
    last_change_version: Option<i64>,
    kind: NodeKind,
}

impl Node {
    /// Creates a node with a fresh UUID and the variant's default name.
    pub fn new(node_type: NodeType) -> Self {
        Self::with_id(Uuid::new_v4(), node_type)
    }

    /// Creates a node with a caller-provided UUID.
    ///
    /// Used by decode paths where identity already exists.
    pub fn with_id(uuid: NodeId, node_type: NodeType) -> Self {
        Self {
            uuid,
            name: node_type.default_name().to_string(),
            comment: String::new(),
            hidden: false,
            last_change_version: None,
            kind: NodeKind::empty(node_type),
        }
    }

    pub fn uuid(&self) -> NodeId {
        self.uuid
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Root => NodeType::Root,
            NodeKind::Collection => NodeType::Collection,
            NodeKind::Object { .. } => NodeType::Object,
            NodeKind::Link { .. } => NodeType::Link,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Raw stored name. Links may store an empty name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Library version in which this node was last persistently changed.
    pub fn last_change_version(&self) -> Option<i64> {
        self.last_change_version
    }

    pub fn set_last_change_version(&mut self, version: Option<i64>) {
        self.last_change_version = version;
    }

    /// Whether this node renders another node's content.
    pub fn is_linking(&self) -> bool {
        matches!(self.kind, NodeKind::Link { .. })
    }

    pub fn icon(&self) -> Option<&IconRef> {
        match &self.kind {
            NodeKind::Object { icon, .. } => icon.as_ref(),
            _ => None,
        }
    }

    /// Sets or clears the custom icon of an Object.
    pub fn set_icon(&mut self, value: Option<IconRef>) -> Result<(), NodeError> {
        let node_type = self.node_type();
        match &mut self.kind {
            NodeKind::Object { icon, .. } => {
                *icon = value;
                Ok(())
            }
            _ => Err(NodeError::UnsupportedOperation {
                operation: "set icon",
                node_type,
            }),
        }
    }

    /// Raw tag values. Empty for non-Object variants.
    pub fn tags(&self) -> &[String] {
        match &self.kind {
            NodeKind::Object { tags, .. } => tags,
            _ => &[],
        }
    }

    pub fn set_tags(&mut self, values: Vec<String>) -> Result<(), NodeError> {
        let node_type = self.node_type();
        match &mut self.kind {
            NodeKind::Object { tags, .. } => {
                if values.iter().any(|value| value.is_empty()) {
                    return Err(NodeError::EmptyTag);
                }
                *tags = values;
                Ok(())
            }
            _ => Err(NodeError::UnsupportedOperation {
                operation: "set tags",
                node_type,
            }),
        }
    }

    pub fn link_target(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Link { target, .. } => *target,
            _ => None,
        }
    }

    /// Sets or clears the link target.
    ///
    /// # Errors
    /// - `UnsupportedOperation` for every variant except Link.
    pub fn set_link_target(&mut self, value: Option<NodeId>) -> Result<(), NodeError> {
        let node_type = self.node_type();
        match &mut self.kind {
            NodeKind::Link { target, .. } => {
                *target = value.filter(|id| !id.is_nil());
                Ok(())
            }
            _ => Err(NodeError::UnsupportedOperation {
                operation: "set link target",
                node_type,
            }),
        }
    }

    /// Runtime active flag; `None` when not applicable to the variant.
    pub fn active(&self) -> Option<bool> {
        match &self.kind {
            NodeKind::Object { active, .. } | NodeKind::Link { active, .. } => Some(*active),
            _ => None,
        }
    }

    pub fn set_active(&mut self, value: bool) -> Result<(), NodeError> {
        let node_type = self.node_type();
        match &mut self.kind {
            NodeKind::Object { active, .. } | NodeKind::Link { active, .. } => {
                *active = value;
                Ok(())
            }
            _ => Err(NodeError::UnsupportedOperation {
                operation: "set active",
                node_type,
            }),
        }
    }
}
