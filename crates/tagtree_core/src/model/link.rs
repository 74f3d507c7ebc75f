//! Link resolution and shadow projections.
//!
//! # Responsibility
//! - Resolve a Link's target UUID through the tree's UUID index.
//! - Produce shadow views of a resolved target's children without copying.
//!
//! # Invariants
//! - Shadows store only a link key, the target key and a position path; every
//!   accessor re-resolves them against the live tree.
//! - Shadows are never persisted.
//! - An unresolved link is a displayable state, not an error.

use crate::model::icon::IconRef;
use crate::model::node::{Node, NodeId, NodeKind, NodeType};
use crate::model::tree::{NodeKey, Tree, TreeError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Display text for a link without a target.
pub const NO_LINKED_ELEMENT: &str = "<no linked element>";
/// Display prefix for a link whose target is missing.
pub const INVALID_TARGET: &str = "<invalid target>";

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Operation requires a Link node.
    NotALink(NodeId),
    /// Shadow was built for a target the link no longer resolves to.
    TargetUnresolved {
        link: NodeId,
        target: Option<NodeId>,
    },
    /// Shadow position has no counterpart in the real subtree.
    ShadowChildNotFound {
        link: NodeId,
        path: Vec<usize>,
        position: usize,
    },
    Tree(TreeError),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotALink(id) => write!(f, "node {id} is not a link"),
            Self::TargetUnresolved { link, target } => match target {
                Some(target) => write!(f, "link {link} does not resolve to {target}"),
                None => write!(f, "link {link} has no target"),
            },
            Self::ShadowChildNotFound {
                link,
                path,
                position,
            } => write!(
                f,
                "shadow child at position {position} under path {path:?} of link {link} not found"
            ),
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for ResolveError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

/// Outcome of resolving one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
    NoTarget,
    /// Target UUID is set but absent from the tree.
    Invalid { target: NodeId, parent_name: String },
    Resolved(NodeKey),
}

impl LinkResolution {
    pub fn resolve(&self) -> Option<NodeKey> {
        match self {
            Self::Resolved(key) => Some(*key),
            _ => None,
        }
    }

    /// Sentinel text for unresolved states; `None` when resolved.
    pub fn sentinel(&self) -> Option<String> {
        match self {
            Self::NoTarget => Some(NO_LINKED_ELEMENT.to_string()),
            Self::Invalid {
                target,
                parent_name,
            } => Some(format!(
                "{INVALID_TARGET} ({target}; no node with this UUID under parent \"{parent_name}\")"
            )),
            Self::Resolved(_) => None,
        }
    }
}

/// Resolves `link` through the UUID index.
pub fn resolve(tree: &Tree, link: NodeKey) -> ResolveResult<LinkResolution> {
    let node = tree.node(link)?;
    if !node.is_linking() {
        return Err(ResolveError::NotALink(node.uuid()));
    }
    let Some(target) = node.link_target() else {
        return Ok(LinkResolution::NoTarget);
    };
    match tree.find(target) {
        Some(key) => Ok(LinkResolution::Resolved(key)),
        None => {
            let parent_name = match tree.parent(link)? {
                Some(parent) => tree.node(parent)?.name().to_string(),
                None => String::new(),
            };
            Ok(LinkResolution::Invalid {
                target,
                parent_name,
            })
        }
    }
}

/// Resolved target of `key` when it is a link with a live target.
pub fn resolved_target(tree: &Tree, key: NodeKey) -> ResolveResult<Option<NodeKey>> {
    if !tree.node(key)?.is_linking() {
        return Ok(None);
    }
    Ok(resolve(tree, key)?.resolve())
}

/// Children as rendered: a link shows its target's children.
pub fn projected_children(tree: &Tree, key: NodeKey) -> ResolveResult<Vec<NodeKey>> {
    if !tree.node(key)?.is_linking() {
        return Ok(tree.children(key)?.to_vec());
    }
    match resolve(tree, key)?.resolve() {
        Some(target) => Ok(tree.children(target)?.to_vec()),
        None => Ok(Vec::new()),
    }
}

/// Read-only view of a node reached through a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShadowNode {
    link: NodeKey,
    target_root: NodeKey,
    path: Vec<usize>,
}

impl ShadowNode {
    pub fn link(&self) -> NodeKey {
        self.link
    }

    pub fn target_root(&self) -> NodeKey {
        self.target_root
    }

    /// Positions from the link target down to this shadow.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Position among the sibling shadows.
    pub fn position(&self) -> usize {
        self.path.last().copied().unwrap_or_default()
    }

    pub fn node<'a>(&self, tree: &'a Tree) -> ResolveResult<&'a Node> {
        let key = real_node(tree, self)?;
        Ok(tree.node(key)?)
    }

    pub fn uuid(&self, tree: &Tree) -> ResolveResult<NodeId> {
        self.node(tree).map(Node::uuid)
    }

    pub fn name(&self, tree: &Tree) -> ResolveResult<String> {
        let key = real_node(tree, self)?;
        display_name(tree, key)
    }

    pub fn icons(&self, tree: &Tree) -> ResolveResult<Vec<IconRef>> {
        let key = real_node(tree, self)?;
        icons(tree, key)
    }
}

/// One shadow per child of the link's resolved target.
///
/// Unresolved links have no shadow children.
pub fn shadow_children(tree: &Tree, link: NodeKey) -> ResolveResult<Vec<ShadowNode>> {
    let Some(target_root) = resolve(tree, link)?.resolve() else {
        return Ok(Vec::new());
    };
    let count = projected_children(tree, target_root)?.len();
    Ok((0..count)
        .map(|position| ShadowNode {
            link,
            target_root,
            path: vec![position],
        })
        .collect())
}

/// Shadows one level below `shadow`.
pub fn shadow_children_of(tree: &Tree, shadow: &ShadowNode) -> ResolveResult<Vec<ShadowNode>> {
    let real = real_node(tree, shadow)?;
    let count = projected_children(tree, real)?.len();
    Ok((0..count)
        .map(|position| {
            let mut path = shadow.path.clone();
            path.push(position);
            ShadowNode {
                link: shadow.link,
                target_root: shadow.target_root,
                path,
            }
        })
        .collect())
}

/// Real node behind `shadow`.
pub fn real_node(tree: &Tree, shadow: &ShadowNode) -> ResolveResult<NodeKey> {
    shadow_index_of(tree, shadow, shadow.position())
}

/// Maps `position` among `shadow`'s siblings to the real child there.
///
/// # Errors
/// - `TargetUnresolved` when the link no longer resolves to the shadow's
///   target.
/// - `ShadowChildNotFound` when the real subtree has no child at a position
///   on the path.
pub fn shadow_index_of(
    tree: &Tree,
    shadow: &ShadowNode,
    position: usize,
) -> ResolveResult<NodeKey> {
    let link_uuid = tree.uuid(shadow.link)?;
    let current = resolve(tree, shadow.link)?;
    if current.resolve() != Some(shadow.target_root) {
        return Err(ResolveError::TargetUnresolved {
            link: link_uuid,
            target: tree.node(shadow.link)?.link_target(),
        });
    }

    let not_found = |at: usize| ResolveError::ShadowChildNotFound {
        link: link_uuid,
        path: shadow.path.clone(),
        position: at,
    };

    let parent_path = match shadow.path.split_last() {
        Some((_, parent_path)) => parent_path,
        None => &[],
    };
    let mut level = shadow.target_root;
    for step in parent_path {
        level = projected_children(tree, level)?
            .get(*step)
            .copied()
            .ok_or_else(|| not_found(*step))?;
    }
    projected_children(tree, level)?
        .get(position)
        .copied()
        .ok_or_else(|| not_found(position))
}

/// Name as shown to users; blank link names fall back to the target.
pub fn display_name(tree: &Tree, key: NodeKey) -> ResolveResult<String> {
    let node = tree.node(key)?;
    if !node.is_linking() || !node.name().is_empty() {
        return Ok(node.name().to_string());
    }
    let resolution = resolve(tree, key)?;
    match resolution.resolve() {
        Some(target) => Ok(tree.node(target)?.name().to_string()),
        None => Ok(resolution.sentinel().unwrap_or_default()),
    }
}

/// Edit-mode name: links show `name -> target`.
pub fn edit_name(tree: &Tree, key: NodeKey) -> ResolveResult<String> {
    let node = tree.node(key)?;
    if !node.is_linking() {
        return Ok(node.name().to_string());
    }
    let resolution = resolve(tree, key)?;
    let target_name = match resolution.resolve() {
        Some(target) => tree.node(target)?.name().to_string(),
        None => resolution.sentinel().unwrap_or_default(),
    };
    Ok(format!("{} -> {}", node.name(), target_name))
}

/// Icons shown for `key`; links borrow their target's icons.
pub fn icons(tree: &Tree, key: NodeKey) -> ResolveResult<Vec<IconRef>> {
    let node = tree.node(key)?;
    Ok(match node.kind() {
        NodeKind::Root => Vec::new(),
        NodeKind::Collection => IconRef::generic(NodeType::Collection).into_iter().collect(),
        NodeKind::Object { icon, .. } => match icon {
            Some(icon) => vec![icon.clone()],
            None => IconRef::generic(NodeType::Object).into_iter().collect(),
        },
        NodeKind::Link { .. } => match resolve(tree, key)?.resolve() {
            Some(target) if !tree.node(target)?.is_linking() => icons(tree, target)?,
            _ => vec![IconRef::unlinked()],
        },
    })
}
