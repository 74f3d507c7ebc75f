//! Arena-backed tag library tree.
//!
//! # Responsibility
//! - Own every node of one library in a growable arena.
//! - Provide generic parent/child operations shared by container variants.
//! - Maintain the UUID index used by link resolution.
//!
//! # Invariants
//! - Exactly one Root exists and owns exactly one Collection.
//! - `by_uuid` holds exactly the UUIDs of live nodes; every structural
//!   mutation updates it before returning.
//! - Freed slots bump their generation, so stale keys never alias a new node.
//! - Child order is display order.

use crate::model::node::{Node, NodeError, NodeId, NodeType};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Name given to the collection of a freshly created library.
pub const MAIN_COLLECTION_NAME: &str = "Main collection";

pub type TreeResult<T> = Result<T, TreeError>;

/// Stable handle of one arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    index: u32,
    generation: u32,
}

/// Errors from tree structure operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// `child` is not a direct child of `parent`.
    ChildNotFound { child: NodeId, parent: NodeId },
    /// Parent variant does not accept the child variant.
    CannotInsertChild {
        parent: NodeId,
        parent_type: NodeType,
        child_type: NodeType,
    },
    /// UUID already present in the tree.
    DuplicateUuid(NodeId),
    /// Key refers to a freed or foreign slot.
    StaleKey(NodeKey),
    /// Root and root collection are fixed parts of the library.
    FixedNode(NodeId),
    /// Move would place a node below itself.
    CycleDetected { node: NodeId, parent: NodeId },
    /// Draft used to build a tree is not a Root.
    NotARoot(NodeType),
    /// Node-level field failure.
    Node(NodeError),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChildNotFound { child, parent } => {
                write!(f, "node {child} is not a child of {parent}")
            }
            Self::CannotInsertChild {
                parent,
                parent_type,
                child_type,
            } => write!(
                f,
                "node {parent} of type {parent_type} cannot hold a child of type {child_type}"
            ),
            Self::DuplicateUuid(id) => write!(f, "UUID occurs more than once: {id}"),
            Self::StaleKey(key) => {
                write!(f, "stale node key {}:{}", key.index, key.generation)
            }
            Self::FixedNode(id) => write!(f, "node {id} cannot be removed or moved"),
            Self::CycleDetected { node, parent } => write!(
                f,
                "move would create cycle: node {node} under parent {parent}"
            ),
            Self::NotARoot(node_type) => {
                write!(f, "invalid type of root node, expected Root but got {node_type}")
            }
            Self::Node(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Node(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NodeError> for TreeError {
    fn from(value: NodeError) -> Self {
        Self::Node(value)
    }
}

/// Owned subtree detached from (or not yet attached to) a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDraft {
    pub node: Node,
    pub children: Vec<NodeDraft>,
}

impl NodeDraft {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    pub fn with_children(node: Node, children: Vec<NodeDraft>) -> Self {
        Self { node, children }
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// UUIDs of this node and all descendants in pre-order.
    pub fn uuids(&self) -> Vec<NodeId> {
        let mut result = vec![self.node.uuid()];
        for child in &self.children {
            result.extend(child.uuids());
        }
        result
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

#[derive(Debug, Clone)]
struct Entry {
    generation: u32,
    slot: Option<Slot>,
}

/// One library tree.
#[derive(Debug, Clone)]
pub struct Tree {
    entries: Vec<Entry>,
    free: Vec<u32>,
    by_uuid: HashMap<NodeId, NodeKey>,
    root: NodeKey,
    root_collection: NodeKey,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a library with a Root and an empty main collection.
    pub fn new() -> Self {
        let mut collection = Node::new(NodeType::Collection);
        collection.set_name(MAIN_COLLECTION_NAME);
        Self::seeded(
            Node::new(NodeType::Root),
            NodeDraft::new(collection),
        )
    }

    /// Builds a tree from a decoded Root draft.
    ///
    /// # Errors
    /// - `NotARoot` when the draft is not a Root.
    /// - `CannotInsertChild` when the Root does not own exactly one Collection
    ///   or a descendant violates child-type rules.
    /// - `DuplicateUuid` when any UUID repeats.
    pub fn from_draft(draft: NodeDraft) -> TreeResult<Self> {
        let NodeDraft { node: root, children } = draft;
        if root.node_type() != NodeType::Root {
            return Err(TreeError::NotARoot(root.node_type()));
        }
        let mut children = children.into_iter();
        let collection = match (children.next(), children.next()) {
            (Some(collection), None) if collection.node.node_type() == NodeType::Collection => {
                collection
            }
            (Some(extra), _) => {
                return Err(TreeError::CannotInsertChild {
                    parent: root.uuid(),
                    parent_type: NodeType::Root,
                    child_type: extra.node.node_type(),
                })
            }
            (None, _) => {
                return Err(TreeError::CannotInsertChild {
                    parent: root.uuid(),
                    parent_type: NodeType::Root,
                    child_type: NodeType::Collection,
                })
            }
        };

        let mut seen = HashSet::from([root.uuid()]);
        validate_draft(root.uuid(), NodeType::Root, &collection, &mut seen)?;
        Ok(Self::seeded(root, collection))
    }

    fn seeded(root: Node, collection: NodeDraft) -> Self {
        let root_uuid = root.uuid();
        let root_key = NodeKey {
            index: 0,
            generation: 0,
        };
        let mut tree = Self {
            entries: vec![Entry {
                generation: 0,
                slot: Some(Slot {
                    node: root,
                    parent: None,
                    children: Vec::new(),
                }),
            }],
            free: Vec::new(),
            by_uuid: HashMap::from([(root_uuid, root_key)]),
            root: root_key,
            root_collection: root_key,
        };
        tree.root_collection = tree.attach_draft(root_key, 0, collection);
        tree
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn root_collection(&self) -> NodeKey {
        self.root_collection
    }

    /// Number of live nodes, Root included.
    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.slot(key).is_ok()
    }

    /// Looks a node up by UUID through the index.
    pub fn find(&self, uuid: NodeId) -> Option<NodeKey> {
        self.by_uuid.get(&uuid).copied()
    }

    pub fn node(&self, key: NodeKey) -> TreeResult<&Node> {
        self.slot(key).map(|slot| &slot.node)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> TreeResult<&mut Node> {
        self.slot_mut(key).map(|slot| &mut slot.node)
    }

    pub fn uuid(&self, key: NodeKey) -> TreeResult<NodeId> {
        self.node(key).map(Node::uuid)
    }

    pub fn parent(&self, key: NodeKey) -> TreeResult<Option<NodeKey>> {
        self.slot(key).map(|slot| slot.parent)
    }

    pub fn children(&self, key: NodeKey) -> TreeResult<&[NodeKey]> {
        self.slot(key).map(|slot| slot.children.as_slice())
    }

    /// Whether `parent` may receive one more child of `child_type`.
    pub fn can_insert_child(&self, parent: NodeKey, child_type: NodeType) -> TreeResult<bool> {
        let slot = self.slot(parent)?;
        let node_type = slot.node.node_type();
        if node_type == NodeType::Root && !slot.children.is_empty() {
            return Ok(false);
        }
        Ok(node_type.accepts_child(child_type))
    }

    /// Inserts a childless node at `row` (clamped to the child count).
    pub fn insert_child(&mut self, parent: NodeKey, row: usize, node: Node) -> TreeResult<NodeKey> {
        self.insert_subtree(parent, row, NodeDraft::new(node))
    }

    pub fn append_child(&mut self, parent: NodeKey, node: Node) -> TreeResult<NodeKey> {
        let row = self.children(parent)?.len();
        self.insert_child(parent, row, node)
    }

    /// Inserts a whole subtree; nothing is attached unless all of it is valid.
    pub fn insert_subtree(
        &mut self,
        parent: NodeKey,
        row: usize,
        draft: NodeDraft,
    ) -> TreeResult<NodeKey> {
        let parent_node = self.node(parent)?;
        let parent_uuid = parent_node.uuid();
        let parent_type = parent_node.node_type();
        if !self.can_insert_child(parent, draft.node.node_type())? {
            return Err(TreeError::CannotInsertChild {
                parent: parent_uuid,
                parent_type,
                child_type: draft.node.node_type(),
            });
        }

        let mut seen = HashSet::new();
        validate_draft(parent_uuid, parent_type, &draft, &mut seen)?;
        if let Some(existing) = seen.iter().find(|id| self.by_uuid.contains_key(id)) {
            return Err(TreeError::DuplicateUuid(*existing));
        }

        let row = row.min(self.children(parent)?.len());
        Ok(self.attach_draft(parent, row, draft))
    }

    /// Detaches `child` from `parent`, frees its subtree and drops its UUIDs.
    ///
    /// Returns the detached subtree.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> TreeResult<NodeDraft> {
        let row = self.index_of_child(parent, child)?;
        if child == self.root_collection {
            return Err(TreeError::FixedNode(self.uuid(child)?));
        }
        self.slot_mut(parent)?.children.remove(row);
        self.free_subtree(child).ok_or(TreeError::StaleKey(child))
    }

    /// Position of `child` among the direct children of `parent`.
    ///
    /// # Errors
    /// - `ChildNotFound` with both identities when `child` is not a direct
    ///   child of `parent`.
    pub fn index_of_child(&self, parent: NodeKey, child: NodeKey) -> TreeResult<usize> {
        let parent_slot = self.slot(parent)?;
        parent_slot
            .children
            .iter()
            .position(|key| *key == child)
            .ok_or_else(|| TreeError::ChildNotFound {
                child: self
                    .node(child)
                    .map(Node::uuid)
                    .unwrap_or_else(|_| NodeId::nil()),
                parent: parent_slot.node.uuid(),
            })
    }

    /// Position of `key` among its siblings; the Root is at row 0.
    pub fn row_of(&self, key: NodeKey) -> TreeResult<usize> {
        match self.parent(key)? {
            Some(parent) => self.index_of_child(parent, key),
            None => Ok(0),
        }
    }

    /// Re-parents `key` under `new_parent` at `row`, keeping UUIDs and keys.
    ///
    /// `row` counts positions before the move, as a drop target does.
    pub fn move_node(&mut self, key: NodeKey, new_parent: NodeKey, row: usize) -> TreeResult<()> {
        let node = self.node(key)?;
        let node_uuid = node.uuid();
        let node_type = node.node_type();
        if key == self.root || key == self.root_collection {
            return Err(TreeError::FixedNode(node_uuid));
        }
        let parent_node = self.node(new_parent)?;
        let parent_uuid = parent_node.uuid();
        let parent_type = parent_node.node_type();
        if new_parent == key || self.is_ancestor_of(key, new_parent)? {
            return Err(TreeError::CycleDetected {
                node: node_uuid,
                parent: parent_uuid,
            });
        }
        if !self.can_insert_child(new_parent, node_type)? {
            return Err(TreeError::CannotInsertChild {
                parent: parent_uuid,
                parent_type,
                child_type: node_type,
            });
        }

        let old_parent = self.parent(key)?.ok_or(TreeError::FixedNode(node_uuid))?;
        let old_row = self.index_of_child(old_parent, key)?;
        let mut row = row.min(self.children(new_parent)?.len());
        if old_parent == new_parent && old_row < row {
            row -= 1;
        }

        self.slot_mut(old_parent)?.children.remove(old_row);
        self.slot_mut(new_parent)?.children.insert(row, key);
        self.slot_mut(key)?.parent = Some(new_parent);
        Ok(())
    }

    /// Whether `ancestor` lies on the parent chain of `key`.
    pub fn is_ancestor_of(&self, ancestor: NodeKey, key: NodeKey) -> TreeResult<bool> {
        let mut current = self.parent(key)?;
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            current = self.parent(parent)?;
        }
        Ok(false)
    }

    /// Parent chain of `key`, nearest first.
    pub fn ancestors(&self, key: NodeKey) -> TreeResult<Vec<NodeKey>> {
        let mut result = Vec::new();
        let mut current = self.parent(key)?;
        while let Some(parent) = current {
            result.push(parent);
            current = self.parent(parent)?;
        }
        Ok(result)
    }

    /// Number of nodes transitively owned by `key`.
    pub fn descendant_count(&self, key: NodeKey) -> TreeResult<usize> {
        Ok(self.preorder(key)?.len() - 1)
    }

    /// `key` followed by all its descendants in display order.
    pub fn preorder(&self, key: NodeKey) -> TreeResult<Vec<NodeKey>> {
        let mut result = Vec::new();
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let slot = self.slot(current)?;
            result.push(current);
            stack.extend(slot.children.iter().rev().copied());
        }
        Ok(result)
    }

    /// Slash-separated names from the root collection down to `key`.
    pub fn path(&self, key: NodeKey) -> TreeResult<String> {
        let mut names = vec![self.node(key)?.name().to_string()];
        for ancestor in self.ancestors(key)? {
            if ancestor == self.root {
                break;
            }
            names.push(self.node(ancestor)?.name().to_string());
        }
        names.reverse();
        Ok(names.join("/"))
    }

    /// `prefix`, or `"prefix #N"` with the smallest N unused among children.
    pub fn unused_child_name(&self, parent: NodeKey, prefix: &str) -> TreeResult<String> {
        let taken = self
            .children(parent)?
            .iter()
            .map(|child| self.node(*child).map(|node| node.name()))
            .collect::<TreeResult<HashSet<_>>>()?;
        let mut candidate = prefix.to_string();
        let mut counter = 1usize;
        while taken.contains(candidate.as_str()) {
            candidate = format!("{prefix} #{counter}");
            counter += 1;
        }
        Ok(candidate)
    }

    /// Owned copy of the subtree rooted at `key`.
    pub fn to_draft(&self, key: NodeKey) -> TreeResult<NodeDraft> {
        let slot = self.slot(key)?;
        let children = slot
            .children
            .iter()
            .map(|child| self.to_draft(*child))
            .collect::<TreeResult<Vec<_>>>()?;
        Ok(NodeDraft::with_children(slot.node.clone(), children))
    }

    /// Every live node in display order, Root first.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> + '_ {
        self.preorder(self.root)
            .unwrap_or_default()
            .into_iter()
            .filter_map(move |key| self.node(key).ok().map(|node| (key, node)))
    }

    fn slot(&self, key: NodeKey) -> TreeResult<&Slot> {
        self.entries
            .get(key.index as usize)
            .filter(|entry| entry.generation == key.generation)
            .and_then(|entry| entry.slot.as_ref())
            .ok_or(TreeError::StaleKey(key))
    }

    fn slot_mut(&mut self, key: NodeKey) -> TreeResult<&mut Slot> {
        self.entries
            .get_mut(key.index as usize)
            .filter(|entry| entry.generation == key.generation)
            .and_then(|entry| entry.slot.as_mut())
            .ok_or(TreeError::StaleKey(key))
    }

    fn allocate(&mut self, node: Node, parent: NodeKey) -> NodeKey {
        let uuid = node.uuid();
        let slot = Slot {
            node,
            parent: Some(parent),
            children: Vec::new(),
        };
        let key = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.slot = Some(slot);
                NodeKey {
                    index,
                    generation: entry.generation,
                }
            }
            None => {
                let index = self.entries.len() as u32;
                self.entries.push(Entry {
                    generation: 0,
                    slot: Some(slot),
                });
                NodeKey {
                    index,
                    generation: 0,
                }
            }
        };
        self.by_uuid.insert(uuid, key);
        key
    }

    // Callers validate the draft first.
    fn attach_draft(&mut self, parent: NodeKey, row: usize, draft: NodeDraft) -> NodeKey {
        let NodeDraft { node, children } = draft;
        let key = self.allocate(node, parent);
        if let Ok(slot) = self.slot_mut(parent) {
            slot.children.insert(row, key);
        }
        for (index, child) in children.into_iter().enumerate() {
            self.attach_draft(key, index, child);
        }
        key
    }

    fn free_subtree(&mut self, key: NodeKey) -> Option<NodeDraft> {
        let entry = self
            .entries
            .get_mut(key.index as usize)
            .filter(|entry| entry.generation == key.generation)?;
        let slot = entry.slot.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(key.index);
        self.by_uuid.remove(&slot.node.uuid());

        let children = slot
            .children
            .into_iter()
            .filter_map(|child| self.free_subtree(child))
            .collect();
        Some(NodeDraft::with_children(slot.node, children))
    }
}

fn validate_draft(
    parent: NodeId,
    parent_type: NodeType,
    draft: &NodeDraft,
    seen: &mut HashSet<NodeId>,
) -> TreeResult<()> {
    let node_type = draft.node.node_type();
    if !parent_type.accepts_child(node_type) {
        return Err(TreeError::CannotInsertChild {
            parent,
            parent_type,
            child_type: node_type,
        });
    }
    let uuid = draft.node.uuid();
    if !seen.insert(uuid) {
        return Err(TreeError::DuplicateUuid(uuid));
    }
    for child in &draft.children {
        validate_draft(uuid, node_type, child, seen)?;
    }
    Ok(())
}
