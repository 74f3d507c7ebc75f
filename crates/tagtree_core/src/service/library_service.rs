//! Tag library facade.
//!
//! # Responsibility
//! - Own one library tree and its metadata.
//! - Expose UUID-addressed create, delete, link, change and move operations.
//! - Persist the library with version stamping and optional backups.
//! - Notify subscribers about structural and content changes.
//!
//! # Invariants
//! - Every operation validates before mutating; on error nothing changed.
//! - Persistent mutations stamp the node with the upcoming library version.
//! - The root collection cannot be renamed, deleted or moved.
//! - Link targets are never the Root, a Link or an ancestor of the link;
//!   both `link` and `move_node` keep it that way.

use crate::format::codec::{document_from_bytes, document_to_bytes};
use crate::format::{decode_document, encode_document, LibraryMetadata};
use crate::model::icon::IconRef;
use crate::model::link::{self, LinkResolution, ResolveError};
use crate::model::node::{Node, NodeError, NodeId, NodeType};
use crate::model::settings::LibraryOptions;
use crate::model::tag::{node_tags, without_duplicates};
use crate::model::tree::{NodeKey, Tree, TreeError};
use crate::repo::library_file::{
    count_backups, create_backup, read_library_file, write_library_file,
};
use crate::service::describe::{self, RichText};
use crate::service::drag;
use crate::service::error::{
    checked_tree, ChangeError, LibraryError, LibraryResult, LinkError, MoveError,
};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Instant;
use uuid::Uuid;

/// Change notification for collaborators holding node UUIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    NodeInserted {
        parent: NodeId,
        node: NodeId,
        row: usize,
    },
    /// `node` and `descendants` nodes below it are gone.
    NodeRemoved {
        parent: NodeId,
        node: NodeId,
        descendants: usize,
    },
    NodeRenamed {
        node: NodeId,
    },
    NodeRelinked {
        node: NodeId,
        target: Option<NodeId>,
    },
    /// Comment, icon, tags, hidden or active state changed.
    NodeChanged {
        node: NodeId,
    },
    NodeMoved {
        node: NodeId,
        old_parent: NodeId,
        new_parent: NodeId,
        row: usize,
    },
    /// Whole tree replaced by a load.
    LibraryReset,
}

/// Collaborator-facing summary of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub uuid: NodeId,
    pub display_name: String,
    /// Resolved tag values.
    pub tags: Vec<String>,
    pub icons: Vec<IconRef>,
    pub node_type: NodeType,
    pub is_linking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub descendants: usize,
    /// UUIDs of the deleted node and its descendants, pre-order.
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub version: i64,
    /// Backups of the file that existed before this save.
    pub backups_found: usize,
    pub backup_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub format_version: i64,
    pub application: String,
    /// Findings of [`Library::verify`] on the loaded tree.
    pub problems: Vec<String>,
}

/// One tag library owned by a single caller.
#[derive(Debug)]
pub struct Library {
    /// Identifies this in-memory instance in drag payloads; not persisted.
    instance: Uuid,
    tree: Tree,
    metadata: LibraryMetadata,
    next_version: i64,
    options: LibraryOptions,
    subscribers: Vec<Sender<LibraryEvent>>,
}

impl Default for Library {
    fn default() -> Self {
        Self::new(LibraryOptions::default())
    }
}

impl Library {
    /// Creates an empty library with a main collection.
    pub fn new(options: LibraryOptions) -> Self {
        let metadata = LibraryMetadata::fresh();
        Self {
            instance: Uuid::new_v4(),
            tree: Tree::new(),
            next_version: metadata.version + 1,
            metadata,
            options,
            subscribers: Vec::new(),
        }
    }

    pub fn instance(&self) -> Uuid {
        self.instance
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn metadata(&self) -> &LibraryMetadata {
        &self.metadata
    }

    /// Version the next save will write.
    pub fn next_version(&self) -> i64 {
        self.next_version
    }

    pub fn options(&self) -> LibraryOptions {
        self.options
    }

    pub fn set_options(&mut self, options: LibraryOptions) {
        self.options = options;
    }

    pub fn root_collection(&self) -> NodeId {
        self.node_uuid(self.tree.root_collection())
    }

    /// Receives every event emitted after this call.
    pub fn subscribe(&mut self) -> Receiver<LibraryEvent> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Arena key of `uuid`.
    ///
    /// # Errors
    /// - `NoNodeWithUuid` when the UUID is not part of this library.
    pub fn find_by_uuid(&self, uuid: NodeId) -> LibraryResult<NodeKey> {
        self.tree
            .find(uuid)
            .ok_or(LibraryError::NoNodeWithUuid(uuid))
    }

    pub fn node(&self, uuid: NodeId) -> LibraryResult<&Node> {
        let key = self.find_by_uuid(uuid)?;
        self.tree.node(key).map_err(|_| LibraryError::NoNodeWithUuid(uuid))
    }

    /// UUIDs of the direct children of `uuid`.
    pub fn children(&self, uuid: NodeId) -> LibraryResult<Vec<NodeId>> {
        let key = self.find_by_uuid(uuid)?;
        let children = self
            .tree
            .children(key)
            .map_err(|_| LibraryError::NoNodeWithUuid(uuid))?;
        Ok(children.iter().map(|child| self.node_uuid(*child)).collect())
    }

    /// Appends a default-named node of `node_type` under `parent`.
    pub fn create_child(&mut self, parent: NodeId, node_type: NodeType) -> LibraryResult<NodeId> {
        let parent_key = self.find_by_uuid(parent)?;
        let create_failed = |cause: TreeError| LibraryError::CreateFailed {
            parent,
            node_type,
            cause: checked_tree(cause),
        };

        let mut node = Node::new(node_type);
        let name = match node_type {
            NodeType::Link => String::new(),
            _ => self
                .tree
                .unused_child_name(parent_key, node_type.default_name())
                .map_err(create_failed)?,
        };
        node.set_name(name);
        node.set_last_change_version(Some(self.next_version));
        let uuid = node.uuid();

        let key = self
            .tree
            .append_child(parent_key, node)
            .map_err(create_failed)?;
        let row = self.tree.row_of(key).map_err(create_failed)?;
        info!(
            "event=node_create module=library status=ok node_type={} row={}",
            node_type.label(),
            row
        );
        self.emit(LibraryEvent::NodeInserted {
            parent,
            node: uuid,
            row,
        });
        Ok(uuid)
    }

    /// Number of nodes that [`Library::delete`] would remove besides `uuid`.
    pub fn descendant_count(&self, uuid: NodeId) -> LibraryResult<usize> {
        let key = self.find_by_uuid(uuid)?;
        self.tree
            .descendant_count(key)
            .map_err(|cause| LibraryError::DeleteFailed {
                node: uuid,
                cause: checked_tree(cause),
            })
    }

    /// Removes `uuid` and its subtree.
    pub fn delete(&mut self, uuid: NodeId) -> LibraryResult<DeleteReport> {
        let key = self.find_by_uuid(uuid)?;
        let delete_failed = |cause: TreeError| LibraryError::DeleteFailed {
            node: uuid,
            cause: checked_tree(cause),
        };

        let descendants = self.tree.descendant_count(key).map_err(delete_failed)?;
        let parent = self
            .tree
            .parent(key)
            .map_err(delete_failed)?
            .ok_or(TreeError::FixedNode(uuid))
            .map_err(delete_failed)?;
        let parent_uuid = self.node_uuid(parent);
        let removed = self
            .tree
            .remove_child(parent, key)
            .map_err(delete_failed)?;

        info!(
            "event=node_delete module=library status=ok descendants={}",
            descendants
        );
        self.emit(LibraryEvent::NodeRemoved {
            parent: parent_uuid,
            node: uuid,
            descendants,
        });
        Ok(DeleteReport {
            descendants,
            removed: removed.uuids(),
        })
    }

    /// Points link `source` at `target`.
    pub fn link(&mut self, source: NodeId, target: NodeId) -> LibraryResult<()> {
        let source_key = self.find_by_uuid(source)?;
        let link_failed = |cause: LinkError| LibraryError::LinkFailed {
            source,
            target: Some(target),
            cause,
        };

        let source_node = self.tree_node(source_key)?;
        if !source_node.is_linking() {
            return Err(link_failed(LinkError::NotALink(source_node.node_type())));
        }
        let target_key = self
            .tree
            .find(target)
            .ok_or(LinkError::TargetNotFound(target))
            .map_err(link_failed)?;
        let target_type = self.tree_node(target_key)?.node_type();
        if matches!(target_type, NodeType::Root | NodeType::Link) {
            return Err(link_failed(LinkError::InvalidTargetType(target_type)));
        }
        if self
            .tree
            .is_ancestor_of(target_key, source_key)
            .map_err(invariant)?
        {
            return Err(link_failed(LinkError::TargetIsAncestor(target)));
        }

        let version = self.next_version;
        let node = self.tree_node_mut(source_key)?;
        node.set_link_target(Some(target))
            .map_err(|err| link_failed(err.into()))?;
        node.set_last_change_version(Some(version));
        info!("event=node_link module=library status=ok");
        self.emit(LibraryEvent::NodeRelinked {
            node: source,
            target: Some(target),
        });
        Ok(())
    }

    /// Clears the target of link `source`.
    pub fn unlink(&mut self, source: NodeId) -> LibraryResult<()> {
        let source_key = self.find_by_uuid(source)?;
        let unlink_failed = |cause: LinkError| LibraryError::LinkFailed {
            source,
            target: None,
            cause,
        };
        let node_type = self.tree_node(source_key)?.node_type();
        if node_type != NodeType::Link {
            return Err(unlink_failed(LinkError::NotALink(node_type)));
        }

        let version = self.next_version;
        let node = self.tree_node_mut(source_key)?;
        node.set_link_target(None)
            .map_err(|err| unlink_failed(err.into()))?;
        node.set_last_change_version(Some(version));
        info!("event=node_unlink module=library status=ok");
        self.emit(LibraryEvent::NodeRelinked {
            node: source,
            target: None,
        });
        Ok(())
    }

    /// Renames `uuid`; links accept a blank name and then show their target.
    pub fn rename(&mut self, uuid: NodeId, name: &str) -> LibraryResult<()> {
        let key = self.find_by_uuid(uuid)?;
        let change_failed = |cause: ChangeError| LibraryError::ChangeFailed {
            node: uuid,
            action: "change name",
            cause,
        };
        if key == self.tree.root() || key == self.tree.root_collection() {
            return Err(change_failed(ChangeError::FixedNode(uuid)));
        }
        let trimmed = name.trim();
        let node = self.tree_node(key)?;
        if trimmed.is_empty() && !node.is_linking() {
            return Err(change_failed(ChangeError::BlankName));
        }

        let version = self.next_version;
        let node = self.tree_node_mut(key)?;
        node.set_name(trimmed);
        node.set_last_change_version(Some(version));
        self.emit(LibraryEvent::NodeRenamed { node: uuid });
        Ok(())
    }

    pub fn set_comment(&mut self, uuid: NodeId, comment: &str) -> LibraryResult<()> {
        self.change(uuid, "change comment", true, |node| {
            if node.node_type() == NodeType::Root {
                return Err(ChangeError::Node(
                    NodeError::UnsupportedOperation {
                        operation: "set comment",
                        node_type: NodeType::Root,
                    },
                ));
            }
            node.set_comment(comment);
            Ok(())
        })
    }

    /// Sets a custom Object icon after checking that it can be read.
    pub fn set_icon(&mut self, uuid: NodeId, icon: IconRef) -> LibraryResult<()> {
        self.change(uuid, "change icon", true, |node| {
            icon.check_readable()?;
            node.set_icon(Some(icon))?;
            Ok(())
        })
    }

    /// Restores the generic icon.
    pub fn reset_icon(&mut self, uuid: NodeId) -> LibraryResult<()> {
        self.change(uuid, "reset icon", true, |node| {
            node.set_icon(None)?;
            Ok(())
        })
    }

    pub fn set_tags(&mut self, uuid: NodeId, tags: Vec<String>) -> LibraryResult<()> {
        self.change(uuid, "change tags", true, |node| {
            let cleared = tags.is_empty();
            node.set_tags(tags)?;
            if cleared {
                node.set_active(false)?;
            }
            Ok(())
        })
    }

    pub fn set_hidden(&mut self, uuid: NodeId, hidden: bool) -> LibraryResult<()> {
        self.change(uuid, "change hidden state", true, |node| {
            if node.node_type() == NodeType::Root {
                return Err(ChangeError::Node(
                    NodeError::UnsupportedOperation {
                        operation: "set hidden",
                        node_type: NodeType::Root,
                    },
                ));
            }
            node.set_hidden(hidden);
            Ok(())
        })
    }

    /// Sets the runtime active flag; activation needs resolved tags.
    pub fn set_active(&mut self, uuid: NodeId, active: bool) -> LibraryResult<()> {
        let key = self.find_by_uuid(uuid)?;
        let has_tags = !node_tags(&self.tree, key)?.is_empty();
        self.change(uuid, "change active state", false, |node| {
            if node.active().is_some() && active && !has_tags {
                return Err(ChangeError::Node(
                    NodeError::NoTags(uuid),
                ));
            }
            node.set_active(active)?;
            Ok(())
        })
    }

    /// Activates exactly the nodes whose resolved tags intersect `tags`.
    ///
    /// Returns the number of active nodes.
    pub fn set_tags_active(&mut self, tags: &[String]) -> LibraryResult<usize> {
        let wanted: HashSet<&str> = tags.iter().map(String::as_str).collect();
        let mut updates = Vec::new();
        for (key, node) in self.tree.iter() {
            let Some(current) = node.active() else {
                continue;
            };
            let active = node_tags(&self.tree, key)?
                .iter()
                .any(|tag| wanted.contains(tag.resolved.as_str()));
            if active != current {
                updates.push((key, node.uuid(), active));
            }
        }

        for (key, uuid, active) in &updates {
            self.tree_node_mut(*key)?
                .set_active(*active)
                .map_err(|err| LibraryError::ChangeFailed {
                    node: *uuid,
                    action: "change active state",
                    cause: err.into(),
                })?;
        }
        for (_, uuid, _) in updates {
            self.emit(LibraryEvent::NodeChanged { node: uuid });
        }
        Ok(self
            .tree
            .iter()
            .filter(|(_, node)| node.active() == Some(true))
            .count())
    }

    /// Resolved tags of every active node, without duplicates.
    pub fn active_tags(&self) -> LibraryResult<Vec<String>> {
        let mut result = Vec::new();
        for (key, node) in self.tree.iter() {
            if node.active() == Some(true) {
                result.extend(node_tags(&self.tree, key)?.into_iter().map(|tag| tag.resolved));
            }
        }
        Ok(without_duplicates(&result))
    }

    /// Every resolved tag in tree order, without duplicates.
    pub fn all_tags(&self) -> LibraryResult<Vec<String>> {
        let mut result = Vec::new();
        for (key, _) in self.tree.iter() {
            result.extend(node_tags(&self.tree, key)?.into_iter().map(|tag| tag.resolved));
        }
        Ok(without_duplicates(&result))
    }

    /// Moves `uuid` under `new_parent` at `row`, keeping its subtree.
    pub fn move_node(&mut self, uuid: NodeId, new_parent: NodeId, row: usize) -> LibraryResult<()> {
        let key = self.find_by_uuid(uuid)?;
        let parent_key = self.find_by_uuid(new_parent)?;
        let move_failed = |cause: TreeError| LibraryError::MoveFailed {
            node: Some(uuid),
            parent: new_parent,
            cause: MoveError::Tree(checked_tree(cause)),
        };

        let old_parent = self
            .tree
            .parent(key)
            .map_err(move_failed)?
            .map(|parent| self.node_uuid(parent))
            .unwrap_or_else(Uuid::nil);
        let cyclic =
            key == parent_key || self.tree.is_ancestor_of(key, parent_key).map_err(invariant)?;
        if !cyclic {
            if let Some((link, target)) = self.link_nested_by_move(key, parent_key)? {
                return Err(LibraryError::MoveFailed {
                    node: Some(uuid),
                    parent: new_parent,
                    cause: MoveError::WouldNestLinkTarget { link, target },
                });
            }
        }
        self.tree
            .move_node(key, parent_key, row)
            .map_err(move_failed)?;
        let row = self.tree.row_of(key).map_err(move_failed)?;
        let version = self.next_version;
        self.tree_node_mut(key)?
            .set_last_change_version(Some(version));

        info!("event=node_move module=library status=ok row={}", row);
        self.emit(LibraryEvent::NodeMoved {
            node: uuid,
            old_parent,
            new_parent,
            row,
        });
        Ok(())
    }

    /// Encodes a drag payload for the selected nodes.
    pub fn drag_payload(&self, selection: &[NodeId]) -> LibraryResult<Vec<u8>> {
        let keys = selection
            .iter()
            .map(|uuid| self.find_by_uuid(*uuid))
            .collect::<LibraryResult<Vec<_>>>()?;
        Ok(drag::encode_payload(&self.tree, &keys, self.instance)?)
    }

    /// Moves the node referenced by `payload` under `parent` at `row`.
    ///
    /// Only payloads dragged from this instance can be dropped, even when
    /// another instance holds a copy of the same file.
    pub fn drop_payload(
        &mut self,
        parent: NodeId,
        row: usize,
        payload: &[u8],
    ) -> LibraryResult<NodeId> {
        self.find_by_uuid(parent)?;
        let dragged = drag::decode_payload(payload).map_err(|err| LibraryError::MoveFailed {
            node: None,
            parent,
            cause: MoveError::Drag(err),
        })?;
        if dragged.source_instance != self.instance || self.tree.find(dragged.uuid).is_none() {
            return Err(LibraryError::MoveFailed {
                node: Some(dragged.uuid),
                parent,
                cause: MoveError::NotInLibrary(dragged.uuid),
            });
        }
        self.move_node(dragged.uuid, parent, row)?;
        Ok(dragged.uuid)
    }

    /// Display data for collaborators.
    pub fn lookup(&self, uuid: NodeId) -> LibraryResult<NodeSummary> {
        let key = self.find_by_uuid(uuid)?;
        let node = self.tree_node(key)?;
        Ok(NodeSummary {
            uuid,
            display_name: link::display_name(&self.tree, key)?,
            tags: node_tags(&self.tree, key)?
                .into_iter()
                .map(|tag| tag.resolved)
                .collect(),
            icons: link::icons(&self.tree, key)?,
            node_type: node.node_type(),
            is_linking: node.is_linking(),
        })
    }

    /// Description for info panels; see [`describe::describe`].
    pub fn describe(&self, uuid: NodeId) -> LibraryResult<RichText> {
        describe::describe(self, uuid)
    }

    /// Consistency findings: duplicate UUIDs, duplicate resolved tags and
    /// links with invalid targets.
    pub fn verify(&self) -> LibraryResult<Vec<String>> {
        let mut problems = Vec::new();
        let mut uuids = HashSet::new();
        let mut tag_owners: HashMap<String, NodeId> = HashMap::new();

        for (key, node) in self.tree.iter() {
            if !uuids.insert(node.uuid()) {
                problems.push(format!("UUID occurs more than once: {}", node.uuid()));
            }
            if !node.is_linking() {
                for tag in node_tags(&self.tree, key)? {
                    if let Some(owner) = tag_owners.insert(tag.resolved.clone(), node.uuid()) {
                        if owner != node.uuid() {
                            problems.push(format!(
                                "Tag (resolved) occurs more than once: {}",
                                tag.resolved
                            ));
                        }
                    }
                }
            }
            if node.is_linking() {
                if let LinkResolution::Invalid { target, .. } = link::resolve(&self.tree, key)? {
                    problems.push(format!(
                        "Link {} has an invalid target: {}",
                        node.uuid(),
                        target
                    ));
                }
            }
        }
        Ok(problems)
    }

    /// Writes the library to `path` as the next version.
    ///
    /// The primary file is written atomically before any backup is made;
    /// a failed backup is logged and does not fail the save.
    pub fn save(&mut self, path: &Path) -> LibraryResult<SaveReport> {
        let started_at = Instant::now();
        let metadata = LibraryMetadata {
            library_uuid: self.metadata.library_uuid,
            version: self.next_version,
            version_uuid: Uuid::new_v4(),
        };
        let format_failed = |cause| LibraryError::Format {
            path: path.to_path_buf(),
            cause,
        };
        let document = encode_document(&self.tree, &metadata).map_err(format_failed)?;
        let bytes = document_to_bytes(&document).map_err(format_failed)?;

        let backups_found = count_backups(path).unwrap_or_else(|err| {
            warn!(
                "event=library_backup module=library status=warn reason=count_failed error={}",
                err
            );
            0
        });
        write_library_file(path, &bytes)?;

        self.metadata = metadata;
        self.next_version = metadata.version + 1;

        let backup_path = if self.options.backup_on_any_change {
            match create_backup(path) {
                Ok(backup) => Some(backup),
                Err(err) => {
                    warn!(
                        "event=library_backup module=library status=warn reason=copy_failed error={}",
                        err
                    );
                    None
                }
            }
        } else {
            None
        };

        info!(
            "event=library_save module=library status=ok duration_ms={} version={} backups_found={}",
            started_at.elapsed().as_millis(),
            metadata.version,
            backups_found
        );
        Ok(SaveReport {
            version: metadata.version,
            backups_found,
            backup_path,
        })
    }

    /// Replaces the library with the content of `path`.
    ///
    /// On any error the current library is kept unchanged.
    pub fn load(&mut self, path: &Path) -> LibraryResult<LoadReport> {
        let started_at = Instant::now();
        let format_failed = |cause| LibraryError::Format {
            path: path.to_path_buf(),
            cause,
        };
        let bytes = read_library_file(path)?;
        let document = document_from_bytes(&bytes).map_err(format_failed)?;
        let decoded = decode_document(document).map_err(|cause| {
            warn!(
                "event=library_load module=library status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                cause
            );
            format_failed(cause)
        })?;

        self.tree = decoded.tree;
        self.metadata = decoded.metadata;
        self.next_version = decoded.metadata.version + 1;

        let problems = self.verify()?;
        for problem in &problems {
            warn!(
                "event=library_verify module=library status=warn problem={}",
                problem
            );
        }
        info!(
            "event=library_load module=library status=ok duration_ms={} format_version={} nodes={}",
            started_at.elapsed().as_millis(),
            decoded.format_version,
            self.tree.len()
        );
        self.emit(LibraryEvent::LibraryReset);
        Ok(LoadReport {
            format_version: decoded.format_version,
            application: decoded.application,
            problems,
        })
    }

    fn change(
        &mut self,
        uuid: NodeId,
        action: &'static str,
        persistent: bool,
        apply: impl FnOnce(&mut Node) -> Result<(), ChangeError>,
    ) -> LibraryResult<()> {
        let key = self.find_by_uuid(uuid)?;
        let version = self.next_version;
        let node = self.tree_node_mut(key)?;
        apply(node).map_err(|cause| LibraryError::ChangeFailed {
            node: uuid,
            action,
            cause,
        })?;
        if persistent {
            node.set_last_change_version(Some(version));
        }
        self.emit(LibraryEvent::NodeChanged { node: uuid });
        Ok(())
    }

    /// First link under `key` whose target would become its ancestor once
    /// `key` is moved below `new_parent`.
    fn link_nested_by_move(
        &self,
        key: NodeKey,
        new_parent: NodeKey,
    ) -> LibraryResult<Option<(NodeId, NodeId)>> {
        for current in self.tree.preorder(key).map_err(invariant)? {
            if !self.tree_node(current)?.is_linking() {
                continue;
            }
            if let LinkResolution::Resolved(target) = link::resolve(&self.tree, current)? {
                if target == new_parent
                    || self.tree.is_ancestor_of(target, new_parent).map_err(invariant)?
                {
                    return Ok(Some((self.node_uuid(current), self.node_uuid(target))));
                }
            }
        }
        Ok(None)
    }

    fn emit(&mut self, event: LibraryEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn tree_node(&self, key: NodeKey) -> LibraryResult<&Node> {
        self.tree.node(key).map_err(invariant)
    }

    fn tree_node_mut(&mut self, key: NodeKey) -> LibraryResult<&mut Node> {
        self.tree.node_mut(key).map_err(invariant)
    }

    fn node_uuid(&self, key: NodeKey) -> NodeId {
        self.tree.uuid(key).unwrap_or_else(|_| Uuid::nil())
    }
}

// Stale keys obtained from the UUID index are a tree invariant violation.
fn invariant(err: TreeError) -> LibraryError {
    LibraryError::from(ResolveError::from(err))
}
