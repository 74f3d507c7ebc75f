//! Library document codec.
//!
//! # Responsibility
//! - Map a live tree to the persisted document and back.
//! - Validate top-level keys before any node is decoded.
//!
//! # Invariants
//! - Top-level checks run in a fixed order: format version, application key,
//!   root presence, library metadata. Node decoding starts only afterwards.
//! - Node checks run in a fixed order: map shape, `type`, `uuid`,
//!   discriminant, shared fields, variant fields, `children`.
//! - Encoding always writes [`FORMAT_VERSION`].
//! - Unknown keys are logged and ignored, never defaulted into data.

use crate::format::value::{from_bytes, to_bytes, Map, Value, ValueKind};
use crate::model::icon::IconRef;
use crate::model::node::{Node, NodeError, NodeId, NodeKind, NodeType};
use crate::model::tree::{NodeDraft, NodeKey, Tree, TreeError};
use log::warn;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Version written by the encoder.
pub const FORMAT_VERSION: i64 = 2;
/// Versions accepted by the decoder.
pub const SUPPORTED_FORMAT_VERSIONS: &[i64] = &[1, 2];
/// Producer identifier stored under `application`.
pub const APPLICATION: &str = "TAGTREE";
/// Highest library version a document may carry; the facade stamps
/// `version + 1` on the next change.
pub const MAX_LIBRARY_VERSION: i64 = i64::MAX - 1;

/// Document keys.
pub mod keys {
    pub const FORMAT_VERSION: &str = "format_version";
    pub const APPLICATION: &str = "application";
    pub const ROOT: &str = "root";
    pub const LIBRARY_UUID: &str = "library_uuid";
    pub const LIBRARY_VERSION: &str = "library_version";
    pub const LIBRARY_VERSION_UUID: &str = "library_version_uuid";

    pub const TYPE: &str = "type";
    pub const UUID: &str = "uuid";
    pub const NAME: &str = "name";
    pub const COMMENT: &str = "comment";
    pub const HIDDEN: &str = "hidden";
    pub const LAST_CHANGE_VERSION: &str = "last_change_version";
    pub const ICON: &str = "icon";
    pub const TAGS: &str = "tags";
    pub const TARGET: &str = "target";
    pub const CHILDREN: &str = "children";
}

pub type FormatResult<T> = Result<T, FormatError>;

/// Document decoding and encoding errors.
///
/// `found: None` means the key is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Bytes are not a value document.
    Malformed(String),
    ContentNotMap(ValueKind),
    MissingFormatVersion,
    FormatVersionNotInteger(Value),
    UnknownFormatVersion(i64),
    ApplicationKeyMissing,
    ApplicationKeyNotString(ValueKind),
    RootNodeMissing,
    LibraryUuidMissing,
    LibraryUuidNotByteArray(ValueKind),
    LibraryVersionMissing,
    LibraryVersionNotInteger(ValueKind),
    /// Negative or above [`MAX_LIBRARY_VERSION`].
    LibraryVersionOutOfRange(i64),
    LibraryVersionUuidMissing,
    LibraryVersionUuidNotByteArray(ValueKind),
    ExpectedRootNode(NodeType),
    RootChildCount(usize),
    RootChildNotCollection(NodeType),
    NodeNotMap(ValueKind),
    NodeHasNoTypeKey,
    NodeTypeNotInteger(ValueKind),
    UuidNotByteArray(Option<ValueKind>),
    UuidWrongLength(usize),
    UnknownNodeType { uuid: NodeId, discriminant: i64 },
    DuplicateUuid(NodeId),
    NameNotString { uuid: NodeId, found: Option<ValueKind> },
    CommentNotString { uuid: NodeId, found: ValueKind },
    HiddenNotBool { uuid: NodeId, found: ValueKind },
    LastChangeVersionNotInteger { uuid: NodeId, found: ValueKind },
    IconNotString { uuid: NodeId, found: ValueKind },
    TagsNotArray { uuid: NodeId, found: ValueKind },
    TagNotString { uuid: NodeId, found: ValueKind },
    EmptyTag(NodeId),
    TargetNotByteArray { uuid: NodeId, found: Option<ValueKind> },
    MissingChildrenKey(NodeId),
    InvalidChildrenType { uuid: NodeId, found: ValueKind },
    InvalidChild {
        parent: NodeId,
        parent_type: NodeType,
        child_type: NodeType,
    },
    Tree(TreeError),
}

fn found_label(found: &Option<ValueKind>) -> String {
    found.map_or_else(|| "missing".to_string(), |kind| kind.to_string())
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(detail) => write!(f, "content is not a valid document: {detail}"),
            Self::ContentNotMap(kind) => write!(f, "content is not a map but {kind}"),
            Self::MissingFormatVersion => write!(f, "missing format version"),
            Self::FormatVersionNotInteger(value) => write!(
                f,
                "format version is not an integer, but {} ({value:?})",
                value.kind()
            ),
            Self::UnknownFormatVersion(version) => write!(f, "unknown format version: {version}"),
            Self::ApplicationKeyMissing => write!(f, "application key doesn't exist"),
            Self::ApplicationKeyNotString(kind) => {
                write!(f, "application key is not a string but {kind}")
            }
            Self::RootNodeMissing => write!(f, "root node not found"),
            Self::LibraryUuidMissing => write!(f, "library UUID key doesn't exist"),
            Self::LibraryUuidNotByteArray(kind) => {
                write!(f, "library UUID is not a byte array but {kind}")
            }
            Self::LibraryVersionMissing => write!(f, "library version key doesn't exist"),
            Self::LibraryVersionNotInteger(kind) => {
                write!(f, "library version is not an integer but {kind}")
            }
            Self::LibraryVersionOutOfRange(version) => write!(
                f,
                "library version {version} is outside 0..={MAX_LIBRARY_VERSION}"
            ),
            Self::LibraryVersionUuidMissing => write!(f, "library version UUID key doesn't exist"),
            Self::LibraryVersionUuidNotByteArray(kind) => {
                write!(f, "library version UUID is not a byte array but {kind}")
            }
            Self::ExpectedRootNode(node_type) => write!(
                f,
                "invalid type of root node, expected Root but got {node_type}"
            ),
            Self::RootChildCount(count) => {
                write!(f, "root node must own exactly one collection, found {count} children")
            }
            Self::RootChildNotCollection(node_type) => write!(
                f,
                "root child must be a collection but is {node_type}"
            ),
            Self::NodeNotMap(kind) => write!(f, "node is not a map but {kind}"),
            Self::NodeHasNoTypeKey => write!(f, "node has no type key"),
            Self::NodeTypeNotInteger(kind) => write!(f, "node type is not an integer but {kind}"),
            Self::UuidNotByteArray(found) => {
                write!(f, "node UUID is not a byte array but {}", found_label(found))
            }
            Self::UuidWrongLength(len) => {
                write!(f, "UUID must be 16 bytes long, got {len}")
            }
            Self::UnknownNodeType { uuid, discriminant } => {
                write!(f, "unknown node type {discriminant} for node {uuid}")
            }
            Self::DuplicateUuid(uuid) => write!(f, "UUID occurs more than once: {uuid}"),
            Self::NameNotString { uuid, found } => write!(
                f,
                "name element of node {uuid} is not a string but {}",
                found_label(found)
            ),
            Self::CommentNotString { uuid, found } => {
                write!(f, "comment element of node {uuid} is not a string but {found}")
            }
            Self::HiddenNotBool { uuid, found } => {
                write!(f, "hidden element of node {uuid} is not a bool but {found}")
            }
            Self::LastChangeVersionNotInteger { uuid, found } => write!(
                f,
                "last change version of node {uuid} is not an integer but {found}"
            ),
            Self::IconNotString { uuid, found } => {
                write!(f, "icon element of node {uuid} is not a string but {found}")
            }
            Self::TagsNotArray { uuid, found } => {
                write!(f, "tags element of node {uuid} is not an array but {found}")
            }
            Self::TagNotString { uuid, found } => {
                write!(f, "tag of node {uuid} is not a string but {found}")
            }
            Self::EmptyTag(uuid) => write!(f, "node {uuid} has an empty tag"),
            Self::TargetNotByteArray { uuid, found } => write!(
                f,
                "link target element of node {uuid} is not a byte array but {}",
                found_label(found)
            ),
            Self::MissingChildrenKey(uuid) => write!(f, "node {uuid} has no children key"),
            Self::InvalidChildrenType { uuid, found } => {
                write!(f, "children of node {uuid} are not an array but {found}")
            }
            Self::InvalidChild {
                parent,
                parent_type,
                child_type,
            } => write!(
                f,
                "node {parent} of type {parent_type} cannot hold a child of type {child_type}"
            ),
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for FormatError {
    fn from(value: TreeError) -> Self {
        match value {
            TreeError::DuplicateUuid(uuid) => Self::DuplicateUuid(uuid),
            other => Self::Tree(other),
        }
    }
}

impl From<NodeError> for FormatError {
    fn from(value: NodeError) -> Self {
        Self::Tree(TreeError::Node(value))
    }
}

impl From<bincode::Error> for FormatError {
    fn from(value: bincode::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

/// Identity and version counter of one library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryMetadata {
    pub library_uuid: Uuid,
    pub version: i64,
    pub version_uuid: Uuid,
}

impl LibraryMetadata {
    /// Metadata of a library that was never saved.
    pub fn fresh() -> Self {
        Self {
            library_uuid: Uuid::new_v4(),
            version: 0,
            version_uuid: Uuid::new_v4(),
        }
    }
}

/// Result of decoding one library document.
#[derive(Debug, Clone)]
pub struct DecodedLibrary {
    pub tree: Tree,
    pub metadata: LibraryMetadata,
    pub format_version: i64,
    pub application: String,
}

/// Encodes a whole library.
pub fn encode_document(tree: &Tree, metadata: &LibraryMetadata) -> FormatResult<Value> {
    let version = checked_library_version(metadata.version)?;
    let mut map = Map::new();
    map.insert(keys::FORMAT_VERSION, FORMAT_VERSION);
    map.insert(keys::APPLICATION, APPLICATION);
    map.insert(keys::ROOT, encode_subtree(tree, tree.root())?);
    map.insert(keys::LIBRARY_UUID, uuid_value(metadata.library_uuid));
    map.insert(keys::LIBRARY_VERSION, version);
    map.insert(keys::LIBRARY_VERSION_UUID, uuid_value(metadata.version_uuid));
    Ok(Value::Map(map))
}

/// Encodes `key` and its descendants.
pub fn encode_subtree(tree: &Tree, key: NodeKey) -> FormatResult<Value> {
    let node = tree.node(key)?;
    let mut map = encode_node(node);
    if node.node_type().is_container() {
        let children = tree
            .children(key)?
            .iter()
            .map(|child| encode_subtree(tree, *child))
            .collect::<FormatResult<Vec<_>>>()?;
        map.insert(keys::CHILDREN, Value::Array(children));
    }
    Ok(Value::Map(map))
}

/// Encodes the fields of one node, without `children`.
pub fn encode_node(node: &Node) -> Map {
    let mut map = Map::new();
    map.insert(keys::TYPE, node.node_type().discriminant());
    map.insert(keys::UUID, uuid_value(node.uuid()));
    if node.node_type() != NodeType::Root {
        map.insert(keys::NAME, node.name());
    }
    if !node.comment().is_empty() {
        map.insert(keys::COMMENT, node.comment());
    }
    map.insert(keys::HIDDEN, node.is_hidden());
    if let Some(version) = node.last_change_version() {
        map.insert(keys::LAST_CHANGE_VERSION, version);
    }
    match node.kind() {
        NodeKind::Object { icon, tags, .. } => {
            if let Some(icon) = icon {
                map.insert(keys::ICON, icon.as_str());
            }
            if !tags.is_empty() {
                map.insert(
                    keys::TAGS,
                    Value::Array(tags.iter().map(|tag| Value::from(tag.as_str())).collect()),
                );
            }
        }
        NodeKind::Link { target, .. } => {
            map.insert(keys::TARGET, uuid_value(target.unwrap_or_else(Uuid::nil)));
        }
        NodeKind::Root | NodeKind::Collection => {}
    }
    map
}

/// Decodes a whole library document.
pub fn decode_document(value: Value) -> FormatResult<DecodedLibrary> {
    let mut map = match value {
        Value::Map(map) => map,
        other => return Err(FormatError::ContentNotMap(other.kind())),
    };

    let format_version = match map.take(keys::FORMAT_VERSION) {
        None => return Err(FormatError::MissingFormatVersion),
        Some(Value::Integer(version)) => version,
        Some(other) => return Err(FormatError::FormatVersionNotInteger(other)),
    };
    if !SUPPORTED_FORMAT_VERSIONS.contains(&format_version) {
        return Err(FormatError::UnknownFormatVersion(format_version));
    }

    let application = match map.take(keys::APPLICATION) {
        None => return Err(FormatError::ApplicationKeyMissing),
        Some(Value::String(application)) => application,
        Some(other) => return Err(FormatError::ApplicationKeyNotString(other.kind())),
    };
    if application != APPLICATION {
        warn!(
            "event=document_decode module=format status=warn reason=foreign_application application={}",
            application
        );
    }

    let root = map.take(keys::ROOT).ok_or(FormatError::RootNodeMissing)?;
    let metadata = if format_version >= 2 {
        decode_metadata(&mut map)?
    } else {
        LibraryMetadata::fresh()
    };
    log_unknown_keys("document", &map);

    let tree = Tree::from_draft(decode_root(root, format_version)?)?;
    Ok(DecodedLibrary {
        tree,
        metadata,
        format_version,
        application,
    })
}

fn decode_metadata(map: &mut Map) -> FormatResult<LibraryMetadata> {
    let library_uuid = match map.take(keys::LIBRARY_UUID) {
        None => return Err(FormatError::LibraryUuidMissing),
        Some(Value::Bytes(bytes)) => uuid_from_bytes(&bytes)?,
        Some(other) => return Err(FormatError::LibraryUuidNotByteArray(other.kind())),
    };
    let version = match map.take(keys::LIBRARY_VERSION) {
        None => return Err(FormatError::LibraryVersionMissing),
        Some(Value::Integer(version)) => checked_library_version(version)?,
        Some(other) => return Err(FormatError::LibraryVersionNotInteger(other.kind())),
    };
    let version_uuid = match map.take(keys::LIBRARY_VERSION_UUID) {
        None => return Err(FormatError::LibraryVersionUuidMissing),
        Some(Value::Bytes(bytes)) => uuid_from_bytes(&bytes)?,
        Some(other) => return Err(FormatError::LibraryVersionUuidNotByteArray(other.kind())),
    };
    Ok(LibraryMetadata {
        library_uuid,
        version,
        version_uuid,
    })
}

fn checked_library_version(version: i64) -> FormatResult<i64> {
    if (0..=MAX_LIBRARY_VERSION).contains(&version) {
        Ok(version)
    } else {
        Err(FormatError::LibraryVersionOutOfRange(version))
    }
}

fn decode_root(value: Value, format_version: i64) -> FormatResult<NodeDraft> {
    let mut seen = HashSet::new();
    let root = decode_subtree(value, format_version, &mut seen)?;
    if root.node.node_type() != NodeType::Root {
        return Err(FormatError::ExpectedRootNode(root.node.node_type()));
    }
    if root.children.len() != 1 {
        return Err(FormatError::RootChildCount(root.children.len()));
    }
    if let Some(child) = root.children.first() {
        if child.node.node_type() != NodeType::Collection {
            return Err(FormatError::RootChildNotCollection(child.node.node_type()));
        }
    }
    Ok(root)
}

/// Decodes one node document and its `children`.
pub fn decode_subtree(
    value: Value,
    format_version: i64,
    seen: &mut HashSet<NodeId>,
) -> FormatResult<NodeDraft> {
    let mut map = match value {
        Value::Map(map) => map,
        other => return Err(FormatError::NodeNotMap(other.kind())),
    };
    let node = decode_node(&mut map, format_version)?;
    let uuid = node.uuid();
    if !seen.insert(uuid) {
        return Err(FormatError::DuplicateUuid(uuid));
    }

    let node_type = node.node_type();
    let mut children = Vec::new();
    if node_type.is_container() {
        let items = match map.take(keys::CHILDREN) {
            None => return Err(FormatError::MissingChildrenKey(uuid)),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(FormatError::InvalidChildrenType {
                    uuid,
                    found: other.kind(),
                })
            }
        };
        for item in items {
            let child = decode_subtree(item, format_version, seen)?;
            let child_type = child.node.node_type();
            // Root children are checked by the document decoder.
            if node_type != NodeType::Root && !node_type.accepts_child(child_type) {
                return Err(FormatError::InvalidChild {
                    parent: uuid,
                    parent_type: node_type,
                    child_type,
                });
            }
            children.push(child);
        }
    }
    log_unknown_keys("node", &map);
    Ok(NodeDraft::with_children(node, children))
}

/// Decodes the fields of one node, consuming the keys it understands.
///
/// `children` is left in `map` for the caller.
pub fn decode_node(map: &mut Map, format_version: i64) -> FormatResult<Node> {
    let discriminant = match map.take(keys::TYPE) {
        None => return Err(FormatError::NodeHasNoTypeKey),
        Some(Value::Integer(discriminant)) => discriminant,
        Some(other) => return Err(FormatError::NodeTypeNotInteger(other.kind())),
    };
    let uuid = match map.take(keys::UUID) {
        Some(Value::Bytes(bytes)) => uuid_from_bytes(&bytes)?,
        other => return Err(FormatError::UuidNotByteArray(other.map(|value| value.kind()))),
    };
    let node_type = NodeType::from_discriminant(discriminant)
        .ok_or(FormatError::UnknownNodeType { uuid, discriminant })?;
    let mut node = Node::with_id(uuid, node_type);

    match map.take(keys::NAME) {
        Some(Value::String(name)) => node.set_name(name),
        None if node_type == NodeType::Root => {}
        other => {
            return Err(FormatError::NameNotString {
                uuid,
                found: other.map(|value| value.kind()),
            })
        }
    }
    match map.take(keys::COMMENT) {
        None => {}
        Some(Value::String(comment)) => node.set_comment(comment),
        Some(other) => {
            return Err(FormatError::CommentNotString {
                uuid,
                found: other.kind(),
            })
        }
    }
    if format_version >= 2 {
        match map.take(keys::HIDDEN) {
            None => {}
            Some(Value::Bool(hidden)) => node.set_hidden(hidden),
            Some(other) => {
                return Err(FormatError::HiddenNotBool {
                    uuid,
                    found: other.kind(),
                })
            }
        }
        match map.take(keys::LAST_CHANGE_VERSION) {
            None => {}
            Some(Value::Integer(version)) => node.set_last_change_version(Some(version)),
            Some(other) => {
                return Err(FormatError::LastChangeVersionNotInteger {
                    uuid,
                    found: other.kind(),
                })
            }
        }
    }

    match node_type {
        NodeType::Object => decode_object_fields(map, &mut node)?,
        NodeType::Link => {
            let target = match map.take(keys::TARGET) {
                Some(Value::Bytes(bytes)) if bytes.is_empty() => None,
                Some(Value::Bytes(bytes)) => Some(uuid_from_bytes(&bytes)?),
                other => {
                    return Err(FormatError::TargetNotByteArray {
                        uuid,
                        found: other.map(|value| value.kind()),
                    })
                }
            };
            node.set_link_target(target)?;
        }
        NodeType::Root | NodeType::Collection => {}
    }
    Ok(node)
}

fn decode_object_fields(map: &mut Map, node: &mut Node) -> FormatResult<()> {
    let uuid = node.uuid();
    match map.take(keys::ICON) {
        None => {}
        Some(Value::String(icon)) if icon.is_empty() => {}
        Some(Value::String(icon)) => node.set_icon(Some(IconRef::new(icon)))?,
        Some(other) => {
            return Err(FormatError::IconNotString {
                uuid,
                found: other.kind(),
            })
        }
    }
    let items = match map.take(keys::TAGS) {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(FormatError::TagsNotArray {
                uuid,
                found: other.kind(),
            })
        }
    };
    let mut tags = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(tag) if tag.is_empty() => return Err(FormatError::EmptyTag(uuid)),
            Value::String(tag) => tags.push(tag),
            other => {
                return Err(FormatError::TagNotString {
                    uuid,
                    found: other.kind(),
                })
            }
        }
    }
    node.set_tags(tags)?;
    Ok(())
}

/// Encodes a document to bytes.
pub fn document_to_bytes(value: &Value) -> FormatResult<Vec<u8>> {
    Ok(to_bytes(value)?)
}

/// Parses document bytes.
pub fn document_from_bytes(bytes: &[u8]) -> FormatResult<Value> {
    Ok(from_bytes(bytes)?)
}

pub(crate) fn uuid_value(uuid: Uuid) -> Value {
    Value::Bytes(uuid.as_bytes().to_vec())
}

pub(crate) fn uuid_from_bytes(bytes: &[u8]) -> FormatResult<Uuid> {
    Uuid::from_slice(bytes).map_err(|_| FormatError::UuidWrongLength(bytes.len()))
}

fn log_unknown_keys(scope: &str, map: &Map) {
    for key in map.keys() {
        warn!(
            "event=document_decode module=format status=warn reason=unhandled_key scope={} key={}",
            scope, key
        );
    }
}
