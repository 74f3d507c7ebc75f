//! Single-node drag payload.
//!
//! The payload is an array holding exactly one entry map, encoded with the
//! library document codec. The entry names the library instance that produced
//! it and carries the node's own fields; the subtree stays in the library and
//! is referenced by UUID.

use crate::format::codec::{
    decode_node, document_from_bytes, document_to_bytes, encode_node, uuid_from_bytes, uuid_value,
};
use crate::format::{FormatError, Map, Value, ValueKind, FORMAT_VERSION};
use crate::model::node::{Node, NodeId, NodeType};
use crate::model::tree::{NodeKey, Tree, TreeError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Clipboard/drag format identifier.
pub const DRAG_MIME_TYPE: &str = "application/x-tagtree-node";

/// Payload entry keys.
pub mod keys {
    pub const SOURCE_INSTANCE: &str = "source_instance";
    pub const NODE: &str = "node";
}

pub type DragResult<T> = Result<T, DragError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    /// Anything but exactly one node was selected or received.
    UnsupportedMultiDrag { count: usize },
    PayloadNotArray(ValueKind),
    DragElementNotMap(ValueKind),
    SourceInstanceNotByteArray(Option<ValueKind>),
    NodeDataNotMap(Option<ValueKind>),
    /// Root and root collection cannot be dragged.
    NotDraggable(NodeId),
    Format(FormatError),
    Tree(TreeError),
}

impl Display for DragError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedMultiDrag { count } => {
                write!(f, "dragging {count} elements is not supported, drag exactly one")
            }
            Self::PayloadNotArray(kind) => write!(f, "drag payload is not an array but {kind}"),
            Self::DragElementNotMap(kind) => {
                write!(f, "drag payload element is not a map but {kind}")
            }
            Self::SourceInstanceNotByteArray(found) => write!(
                f,
                "drag source instance is not a byte array but {}",
                found.map_or_else(|| "missing".to_string(), |kind| kind.to_string())
            ),
            Self::NodeDataNotMap(found) => write!(
                f,
                "drag node data is not a map but {}",
                found.map_or_else(|| "missing".to_string(), |kind| kind.to_string())
            ),
            Self::NotDraggable(id) => write!(f, "node {id} cannot be dragged"),
            Self::Format(err) => write!(f, "{err}"),
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DragError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Format(err) => Some(err),
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FormatError> for DragError {
    fn from(value: FormatError) -> Self {
        Self::Format(value)
    }
}

impl From<TreeError> for DragError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

/// Node identity carried by a decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraggedNode {
    /// Library instance the drag started in.
    pub source_instance: Uuid,
    pub node_type: NodeType,
    pub uuid: NodeId,
    pub name: String,
    /// Decoded fields; children are not part of the payload.
    pub node: Node,
}

/// Encodes the selected nodes of library instance `source_instance`;
/// exactly one node is supported.
pub fn encode_payload(
    tree: &Tree,
    selection: &[NodeKey],
    source_instance: Uuid,
) -> DragResult<Vec<u8>> {
    let [key] = selection else {
        return Err(DragError::UnsupportedMultiDrag {
            count: selection.len(),
        });
    };
    let node = tree.node(*key)?;
    if *key == tree.root() || *key == tree.root_collection() {
        return Err(DragError::NotDraggable(node.uuid()));
    }
    let mut entry = Map::new();
    entry.insert(keys::SOURCE_INSTANCE, uuid_value(source_instance));
    entry.insert(keys::NODE, Value::Map(encode_node(node)));
    let payload = Value::Array(vec![Value::Map(entry)]);
    Ok(document_to_bytes(&payload)?)
}

/// Decodes a payload produced by [`encode_payload`].
pub fn decode_payload(bytes: &[u8]) -> DragResult<DraggedNode> {
    let items = match document_from_bytes(bytes)? {
        Value::Array(items) => items,
        other => return Err(DragError::PayloadNotArray(other.kind())),
    };
    let count = items.len();
    let mut items = items.into_iter();
    let element = match (items.next(), count) {
        (Some(element), 1) => element,
        _ => return Err(DragError::UnsupportedMultiDrag { count }),
    };
    let mut entry = match element {
        Value::Map(map) => map,
        other => return Err(DragError::DragElementNotMap(other.kind())),
    };
    let source_instance = match entry.take(keys::SOURCE_INSTANCE) {
        Some(Value::Bytes(bytes)) => uuid_from_bytes(&bytes)?,
        other => {
            return Err(DragError::SourceInstanceNotByteArray(
                other.map(|value| value.kind()),
            ))
        }
    };
    let mut map = match entry.take(keys::NODE) {
        Some(Value::Map(map)) => map,
        other => return Err(DragError::NodeDataNotMap(other.map(|value| value.kind()))),
    };

    let node = decode_node(&mut map, FORMAT_VERSION)?;
    Ok(DraggedNode {
        source_instance,
        node_type: node.node_type(),
        uuid: node.uuid(),
        name: node.name().to_string(),
        node,
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_payload, keys, DragError};
    use crate::format::codec::document_to_bytes;
    use crate::format::{Map, Value, ValueKind};
    use uuid::Uuid;

    #[test]
    fn empty_array_is_rejected_as_multi_drag() {
        let bytes = document_to_bytes(&Value::Array(Vec::new())).unwrap();
        assert_eq!(
            decode_payload(&bytes).unwrap_err(),
            DragError::UnsupportedMultiDrag { count: 0 }
        );
    }

    #[test]
    fn map_payload_is_not_an_array() {
        let bytes = document_to_bytes(&Value::Map(Map::new())).unwrap();
        assert!(matches!(
            decode_payload(&bytes).unwrap_err(),
            DragError::PayloadNotArray(_)
        ));
    }

    #[test]
    fn element_must_be_a_map() {
        let bytes = document_to_bytes(&Value::Array(vec![Value::from(7i64)])).unwrap();
        assert_eq!(
            decode_payload(&bytes).unwrap_err(),
            DragError::DragElementNotMap(ValueKind::Integer)
        );
    }

    #[test]
    fn entry_without_source_instance_is_rejected() {
        let mut entry = Map::new();
        entry.insert(keys::NODE, Map::new());
        let bytes = document_to_bytes(&Value::Array(vec![Value::Map(entry)])).unwrap();
        assert_eq!(
            decode_payload(&bytes).unwrap_err(),
            DragError::SourceInstanceNotByteArray(None)
        );
    }

    #[test]
    fn entry_node_data_must_be_a_map() {
        let mut entry = Map::new();
        entry.insert(
            keys::SOURCE_INSTANCE,
            Value::Bytes(Uuid::new_v4().as_bytes().to_vec()),
        );
        entry.insert(keys::NODE, "not a node");
        let bytes = document_to_bytes(&Value::Array(vec![Value::Map(entry)])).unwrap();
        assert_eq!(
            decode_payload(&bytes).unwrap_err(),
            DragError::NodeDataNotMap(Some(ValueKind::String))
        );
    }
}
