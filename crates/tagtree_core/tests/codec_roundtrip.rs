use tagtree_core::format::codec::{document_from_bytes, document_to_bytes, keys};
use tagtree_core::format::{
    decode_document, encode_document, FormatError, LibraryMetadata, Map, Value, ValueKind,
    APPLICATION, MAX_LIBRARY_VERSION,
};
use tagtree_core::{IconRef, Node, NodeType, Tree};
use uuid::Uuid;

fn sample_tree() -> Tree {
    let mut tree = Tree::new();
    let collection = tree.root_collection();

    let mut nested = Node::new(NodeType::Collection);
    nested.set_name("Projects");
    nested.set_comment("work related");
    let nested = tree.append_child(collection, nested).unwrap();

    let mut object = Node::new(NodeType::Object);
    object.set_name("Rust");
    object.set_tags(vec!["lang".to_string(), "%/rust".to_string()]).unwrap();
    object.set_icon(Some(IconRef::new(":/icons/bx-code.svg"))).unwrap();
    object.set_hidden(true);
    object.set_last_change_version(Some(4));
    let object = tree.append_child(nested, object).unwrap();

    let mut child = Node::new(NodeType::Object);
    child.set_name("Cargo");
    tree.append_child(object, child).unwrap();

    let mut link = Node::new(NodeType::Link);
    link.set_link_target(Some(tree.uuid(object).unwrap())).unwrap();
    tree.append_child(collection, link).unwrap();
    tree.append_child(collection, Node::new(NodeType::Link)).unwrap();
    tree
}

fn versioned(format_version: Value) -> Map {
    let mut map = Map::new();
    map.insert(keys::FORMAT_VERSION, format_version);
    map
}

fn node_map(node_type: NodeType, uuid: Uuid, children: Vec<Value>) -> Map {
    let mut map = Map::new();
    map.insert(keys::TYPE, node_type.discriminant());
    map.insert(keys::UUID, Value::Bytes(uuid.as_bytes().to_vec()));
    if node_type != NodeType::Root {
        map.insert(keys::NAME, "node");
    }
    map.insert(keys::CHILDREN, Value::Array(children));
    map
}

fn version_one_document(root: Map) -> Value {
    let mut document = versioned(Value::from(1i64));
    document.insert(keys::APPLICATION, APPLICATION);
    document.insert(keys::ROOT, root);
    Value::Map(document)
}

#[test]
fn decode_of_encode_reproduces_the_tree() {
    let tree = sample_tree();
    let metadata = LibraryMetadata {
        version: 7,
        ..LibraryMetadata::fresh()
    };

    let bytes = document_to_bytes(&encode_document(&tree, &metadata).unwrap()).unwrap();
    let decoded = decode_document(document_from_bytes(&bytes).unwrap()).unwrap();

    assert_eq!(
        decoded.tree.to_draft(decoded.tree.root()).unwrap(),
        tree.to_draft(tree.root()).unwrap()
    );
    assert_eq!(decoded.metadata, metadata);
    assert_eq!(decoded.application, APPLICATION);
    assert_eq!(decoded.format_version, 2);
}

#[test]
fn uuids_survive_round_trip() {
    let tree = sample_tree();
    let document = encode_document(&tree, &LibraryMetadata::fresh()).unwrap();
    let decoded = decode_document(document).unwrap();

    for (_, node) in tree.iter() {
        assert!(decoded.tree.find(node.uuid()).is_some());
    }
    assert_eq!(decoded.tree.len(), tree.len());
}

#[test]
fn missing_format_version_is_reported_first() {
    let mut map = Map::new();
    map.insert(keys::APPLICATION, 12i64);
    assert_eq!(
        decode_document(Value::Map(map)).unwrap_err(),
        FormatError::MissingFormatVersion
    );
}

#[test]
fn non_integer_format_version_carries_the_value() {
    let map = versioned(Value::from("2"));
    assert_eq!(
        decode_document(Value::Map(map)).unwrap_err(),
        FormatError::FormatVersionNotInteger(Value::from("2"))
    );
}

#[test]
fn unknown_format_version_is_rejected() {
    let map = versioned(Value::from(99i64));
    assert_eq!(
        decode_document(Value::Map(map)).unwrap_err(),
        FormatError::UnknownFormatVersion(99)
    );
}

#[test]
fn application_key_is_checked_before_nodes() {
    let mut map = versioned(Value::from(2i64));
    map.insert(keys::ROOT, 5i64);
    assert_eq!(
        decode_document(Value::Map(map)).unwrap_err(),
        FormatError::ApplicationKeyMissing
    );

    let mut map = versioned(Value::from(2i64));
    map.insert(keys::APPLICATION, true);
    assert!(matches!(
        decode_document(Value::Map(map)).unwrap_err(),
        FormatError::ApplicationKeyNotString(_)
    ));
}

#[test]
fn version_one_document_decodes_without_metadata() {
    let collection = Uuid::new_v4();
    let mut collection_map = Map::new();
    collection_map.insert(keys::TYPE, 2i64);
    collection_map.insert(keys::UUID, Value::Bytes(collection.as_bytes().to_vec()));
    collection_map.insert(keys::NAME, "Main collection");
    collection_map.insert(keys::CHILDREN, Value::Array(Vec::new()));

    let mut root = Map::new();
    root.insert(keys::TYPE, 1i64);
    root.insert(keys::UUID, Value::Bytes(Uuid::new_v4().as_bytes().to_vec()));
    root.insert(keys::CHILDREN, Value::Array(vec![Value::Map(collection_map)]));

    let mut document = versioned(Value::from(1i64));
    document.insert(keys::APPLICATION, APPLICATION);
    document.insert(keys::ROOT, root);

    let decoded = decode_document(Value::Map(document)).unwrap();
    assert_eq!(decoded.format_version, 1);
    assert_eq!(decoded.metadata.version, 0);
    assert!(decoded.tree.find(collection).is_some());
}

#[test]
fn node_errors_name_the_offending_node() {
    let uuid = Uuid::new_v4();
    let mut unknown = Map::new();
    unknown.insert(keys::TYPE, 42i64);
    unknown.insert(keys::UUID, Value::Bytes(uuid.as_bytes().to_vec()));

    let mut root = Map::new();
    root.insert(keys::TYPE, 1i64);
    root.insert(keys::UUID, Value::Bytes(Uuid::new_v4().as_bytes().to_vec()));
    root.insert(keys::CHILDREN, Value::Array(vec![Value::Map(unknown)]));

    let mut document = versioned(Value::from(1i64));
    document.insert(keys::APPLICATION, APPLICATION);
    document.insert(keys::ROOT, root);

    assert_eq!(
        decode_document(Value::Map(document)).unwrap_err(),
        FormatError::UnknownNodeType {
            uuid,
            discriminant: 42
        }
    );
}

#[test]
fn node_without_type_or_children_is_rejected() {
    let mut root = Map::new();
    root.insert(keys::UUID, Value::Bytes(Uuid::new_v4().as_bytes().to_vec()));
    let mut document = versioned(Value::from(1i64));
    document.insert(keys::APPLICATION, APPLICATION);
    document.insert(keys::ROOT, root);
    assert_eq!(
        decode_document(Value::Map(document)).unwrap_err(),
        FormatError::NodeHasNoTypeKey
    );

    let root_uuid = Uuid::new_v4();
    let mut root = Map::new();
    root.insert(keys::TYPE, 1i64);
    root.insert(keys::UUID, Value::Bytes(root_uuid.as_bytes().to_vec()));
    let mut document = versioned(Value::from(1i64));
    document.insert(keys::APPLICATION, APPLICATION);
    document.insert(keys::ROOT, root);
    assert_eq!(
        decode_document(Value::Map(document)).unwrap_err(),
        FormatError::MissingChildrenKey(root_uuid)
    );
}

#[test]
fn garbage_bytes_are_malformed() {
    assert!(matches!(
        document_from_bytes(&[0xff, 0xff, 0xff]).unwrap_err(),
        FormatError::Malformed(_)
    ));
}

#[test]
fn encoded_link_without_target_writes_nil_uuid() {
    let mut tree = Tree::new();
    let link = tree
        .append_child(tree.root_collection(), Node::new(NodeType::Link))
        .unwrap();
    let document = encode_document(&tree, &LibraryMetadata::fresh()).unwrap();
    let dump = serde_json::to_string(&document).unwrap();

    let collection = document
        .as_map()
        .and_then(|map| map.get(keys::ROOT))
        .and_then(Value::as_map)
        .and_then(|root| root.get(keys::CHILDREN))
        .cloned();
    let Some(Value::Array(collections)) = collection else {
        panic!("root has no children array: {dump}");
    };
    let Some(Value::Map(collection)) = collections.first() else {
        panic!("root collection missing: {dump}");
    };
    let Some(Value::Array(children)) = collection.get(keys::CHILDREN) else {
        panic!("collection has no children array: {dump}");
    };
    let Some(Value::Map(encoded_link)) = children.first() else {
        panic!("link missing: {dump}");
    };

    assert_eq!(
        encoded_link.get(keys::UUID),
        Some(&Value::Bytes(tree.uuid(link).unwrap().as_bytes().to_vec()))
    );
    assert_eq!(
        encoded_link.get(keys::TARGET),
        Some(&Value::Bytes(vec![0; 16])),
        "{dump}"
    );
    assert!(encoded_link.get(keys::CHILDREN).is_none(), "{dump}");
}

#[test]
fn library_version_must_stay_in_range() {
    for version in [-1, i64::MAX] {
        let Value::Map(mut map) =
            encode_document(&Tree::new(), &LibraryMetadata::fresh()).unwrap()
        else {
            panic!("document is not a map");
        };
        map.insert(keys::LIBRARY_VERSION, version);
        assert_eq!(
            decode_document(Value::Map(map)).unwrap_err(),
            FormatError::LibraryVersionOutOfRange(version)
        );
    }

    let highest = LibraryMetadata {
        version: MAX_LIBRARY_VERSION,
        ..LibraryMetadata::fresh()
    };
    let decoded = decode_document(encode_document(&Tree::new(), &highest).unwrap()).unwrap();
    assert_eq!(decoded.metadata.version, MAX_LIBRARY_VERSION);

    let saturated = LibraryMetadata {
        version: i64::MAX,
        ..LibraryMetadata::fresh()
    };
    assert_eq!(
        encode_document(&Tree::new(), &saturated).unwrap_err(),
        FormatError::LibraryVersionOutOfRange(i64::MAX)
    );
}

#[test]
fn root_child_must_be_a_collection() {
    let object = node_map(NodeType::Object, Uuid::new_v4(), Vec::new());
    let root = node_map(NodeType::Root, Uuid::new_v4(), vec![Value::Map(object)]);
    assert_eq!(
        decode_document(version_one_document(root)).unwrap_err(),
        FormatError::RootChildNotCollection(NodeType::Object)
    );
}

#[test]
fn root_must_own_exactly_one_child() {
    let root = node_map(NodeType::Root, Uuid::new_v4(), Vec::new());
    assert_eq!(
        decode_document(version_one_document(root)).unwrap_err(),
        FormatError::RootChildCount(0)
    );

    let collections = (0..2)
        .map(|_| Value::Map(node_map(NodeType::Collection, Uuid::new_v4(), Vec::new())))
        .collect();
    let root = node_map(NodeType::Root, Uuid::new_v4(), collections);
    assert_eq!(
        decode_document(version_one_document(root)).unwrap_err(),
        FormatError::RootChildCount(2)
    );
}

#[test]
fn node_uuid_must_be_a_byte_array() {
    let mut root = node_map(NodeType::Root, Uuid::new_v4(), Vec::new());
    root.insert(keys::UUID, "not bytes");
    assert_eq!(
        decode_document(version_one_document(root)).unwrap_err(),
        FormatError::UuidNotByteArray(Some(ValueKind::String))
    );
}

#[test]
fn node_type_must_be_an_integer() {
    let mut root = node_map(NodeType::Root, Uuid::new_v4(), Vec::new());
    root.insert(keys::TYPE, "1");
    assert_eq!(
        decode_document(version_one_document(root)).unwrap_err(),
        FormatError::NodeTypeNotInteger(ValueKind::String)
    );
}

#[test]
fn children_must_be_an_array() {
    let uuid = Uuid::new_v4();
    let mut root = node_map(NodeType::Root, uuid, Vec::new());
    root.insert(keys::CHILDREN, 3i64);
    assert_eq!(
        decode_document(version_one_document(root)).unwrap_err(),
        FormatError::InvalidChildrenType {
            uuid,
            found: ValueKind::Integer
        }
    );
}
