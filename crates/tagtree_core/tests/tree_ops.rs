use std::collections::HashSet;
use tagtree_core::model::tree::{NodeDraft, MAIN_COLLECTION_NAME};
use tagtree_core::{Node, NodeType, Tree, TreeError};

fn named(node_type: NodeType, name: &str) -> Node {
    let mut node = Node::new(node_type);
    node.set_name(name);
    node
}

#[test]
fn new_tree_has_root_and_main_collection() {
    let tree = Tree::new();

    assert_eq!(tree.len(), 2);
    let collection = tree.node(tree.root_collection()).unwrap();
    assert_eq!(collection.node_type(), NodeType::Collection);
    assert_eq!(collection.name(), MAIN_COLLECTION_NAME);
    assert_eq!(tree.parent(tree.root_collection()).unwrap(), Some(tree.root()));
}

#[test]
fn append_and_index_of_child_follow_insertion_order() {
    let mut tree = Tree::new();
    let parent = tree.root_collection();
    let a = tree.append_child(parent, named(NodeType::Object, "a")).unwrap();
    let b = tree.append_child(parent, named(NodeType::Object, "b")).unwrap();
    let c = tree.insert_child(parent, 1, named(NodeType::Link, "c")).unwrap();

    assert_eq!(tree.children(parent).unwrap(), &[a, c, b]);
    assert_eq!(tree.index_of_child(parent, b).unwrap(), 2);
}

#[test]
fn index_of_child_reports_both_identities() {
    let mut tree = Tree::new();
    let parent = tree.root_collection();
    let object = tree.append_child(parent, named(NodeType::Object, "o")).unwrap();
    let nested = tree.append_child(object, named(NodeType::Object, "n")).unwrap();

    let err = tree.index_of_child(parent, nested).unwrap_err();
    assert_eq!(
        err,
        TreeError::ChildNotFound {
            child: tree.uuid(nested).unwrap(),
            parent: tree.uuid(parent).unwrap(),
        }
    );
}

#[test]
fn child_type_rules_are_enforced() {
    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let object = tree.append_child(collection, named(NodeType::Object, "o")).unwrap();
    let link = tree.append_child(collection, Node::new(NodeType::Link)).unwrap();

    let err = tree
        .append_child(object, named(NodeType::Collection, "c"))
        .unwrap_err();
    assert!(matches!(
        err,
        TreeError::CannotInsertChild {
            parent_type: NodeType::Object,
            child_type: NodeType::Collection,
            ..
        }
    ));
    assert!(tree.append_child(link, Node::new(NodeType::Object)).is_err());
    assert!(tree
        .append_child(tree.root(), named(NodeType::Collection, "second"))
        .is_err());
    assert!(tree.append_child(object, Node::new(NodeType::Link)).is_ok());
}

#[test]
fn remove_child_drops_every_uuid_of_the_subtree() {
    let mut tree = Tree::new();
    let parent = tree.root_collection();
    let branch = tree.append_child(parent, named(NodeType::Collection, "branch")).unwrap();
    let first = tree.append_child(branch, named(NodeType::Object, "first")).unwrap();
    tree.append_child(branch, named(NodeType::Object, "second")).unwrap();
    tree.append_child(first, named(NodeType::Object, "leaf")).unwrap();

    assert_eq!(tree.descendant_count(branch).unwrap(), 3);
    let removed = tree.remove_child(parent, branch).unwrap();

    assert_eq!(removed.descendant_count(), 3);
    for uuid in removed.uuids() {
        assert!(tree.find(uuid).is_none());
    }
    assert_eq!(tree.len(), 2);
    assert!(matches!(tree.node(first), Err(TreeError::StaleKey(_))));
}

#[test]
fn root_collection_is_fixed() {
    let mut tree = Tree::new();
    let root = tree.root();
    let collection = tree.root_collection();

    assert!(matches!(
        tree.remove_child(root, collection),
        Err(TreeError::FixedNode(_))
    ));
    assert!(matches!(
        tree.move_node(collection, collection, 0),
        Err(TreeError::FixedNode(_))
    ));
}

#[test]
fn move_node_rejects_cycles_and_keeps_uuids() {
    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let outer = tree.append_child(collection, named(NodeType::Collection, "outer")).unwrap();
    let inner = tree.append_child(outer, named(NodeType::Collection, "inner")).unwrap();
    let object = tree.append_child(inner, named(NodeType::Object, "o")).unwrap();
    let uuid = tree.uuid(object).unwrap();

    assert!(matches!(
        tree.move_node(outer, inner, 0),
        Err(TreeError::CycleDetected { .. })
    ));

    tree.move_node(object, collection, 0).unwrap();
    assert_eq!(tree.children(collection).unwrap()[0], object);
    assert_eq!(tree.find(uuid), Some(object));
    assert_eq!(tree.path(object).unwrap(), format!("{MAIN_COLLECTION_NAME}/o"));
}

#[test]
fn unused_child_name_counts_up() {
    let mut tree = Tree::new();
    let parent = tree.root_collection();
    let prefix = NodeType::Object.default_name();

    assert_eq!(tree.unused_child_name(parent, prefix).unwrap(), prefix);
    tree.append_child(parent, named(NodeType::Object, prefix)).unwrap();
    assert_eq!(
        tree.unused_child_name(parent, prefix).unwrap(),
        format!("{prefix} #1")
    );
    tree.append_child(parent, named(NodeType::Object, &format!("{prefix} #1")))
        .unwrap();
    assert_eq!(
        tree.unused_child_name(parent, prefix).unwrap(),
        format!("{prefix} #2")
    );
}

#[test]
fn from_draft_rejects_duplicate_uuids() {
    let object = named(NodeType::Object, "o");
    let twin = object.clone();
    let draft = NodeDraft::with_children(
        Node::new(NodeType::Root),
        vec![NodeDraft::with_children(
            named(NodeType::Collection, "c"),
            vec![NodeDraft::new(object.clone()), NodeDraft::new(twin)],
        )],
    );

    assert_eq!(
        Tree::from_draft(draft).unwrap_err(),
        TreeError::DuplicateUuid(object.uuid())
    );
}

#[test]
fn created_nodes_have_distinct_uuids() {
    let mut tree = Tree::new();
    let parent = tree.root_collection();
    let mut uuids = HashSet::new();
    for _ in 0..50 {
        let key = tree.append_child(parent, Node::new(NodeType::Object)).unwrap();
        assert!(uuids.insert(tree.uuid(key).unwrap()));
    }
    assert_eq!(tree.len(), 52);
}
