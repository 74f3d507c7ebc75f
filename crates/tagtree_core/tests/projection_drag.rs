use tagtree_core::service::drag::{decode_payload, encode_payload};
use tagtree_core::{
    row_data, rows, DragError, Library, LibraryError, LibraryOptions, MoveError, NodeId, NodeType,
    RowNode,
};

fn named_child(library: &mut Library, parent: NodeId, node_type: NodeType, name: &str) -> NodeId {
    let uuid = library.create_child(parent, node_type).unwrap();
    library.rename(uuid, name).unwrap();
    uuid
}

#[test]
fn rows_follow_preorder_with_depth() {
    let mut library = Library::new(LibraryOptions::default());
    let root = library.root_collection();
    let music = named_child(&mut library, root, NodeType::Collection, "Music");
    named_child(&mut library, music, NodeType::Object, "Rock");
    named_child(&mut library, root, NodeType::Object, "Photos");

    let tree = library.tree();
    let listed = rows(tree, false)
        .unwrap()
        .iter()
        .map(|row| (row.depth, row_data(tree, row).unwrap().name))
        .collect::<Vec<_>>();
    assert_eq!(
        listed,
        vec![
            (0, "Main collection".to_string()),
            (1, "Music".to_string()),
            (2, "Rock".to_string()),
            (1, "Photos".to_string()),
        ]
    );
}

#[test]
fn links_expand_into_shadow_rows() {
    let mut library = Library::new(LibraryOptions::default());
    let root = library.root_collection();
    let shared = named_child(&mut library, root, NodeType::Collection, "Shared");
    let a = named_child(&mut library, shared, NodeType::Object, "a");
    named_child(&mut library, shared, NodeType::Object, "b");
    let link = library.create_child(root, NodeType::Link).unwrap();
    library.link(link, shared).unwrap();

    let tree = library.tree();
    let all = rows(tree, false).unwrap();
    let shadows = all
        .iter()
        .filter(|row| matches!(row.node, RowNode::Shadow(_)))
        .map(|row| row_data(tree, row).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(shadows.len(), 2);
    assert!(shadows.iter().all(|data| data.is_shadow));
    assert_eq!(shadows[0].uuid, a);
    assert_eq!(shadows[0].name, "a");
    assert_eq!(all.last().unwrap().depth, 2);
}

#[test]
fn hidden_nodes_are_listed_only_on_request() {
    let mut library = Library::new(LibraryOptions::default());
    let root = library.root_collection();
    let secret = named_child(&mut library, root, NodeType::Collection, "Secret");
    named_child(&mut library, secret, NodeType::Object, "inside");
    library.set_hidden(secret, true).unwrap();

    assert_eq!(rows(library.tree(), false).unwrap().len(), 1);
    assert_eq!(rows(library.tree(), true).unwrap().len(), 3);
}

#[test]
fn link_to_own_container_is_listed_without_expansion() {
    let mut library = Library::new(LibraryOptions::default());
    let root = library.root_collection();
    let outer = named_child(&mut library, root, NodeType::Collection, "outer");
    let inner = named_child(&mut library, outer, NodeType::Collection, "inner");
    let link = library.create_child(inner, NodeType::Link).unwrap();
    let sibling = named_child(&mut library, root, NodeType::Collection, "sibling");
    let back = library.create_child(sibling, NodeType::Link).unwrap();
    library.link(link, sibling).unwrap();
    library.link(back, outer).unwrap();

    let listed = rows(library.tree(), false).unwrap();
    assert!(listed.len() < 64);
    assert!(listed.iter().all(|row| row.depth < 16));
}

#[test]
fn drag_supports_exactly_one_node() {
    let mut library = Library::new(LibraryOptions::default());
    let root = library.root_collection();
    let first = named_child(&mut library, root, NodeType::Object, "first");
    let second = named_child(&mut library, root, NodeType::Object, "second");

    assert!(matches!(
        library.drag_payload(&[first, second]),
        Err(LibraryError::Drag(DragError::UnsupportedMultiDrag { count: 2 }))
    ));
    assert!(matches!(
        library.drag_payload(&[root]),
        Err(LibraryError::Drag(DragError::NotDraggable(_)))
    ));

    let payload = library.drag_payload(&[second]).unwrap();
    let dragged = decode_payload(&payload).unwrap();
    assert_eq!(dragged.source_instance, library.instance());
    assert_eq!(dragged.uuid, second);
    assert_eq!(dragged.name, "second");
    assert_eq!(dragged.node_type, NodeType::Object);
}

#[test]
fn encode_payload_rejects_empty_selection() {
    let library = Library::new(LibraryOptions::default());
    assert_eq!(
        encode_payload(library.tree(), &[], library.instance()).unwrap_err(),
        DragError::UnsupportedMultiDrag { count: 0 }
    );
}

#[test]
fn drop_moves_the_referenced_node() {
    let mut library = Library::new(LibraryOptions::default());
    let root = library.root_collection();
    let folder = named_child(&mut library, root, NodeType::Collection, "folder");
    let object = named_child(&mut library, root, NodeType::Object, "object");
    let child = named_child(&mut library, object, NodeType::Object, "child");

    let payload = library.drag_payload(&[object]).unwrap();
    assert_eq!(library.drop_payload(folder, 0, &payload).unwrap(), object);
    assert_eq!(library.children(folder).unwrap(), vec![object]);
    assert_eq!(library.children(object).unwrap(), vec![child]);

    let mut other = Library::new(LibraryOptions::default());
    let foreign_root = other.root_collection();
    let foreign = other.create_child(foreign_root, NodeType::Object).unwrap();
    let foreign_payload = other.drag_payload(&[foreign]).unwrap();
    assert!(matches!(
        library.drop_payload(folder, 0, &foreign_payload),
        Err(LibraryError::MoveFailed {
            cause: MoveError::NotInLibrary(id),
            ..
        }) if id == foreign
    ));
}

#[test]
fn drop_from_another_instance_of_the_same_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.tags");
    let mut original = Library::new(LibraryOptions::default());
    let root = original.root_collection();
    let folder = named_child(&mut original, root, NodeType::Collection, "folder");
    let object = named_child(&mut original, root, NodeType::Object, "object");
    original.save(&path).unwrap();

    let mut first = Library::new(LibraryOptions::default());
    first.load(&path).unwrap();
    let mut second = Library::new(LibraryOptions::default());
    second.load(&path).unwrap();
    assert_ne!(first.instance(), second.instance());

    let payload = first.drag_payload(&[object]).unwrap();
    assert!(matches!(
        second.drop_payload(folder, 0, &payload),
        Err(LibraryError::MoveFailed {
            cause: MoveError::NotInLibrary(id),
            ..
        }) if id == object
    ));
    assert_eq!(second.children(folder).unwrap(), Vec::<NodeId>::new());

    assert_eq!(first.drop_payload(folder, 0, &payload).unwrap(), object);
    assert_eq!(first.children(folder).unwrap(), vec![object]);
}
