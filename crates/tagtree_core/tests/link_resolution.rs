use tagtree_core::model::link::{
    display_name, edit_name, icons, resolve, shadow_children, shadow_children_of, shadow_index_of,
    INVALID_TARGET, NO_LINKED_ELEMENT,
};
use tagtree_core::model::tag::{node_tags, resolve_child_tag};
use tagtree_core::{IconRef, LinkResolution, Node, NodeKey, NodeType, ResolveError, Tree};
use uuid::Uuid;

fn named(node_type: NodeType, name: &str) -> Node {
    let mut node = Node::new(node_type);
    node.set_name(name);
    node
}

fn link_to(tree: &mut Tree, parent: NodeKey, target: Option<NodeKey>) -> NodeKey {
    let mut link = Node::new(NodeType::Link);
    let target = target.map(|key| tree.uuid(key).unwrap());
    link.set_link_target(target).unwrap();
    tree.append_child(parent, link).unwrap()
}

#[test]
fn link_without_target_shows_no_linked_element() {
    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let link = link_to(&mut tree, collection, None);

    let resolution = resolve(&tree, link).unwrap();
    assert_eq!(resolution, LinkResolution::NoTarget);
    assert_eq!(display_name(&tree, link).unwrap(), NO_LINKED_ELEMENT);
    assert_eq!(icons(&tree, link).unwrap(), vec![IconRef::unlinked()]);
}

#[test]
fn link_with_missing_target_carries_the_stale_uuid() {
    let mut tree = Tree::new();
    let stale = Uuid::new_v4();
    let mut link = Node::new(NodeType::Link);
    link.set_link_target(Some(stale)).unwrap();
    let link = tree.append_child(tree.root_collection(), link).unwrap();

    let resolution = resolve(&tree, link).unwrap();
    match &resolution {
        LinkResolution::Invalid {
            target,
            parent_name,
        } => {
            assert_eq!(*target, stale);
            assert_eq!(parent_name, "Main collection");
        }
        other => panic!("unexpected resolution: {other:?}"),
    }
    let sentinel = resolution.sentinel().unwrap();
    assert!(sentinel.starts_with(INVALID_TARGET));
    assert!(sentinel.contains(&stale.to_string()));
}

#[test]
fn link_resolves_to_the_exact_target() {
    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let target = tree.append_child(collection, named(NodeType::Object, "target")).unwrap();
    let link = link_to(&mut tree, collection, Some(target));

    assert_eq!(resolve(&tree, link).unwrap(), LinkResolution::Resolved(target));
    assert_eq!(display_name(&tree, link).unwrap(), "target");
    assert_eq!(edit_name(&tree, link).unwrap(), " -> target");
    assert_eq!(icons(&tree, link).unwrap(), icons(&tree, target).unwrap());
}

#[test]
fn resolve_on_non_link_fails() {
    let tree = Tree::new();
    assert!(matches!(
        resolve(&tree, tree.root_collection()),
        Err(ResolveError::NotALink(_))
    ));
}

#[test]
fn shadow_children_mirror_target_children_in_order() {
    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let target = tree.append_child(collection, named(NodeType::Collection, "shared")).unwrap();
    let real = ["a", "b", "c"]
        .iter()
        .map(|name| tree.append_child(target, named(NodeType::Object, name)).unwrap())
        .collect::<Vec<_>>();
    let link = link_to(&mut tree, collection, Some(target));

    let shadows = shadow_children(&tree, link).unwrap();
    let names = shadows
        .iter()
        .map(|shadow| shadow.name(&tree).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["a", "b", "c"]);

    for (position, shadow) in shadows.iter().enumerate() {
        assert_eq!(shadow_index_of(&tree, shadow, position).unwrap(), real[position]);
        assert_eq!(shadow.uuid(&tree).unwrap(), tree.uuid(real[position]).unwrap());
    }
}

#[test]
fn nested_shadows_follow_the_real_subtree() {
    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let target = tree.append_child(collection, named(NodeType::Collection, "shared")).unwrap();
    let parent = tree.append_child(target, named(NodeType::Object, "parent")).unwrap();
    let leaf = tree.append_child(parent, named(NodeType::Object, "leaf")).unwrap();
    let link = link_to(&mut tree, collection, Some(target));

    let top = shadow_children(&tree, link).unwrap();
    let nested = shadow_children_of(&tree, &top[0]).unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].depth(), 2);
    assert_eq!(shadow_index_of(&tree, &nested[0], 0).unwrap(), leaf);
}

#[test]
fn stale_shadow_reports_missing_child() {
    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let target = tree.append_child(collection, named(NodeType::Collection, "shared")).unwrap();
    let child = tree.append_child(target, named(NodeType::Object, "only")).unwrap();
    let link = link_to(&mut tree, collection, Some(target));

    let shadows = shadow_children(&tree, link).unwrap();
    tree.remove_child(target, child).unwrap();

    assert!(matches!(
        shadow_index_of(&tree, &shadows[0], 0),
        Err(ResolveError::ShadowChildNotFound { position: 0, .. })
    ));
}

#[test]
fn unresolved_link_has_no_shadows() {
    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let link = link_to(&mut tree, collection, None);
    assert!(shadow_children(&tree, link).unwrap().is_empty());
}

#[test]
fn child_tags_resolve_through_parent_templates() {
    assert_eq!(resolve_child_tag("color(s:/dark)", "%(s)/blue"), "color/dark/blue");
    assert_eq!(resolve_child_tag("color(s:/dark)", "%-blue"), "color-blue");

    let mut tree = Tree::new();
    let collection = tree.root_collection();
    let mut parent = named(NodeType::Object, "color");
    parent.set_tags(vec!["color".to_string()]).unwrap();
    let parent = tree.append_child(collection, parent).unwrap();
    let mut child = named(NodeType::Object, "red");
    child.set_tags(vec!["%/red".to_string()]).unwrap();
    let child = tree.append_child(parent, child).unwrap();
    let link = link_to(&mut tree, collection, Some(child));

    let child_tags = node_tags(&tree, child).unwrap();
    assert_eq!(child_tags.len(), 1);
    assert_eq!(child_tags[0].raw, "%/red");
    assert_eq!(child_tags[0].resolved, "color/red");

    let link_tags = node_tags(&tree, link).unwrap();
    assert_eq!(link_tags[0].resolved, "color/red");
}
