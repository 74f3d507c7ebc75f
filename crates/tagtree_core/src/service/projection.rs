//! Flat row projection of a library tree for UI consumption.
//!
//! # Responsibility
//! - List visible nodes in pre-order with their depth.
//! - Expand resolved links into shadow rows instead of copies.
//!
//! # Invariants
//! - Rows start at the root collection with depth 0; the Root is not listed.
//! - Children appear in stored order.
//! - A node whose expansion would revisit a real node already on the
//!   current path is listed but not expanded.

use crate::model::icon::IconRef;
use crate::model::link::{self, ResolveResult, ShadowNode};
use crate::model::node::{NodeId, NodeType};
use crate::model::tree::{NodeKey, Tree};

/// Node behind one projected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowNode {
    Real(NodeKey),
    Shadow(ShadowNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub depth: usize,
    pub node: RowNode,
}

/// Display data of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowData {
    pub uuid: NodeId,
    pub name: String,
    pub icons: Vec<IconRef>,
    pub node_type: NodeType,
    pub is_shadow: bool,
    pub is_hidden: bool,
}

/// Rows of `tree` in pre-order.
///
/// Hidden nodes and their subtrees are left out unless `include_hidden`.
pub fn rows(tree: &Tree, include_hidden: bool) -> ResolveResult<Vec<Row>> {
    let mut rows = Vec::new();
    let mut on_path = Vec::new();
    push_rows(
        tree,
        RowNode::Real(tree.root_collection()),
        0,
        include_hidden,
        &mut on_path,
        &mut rows,
    )?;
    Ok(rows)
}

/// Resolves the real node of `row` and its display data.
pub fn row_data(tree: &Tree, row: &Row) -> ResolveResult<RowData> {
    let (key, is_shadow) = real_key(tree, &row.node)?;
    let node = tree.node(key)?;
    Ok(RowData {
        uuid: node.uuid(),
        name: link::display_name(tree, key)?,
        icons: link::icons(tree, key)?,
        node_type: node.node_type(),
        is_shadow,
        is_hidden: node.is_hidden(),
    })
}

fn real_key(tree: &Tree, node: &RowNode) -> ResolveResult<(NodeKey, bool)> {
    match node {
        RowNode::Real(key) => Ok((*key, false)),
        RowNode::Shadow(shadow) => Ok((link::real_node(tree, shadow)?, true)),
    }
}

fn push_rows(
    tree: &Tree,
    node: RowNode,
    depth: usize,
    include_hidden: bool,
    on_path: &mut Vec<NodeKey>,
    rows: &mut Vec<Row>,
) -> ResolveResult<()> {
    let (key, _) = real_key(tree, &node)?;
    let real = tree.node(key)?;
    if !include_hidden && real.is_hidden() {
        return Ok(());
    }
    let is_link = real.is_linking();

    // Expanding a link walks its target's children.
    let expands = link::resolved_target(tree, key)?.unwrap_or(key);
    let cyclic = on_path.contains(&expands);
    let children: Vec<RowNode> = if cyclic {
        Vec::new()
    } else {
        match &node {
            RowNode::Shadow(shadow) => link::shadow_children_of(tree, shadow)?
                .into_iter()
                .map(RowNode::Shadow)
                .collect(),
            RowNode::Real(_) if is_link => link::shadow_children(tree, key)?
                .into_iter()
                .map(RowNode::Shadow)
                .collect(),
            RowNode::Real(_) => tree
                .children(key)?
                .iter()
                .map(|child| RowNode::Real(*child))
                .collect(),
        }
    };

    rows.push(Row { depth, node });
    on_path.push(key);
    on_path.push(expands);
    for child in children {
        push_rows(tree, child, depth + 1, include_hidden, on_path, rows)?;
    }
    on_path.truncate(on_path.len() - 2);
    Ok(())
}
