//! Tag template resolution.
//!
//! A child tag may embed its parent's tag with `%` or `%(spec)`. A parent tag
//! may carry optional sections written as `(spec:replacement)`; a section is
//! kept only when the child asks for the same `spec`, and every section is
//! dropped for a plain `%`.
//!
//! Example: parent `color(s:/dark)`, child `%(s)/blue` resolves to
//! `color/dark/blue`, while child `%-blue` resolves to `color-blue`.

use crate::model::link::{resolve, ResolveResult};
use crate::model::node::NodeKind;
use crate::model::tree::{NodeKey, Tree};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

static PARENT_REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%(?:\(([^)]*)\))?").expect("valid parent reference regex"));
static OPTIONAL_SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^:()]*):([^()]*)\)").expect("valid optional section regex"));

/// Tag value before and after template resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub raw: String,
    pub resolved: String,
}

/// Resolves one child tag against one parent tag.
pub fn resolve_child_tag(parent: &str, child: &str) -> String {
    let substituted = PARENT_REFERENCE_RE.replace_all(child, |caps: &Captures<'_>| {
        let spec = caps.get(1).map_or("", |m| m.as_str());
        keep_sections(parent, spec)
    });
    keep_sections(&substituted, "")
}

/// Keeps optional sections matching `spec` and drops the others.
fn keep_sections(value: &str, spec: &str) -> String {
    OPTIONAL_SECTION_RE
        .replace_all(value, |caps: &Captures<'_>| {
            if &caps[1] == spec {
                caps[2].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Tags of `key` resolved through its ancestors.
///
/// Objects resolve their own values; links expose their target's resolved
/// tags, resolved once more through the link's ancestors. Other variants
/// have no tags.
pub fn node_tags(tree: &Tree, key: NodeKey) -> ResolveResult<Vec<Tag>> {
    let mut visiting = HashSet::new();
    node_tags_guarded(tree, key, &mut visiting)
}

fn node_tags_guarded(
    tree: &Tree,
    key: NodeKey,
    visiting: &mut HashSet<NodeKey>,
) -> ResolveResult<Vec<Tag>> {
    if !visiting.insert(key) {
        return Ok(Vec::new());
    }
    let mut result = Vec::new();
    match tree.node(key)?.kind() {
        NodeKind::Object { tags, .. } => {
            for raw in tags {
                for resolved in resolve_through_parent(tree, key, raw)? {
                    result.push(Tag {
                        raw: raw.clone(),
                        resolved,
                    });
                }
            }
        }
        NodeKind::Link { .. } => {
            if let Some(target) = resolve(tree, key)?.resolve() {
                for tag in node_tags_guarded(tree, target, visiting)? {
                    for resolved in resolve_through_parent(tree, key, &tag.resolved)? {
                        result.push(Tag {
                            raw: tag.raw.clone(),
                            resolved,
                        });
                    }
                }
            }
        }
        NodeKind::Root | NodeKind::Collection => {}
    }
    result.retain(|tag| !tag.resolved.is_empty());
    Ok(without_duplicates(&result))
}

fn resolve_through_parent(tree: &Tree, key: NodeKey, tag: &str) -> ResolveResult<Vec<String>> {
    match tree.parent(key)? {
        Some(parent) => resolve_for_child(tree, parent, tag),
        None => Ok(vec![tag.to_string()]),
    }
}

// Collections and the Root end resolution.
fn resolve_for_child(tree: &Tree, key: NodeKey, tag: &str) -> ResolveResult<Vec<String>> {
    match tree.node(key)?.kind() {
        NodeKind::Object { tags, .. } if !tags.is_empty() => {
            let mut result = Vec::new();
            for own in tags {
                let combined = resolve_child_tag(own, tag);
                result.extend(resolve_through_parent(tree, key, &combined)?);
            }
            Ok(result)
        }
        NodeKind::Object { .. } | NodeKind::Link { .. } => resolve_through_parent(tree, key, tag),
        NodeKind::Root | NodeKind::Collection => Ok(vec![tag.to_string()]),
    }
}

/// Removes repeated values while keeping first-seen order.
pub fn without_duplicates<T: PartialEq + Clone>(values: &[T]) -> Vec<T> {
    let mut result: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        if !result.contains(value) {
            result.push(value.clone());
        }
    }
    result
}
