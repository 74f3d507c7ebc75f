//! Read-only node descriptions for info panels and tooltips.

use crate::model::link::{self, ResolveError};
use crate::model::node::NodeId;
use crate::model::tag::node_tags;
use crate::service::error::LibraryResult;
use crate::service::library_service::Library;
use std::fmt::{Display, Formatter};

const NOT_APPLICABLE: &str = "not applicable";

/// Labelled description of one node.
///
/// `fields` describe the node, `library_fields` the library it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichText {
    pub title: String,
    pub fields: Vec<(String, String)>,
    pub library_fields: Vec<(String, String)>,
}

impl RichText {
    /// Value of the first field labelled `label`.
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .chain(self.library_fields.iter())
            .find(|(name, _)| name == label)
            .map(|(_, value)| value.as_str())
    }

    /// HTML rendering; field text is escaped.
    pub fn to_html(&self) -> String {
        let mut html = format!("<h3>{}</h3>", escape_html(&self.title));
        push_rows(&mut html, &self.fields);
        html.push_str("<hr>");
        push_rows(&mut html, &self.library_fields);
        html
    }
}

impl Display for RichText {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        for (label, value) in &self.fields {
            writeln!(f, "{label}: {value}")?;
        }
        writeln!(f, "---")?;
        for (label, value) in &self.library_fields {
            writeln!(f, "{label}: {value}")?;
        }
        Ok(())
    }
}

/// Describes `uuid` within `library`.
///
/// Data that does not apply to the node's variant renders as
/// "not applicable"; only an unknown UUID fails.
pub fn describe(library: &Library, uuid: NodeId) -> LibraryResult<RichText> {
    let tree = library.tree();
    let key = library.find_by_uuid(uuid)?;
    let node = library.node(uuid)?;

    let tags = node_tags(tree, key)?
        .into_iter()
        .map(|tag| tag.resolved)
        .collect::<Vec<_>>();
    let icons = link::icons(tree, key)?
        .iter()
        .map(|icon| icon.name().to_string())
        .collect::<Vec<_>>();
    let mut type_label = node.node_type().label().to_string();
    if node.is_linking() {
        type_label.push_str(" (linking node)");
    }

    let mut fields = vec![
        ("Name".to_string(), link::display_name(tree, key)?),
        ("Tag".to_string(), or_not_applicable(tags.join(", "))),
        ("Type".to_string(), type_label),
        ("Icon(s)".to_string(), or_not_applicable(icons.join(", "))),
        ("UUID".to_string(), uuid.to_string()),
    ];

    if node.is_linking() {
        let resolution = link::resolve(tree, key)?;
        let (target, path) = match resolution.resolve() {
            Some(target) => {
                let target_node = tree.node(target).map_err(ResolveError::from)?;
                (
                    format!("{} ({})", target_node.name(), target_node.uuid()),
                    tree.path(target).map_err(ResolveError::from)?,
                )
            }
            None => (
                resolution.sentinel().unwrap_or_default(),
                NOT_APPLICABLE.to_string(),
            ),
        };
        fields.push(("Link target".to_string(), target));
        fields.push(("Target path".to_string(), path));
    }

    let active = match node.active() {
        Some(true) => "yes",
        Some(false) => "no",
        None => NOT_APPLICABLE,
    };
    fields.push(("Active".to_string(), active.to_string()));
    fields.push(("Comment".to_string(), or_not_applicable(node.comment().to_string())));
    fields.push((
        "Hidden".to_string(),
        if node.is_hidden() { "yes" } else { "no" }.to_string(),
    ));
    fields.push((
        "Last change version".to_string(),
        node.last_change_version()
            .map(|version| version.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    ));

    let metadata = library.metadata();
    let library_fields = vec![
        ("Library UUID".to_string(), metadata.library_uuid.to_string()),
        (
            "Library version".to_string(),
            format!("{} ({})", metadata.version, metadata.version_uuid),
        ),
    ];

    Ok(RichText {
        title: link::display_name(tree, key)?,
        fields,
        library_fields,
    })
}

fn or_not_applicable(value: String) -> String {
    if value.is_empty() {
        NOT_APPLICABLE.to_string()
    } else {
        value
    }
}

fn push_rows(html: &mut String, rows: &[(String, String)]) {
    html.push_str("<table>");
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><td><b>{}</b></td><td>{}</td></tr>",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</table>");
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}
