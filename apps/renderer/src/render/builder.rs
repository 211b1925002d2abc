//! Builder tree walker: declarative component trees → markup.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::render::error::RenderError;
use crate::render::expander::Expander;
use crate::render::path::{display_value, lookup, lookup_text};

/// Elements that never take children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

/// CSS properties whose bare numeric values take no `px` suffix.
const UNITLESS_PROPERTIES: &[&str] = &[
    "flex",
    "flex-grow",
    "flex-shrink",
    "font-weight",
    "line-height",
    "opacity",
    "order",
    "orphans",
    "widows",
    "z-index",
    "zoom",
];

/// One node of a builder template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderNode {
    /// Editor role of the node (`wrapper`, `header`, `name`, ...). Not rendered.
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default = "default_tag")]
    pub tag_name: String,
    /// Literal text or Handlebars markup. Exactly `{{#each path}}` repeats the
    /// children once per item of `path`.
    #[serde(default)]
    pub content: String,
    /// Dotted path whose value replaces `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(default)]
    pub style: Map<String, Value>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub components: Vec<BuilderNode>,
}

fn default_tag() -> String {
    "div".to_string()
}

impl Default for BuilderNode {
    fn default() -> Self {
        Self {
            node_type: String::new(),
            tag_name: default_tag(),
            content: String::new(),
            binding: None,
            style: Map::new(),
            attributes: Map::new(),
            classes: Vec::new(),
            components: Vec::new(),
        }
    }
}

impl BuilderNode {
    /// The array path this node repeats over, if its content is a bare
    /// `{{#each path}}` opener.
    pub fn repeat_path(&self) -> Option<&str> {
        let inner = self
            .content
            .trim()
            .strip_prefix("{{#each")?
            .strip_suffix("}}")?
            .trim();
        (!inner.is_empty() && !inner.contains(char::is_whitespace) && !inner.contains('}'))
            .then_some(inner)
    }
}

/// A builder template: root components plus the stylesheet shipped with them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderDocument {
    #[serde(default)]
    pub components: Vec<BuilderNode>,
    #[serde(default)]
    pub style: String,
}

/// Walks `nodes` in order and concatenates their markup.
pub fn render_nodes(
    nodes: &[BuilderNode],
    scope: &Value,
    expander: &Expander,
) -> Result<String, RenderError> {
    let mut out = String::new();
    for node in nodes {
        render_node(node, scope, expander, &mut out)?;
    }
    Ok(out)
}

fn render_node(
    node: &BuilderNode,
    scope: &Value,
    expander: &Expander,
    out: &mut String,
) -> Result<(), RenderError> {
    let tag = element_name(&node.tag_name);
    open_tag(node, tag, out);
    if VOID_ELEMENTS.contains(&tag) {
        return Ok(());
    }

    if let Some(path) = node.repeat_path() {
        if let Some(Value::Array(items)) = lookup(scope, path) {
            for item in items {
                let item_scope = item_scope(scope, item);
                out.push_str("<div>");
                for child in &node.components {
                    render_node(child, &item_scope, expander, out)?;
                }
                out.push_str("</div>");
            }
        }
    } else {
        match &node.binding {
            Some(path) => out.push_str(&handlebars::html_escape(&lookup_text(scope, path))),
            None => out.push_str(&expander.expand(&node.content, scope)?),
        }
        for child in &node.components {
            render_node(child, scope, expander, out)?;
        }
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
    Ok(())
}

/// Object items see their own fields over the enclosing scope; scalar items
/// become the scope itself (`{{this}}`).
fn item_scope(outer: &Value, item: &Value) -> Value {
    match (outer, item) {
        (Value::Object(outer), Value::Object(fields)) => {
            let mut merged = outer.clone();
            for (key, value) in fields {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => item.clone(),
    }
}

fn open_tag(node: &BuilderNode, tag: &str, out: &mut String) {
    out.push('<');
    out.push_str(tag);

    let css = inline_style(&node.style);
    if !css.is_empty() {
        push_attribute(out, "style", &css);
    }

    let classes: Vec<&str> = node
        .classes
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if !classes.is_empty() {
        push_attribute(out, "class", &classes.join(" "));
    }

    for (name, value) in &node.attributes {
        if !is_valid_name(name) || matches!(name.as_str(), "style" | "class") {
            continue;
        }
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::Bool(true) => {
                out.push(' ');
                out.push_str(name);
            }
            other => push_attribute(out, name, &display_value(other)),
        }
    }
    out.push('>');
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&handlebars::html_escape(value));
    out.push('"');
}

/// Serializes a camelCase style map into an inline CSS declaration list.
pub fn inline_style(style: &Map<String, Value>) -> String {
    style
        .iter()
        .filter_map(|(key, value)| {
            let property = kebab_case(key);
            let value = match value {
                Value::Number(n)
                    if n.as_f64() != Some(0.0)
                        && !UNITLESS_PROPERTIES.contains(&property.as_str()) =>
                {
                    format!("{}px", display_value(value))
                }
                Value::Null | Value::Object(_) | Value::Array(_) => return None,
                other => display_value(other),
            };
            (!value.trim().is_empty()).then(|| format!("{property}:{value}"))
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// `fontSize` → `font-size`, `WebkitTransform` → `-webkit-transform`.
fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn element_name(tag: &str) -> &str {
    let tag = tag.trim();
    if is_valid_name(tag) && tag.starts_with(|c: char| c.is_ascii_alphabetic()) {
        tag
    } else {
        "div"
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}
