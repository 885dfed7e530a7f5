use crate::error::Result;
use crate::model::{Field, FieldRole, Schema, Table};
use quick_xml::events::Event;
use quick_xml::Reader;
use roxmltree::Node;

/// Longest value an enumerated column can hold; relational sinks truncate
/// to this before validating.
pub const MAX_ENUM_LEN: usize = 63;

/// How wildcard (`xs:any` / `xs:anyAttribute`) content is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardStyle {
    /// Minimal re-parented XML fragment, namespace prefixes stripped.
    Fragment,
    /// Flattened `path:value` lines, one per text node, document order.
    PathValue,
}

#[derive(Debug, Clone, Copy)]
pub struct ContentOptions {
    pub fill_default_values: bool,
    pub relational: bool,
    pub wildcard_style: WildcardStyle,
}

/// Outcome of extracting one field from one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Value(String),
    Absent,
    /// Required content is missing; the whole record is incomplete.
    MissingRequired,
}

/// Extract and filter one content field. Key roles yield `Absent`; they
/// are derived at emit time, not read from the document.
pub fn extract_field(
    schema: &Schema,
    table: &Table,
    field: &Field,
    node: Node,
    as_attr: bool,
    suppress_simple_list: bool,
    opts: &ContentOptions,
) -> Result<Extracted> {
    let raw = match field.role {
        FieldRole::Attribute => {
            if field.simple_attribute {
                parent_attribute(field, node)
            } else {
                node.attribute(field.xname.as_str()).map(str::to_string)
            }
        }
        FieldRole::SimpleContent => {
            if as_attr {
                node.attribute(table.xname.as_str()).map(str::to_string)
            } else if suppress_simple_list && field.simple_primitive_list {
                // nested content takes precedence over collapsed simple content
                None
            } else {
                node.text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
            }
        }
        FieldRole::Element => node
            .children()
            .find(|c| c.is_element() && c.tag_name().name() == field.xname)
            .map(element_text),
        FieldRole::Any => wildcard_elements(schema, table, node, opts.wildcard_style)?,
        FieldRole::AnyAttribute => wildcard_attributes(schema, table, node, opts.wildcard_style),
        _ => None,
    };

    Ok(apply_filters(field, raw, opts))
}

/// Filter pipeline, applied in declaration order: default fill, forced
/// fill-text, required check, pattern, filter-out, enumeration.
fn apply_filters(field: &Field, raw: Option<String>, opts: &ContentOptions) -> Extracted {
    let mut value = raw.filter(|v| !v.is_empty());

    if value.is_none() && opts.fill_default_values {
        if let Some(default) = &field.default_value {
            value = Some(default.clone());
        }
    }

    if field.fill_this {
        value = field.filled_text.clone();
    }

    if field.required && value.as_deref().map_or(true, str::is_empty) {
        return Extracted::MissingRequired;
    }

    if let (Some(pattern), Some(v)) = (&field.pattern, value.as_deref()) {
        if !pattern.is_match(v) {
            return Extracted::Absent;
        }
    }

    if let (Some(filter), Some(v)) = (&field.filter_pattern, value.as_deref()) {
        if filter.is_match(v) {
            return Extracted::Absent;
        }
    }

    if let Some(v) = value.take() {
        value = match filter_enumeration(field, v, opts.relational) {
            Some(v) => Some(v),
            None => return Extracted::Absent,
        };
    }

    match value {
        Some(v) if !v.is_empty() => Extracted::Value(v),
        _ => Extracted::Absent,
    }
}

fn filter_enumeration(field: &Field, value: String, relational: bool) -> Option<String> {
    if relational {
        let Some(enumeration) = &field.enumeration else {
            return Some(value);
        };
        let truncated: String = value.chars().take(MAX_ENUM_LEN).collect();
        enumeration.iter().any(|e| *e == truncated).then_some(truncated)
    } else {
        let Some(extended) = &field.x_enumeration else {
            return Some(value);
        };
        extended.iter().any(|e| *e == value).then_some(value)
    }
}

/// Simple-attribute content lives on the parent node; the parent-name
/// constraint gates which parents carry it.
fn parent_attribute(field: &Field, node: Node) -> Option<String> {
    let parent = node.parent_element()?;
    if !field.matches_parent_name(parent.tag_name().name()) {
        return None;
    }
    parent.attribute(field.xname.as_str()).map(str::to_string)
}

/// Full text content of an element subtree, document order.
fn element_text(node: Node) -> String {
    let mut out = String::new();
    for descendant in node.descendants() {
        if descendant.is_text() {
            if let Some(text) = descendant.text() {
                out.push_str(text);
            }
        }
    }
    out.trim().to_string()
}

// ──────────────────────────────────────────────────────────────
// Wildcard machinery
// ──────────────────────────────────────────────────────────────

fn wildcard_elements(
    schema: &Schema,
    table: &Table,
    node: Node,
    style: WildcardStyle,
) -> Result<Option<String>> {
    let declared = table.declared_child_xnames(schema);
    let mut fragment = String::new();
    for child in node.children().filter(Node::is_element) {
        if declared.contains(child.tag_name().name()) {
            continue;
        }
        serialize_element(&mut fragment, child);
    }
    if fragment.is_empty() {
        return Ok(None);
    }
    match style {
        WildcardStyle::Fragment => Ok(Some(fragment)),
        WildcardStyle::PathValue => flatten_fragment(&fragment).map(Some),
    }
}

fn wildcard_attributes(
    schema: &Schema,
    table: &Table,
    node: Node,
    style: WildcardStyle,
) -> Option<String> {
    let declared = table.declared_attr_xnames(schema);
    let mut parts: Vec<String> = Vec::new();
    for attr in node.attributes() {
        if declared.contains(attr.name()) {
            continue;
        }
        match style {
            WildcardStyle::Fragment => {
                parts.push(format!("{}=\"{}\"", attr.name(), escape_xml(attr.value())));
            }
            WildcardStyle::PathValue => {
                parts.push(format!("@{}:{}", attr.name(), attr.value()));
            }
        }
    }
    if parts.is_empty() {
        return None;
    }
    let separator = match style {
        WildcardStyle::Fragment => " ",
        WildcardStyle::PathValue => "\n",
    };
    Some(parts.join(separator))
}

/// Re-parented serialization of an undeclared subtree. Namespace prefixes
/// are dropped; `xmlns` declarations never appear (the DOM keeps them out
/// of the attribute list).
fn serialize_element(out: &mut String, node: Node) {
    let name = node.tag_name().name();
    out.push('<');
    out.push_str(name);
    for attr in node.attributes() {
        out.push(' ');
        out.push_str(attr.name());
        out.push_str("=\"");
        out.push_str(&escape_xml(attr.value()));
        out.push('"');
    }
    let has_children = node
        .children()
        .any(|c| c.is_element() || c.text().map_or(false, |t| !t.trim().is_empty()));
    if !has_children {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in node.children() {
        if child.is_element() {
            serialize_element(out, child);
        } else if child.is_text() {
            if let Some(text) = child.text() {
                let text = text.trim();
                if !text.is_empty() {
                    out.push_str(&escape_xml(text));
                }
            }
        }
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// SAX re-parse of a serialized fragment into `path:value` lines.
fn flatten_fragment(fragment: &str) -> Result<String> {
    let mut reader = Reader::from_str(fragment);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                stack.push(name);
            }
            Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                lines.push(format!("{}:", join_path(&stack, Some(name.as_str()))));
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(ref e) => {
                if let Ok(text) = e.unescape() {
                    let text = text.trim();
                    if !text.is_empty() && !stack.is_empty() {
                        lines.push(format!("{}:{}", join_path(&stack, None), text));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(lines.join("\n"))
}

fn join_path(stack: &[String], leaf: Option<&str>) -> String {
    let mut path = stack.join("/");
    if let Some(leaf) = leaf {
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(leaf);
    }
    path
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
