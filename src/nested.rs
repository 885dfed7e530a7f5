use crate::model::{Field, Schema, TableId};
use roxmltree::Node;

/// One instance of a schema-declared parent → child relationship, bound to
/// a specific DOM position. Created fresh for every nested field discovered
/// while parsing a table, consumed by the recursion that immediately
/// follows, then dropped.
#[derive(Debug, Clone)]
pub struct NestedKey {
    pub table: TableId,
    pub list_holder: bool,
    pub as_attr: bool,
    /// Child table is not a direct structural child; it is located by name
    /// search and the traversal catches the same sibling index position.
    pub indirect: bool,
    pub target_ordinal: u32,
    pub maxoccurs: i64,
    /// Accumulated XPath-like identity prefix of the child record.
    pub current_key: String,
    /// Identity string of the enclosing record.
    pub parent_key: String,
}

impl NestedKey {
    /// Continue traversal through the same node: attribute-backed child
    /// tables and virtual targets that fold into the parent.
    pub fn as_is(schema: &Schema, field: &Field, target: TableId, current_key: &str) -> Self {
        Self {
            table: target,
            list_holder: field.list_holder,
            as_attr: field.as_attr,
            indirect: false,
            target_ordinal: 1,
            maxoccurs: field.maxoccurs,
            current_key: extend_key(schema, target, field.as_attr, current_key),
            parent_key: current_key.to_string(),
        }
    }

    /// Enter a genuinely new child element. `indirect` is set when no
    /// direct structural child bears the target name, in which case the
    /// triggering record's sibling ordinal becomes the stop position.
    pub fn as_of_child(
        schema: &Schema,
        field: &Field,
        target: TableId,
        node: Node,
        primary_key: &str,
        node_ordinal: u32,
    ) -> Self {
        let xname = schema.table(target).xname.as_str();
        let indirect = !has_direct_child_named(node, xname);
        Self {
            table: target,
            list_holder: field.list_holder,
            as_attr: field.as_attr,
            indirect,
            target_ordinal: if indirect { node_ordinal } else { 1 },
            maxoccurs: field.maxoccurs,
            current_key: extend_key(schema, target, field.as_attr, primary_key),
            parent_key: primary_key.to_string(),
        }
    }
}

/// Append the child segment to an accumulated key. Virtual targets carry
/// no identity of their own, so the key passes through unchanged.
pub fn extend_key(schema: &Schema, target: TableId, as_attr: bool, base: &str) -> String {
    let table = schema.table(target);
    if table.virtual_ {
        return base.to_string();
    }
    if as_attr {
        format!("{base}/@{}", table.xname)
    } else {
        format!("{base}/{}", table.xname)
    }
}

pub fn has_direct_child_named(node: Node, xname: &str) -> bool {
    node.children()
        .any(|c| c.is_element() && c.tag_name().name() == xname)
}

pub fn has_named_descendant(node: Node, xname: &str) -> bool {
    find_named_descendant(node, xname).is_some()
}

/// First element named `xname` in document order below `node`.
pub fn find_named_descendant<'a, 'input>(
    node: Node<'a, 'input>,
    xname: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants()
        .filter(|d| d.id() != node.id())
        .find(|d| d.is_element() && d.tag_name().name() == xname)
}

/// Name of the node an accumulated key currently points at; this is the
/// parent of whatever gets nested next. Ordinal predicates and the
/// attribute marker are stripped.
pub fn key_parent_name(key: &str) -> &str {
    strip_segment(key.rsplit('/').next().unwrap_or(key))
}

/// Name one level above [`key_parent_name`].
pub fn key_ancestor_name(key: &str) -> &str {
    let mut segments = key.rsplit('/');
    segments.next();
    strip_segment(segments.next().unwrap_or(""))
}

fn strip_segment(segment: &str) -> &str {
    let segment = segment.strip_prefix('@').unwrap_or(segment);
    match segment.find('[') {
        Some(idx) => &segment[..idx],
        None => segment,
    }
}
