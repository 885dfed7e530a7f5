use crate::model::{Schema, Table, TableId};
use crate::nested::{find_named_descendant, NestedKey};
use roxmltree::Node;
use std::collections::HashMap;

/// Per-nesting-level traversal cursor: decides which candidate sibling
/// nodes belong to the child table, tracks the 1-based sibling ordinal for
/// list holders, and detects the last qualifying sibling.
///
/// `is_last_node` must be called exactly once per node that passed
/// `is_omissible`; the ordinal is sibling-position-based, not tied to node
/// identity.
#[derive(Debug)]
pub struct NodeTester<'s, 'd> {
    table: TableId,
    table_xname: &'s str,
    virtual_: bool,
    list_holder: bool,
    as_attr: bool,
    indirect: bool,
    target_ordinal: u32,
    maxoccurs: i64,
    key_base: String,
    pub parent_key: String,
    pub node_ordinal: u32,
    /// Node the accepted record is parsed from; may differ from the
    /// scanned candidate for virtual tables and indirect targets.
    pub proc_node: Option<Node<'d, 'd>>,
    pub proc_key: String,
    cur_node: Option<Node<'d, 'd>>,
    last_node: Option<Option<Node<'d, 'd>>>,
    parent_node: Option<Node<'d, 'd>>,
}

impl<'s, 'd> NodeTester<'s, 'd> {
    /// Prime for the document root table: single instance, no ordinal
    /// tracking.
    pub fn root(table_id: TableId, table: &'s Table, node: Node<'d, 'd>, root_key: String) -> Self {
        Self {
            table: table_id,
            table_xname: &table.xname,
            virtual_: table.virtual_,
            list_holder: false,
            as_attr: false,
            indirect: false,
            target_ordinal: 1,
            maxoccurs: -1,
            key_base: root_key.clone(),
            parent_key: String::new(),
            node_ordinal: 1,
            proc_node: Some(node),
            proc_key: root_key,
            cur_node: Some(node),
            last_node: None,
            parent_node: None,
        }
    }

    /// Prime for a child scan over `parent_node`'s element children,
    /// carrying the relationship instance captured in the nested key.
    pub fn for_traversal(schema: &'s Schema, parent_node: Node<'d, 'd>, nested_key: &NestedKey) -> Self {
        let table = schema.table(nested_key.table);
        Self {
            table: nested_key.table,
            table_xname: &table.xname,
            virtual_: table.virtual_,
            list_holder: nested_key.list_holder,
            as_attr: nested_key.as_attr,
            indirect: nested_key.indirect,
            target_ordinal: nested_key.target_ordinal,
            maxoccurs: nested_key.maxoccurs,
            key_base: nested_key.current_key.clone(),
            parent_key: nested_key.parent_key.clone(),
            node_ordinal: 1,
            proc_node: None,
            proc_key: String::new(),
            cur_node: None,
            last_node: None,
            parent_node: Some(parent_node),
        }
    }

    /// Core filter: true when `node` must be skipped. On acceptance,
    /// `proc_node` and `proc_key` describe the record to parse.
    pub fn is_omissible(&mut self, visited: &HashMap<TableId, String>, node: Node<'d, 'd>) -> bool {
        let mut located: Option<Node<'d, 'd>> = None;

        if node.tag_name().name() != self.table_xname {
            if self.indirect {
                located = find_named_descendant(node, self.table_xname);
                if located.is_none() {
                    return true;
                }
            } else if self.as_attr {
                let reachable = node.has_attribute(self.table_xname)
                    || self
                        .parent_node
                        .map_or(false, |p| p.has_attribute(self.table_xname));
                if !reachable {
                    return true;
                }
            } else {
                return true;
            }
        }

        if self.list_holder {
            if self.indirect && self.node_ordinal < self.target_ordinal {
                // a matching sibling belonging to an earlier record in a
                // parallel repeated list; consumes an ordinal slot
                self.node_ordinal += 1;
                return true;
            }
            if self.maxoccurs >= 0 && i64::from(self.node_ordinal) > self.maxoccurs {
                return true;
            }
            self.proc_key = format!("{}[{}]", self.key_base, self.node_ordinal);
            if self.last_node.is_none() {
                self.last_node = Some(self.resolve_last_node());
            }
        } else {
            self.proc_key = self.key_base.clone();
        }

        if !self.virtual_
            && visited
                .get(&self.table)
                .is_some_and(|key| key == &self.proc_key)
        {
            return true;
        }

        self.cur_node = Some(node);
        self.proc_node = Some(if self.virtual_ {
            self.parent_node.unwrap_or(node)
        } else if let Some(descendant) = located {
            descendant
        } else {
            node
        });
        false
    }

    /// True once the scan has reached its final qualifying sibling.
    /// Increments the ordinal; call exactly once per accepted node.
    pub fn is_last_node(&mut self) -> bool {
        let last = if !self.list_holder {
            true
        } else if self.indirect && self.node_ordinal >= self.target_ordinal {
            true
        } else if self.maxoccurs >= 0 && i64::from(self.node_ordinal) >= self.maxoccurs {
            true
        } else {
            match self.last_node {
                Some(Some(last)) => self.cur_node == Some(last),
                // no qualifying sibling resolved at all
                _ => true,
            }
        };
        self.node_ordinal += 1;
        last
    }

    /// Reverse scan from the parent's last element child for the first
    /// qualifying sibling; resolved at most once per nesting level.
    fn resolve_last_node(&self) -> Option<Node<'d, 'd>> {
        let parent = self.parent_node?;
        let mut cursor = parent.last_element_child();
        while let Some(node) = cursor {
            if self.candidate_matches(node) {
                return Some(node);
            }
            cursor = node.prev_sibling_element();
        }
        None
    }

    fn candidate_matches(&self, node: Node<'d, 'd>) -> bool {
        node.tag_name().name() == self.table_xname
            || (self.indirect && find_named_descendant(node, self.table_xname).is_some())
    }
}
