use crate::config::ConvertConfig;
use crate::content::{extract_field, ContentOptions, Extracted, WildcardStyle};
use crate::error::Result;
use crate::key::{KeyDeriver, KeyValue};
use crate::model::{Field, FieldRole, Schema, Table, TableId};
use crate::nested::{
    has_direct_child_named, has_named_descendant, key_ancestor_name, key_parent_name, NestedKey,
};
use crate::tester::NodeTester;
use roxmltree::Node;
use std::collections::HashMap;

/// Per-document traversal state: document identity, the worker's key
/// deriver, and the visited-key map that scopes record deduplication to
/// this document. The schema itself stays read-only.
pub struct DocContext<'s> {
    pub schema: &'s Schema,
    pub config: &'s ConvertConfig,
    pub document_id: String,
    deriver: KeyDeriver,
    visited: HashMap<TableId, String>,
}

impl<'s> DocContext<'s> {
    pub fn new(schema: &'s Schema, config: &'s ConvertConfig, document_id: String) -> Self {
        Self {
            schema,
            config,
            document_id,
            deriver: KeyDeriver::new(config.hash_algorithm, config.hash_size),
            visited: HashMap::new(),
        }
    }

    pub fn hash_key(&mut self, key: &str) -> KeyValue {
        self.deriver.hash_key(key)
    }

    /// Identity key with the document prefix removed, for xpath keys.
    pub fn xpath_of(&self, key: &str) -> String {
        key.strip_prefix(self.document_id.as_str())
            .unwrap_or(key)
            .to_string()
    }
}

/// One staged logical record, ready for a sink. `values` is indexed by the
/// table's field declaration order; key columns are derived at emit time
/// from the identity strings carried here.
#[derive(Debug, Clone)]
pub struct Record {
    pub table: TableId,
    pub current_key: String,
    pub parent_key: Option<String>,
    /// Sibling ordinal of this record, feeds serial keys.
    pub ordinal: u32,
    pub values: Vec<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    Complete,
    /// A required content field was missing; nothing is written but
    /// already-staged nested keys are still descended.
    Incomplete,
    /// All simple-primitive-list content was null and no nested keys were
    /// found; the blank record is suppressed.
    Empty,
}

/// Output strategy plugged into the single traversal. One walker, five of
/// these: relational CSV, SQL batches, JSON layouts, full-text index
/// fields, Sphinx xmlpipe2.
pub trait RecordEmitter {
    fn wildcard_style(&self) -> WildcardStyle;
    /// Relational sinks truncate enumerations and honor `rel_data_ext`.
    fn relational(&self) -> bool;
    fn emit(&mut self, ctx: &mut DocContext<'_>, table: &Table, record: &Record) -> Result<()>;
    /// Hooks for emitters that mirror the nesting structure (JSON object
    /// layout); others ignore them.
    fn begin_nested(&mut self, _table: &Table, _list_holder: bool) -> Result<()> {
        Ok(())
    }
    fn end_nested(&mut self, _table: &Table) -> Result<()> {
        Ok(())
    }
}

/// Recursive descent over one document: parse the current node's fields,
/// discover nested keys, recurse per nested key, emitting one logical
/// record per accepted (table, key) pair.
pub struct NodeWalker<'c, 's, E: RecordEmitter> {
    ctx: &'c mut DocContext<'s>,
    emitter: &'c mut E,
}

impl<'c, 's, E: RecordEmitter> NodeWalker<'c, 's, E> {
    pub fn new(ctx: &'c mut DocContext<'s>, emitter: &'c mut E) -> Self {
        Self { ctx, emitter }
    }

    pub fn walk(&mut self, root_table: TableId, root: Node<'_, '_>) -> Result<()> {
        let table = self.ctx.schema.table(root_table);
        let root_key = format!("{}/{}", self.ctx.document_id, table.xname);
        let tester = NodeTester::root(root_table, table, root, root_key);
        let node = tester.proc_node.unwrap_or(root);
        let key = tester.proc_key.clone();
        self.parse_node(root_table, node, &key, None, 1, false)
    }

    fn parse_node(
        &mut self,
        table_id: TableId,
        node: Node<'_, '_>,
        current_key: &str,
        parent_key: Option<&str>,
        ordinal: u32,
        as_attr: bool,
    ) -> Result<()> {
        let table = self.ctx.schema.table(table_id);

        if !table.virtual_
            && self
                .ctx
                .visited
                .get(&table_id)
                .is_some_and(|key| key == current_key)
        {
            return Ok(());
        }

        let (outcome, values, nested) =
            self.read_fields(table, node, current_key, ordinal, as_attr)?;

        if outcome == ParseOutcome::Complete {
            let record = Record {
                table: table_id,
                current_key: current_key.to_string(),
                parent_key: parent_key.map(str::to_string),
                ordinal,
                values,
            };
            self.emitter.emit(self.ctx, table, &record)?;
            if !table.virtual_ {
                self.ctx
                    .visited
                    .insert(table_id, current_key.to_string());
            }
        }

        for nested_key in &nested {
            self.traverse_nested(node, nested_key)?;
        }
        Ok(())
    }

    /// Field iteration in declaration order: stage content values, collect
    /// nested keys. Stops extracting content at the first missing required
    /// field; nested keys staged before that point survive.
    fn read_fields(
        &mut self,
        table: &Table,
        node: Node<'_, '_>,
        current_key: &str,
        ordinal: u32,
        as_attr: bool,
    ) -> Result<(ParseOutcome, Vec<Option<String>>, Vec<NestedKey>)> {
        let schema = self.ctx.schema;
        let mut values: Vec<Option<String>> = vec![None; table.fields.len()];
        let mut nested: Vec<NestedKey> = Vec::new();

        let (parent_name, ancestor_name) = if table.has_path_restriction() {
            (key_parent_name(current_key), key_ancestor_name(current_key))
        } else {
            ("", "")
        };

        let suppress_simple_list = table.has_simple_primitive_list()
            && table.fields.iter().any(|f| {
                f.role == FieldRole::NestedKey
                    && f.matches_parent_name(key_parent_name(current_key))
            });

        let opts = ContentOptions {
            fill_default_values: self.ctx.config.fill_default_values,
            relational: self.emitter.relational(),
            wildcard_style: self.emitter.wildcard_style(),
        };

        for (idx, field) in table.fields.iter().enumerate() {
            match field.role {
                FieldRole::DocumentKey => values[idx] = Some(self.ctx.document_id.clone()),
                FieldRole::PrimaryKey
                | FieldRole::ForeignKey
                | FieldRole::SerialKey
                | FieldRole::XPathKey
                | FieldRole::UserKey
                | FieldRole::SystemKey => {}
                FieldRole::NestedKey => {
                    if !table.has_path_restriction()
                        || (field.matches_parent_name(parent_name)
                            && field.matches_ancestor_name(ancestor_name))
                    {
                        if let Some(nested_key) =
                            set_nested_key(schema, field, node, current_key, ordinal)
                        {
                            values[idx] = Some(nested_key.current_key.clone());
                            nested.push(nested_key);
                        }
                    }
                }
                _ => {
                    match extract_field(schema, table, field, node, as_attr, suppress_simple_list, &opts)? {
                        Extracted::Value(v) => values[idx] = Some(v),
                        Extracted::Absent => {}
                        Extracted::MissingRequired => {
                            return Ok((ParseOutcome::Incomplete, values, nested));
                        }
                    }
                }
            }
        }

        if nested.is_empty() && table.has_simple_primitive_list() {
            let all_null = table
                .fields
                .iter()
                .zip(&values)
                .all(|(f, v)| !f.simple_primitive_list || v.is_none());
            if all_null {
                return Ok((ParseOutcome::Empty, values, nested));
            }
        }

        Ok((ParseOutcome::Complete, values, nested))
    }

    /// Scan for the nested key's child records and recurse into each. For
    /// indirect targets the scan runs over the current node's sibling list
    /// (its parent's children), catching the matching index position.
    fn traverse_nested(&mut self, node: Node<'_, '_>, nested_key: &NestedKey) -> Result<()> {
        let schema = self.ctx.schema;
        let table = schema.table(nested_key.table);
        self.emitter.begin_nested(table, nested_key.list_holder)?;

        let scan_parent = if nested_key.indirect {
            node.parent_element().unwrap_or(node)
        } else {
            node
        };

        let mut tester = NodeTester::for_traversal(schema, scan_parent, nested_key);
        let mut visited_any = false;
        let mut child = scan_parent.first_element_child();
        while let Some(candidate) = child {
            child = candidate.next_sibling_element();
            if tester.is_omissible(&self.ctx.visited, candidate) {
                continue;
            }
            let proc_node = tester.proc_node.unwrap_or(candidate);
            let proc_key = tester.proc_key.clone();
            let node_ordinal = tester.node_ordinal;
            let last = tester.is_last_node();
            self.parse_node(
                nested_key.table,
                proc_node,
                &proc_key,
                Some(nested_key.parent_key.as_str()),
                node_ordinal,
                nested_key.as_attr,
            )?;
            visited_any = true;
            if last {
                break;
            }
        }

        // no child element qualified: virtual and attribute-backed targets
        // fold the current node itself into the child record
        if !visited_any && (table.virtual_ || nested_key.as_attr) {
            self.parse_node(
                nested_key.table,
                node,
                &nested_key.current_key,
                Some(nested_key.parent_key.as_str()),
                1,
                nested_key.as_attr,
            )?;
        }

        self.emitter.end_nested(table)?;
        Ok(())
    }
}

/// Validate constraints and materialize one nested-key instance, checking
/// that the target actually exists under this node unless it is virtual.
fn set_nested_key(
    schema: &Schema,
    field: &Field,
    node: Node<'_, '_>,
    current_key: &str,
    node_ordinal: u32,
) -> Option<NestedKey> {
    let target = field.foreign_table?;
    let target_table = schema.table(target);

    if target_table.virtual_ {
        return Some(NestedKey::as_is(schema, field, target, current_key));
    }

    if field.as_attr {
        if !node.has_attribute(target_table.xname.as_str()) {
            return None;
        }
        return Some(NestedKey::as_is(schema, field, target, current_key));
    }

    let xname = target_table.xname.as_str();
    if has_direct_child_named(node, xname)
        || has_named_descendant(node, xname)
        || node
            .parent_element()
            .map_or(false, |p| has_direct_child_named(p, xname))
    {
        Some(NestedKey::as_of_child(
            schema,
            field,
            target,
            node,
            current_key,
            node_ordinal,
        ))
    } else {
        None
    }
}
