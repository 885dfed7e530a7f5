use regex::Regex;
use std::collections::HashSet;

/// Index of a table within its [`Schema`].
pub type TableId = usize;

/// Read-only table/field model compiled from an XML Schema by an external
/// collaborator. The traversal engine never mutates it; all per-document
/// working state lives in the traversal context.
#[derive(Debug)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id]
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table_by_xname(&self, xname: &str) -> Option<TableId> {
        self.tables.iter().position(|t| t.xname == xname)
    }
}

#[derive(Debug)]
pub struct Table {
    /// Target-side name (column-file/statement/index prefix).
    pub name: String,
    /// Canonical XML-schema name matched against element local names.
    pub xname: String,
    /// No identity of its own; records fold into the parent.
    pub virtual_: bool,
    /// Expects zero-or-more repeated sibling elements.
    pub list_holder: bool,
    /// Pure join table without content fields.
    pub bridge: bool,
    pub content_holder: bool,
    pub writable: bool,
    pub jsonable: bool,
    pub indexable: bool,
    pub relational: bool,
    pub fields: Vec<Field>,
}

impl Table {
    pub fn new(name: &str, fields: Vec<Field>) -> Self {
        Self {
            name: name.to_string(),
            xname: name.to_string(),
            virtual_: false,
            list_holder: false,
            bridge: false,
            content_holder: fields.iter().any(Field::is_content),
            writable: true,
            jsonable: true,
            indexable: true,
            relational: true,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_path_restriction(&self) -> bool {
        self.fields
            .iter()
            .any(|f| !f.parent_node_names.is_empty() || !f.ancestor_node_names.is_empty())
    }

    pub fn has_simple_primitive_list(&self) -> bool {
        self.fields.iter().any(|f| f.simple_primitive_list)
    }

    /// Element names accounted for by the schema under this table: element
    /// and simple-content field names plus nested child table names.
    /// Anything else under a node of this table belongs to `xs:any`.
    pub fn declared_child_xnames<'s>(&'s self, schema: &'s Schema) -> HashSet<&'s str> {
        let mut names: HashSet<&str> = self
            .fields
            .iter()
            .filter(|f| matches!(f.role, FieldRole::Element | FieldRole::SimpleContent))
            .map(|f| f.xname.as_str())
            .collect();
        for field in &self.fields {
            if field.role == FieldRole::NestedKey {
                if let Some(target) = field.foreign_table {
                    names.insert(schema.table(target).xname.as_str());
                }
            }
        }
        names
    }

    /// Attribute names accounted for by the schema on this table's nodes.
    /// Anything else belongs to `xs:anyAttribute`.
    pub fn declared_attr_xnames<'s>(&'s self, schema: &'s Schema) -> HashSet<&'s str> {
        let mut names: HashSet<&str> = self
            .fields
            .iter()
            .filter(|f| f.role == FieldRole::Attribute)
            .map(|f| f.xname.as_str())
            .collect();
        for field in &self.fields {
            if field.role == FieldRole::NestedKey && field.as_attr {
                if let Some(target) = field.foreign_table {
                    names.insert(schema.table(target).xname.as_str());
                }
            }
        }
        names
    }
}

/// Mutually exclusive classification of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    DocumentKey,
    PrimaryKey,
    ForeignKey,
    NestedKey,
    SerialKey,
    XPathKey,
    Attribute,
    SimpleContent,
    Element,
    Any,
    AnyAttribute,
    UserKey,
    SystemKey,
}

#[derive(Debug)]
pub struct Field {
    pub name: String,
    pub xname: String,
    pub role: FieldRole,

    pub required: bool,
    pub default_value: Option<String>,
    /// Overwrite whatever was extracted with `filled_text`.
    pub fill_this: bool,
    pub filled_text: Option<String>,
    pub pattern: Option<Regex>,
    /// Content matching this pattern is dropped.
    pub filter_pattern: Option<Regex>,
    pub enumeration: Option<Vec<String>>,
    /// Extended enumeration used by non-relational sinks.
    pub x_enumeration: Option<Vec<String>>,

    pub writable: bool,
    pub jsonable: bool,
    pub indexable: bool,
    pub index_as_number: bool,

    /// Nested-key metadata: target table and how the child is reached.
    pub foreign_table: Option<TableId>,
    pub as_attr: bool,
    pub list_holder: bool,
    /// Schema-declared occurrence bound, -1 = unbounded.
    pub maxoccurs: i64,

    /// Path restrictions matched against names extracted from the
    /// accumulated key. Empty = unrestricted.
    pub parent_node_names: Vec<String>,
    pub ancestor_node_names: Vec<String>,

    /// Collapsed simple content standing in for a repeated primitive list.
    pub simple_primitive_list: bool,
    /// Simple content rendered as an attribute on the parent node.
    pub simple_attribute: bool,
}

impl Field {
    pub fn new(name: &str, role: FieldRole) -> Self {
        Self {
            name: name.to_string(),
            xname: name.to_string(),
            role,
            required: false,
            default_value: None,
            fill_this: false,
            filled_text: None,
            pattern: None,
            filter_pattern: None,
            enumeration: None,
            x_enumeration: None,
            writable: true,
            jsonable: true,
            indexable: true,
            index_as_number: false,
            foreign_table: None,
            as_attr: false,
            list_holder: false,
            maxoccurs: -1,
            parent_node_names: Vec::new(),
            ancestor_node_names: Vec::new(),
            simple_primitive_list: false,
            simple_attribute: false,
        }
    }

    /// Nested key pointing at `target`.
    pub fn nested(name: &str, target: TableId) -> Self {
        let mut field = Self::new(name, FieldRole::NestedKey);
        field.foreign_table = Some(target);
        field
    }

    pub fn is_content(&self) -> bool {
        matches!(
            self.role,
            FieldRole::Attribute
                | FieldRole::SimpleContent
                | FieldRole::Element
                | FieldRole::Any
                | FieldRole::AnyAttribute
        )
    }

    pub fn is_key(&self) -> bool {
        matches!(
            self.role,
            FieldRole::DocumentKey
                | FieldRole::PrimaryKey
                | FieldRole::ForeignKey
                | FieldRole::NestedKey
                | FieldRole::SerialKey
                | FieldRole::XPathKey
        )
    }

    pub fn matches_parent_name(&self, name: &str) -> bool {
        self.parent_node_names.is_empty() || self.parent_node_names.iter().any(|n| n == name)
    }

    pub fn matches_ancestor_name(&self, name: &str) -> bool {
        self.ancestor_node_names.is_empty() || self.ancestor_node_names.iter().any(|n| n == name)
    }
}
