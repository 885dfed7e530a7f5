#![allow(dead_code)]
use std::path::Path;
use xmlshred::config::{ConvertConfig, HashAlgorithm};
use xmlshred::content::WildcardStyle;
use xmlshred::error::Result;
use xmlshred::model::{Field, FieldRole, Schema, Table};
use xmlshred::sink::fulltext::{IndexFieldAttrs, IndexSink};
use xmlshred::sink::sql::{SqlBatch, SqlRow};
use xmlshred::walker::{DocContext, Record, RecordEmitter};

pub fn fixtures_dir() -> String {
    format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR"))
}

pub fn load_fixture(filename: &str) -> String {
    let path = Path::new(&fixtures_dir()).join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

/// Raw identity keys instead of digests, so assertions can read them.
pub fn debug_config() -> ConvertConfig {
    ConvertConfig {
        hash_algorithm: HashAlgorithm::Debug,
        ..ConvertConfig::default()
    }
}

fn key_fields(foreign: bool) -> Vec<Field> {
    let mut fields = vec![
        Field::new("document_id", FieldRole::DocumentKey),
        Field::new("id", FieldRole::PrimaryKey),
    ];
    if foreign {
        fields.push(Field::new("parent_id", FieldRole::ForeignKey));
        fields.push(Field::new("ord", FieldRole::SerialKey));
    }
    fields
}

/// `root` with a list-holder nested child `item` carrying simple content.
pub fn items_schema(maxoccurs: i64) -> Schema {
    let mut nested = Field::nested("item", 1);
    nested.list_holder = true;
    nested.maxoccurs = maxoccurs;

    let mut root_fields = key_fields(false);
    root_fields.push(nested);
    let root = Table::new("root", root_fields);

    let mut item_fields = key_fields(true);
    item_fields.push(Field::new("value", FieldRole::SimpleContent));
    let mut item = Table::new("item", item_fields);
    item.list_holder = true;

    Schema::new(vec![root, item])
}

/// Like [`items_schema`] but each item requires a `code` attribute.
pub fn items_schema_with_required_code() -> Schema {
    let mut nested = Field::nested("item", 1);
    nested.list_holder = true;

    let mut root_fields = key_fields(false);
    root_fields.push(nested);
    let root = Table::new("root", root_fields);

    let mut code = Field::new("code", FieldRole::Attribute);
    code.required = true;
    let mut item_fields = key_fields(true);
    item_fields.push(code);
    item_fields.push(Field::new("value", FieldRole::SimpleContent));
    let item = Table::new("item", item_fields);

    Schema::new(vec![root, item])
}

/// Records captured straight off the walker, before any sink formatting.
#[derive(Debug, Default)]
pub struct CollectEmitter {
    pub records: Vec<(String, Record)>,
}

impl CollectEmitter {
    pub fn keys_for(&self, table: &str) -> Vec<&str> {
        self.records
            .iter()
            .filter(|(name, _)| name == table)
            .map(|(_, r)| r.current_key.as_str())
            .collect()
    }
}

impl RecordEmitter for CollectEmitter {
    fn wildcard_style(&self) -> WildcardStyle {
        WildcardStyle::PathValue
    }

    fn relational(&self) -> bool {
        false
    }

    fn emit(&mut self, _ctx: &mut DocContext<'_>, table: &Table, record: &Record) -> Result<()> {
        self.records.push((table.name.clone(), record.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockSqlBatch {
    pub upsert: bool,
    pub rows: Vec<(String, SqlRow)>,
    pub executes: usize,
}

impl SqlBatch for MockSqlBatch {
    fn upsert(&self) -> bool {
        self.upsert
    }

    fn add_row(&mut self, table: &Table, row: SqlRow) -> std::result::Result<(), String> {
        self.rows.push((table.name.clone(), row));
        Ok(())
    }

    fn execute(&mut self, _table: &Table) -> std::result::Result<(), String> {
        self.executes += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockIndexSink {
    pub documents: Vec<String>,
    pub fields: Vec<(String, String, IndexFieldAttrs)>,
    pub ended: usize,
}

impl IndexSink for MockIndexSink {
    fn start_document(&mut self, document_id: &str) {
        self.documents.push(document_id.to_string());
    }

    fn add_field(&mut self, name: &str, value: &str, attrs: IndexFieldAttrs) {
        self.fields.push((name.to_string(), value.to_string(), attrs));
    }

    fn end_document(&mut self) {
        self.ended += 1;
    }
}
