mod common;

use common::{debug_config, items_schema};
use roxmltree::Document;
use xmlshred::builder::DocumentBuilder;
use xmlshred::config::OutputFormat;
use xmlshred::error::SchemaError;
use xmlshred::sink::csv::CsvBuffers;

#[test]
fn wrong_entry_point_for_the_configured_format_fails_fast() {
    let schema = items_schema(-1);
    let builder = DocumentBuilder::new(&schema, OutputFormat::PgCsv, debug_config(), "doc1");
    let doc = Document::parse("<root><item>A</item></root>").unwrap();

    match builder.to_json(&doc) {
        Err(SchemaError::Misconfigured {
            configured,
            requested,
        }) => {
            assert_eq!(configured, OutputFormat::PgCsv);
            assert_eq!(requested, OutputFormat::Json);
        }
        other => panic!("expected misconfiguration error, got {other:?}"),
    }
}

#[test]
fn unknown_root_element_is_rejected() {
    let schema = items_schema(-1);
    let builder = DocumentBuilder::new(&schema, OutputFormat::PgCsv, debug_config(), "doc1");
    let doc = Document::parse("<stranger/>").unwrap();
    let mut target = CsvBuffers::new();

    match builder.to_csv(&doc, &mut target) {
        Err(SchemaError::UnknownRoot(name)) => assert_eq!(name, "stranger"),
        other => panic!("expected unknown-root error, got {other:?}"),
    }
}

#[test]
fn xpath_key_drops_the_document_prefix() {
    use xmlshred::model::{Field, FieldRole, Schema, Table};

    let schema = Schema::new(vec![Table::new(
        "root",
        vec![
            Field::new("id", FieldRole::PrimaryKey),
            Field::new("xpath", FieldRole::XPathKey),
            Field::new("name", FieldRole::Element),
        ],
    )]);
    let builder = DocumentBuilder::new(&schema, OutputFormat::PgCsv, debug_config(), "doc1");
    let doc = Document::parse("<root><name>n</name></root>").unwrap();
    let mut target = CsvBuffers::new();
    builder.to_csv(&doc, &mut target).unwrap();

    assert_eq!(target.rows("root"), vec!["doc1/root\t/root\tn"]);
}

#[test]
fn csv_rows_keep_debug_keys_readable() {
    let schema = items_schema(-1);
    let builder = DocumentBuilder::new(&schema, OutputFormat::PgCsv, debug_config(), "doc1");
    let doc = Document::parse("<root><item>A\tB</item></root>").unwrap();
    let mut target = CsvBuffers::new();
    builder.to_csv(&doc, &mut target).expect("csv conversion succeeds");

    assert_eq!(target.rows("root"), vec!["doc1\tdoc1/root\tdoc1/root/item"]);
    assert_eq!(
        target.rows("item"),
        vec!["doc1\tdoc1/root/item[1]\tdoc1/root\t1\tA\\tB"]
    );
}
