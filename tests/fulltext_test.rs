mod common;

use common::MockIndexSink;
use roxmltree::Document;
use xmlshred::builder::DocumentBuilder;
use xmlshred::config::{ConvertConfig, OutputFormat};
use xmlshred::model::{Field, FieldRole, Schema, Table};
use xmlshred::sink::sphinx::SphinxWriter;

fn indexable_schema() -> Schema {
    let mut nested = Field::nested("item", 1);
    nested.list_holder = true;
    let root = Table::new(
        "root",
        vec![Field::new("id", FieldRole::PrimaryKey), nested],
    );

    let mut value = Field::new("value", FieldRole::SimpleContent);
    value.index_as_number = true;
    let item = Table::new(
        "item",
        vec![Field::new("id", FieldRole::PrimaryKey), value],
    );
    Schema::new(vec![root, item])
}

const XML: &str = "<root><item>12</item><item>hello</item></root>";

#[test]
fn index_fields_are_prefixed_and_typed() {
    let schema = indexable_schema();
    let config = ConvertConfig {
        min_token_len: 3,
        ..ConvertConfig::default()
    };
    let doc = Document::parse(XML).unwrap();
    let builder = DocumentBuilder::new(&schema, OutputFormat::FullText, config, "doc1");
    let mut sink = MockIndexSink::default();
    builder.to_fulltext(&doc, &mut sink).expect("indexing succeeds");

    assert_eq!(sink.documents, vec!["doc1".to_string()]);
    assert_eq!(sink.ended, 1);
    assert_eq!(sink.fields.len(), 2);

    let (name, value, attrs) = &sink.fields[0];
    assert_eq!(name, "item.value");
    assert_eq!(value, "12");
    assert!(attrs.numeric);
    // below the minimum token length: stored, not tokenized
    assert!(!attrs.tokenized);

    let (_, value, attrs) = &sink.fields[1];
    assert_eq!(value, "hello");
    assert!(!attrs.numeric);
    assert!(attrs.tokenized);
}

#[test]
fn sphinx_feed_wraps_documents_in_an_xmlpipe2_envelope() {
    let schema = indexable_schema();
    let doc = Document::parse(XML).unwrap();
    let builder = DocumentBuilder::new(
        &schema,
        OutputFormat::Sphinx,
        ConvertConfig::default(),
        "doc1",
    );

    let mut writer = SphinxWriter::new(Vec::new());
    writer.begin(&schema).unwrap();
    builder.to_sphinx(&doc, &mut writer).expect("sphinx conversion succeeds");
    let out = writer.finish().unwrap();
    let feed = String::from_utf8(out).unwrap();

    assert!(feed.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(feed.contains("<sphinx:docset>"));
    assert!(feed.contains("<sphinx:field name=\"item__value\"/>"));
    assert!(feed.contains("<sphinx:document id=\""));
    assert!(feed.contains("<document_id>doc1</document_id>"));
    assert!(feed.contains("<item__value>12</item__value>"));
    assert!(feed.contains("<item__value>hello</item__value>"));
    assert!(feed.trim_end().ends_with("</sphinx:docset>"));
}
