mod common;

use common::{debug_config, items_schema, items_schema_with_required_code, CollectEmitter};
use roxmltree::Document;
use xmlshred::model::{Field, FieldRole, Schema, Table};
use xmlshred::walker::{DocContext, NodeWalker};

fn collect(schema: &Schema, xml: &str) -> CollectEmitter {
    let config = debug_config();
    let mut ctx = DocContext::new(schema, &config, "doc1".to_string());
    let doc = Document::parse(xml).expect("fixture xml parses");
    let mut emitter = CollectEmitter::default();
    NodeWalker::new(&mut ctx, &mut emitter)
        .walk(0, doc.root_element())
        .expect("walk succeeds");
    emitter
}

#[test]
fn list_holder_visits_each_sibling_with_ordinal_suffixes() {
    let schema = items_schema(-1);
    let emitter = collect(&schema, "<root><item>A</item><item>B</item></root>");

    assert_eq!(emitter.keys_for("root"), vec!["doc1/root"]);
    assert_eq!(
        emitter.keys_for("item"),
        vec!["doc1/root/item[1]", "doc1/root/item[2]"]
    );

    let items: Vec<_> = emitter
        .records
        .iter()
        .filter(|(name, _)| name == "item")
        .map(|(_, r)| r)
        .collect();
    assert_eq!(items[0].ordinal, 1);
    assert_eq!(items[1].ordinal, 2);
    // both children hang off the same parent record
    assert_eq!(items[0].parent_key.as_deref(), Some("doc1/root"));
    assert_eq!(items[1].parent_key.as_deref(), Some("doc1/root"));
    assert_eq!(items[0].values.last().unwrap().as_deref(), Some("A"));
    assert_eq!(items[1].values.last().unwrap().as_deref(), Some("B"));
}

#[test]
fn maxoccurs_bounds_the_scan() {
    let schema = items_schema(2);
    let emitter = collect(
        &schema,
        "<root><item>A</item><item>B</item><item>C</item></root>",
    );
    assert_eq!(
        emitter.keys_for("item"),
        vec!["doc1/root/item[1]", "doc1/root/item[2]"]
    );
}

#[test]
fn missing_required_content_skips_only_that_record() {
    let schema = items_schema_with_required_code();
    let emitter = collect(
        &schema,
        r#"<root><item code="a">A</item><item>B</item><item code="c">C</item></root>"#,
    );
    let values: Vec<_> = emitter
        .records
        .iter()
        .filter(|(name, _)| name == "item")
        .map(|(_, r)| r.values.last().unwrap().as_deref().unwrap())
        .collect();
    assert_eq!(values, vec!["A", "C"]);
    // siblings keep their own ordinal positions
    assert_eq!(
        emitter.keys_for("item"),
        vec!["doc1/root/item[1]", "doc1/root/item[3]"]
    );
}

#[test]
fn second_walk_over_the_same_document_is_a_no_op() {
    let schema = items_schema(-1);
    let config = debug_config();
    let mut ctx = DocContext::new(&schema, &config, "doc1".to_string());
    let doc = Document::parse("<root><item>A</item></root>").unwrap();
    let mut emitter = CollectEmitter::default();

    let mut walker = NodeWalker::new(&mut ctx, &mut emitter);
    walker.walk(0, doc.root_element()).unwrap();
    walker.walk(0, doc.root_element()).unwrap();

    assert_eq!(emitter.records.len(), 2); // root + item, each exactly once
}

fn entries_and_tags_schema() -> Schema {
    let mut entry_nested = Field::nested("entry", 1);
    entry_nested.list_holder = true;
    let root = Table::new(
        "root",
        vec![
            Field::new("document_id", FieldRole::DocumentKey),
            Field::new("id", FieldRole::PrimaryKey),
            entry_nested,
        ],
    );

    let mut tag_nested = Field::nested("tag", 2);
    tag_nested.list_holder = true;
    let entry = Table::new(
        "entry",
        vec![
            Field::new("id", FieldRole::PrimaryKey),
            Field::new("parent_id", FieldRole::ForeignKey),
            Field::new("value", FieldRole::SimpleContent),
            tag_nested,
        ],
    );

    let tag = Table::new(
        "tag",
        vec![
            Field::new("id", FieldRole::PrimaryKey),
            Field::new("parent_id", FieldRole::ForeignKey),
            Field::new("value", FieldRole::SimpleContent),
        ],
    );

    Schema::new(vec![root, entry, tag])
}

#[test]
fn indirect_target_catches_the_matching_sibling_position() {
    // tags sit beside the entries instead of inside them; each entry must
    // pick up the tag at its own index position and stop there
    let schema = entries_and_tags_schema();
    let emitter = collect(
        &schema,
        "<root>\
            <entry>a</entry><entry>b</entry>\
            <tag>t1</tag><tag>t2</tag><tag>t3</tag>\
         </root>",
    );

    let tags: Vec<_> = emitter
        .records
        .iter()
        .filter(|(name, _)| name == "tag")
        .map(|(_, r)| r)
        .collect();
    assert_eq!(tags.len(), 2);

    assert_eq!(tags[0].current_key, "doc1/root/entry[1]/tag[1]");
    assert_eq!(tags[0].parent_key.as_deref(), Some("doc1/root/entry[1]"));
    assert_eq!(tags[0].values[2].as_deref(), Some("t1"));

    // entry[2] stops at tag[2] even though a third tag sibling exists
    assert_eq!(tags[1].current_key, "doc1/root/entry[2]/tag[2]");
    assert_eq!(tags[1].parent_key.as_deref(), Some("doc1/root/entry[2]"));
    assert_eq!(tags[1].values[2].as_deref(), Some("t2"));
}

#[test]
fn virtual_table_folds_the_current_node_into_the_child_record() {
    let meta_nested = Field::nested("meta", 1);
    let root = Table::new(
        "root",
        vec![
            Field::new("document_id", FieldRole::DocumentKey),
            Field::new("id", FieldRole::PrimaryKey),
            meta_nested,
        ],
    );
    let mut meta = Table::new(
        "meta",
        vec![
            Field::new("lang", FieldRole::Attribute),
            Field::new("rev", FieldRole::Attribute),
        ],
    );
    meta.virtual_ = true;
    let schema = Schema::new(vec![root, meta]);

    let emitter = collect(&schema, r#"<root lang="en" rev="3"><other/></root>"#);

    let meta_records: Vec<_> = emitter
        .records
        .iter()
        .filter(|(name, _)| name == "meta")
        .map(|(_, r)| r)
        .collect();
    assert_eq!(meta_records.len(), 1);
    // identity delegates to the parent: no own key segment
    assert_eq!(meta_records[0].current_key, "doc1/root");
    assert_eq!(meta_records[0].values[0].as_deref(), Some("en"));
    assert_eq!(meta_records[0].values[1].as_deref(), Some("3"));
}

#[test]
fn blank_simple_list_record_with_no_nested_keys_is_suppressed() {
    let mut value = Field::new("value", FieldRole::SimpleContent);
    value.simple_primitive_list = true;
    let mut nested = Field::nested("item", 1);
    nested.list_holder = true;
    let root = Table::new(
        "root",
        vec![Field::new("id", FieldRole::PrimaryKey), nested],
    );
    let item = Table::new("item", vec![Field::new("id", FieldRole::PrimaryKey), value]);
    let schema = Schema::new(vec![root, item]);

    let emitter = collect(&schema, "<root><item>A</item><item>  </item></root>");
    assert_eq!(emitter.keys_for("item"), vec!["doc1/root/item[1]"]);
}
