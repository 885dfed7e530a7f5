use crate::config::JsonLayout;
use crate::content::WildcardStyle;
use crate::error::Result;
use crate::key::KeyValue;
use crate::model::Table;
use crate::sink::key_column_value;
use crate::walker::{DocContext, Record, RecordEmitter};
use serde_json::{Map, Value};

/// JSON output in one of three layouts. Column and relational layouts
/// group records per table; the object layout mirrors the traversal's
/// nesting through the `begin_nested`/`end_nested` hooks, so indentation
/// follows the recursion depth when the value is pretty-printed.
pub struct JsonEmitter {
    layout: JsonLayout,
    tables: Map<String, Value>,
    frames: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    name: String,
    list_holder: bool,
    records: Vec<Value>,
}

impl JsonEmitter {
    pub fn new(layout: JsonLayout) -> Self {
        Self {
            layout,
            tables: Map::new(),
            frames: vec![Frame {
                name: String::new(),
                list_holder: true,
                records: Vec::new(),
            }],
        }
    }

    pub fn finish(mut self) -> Value {
        match self.layout {
            JsonLayout::Column | JsonLayout::Relational => Value::Object(self.tables),
            JsonLayout::Object => {
                let mut root = self.frames.remove(0);
                if root.records.len() == 1 {
                    root.records.remove(0)
                } else {
                    Value::Array(root.records)
                }
            }
        }
    }

    fn record_value(&self, ctx: &mut DocContext<'_>, table: &Table, record: &Record) -> Value {
        let with_keys = self.layout == JsonLayout::Relational;
        let mut obj = Map::new();
        for (idx, field) in table.fields.iter().enumerate() {
            if !field.jsonable {
                continue;
            }
            if field.is_key() {
                if with_keys {
                    if let Some(kv) = key_column_value(ctx, field, idx, record) {
                        obj.insert(field.name.clone(), key_json(kv));
                    }
                }
                continue;
            }
            if let Some(value) = &record.values[idx] {
                obj.insert(field.name.clone(), Value::String(value.clone()));
            }
        }
        Value::Object(obj)
    }
}

impl RecordEmitter for JsonEmitter {
    fn wildcard_style(&self) -> WildcardStyle {
        WildcardStyle::PathValue
    }

    fn relational(&self) -> bool {
        self.layout == JsonLayout::Relational
    }

    fn emit(&mut self, ctx: &mut DocContext<'_>, table: &Table, record: &Record) -> Result<()> {
        if !table.jsonable {
            return Ok(());
        }
        let value = self.record_value(ctx, table, record);
        match self.layout {
            JsonLayout::Column | JsonLayout::Relational => {
                let entry = self
                    .tables
                    .entry(table.name.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(records) = entry {
                    records.push(value);
                }
            }
            JsonLayout::Object => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.records.push(value);
                }
            }
        }
        Ok(())
    }

    fn begin_nested(&mut self, table: &Table, list_holder: bool) -> Result<()> {
        if self.layout == JsonLayout::Object {
            self.frames.push(Frame {
                name: table.name.clone(),
                list_holder,
                records: Vec::new(),
            });
        }
        Ok(())
    }

    fn end_nested(&mut self, _table: &Table) -> Result<()> {
        if self.layout != JsonLayout::Object {
            return Ok(());
        }
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        if frame.records.is_empty() {
            return Ok(());
        }
        let value = if frame.list_holder || frame.records.len() > 1 {
            Value::Array(frame.records)
        } else {
            frame
                .records
                .into_iter()
                .next()
                .expect("frame checked non-empty")
        };
        let Some(parent) = self.frames.last_mut() else {
            return Ok(());
        };
        match parent.records.last_mut().and_then(Value::as_object_mut) {
            Some(parent_record) => {
                parent_record.insert(frame.name, value);
            }
            None => {
                // children of an unwritten (incomplete) parent record still
                // surface, hoisted into the enclosing scope
                let mut wrapper = Map::new();
                wrapper.insert(frame.name, value);
                parent.records.push(Value::Object(wrapper));
            }
        }
        Ok(())
    }
}

fn key_json(value: KeyValue) -> Value {
    match value {
        KeyValue::Text(s) => Value::String(s),
        KeyValue::Bytea(_) => Value::String(value.as_pg_literal()),
        KeyValue::BigInt(v) => Value::from(v),
        KeyValue::Int(v) => Value::from(v),
        KeyValue::SmallInt(v) => Value::from(v),
    }
}
