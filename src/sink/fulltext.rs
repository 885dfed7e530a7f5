use crate::content::WildcardStyle;
use crate::error::Result;
use crate::model::Table;
use crate::walker::{DocContext, Record, RecordEmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFieldAttrs {
    /// Index as a typed numeric field.
    pub numeric: bool,
    /// Short tokens are stored but not tokenized for search.
    pub tokenized: bool,
}

/// Document-field accumulator contract of the full-text index sink.
pub trait IndexSink {
    fn start_document(&mut self, document_id: &str);
    fn add_field(&mut self, name: &str, value: &str, attrs: IndexFieldAttrs);
    fn end_document(&mut self);
}

/// Flattens every indexable content field of a logical record into named
/// index fields, prefixed with the table name.
pub struct FulltextEmitter<'x> {
    sink: &'x mut dyn IndexSink,
    min_token_len: usize,
    index_numbers: bool,
}

impl<'x> FulltextEmitter<'x> {
    pub fn new(sink: &'x mut dyn IndexSink, min_token_len: usize, index_numbers: bool) -> Self {
        Self {
            sink,
            min_token_len,
            index_numbers,
        }
    }
}

impl RecordEmitter for FulltextEmitter<'_> {
    fn wildcard_style(&self) -> WildcardStyle {
        WildcardStyle::PathValue
    }

    fn relational(&self) -> bool {
        false
    }

    fn emit(&mut self, _ctx: &mut DocContext<'_>, table: &Table, record: &Record) -> Result<()> {
        if !table.indexable {
            return Ok(());
        }
        for (idx, field) in table.fields.iter().enumerate() {
            if !field.indexable || !field.is_content() {
                continue;
            }
            let Some(value) = &record.values[idx] else {
                continue;
            };
            let name = format!("{}.{}", table.name, field.name);
            let attrs = IndexFieldAttrs {
                numeric: self.index_numbers
                    && field.index_as_number
                    && value.parse::<f64>().is_ok(),
                tokenized: value.chars().count() >= self.min_token_len,
            };
            self.sink.add_field(&name, value, attrs);
        }
        Ok(())
    }
}
