use crate::content::WildcardStyle;
use crate::error::Result;
use crate::key::digest_u64;
use crate::model::{Schema, Table};
use crate::walker::{DocContext, Record, RecordEmitter};
use std::io::{self, Write};

/// Line-oriented xmlpipe2 feed: a docset envelope, a schema declaration,
/// then one `sphinx:document` per XML document.
pub struct SphinxWriter<W: Write> {
    out: W,
}

impl<W: Write> SphinxWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Docset header with one declared field per indexable column.
    pub fn begin(&mut self, schema: &Schema) -> io::Result<()> {
        writeln!(self.out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
        writeln!(self.out, "<sphinx:docset>")?;
        writeln!(self.out, "<sphinx:schema>")?;
        writeln!(
            self.out,
            "<sphinx:attr name=\"document_id\" type=\"string\"/>"
        )?;
        for table in schema.tables() {
            if !table.indexable {
                continue;
            }
            for field in &table.fields {
                if !field.indexable || !field.is_content() {
                    continue;
                }
                writeln!(
                    self.out,
                    "<sphinx:field name=\"{}\"/>",
                    field_name(table, &field.name)
                )?;
            }
        }
        writeln!(self.out, "</sphinx:schema>")
    }

    pub fn begin_document(&mut self, document_id: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "<sphinx:document id=\"{}\">",
            digest_u64(document_id)
        )?;
        writeln!(
            self.out,
            "<document_id>{}</document_id>",
            escape_xml(document_id)
        )
    }

    pub fn field(&mut self, name: &str, value: &str) -> io::Result<()> {
        writeln!(self.out, "<{name}>{}</{name}>", escape_xml(value))
    }

    pub fn end_document(&mut self) -> io::Result<()> {
        writeln!(self.out, "</sphinx:document>")
    }

    pub fn finish(mut self) -> io::Result<W> {
        writeln!(self.out, "</sphinx:docset>")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

pub struct SphinxEmitter<'w, W: Write> {
    writer: &'w mut SphinxWriter<W>,
}

impl<'w, W: Write> SphinxEmitter<'w, W> {
    pub fn new(writer: &'w mut SphinxWriter<W>) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordEmitter for SphinxEmitter<'_, W> {
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
            if let Some(value) = &record.values[idx] {
                self.writer.field(&field_name(table, &field.name), value)?;
            }
        }
        Ok(())
    }
}

/// xmlpipe2 element names cannot carry dots; tables and fields join with
/// a double underscore instead.
fn field_name(table: &Table, field: &str) -> String {
    format!("{}__{}", table.name, field)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
