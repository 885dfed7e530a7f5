use crate::config::{ConvertConfig, OutputFormat};
use crate::error::{Result, SchemaError};
use crate::model::{Schema, TableId};
use crate::sink::csv::{CsvEmitter, CsvTarget};
use crate::sink::fulltext::{FulltextEmitter, IndexSink};
use crate::sink::json::JsonEmitter;
use crate::sink::sphinx::{SphinxEmitter, SphinxWriter};
use crate::sink::sql::{SqlBatch, SqlEmitter};
use crate::walker::{DocContext, NodeWalker};
use roxmltree::Document;
use std::io::Write;

/// Per-document conversion factory: one instance per XML document, bound
/// to one output format at construction. Each entry point drains the whole
/// document into its sink and drops the traversal state on return.
///
/// Invoking an entry point for a format the builder was not constructed
/// for is a programming error and fails fast.
pub struct DocumentBuilder<'s> {
    schema: &'s Schema,
    format: OutputFormat,
    config: ConvertConfig,
    document_id: String,
}

impl<'s> DocumentBuilder<'s> {
    pub fn new(
        schema: &'s Schema,
        format: OutputFormat,
        config: ConvertConfig,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            format,
            config,
            document_id: document_id.into(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Relational rows as PostgreSQL COPY text, one stream per table.
    pub fn to_csv(&self, doc: &Document<'_>, target: &mut dyn CsvTarget) -> Result<()> {
        self.check_format(OutputFormat::PgCsv)?;
        let root_table = self.root_table(doc)?;
        let mut ctx = self.context();
        let mut emitter = CsvEmitter::new(target);
        NodeWalker::new(&mut ctx, &mut emitter).walk(root_table, doc.root_element())
    }

    /// Relational rows as prepared-statement bind parameters.
    pub fn to_sql(&self, doc: &Document<'_>, batch: &mut dyn SqlBatch) -> Result<()> {
        self.check_format(OutputFormat::PgSql)?;
        let root_table = self.root_table(doc)?;
        let mut ctx = self.context();
        let mut emitter = SqlEmitter::new(batch);
        NodeWalker::new(&mut ctx, &mut emitter).walk(root_table, doc.root_element())
    }

    /// The whole document as one JSON value in the configured layout.
    pub fn to_json(&self, doc: &Document<'_>) -> Result<serde_json::Value> {
        self.check_format(OutputFormat::Json)?;
        let root_table = self.root_table(doc)?;
        let mut ctx = self.context();
        let mut emitter = JsonEmitter::new(self.config.json_layout);
        NodeWalker::new(&mut ctx, &mut emitter).walk(root_table, doc.root_element())?;
        Ok(emitter.finish())
    }

    /// One index document accumulating every indexable field.
    pub fn to_fulltext(&self, doc: &Document<'_>, sink: &mut dyn IndexSink) -> Result<()> {
        self.check_format(OutputFormat::FullText)?;
        let root_table = self.root_table(doc)?;
        let mut ctx = self.context();
        sink.start_document(&self.document_id);
        let outcome = {
            let mut emitter = FulltextEmitter::new(
                &mut *sink,
                self.config.min_token_len,
                self.config.index_numbers,
            );
            NodeWalker::new(&mut ctx, &mut emitter).walk(root_table, doc.root_element())
        };
        sink.end_document();
        outcome
    }

    /// One `sphinx:document` element in an xmlpipe2 feed.
    pub fn to_sphinx<W: Write>(
        &self,
        doc: &Document<'_>,
        writer: &mut SphinxWriter<W>,
    ) -> Result<()> {
        self.check_format(OutputFormat::Sphinx)?;
        let root_table = self.root_table(doc)?;
        let mut ctx = self.context();
        writer.begin_document(&self.document_id)?;
        {
            let mut emitter = SphinxEmitter::new(writer);
            NodeWalker::new(&mut ctx, &mut emitter).walk(root_table, doc.root_element())?;
        }
        writer.end_document()?;
        Ok(())
    }

    fn context(&self) -> DocContext<'_> {
        DocContext::new(self.schema, &self.config, self.document_id.clone())
    }

    fn check_format(&self, requested: OutputFormat) -> Result<()> {
        if self.format == requested {
            Ok(())
        } else {
            Err(SchemaError::Misconfigured {
                configured: self.format,
                requested,
            })
        }
    }

    fn root_table(&self, doc: &Document<'_>) -> Result<TableId> {
        let name = doc.root_element().tag_name().name();
        self.schema
            .table_by_xname(name)
            .ok_or_else(|| SchemaError::UnknownRoot(name.to_string()))
    }
}
