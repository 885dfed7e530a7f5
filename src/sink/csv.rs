use crate::content::WildcardStyle;
use crate::error::Result;
use crate::model::{FieldRole, Table};
use crate::sink::key_column_value;
use crate::walker::{DocContext, Record, RecordEmitter};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

const PG_NULL: &str = "\\N";

/// Buffered-text appender contract for the CSV/TSV sink: one stream of
/// rows per table.
pub trait CsvTarget {
    fn append(&mut self, table: &Table, line: &str) -> io::Result<()>;
}

/// One `.tsv` file per table under a directory. The suffix keeps parallel
/// workers writing disjoint file sets.
pub struct CsvFiles {
    dir: PathBuf,
    suffix: String,
    files: HashMap<String, BufWriter<File>>,
}

impl CsvFiles {
    pub fn new(dir: impl Into<PathBuf>, suffix: &str) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.to_string(),
            files: HashMap::new(),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for writer in self.files.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl CsvTarget for CsvFiles {
    fn append(&mut self, table: &Table, line: &str) -> io::Result<()> {
        if !self.files.contains_key(&table.name) {
            let path = self.dir.join(format!("{}{}.tsv", table.name, self.suffix));
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            self.files.insert(table.name.clone(), BufWriter::new(file));
        }
        let writer = self
            .files
            .get_mut(&table.name)
            .expect("writer inserted above");
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")
    }
}

/// In-memory target, used by tests and by callers that post-process rows.
#[derive(Debug, Default)]
pub struct CsvBuffers {
    pub tables: BTreeMap<String, String>,
}

impl CsvBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> Vec<&str> {
        self.tables
            .get(table)
            .map(|buf| buf.lines().collect())
            .unwrap_or_default()
    }
}

impl CsvTarget for CsvBuffers {
    fn append(&mut self, table: &Table, line: &str) -> io::Result<()> {
        let buf = self.tables.entry(table.name.clone()).or_default();
        buf.push_str(line);
        buf.push('\n');
        Ok(())
    }
}

pub struct CsvEmitter<'w> {
    target: &'w mut dyn CsvTarget,
}

impl<'w> CsvEmitter<'w> {
    pub fn new(target: &'w mut dyn CsvTarget) -> Self {
        Self { target }
    }
}

impl RecordEmitter for CsvEmitter<'_> {
    fn wildcard_style(&self) -> WildcardStyle {
        WildcardStyle::Fragment
    }

    fn relational(&self) -> bool {
        true
    }

    fn emit(&mut self, ctx: &mut DocContext<'_>, table: &Table, record: &Record) -> Result<()> {
        if !table.writable {
            return Ok(());
        }
        let rel_data_ext = ctx.config.rel_data_ext;
        let mut cells: Vec<String> = Vec::with_capacity(table.fields.len());
        for (idx, field) in table.fields.iter().enumerate() {
            if !field.writable {
                continue;
            }
            if field.is_key() && field.role != FieldRole::DocumentKey && !rel_data_ext {
                continue;
            }
            let cell = if field.is_key() {
                key_column_value(ctx, field, idx, record)
                    .map(|kv| kv.as_pg_literal())
                    .unwrap_or_else(|| PG_NULL.to_string())
            } else {
                match &record.values[idx] {
                    Some(value) => escape_copy(value),
                    None => PG_NULL.to_string(),
                }
            };
            cells.push(cell);
        }
        self.target.append(table, &cells.join("\t"))?;
        Ok(())
    }
}

/// PostgreSQL text-format escaping for COPY input.
fn escape_copy(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_escaping() {
        assert_eq!(escape_copy("a\tb"), "a\\tb");
        assert_eq!(escape_copy("a\\b"), "a\\\\b");
        assert_eq!(escape_copy("a\nb"), "a\\nb");
    }
}
