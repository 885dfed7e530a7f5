use crate::content::WildcardStyle;
use crate::error::{Result, SchemaError};
use crate::key::KeyValue;
use crate::model::{FieldRole, Table};
use crate::sink::key_column_value;
use crate::walker::{DocContext, Record, RecordEmitter};

/// One bind parameter for a prepared statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Bytea(Vec<u8>),
    BigInt(i64),
    Int(i32),
    SmallInt(i16),
    Null,
}

impl From<KeyValue> for SqlParam {
    fn from(value: KeyValue) -> Self {
        match value {
            KeyValue::Text(s) => SqlParam::Text(s),
            KeyValue::Bytea(b) => SqlParam::Bytea(b),
            KeyValue::BigInt(v) => SqlParam::BigInt(v),
            KeyValue::Int(v) => SqlParam::Int(v),
            KeyValue::SmallInt(v) => SqlParam::SmallInt(v),
        }
    }
}

/// One record's bind parameters: insert always, update additionally when
/// the batch runs in upsert mode.
#[derive(Debug, Clone)]
pub struct SqlRow {
    pub insert: Vec<SqlParam>,
    pub update: Option<Vec<SqlParam>>,
}

/// Prepared-statement batch executor contract. Implementations own the
/// statements (cached per table) and the batch/commit boundary.
pub trait SqlBatch {
    fn upsert(&self) -> bool;
    fn add_row(&mut self, table: &Table, row: SqlRow) -> std::result::Result<(), String>;
    fn execute(&mut self, table: &Table) -> std::result::Result<(), String>;
}

pub struct SqlEmitter<'b> {
    batch: &'b mut dyn SqlBatch,
}

impl<'b> SqlEmitter<'b> {
    pub fn new(batch: &'b mut dyn SqlBatch) -> Self {
        Self { batch }
    }
}

impl RecordEmitter for SqlEmitter<'_> {
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
        let upsert = self.batch.upsert();

        let mut insert: Vec<SqlParam> = Vec::with_capacity(table.fields.len());
        let mut update: Vec<SqlParam> = Vec::new();

        for (idx, field) in table.fields.iter().enumerate() {
            if !field.writable {
                continue;
            }
            if field.is_key() && field.role != FieldRole::DocumentKey && !rel_data_ext {
                continue;
            }
            let param = if field.is_key() {
                key_column_value(ctx, field, idx, record)
                    .map(SqlParam::from)
                    .unwrap_or(SqlParam::Null)
            } else {
                match &record.values[idx] {
                    Some(value) => SqlParam::Text(value.clone()),
                    None => SqlParam::Null,
                }
            };
            // conflict targets are identity columns; everything else is
            // written again by the update arm
            if upsert
                && !matches!(field.role, FieldRole::PrimaryKey | FieldRole::DocumentKey)
            {
                update.push(param.clone());
            }
            insert.push(param);
        }

        let row = SqlRow {
            insert,
            update: upsert.then_some(update),
        };
        self.batch.add_row(table, row).map_err(SchemaError::Sql)?;
        self.batch.execute(table).map_err(SchemaError::Sql)?;
        Ok(())
    }
}
