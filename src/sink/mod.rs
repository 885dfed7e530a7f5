pub mod csv;
pub mod fulltext;
pub mod json;
pub mod sphinx;
pub mod sql;

use crate::key::{serial_value, KeyValue};
use crate::model::{Field, FieldRole};
use crate::walker::{DocContext, Record};

/// Derive the sink value of a key column from the identity strings staged
/// on the record. Content and user/system columns yield `None`.
pub(crate) fn key_column_value(
    ctx: &mut DocContext<'_>,
    field: &Field,
    idx: usize,
    record: &Record,
) -> Option<KeyValue> {
    match field.role {
        FieldRole::DocumentKey => Some(KeyValue::Text(ctx.document_id.clone())),
        FieldRole::PrimaryKey => Some(ctx.hash_key(&record.current_key)),
        FieldRole::ForeignKey => {
            let parent = record.parent_key.clone()?;
            Some(ctx.hash_key(&parent))
        }
        FieldRole::NestedKey => {
            let staged = record.values[idx].clone()?;
            Some(ctx.hash_key(&staged))
        }
        FieldRole::SerialKey => Some(serial_value(record.ordinal, ctx.config.serial_size)),
        FieldRole::XPathKey => {
            let xpath = ctx.xpath_of(&record.current_key);
            Some(ctx.hash_key(&xpath))
        }
        _ => None,
    }
}
