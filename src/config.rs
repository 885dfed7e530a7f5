use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format a conversion run is configured for. A builder constructed
/// for one format rejects entry points belonging to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    PgCsv,
    PgSql,
    Json,
    FullText,
    Sphinx,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::PgCsv => "pg_csv",
            OutputFormat::PgSql => "pg_sql",
            OutputFormat::Json => "json",
            OutputFormat::FullText => "full_text",
            OutputFormat::Sphinx => "sphinx",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Debug` passes identity keys through as their raw XPath-like strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Debug,
    Sha256,
}

/// Storage width of a hashed identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashSize {
    /// Full digest bytes, rendered as a bytea literal.
    Native,
    Bit64,
    Bit32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialSize {
    Int,
    SmallInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonLayout {
    /// Array of records per table.
    Column,
    /// Nested object graph following the traversal.
    Object,
    /// Flat rows per table, mirroring the relational sink.
    Relational,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    pub hash_algorithm: HashAlgorithm,
    pub hash_size: HashSize,
    pub serial_size: SerialSize,
    /// Fill declared default values into empty content.
    pub fill_default_values: bool,
    /// Fully relational output: hashed primary/foreign/nested key columns
    /// per table. When off, only document keys and content columns are
    /// written (denormalized mode); traversal is unaffected.
    pub rel_data_ext: bool,
    pub json_layout: JsonLayout,
    /// Tokens shorter than this are stored but not tokenized for search.
    pub min_token_len: usize,
    /// Index numeric content as typed numeric fields.
    pub index_numbers: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha256,
            hash_size: HashSize::Native,
            serial_size: SerialSize::Int,
            fill_default_values: true,
            rel_data_ext: true,
            json_layout: JsonLayout::Column,
            min_token_len: 1,
            index_numbers: true,
        }
    }
}
