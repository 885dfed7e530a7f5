use crate::config::OutputFormat;
use thiserror::Error;

/// Fatal error family for one document's conversion. Record-level
/// "incomplete" is a parse outcome, never an error; anything here aborts
/// the current document and is reported by the worker loop.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("xml parse: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("malformed wildcard content: {0}")]
    Wildcard(#[from] quick_xml::Error),

    #[error("builder configured for {configured} cannot produce {requested} output")]
    Misconfigured {
        configured: OutputFormat,
        requested: OutputFormat,
    },

    #[error("no table matches document root element '{0}'")]
    UnknownRoot(String),

    #[error("sink i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("sql batch: {0}")]
    Sql(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
