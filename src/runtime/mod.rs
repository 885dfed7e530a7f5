pub mod convert;
pub mod worker;

pub use convert::{convert_dir_to_csv, document_id_for};
pub use worker::{run_batch, BatchReport};

/// Install the default fmt subscriber. Call once from a binary entry
/// point before running a batch.
pub fn init_logging() {
    tracing_subscriber::fmt::init();
}
