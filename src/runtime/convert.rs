use crate::builder::DocumentBuilder;
use crate::config::{ConvertConfig, OutputFormat};
use crate::error::Result;
use crate::model::Schema;
use crate::runtime::worker::{run_batch, BatchReport};
use crate::sink::csv::CsvFiles;
use roxmltree::Document;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Convert every `.xml` file under `xml_dir` into per-table COPY text
/// files under `out_dir`. Each worker writes its own file set (suffixed by
/// worker index), so no sink handle is shared across threads.
pub fn convert_dir_to_csv(
    schema: &Schema,
    config: &ConvertConfig,
    xml_dir: &Path,
    out_dir: &Path,
    threads: usize,
) -> Result<BatchReport> {
    let mut paths: Vec<PathBuf> = fs::read_dir(xml_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(OsStr::to_str) == Some("xml"))
        .collect();
    paths.sort();
    fs::create_dir_all(out_dir)?;

    tracing::info!("converting {} documents from {}", paths.len(), xml_dir.display());

    let report = run_batch(paths, threads, |worker_id| {
        let mut files = CsvFiles::new(out_dir, &format!("-{worker_id}"));
        move |path: &Path| -> Result<()> {
            let text = fs::read_to_string(path)?;
            let doc = Document::parse(&text)?;
            let builder = DocumentBuilder::new(
                schema,
                OutputFormat::PgCsv,
                config.clone(),
                document_id_for(path),
            );
            builder.to_csv(&doc, &mut files)?;
            files.flush()?;
            Ok(())
        }
    });
    Ok(report)
}

/// Stable per-document identity, derived from the file name.
pub fn document_id_for(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("document")
        .to_string()
}
