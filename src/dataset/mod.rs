//! CSV dataset files shared between pipeline stages
//!
//! Every stage hands its output to the next one as a CSV file: the crawl
//! writes raw listings, cleaning writes accepted and rejected rows, and
//! training reads the accepted ones back. The helpers here are generic
//! over the row type so each stage keeps its own record shape.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors from reading or writing dataset files
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Writes `rows` to a CSV file at `path`, with a header row derived from
/// the record type.
///
/// Parent directories are created as needed. An empty slice still
/// produces a file, so downstream stages can tell "ran with no rows"
/// apart from "never ran".
///
/// # Arguments
///
/// * `path` - Destination file path
/// * `rows` - Records to serialize, one CSV row each
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> DatasetResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(rows = rows.len(), path = %path.display(), "dataset written");
    Ok(())
}

/// Reads every row of the CSV file at `path`.
///
/// # Arguments
///
/// * `path` - Source file path
///
/// # Returns
///
/// * `Ok(Vec<T>)` - All rows, in file order
/// * `Err(DatasetError)` - The file is missing or a row does not fit `T`
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> DatasetResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
