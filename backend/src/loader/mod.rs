//! # File Loader
//!
//! Turns a file chosen by the user into a fresh [`TableBuffer`]. The format is decided by
//! the file extension alone:
//!
//! - `.csv` / `.txt`: delimited text, see [`delimited`]. The delimiter (`;` or `,`) is taken
//!   from the header line and used for the whole file.
//! - `.xml`: generic tabular XML, see [`xml`]. Only the first table found is loaded.
//!
//! Any other extension is rejected with [`ImportError::UnsupportedFormat`]. Loading never
//! writes to disk.

pub mod delimited;
pub mod xml;

use crate::error::ImportError;
use common::model::table::TableBuffer;
use log::info;
use std::path::Path;

/// Source formats recognised by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Xml,
}

impl SourceFormat {
    /// Detects the format from the (case-insensitive) file extension.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "txt" => Ok(SourceFormat::Delimited),
            "xml" => Ok(SourceFormat::Xml),
            other => Err(ImportError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// Loads `path` into a new buffer.
pub fn load_file(path: &Path) -> Result<TableBuffer, ImportError> {
    let format = SourceFormat::from_path(path)?;
    info!("Loading {} as {:?}", path.display(), format);

    let buffer = match format {
        SourceFormat::Delimited => delimited::load_delimited(path)?,
        SourceFormat::Xml => xml::load_xml(path)?,
    };

    info!(
        "Loaded {} columns and {} rows from {}",
        buffer.column_count(),
        buffer.row_count(),
        path.display()
    );
    Ok(buffer)
}
