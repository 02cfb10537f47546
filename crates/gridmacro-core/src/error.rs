//! Error types for gridmacro core.

use std::path::PathBuf;

use thiserror::Error;

use gridmacro_engine::engine::StoreError;

/// Errors returned by document operations.
///
/// Formula and macro failures are not errors here: they are reported
/// through [`ErrorReport`](crate::ErrorReport)s.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot read spreadsheet: {0}")]
    Calamine(#[from] calamine::Error),

    #[error("Cannot write spreadsheet: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Corrupt spreadsheet archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Corrupt spreadsheet XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Corrupt spreadsheet: {0}")]
    Corrupt(String),

    #[error("Grid size must be between 1x1 and {max}x{max}, got {rows}x{cols}")]
    InvalidExtent { rows: usize, cols: usize, max: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, GridError>;
