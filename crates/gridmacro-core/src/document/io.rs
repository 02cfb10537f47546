use super::Document;
use crate::error::{GridError, Result};
use crate::storage::{read_json, read_xlsx, write_json, write_xlsx};
use std::path::Path;

/// Persistence codec, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Xlsx,
}

impl FileFormat {
    /// `.json` or `.xlsx`, in any letter case.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(FileFormat::Json),
            Some("xlsx") => Ok(FileFormat::Xlsx),
            _ => Err(GridError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl Document {
    /// Save every cell to `path`.
    pub fn save_file(&mut self, path: &Path) -> Result<()> {
        let format = FileFormat::from_path(path)?;
        let snapshot = self.store.snapshot();
        match format {
            FileFormat::Json => write_json(path, &snapshot)?,
            FileFormat::Xlsx => write_xlsx(path, &snapshot)?,
        }
        log::info!("saved {} cells to {}", snapshot.len(), path.display());

        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// Replace the whole grid with the contents of `path`.
    ///
    /// The file is parsed completely first; on any error the grid is left
    /// untouched. Files reaching past `MAX_EXTENT` in either dimension are
    /// rejected. Loaded formulas are kept as text, not evaluated.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let snapshot = match FileFormat::from_path(path)? {
            FileFormat::Json => read_json(path)?,
            FileFormat::Xlsx => read_xlsx(path)?,
        };

        self.store.restore(&snapshot);
        log::info!("loaded {} cells from {}", snapshot.len(), path.display());

        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// Write macro source verbatim.
    pub fn save_macro(path: &Path, text: &str) -> Result<()> {
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Read macro source verbatim.
    pub fn load_macro(path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}
