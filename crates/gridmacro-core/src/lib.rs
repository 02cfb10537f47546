pub mod document;
pub mod error;
pub mod storage;

pub use document::{ColorTarget, Document, ErrorReport, FileFormat};
pub use error::{GridError, Result};
