//! Document state and logic (UI-agnostic).

mod eval;
mod io;
mod ops;
mod script;
mod state;

pub use eval::{ERROR_MARKER, MAX_EVAL_DEPTH};
pub use io::FileFormat;
pub use ops::ColorTarget;
pub use state::{DEFAULT_COLS, DEFAULT_ROWS, Document, ErrorReport, MAX_EXTENT};
