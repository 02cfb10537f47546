//! Spreadsheet engine API.
//!
//! - [`Cell`], [`CellPos`], [`Rgb`] - the per-position record
//! - [`CellStore`] - the shared position-indexed container
//! - [`Selector`], [`Slice`], [`RangeAddressor`] - axis addressing
//! - [`Snapshot`] - the lossless dump both file codecs read and write
//! - [`Environment`] - the session-wide scope formulas and macros share
//! - [`create_engine`], [`create_script_engine`] - Rhai engines with built-ins
//! - [`format_result`] - turn a formula result into cell text

mod cell;
mod environment;
mod eval;
mod format;
mod preprocess;
mod selector;
mod snapshot;
mod store;

pub use cell::{Cell, CellPos, FORMULA_MARKER, ParsePosError, Rgb};
pub use environment::{ADDRESSOR_VAR, COL_VAR, Environment, ROW_VAR};
pub use eval::{create_engine, create_script_engine};
pub use format::{format_float, format_result};
pub use preprocess::preprocess_script;
pub use selector::{Indices, RangeAddressor, Resolved, Selector, SelectorError, Slice};
pub use snapshot::{CellRecord, Snapshot};
pub use store::{Axis, CellStore, Changes, StoreError};

pub use rhai::{Dynamic, EvalAltResult};
