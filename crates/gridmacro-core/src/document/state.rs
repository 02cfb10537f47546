use std::fmt;
use std::path::PathBuf;

use gridmacro_engine::builtins::PendingCommits;
use gridmacro_engine::engine::{
    CellStore, Environment, create_engine, create_script_engine,
};
use rhai::Engine;

/// Starting grid size.
pub const DEFAULT_ROWS: usize = 10;
pub const DEFAULT_COLS: usize = 10;
/// Largest row or column count accepted by [`Document::resize`] and by loads.
pub const MAX_EXTENT: usize = 100;

/// A failure the collaborator should show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReport {
    /// A formula failed; the cell now reads `ERROR`.
    Evaluation {
        row: usize,
        col: usize,
        message: String,
    },
    /// A macro run stopped at an error.
    Macro { message: String },
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorReport::Evaluation { row, col, message } => {
                write!(f, "Error evaluating cell ({}, {}): {}", row, col, message)
            }
            ErrorReport::Macro { message } => write!(f, "Error running macro: {}", message),
        }
    }
}

/// UI-agnostic session state.
pub struct Document {
    /// The cell store (clones share state with the engines' built-ins)
    pub store: CellStore,
    /// Variables and functions shared by every formula and macro
    pub env: Environment,
    /// Engine for cell formulas
    pub formula_engine: Engine,
    /// Engine for macros (formula built-ins plus writes and `process`)
    pub script_engine: Engine,
    /// Formula cells written from inside scripts, awaiting evaluation
    pub(crate) pending: PendingCommits,
    /// Path of the last file saved or loaded
    pub file_path: Option<PathBuf>,
    /// Whether anything changed since the last save or load
    pub modified: bool,
    pub(crate) reports: Vec<ErrorReport>,
}

impl Document {
    /// A 10x10 document.
    ///
    /// This constructor is side-effect free: it does not touch the filesystem.
    pub fn new() -> Self {
        Self::with_extent(DEFAULT_ROWS, DEFAULT_COLS)
    }

    pub fn with_extent(rows: usize, cols: usize) -> Self {
        let store = CellStore::new(rows, cols);
        let pending = PendingCommits::default();
        let formula_engine = create_engine(store.clone(), pending.clone());
        let script_engine = create_script_engine(store.clone(), pending.clone());
        store.take_changes();

        Document {
            store,
            env: Environment::new(),
            formula_engine,
            script_engine,
            pending,
            file_path: None,
            modified: false,
            reports: Vec::new(),
        }
    }

    pub(crate) fn report(&mut self, report: ErrorReport) {
        log::warn!("{}", report);
        self.reports.push(report);
    }

    /// Drain the error reports emitted since the last call.
    pub fn take_reports(&mut self) -> Vec<ErrorReport> {
        std::mem::take(&mut self.reports)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
