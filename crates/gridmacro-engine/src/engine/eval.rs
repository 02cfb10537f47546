//! Rhai engine creation.
//!
//! Formulas and macros share one [`Environment`](super::Environment) but run
//! on different engines: the formula engine exposes cell accessors,
//! aggregates, selectors and the `np` module; the script engine adds
//! macro-only writes and the `process` module.

use rhai::Engine;

use super::CellStore;
use crate::builtins::PendingCommits;

/// Create the engine used for cell formulas.
pub fn create_engine(store: CellStore, pending: PendingCommits) -> Engine {
    let mut engine = Engine::new();
    crate::builtins::register_builtins(&mut engine, store, pending);
    crate::numeric::register_numeric(&mut engine);
    engine
}

/// Create the engine used for macros.
/// This engine includes all formula builtins plus `clear_cell` and `process::*`.
pub fn create_script_engine(store: CellStore, pending: PendingCommits) -> Engine {
    let mut engine = create_engine(store.clone(), pending);
    crate::builtins::register_script_builtins(&mut engine, store);
    crate::process::register_process(&mut engine);
    engine
}
