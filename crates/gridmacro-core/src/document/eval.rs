//! Single-shot formula evaluation.
//!
//! Committing `=expr` replaces the cell's text with the result of `expr`.
//! The formula itself is not kept, and nothing is recomputed when cells it
//! read later change.

use super::{Document, ErrorReport};
use crate::error::Result;
use gridmacro_engine::builtins::take_pending;
use gridmacro_engine::engine::{CellPos, format_result};

/// Text a cell shows after its formula failed.
pub const ERROR_MARKER: &str = "ERROR";

/// How deep formulas written from inside other formulas may nest.
pub const MAX_EVAL_DEPTH: usize = 8;

impl Document {
    /// Commit new text for a cell, evaluating it if it is a formula.
    ///
    /// Only an out-of-grid position is an error; formula failures become
    /// [`ErrorReport`]s.
    pub fn commit(&mut self, row: usize, col: usize, text: &str) -> Result<()> {
        let pos = CellPos::new(row, col);
        self.store.set_value(pos, text)?;
        self.modified = true;
        self.evaluate_cell(pos, 0);
        Ok(())
    }

    /// Evaluate the formula at `pos`, if there is one, then everything it
    /// queued.
    pub(crate) fn evaluate_cell(&mut self, pos: CellPos, depth: usize) {
        let Some(cell) = self.store.get(pos) else {
            return;
        };
        let Some(source) = cell.formula_body() else {
            return;
        };

        if depth > MAX_EVAL_DEPTH {
            self.fail_cell(pos, "formula re-entrancy limit exceeded".to_string());
            return;
        }

        log::debug!("evaluating ({}, {}): {}", pos.row, pos.col, source);
        match self
            .env
            .eval_formula(&self.formula_engine, source, pos.row, pos.col)
        {
            Ok(value) => {
                if let Err(e) = self.store.set_value(pos, format_result(&value)) {
                    self.fail_cell(pos, e.to_string());
                }
            }
            Err(e) => self.fail_cell(pos, e.to_string()),
        }

        self.run_pending(depth + 1);
    }

    /// Evaluate formulas that scripts wrote into other cells.
    pub(crate) fn run_pending(&mut self, depth: usize) {
        for pos in take_pending(&self.pending) {
            self.evaluate_cell(pos, depth);
        }
    }

    fn fail_cell(&mut self, pos: CellPos, message: String) {
        if let Err(e) = self.store.set_value(pos, ERROR_MARKER) {
            log::warn!("cannot mark ({}, {}) as failed: {}", pos.row, pos.col, e);
        }
        self.report(ErrorReport::Evaluation {
            row: pos.row,
            col: pos.col,
            message,
        });
    }
}
