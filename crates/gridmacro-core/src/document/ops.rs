use super::Document;
use super::state::MAX_EXTENT;
use crate::error::{GridError, Result};
use gridmacro_engine::engine::{Axis, CellPos, Rgb, StoreError};

/// Which of a cell's two colors an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTarget {
    Background,
    Text,
}

impl Document {
    /// (rows, cols).
    pub fn extent(&self) -> (usize, usize) {
        self.store.extent()
    }

    /// Row and column labels; each is the zero-based index.
    pub fn headers(&self) -> (Vec<String>, Vec<String>) {
        let (rows, cols) = self.extent();
        (
            (0..rows).map(|r| r.to_string()).collect(),
            (0..cols).map(|c| c.to_string()).collect(),
        )
    }

    fn check_all(&self, cells: &[CellPos]) -> Result<()> {
        for &pos in cells {
            if !self.store.in_bounds(pos) {
                let (rows, cols) = self.extent();
                return Err(StoreError::OutOfBounds {
                    row: pos.row as i64,
                    col: pos.col as i64,
                    rows,
                    cols,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Reset text and colors of every cell in a selection.
    ///
    /// Nothing changes if any position is outside the grid.
    pub fn clear_cells(&mut self, cells: &[CellPos]) -> Result<()> {
        self.check_all(cells)?;
        self.store.batch(|store| {
            cells.iter().try_for_each(|&pos| store.clear(pos))
        })?;
        self.modified = true;
        Ok(())
    }

    /// Set one color on every cell in a selection.
    pub fn apply_color(&mut self, cells: &[CellPos], target: ColorTarget, color: Rgb) -> Result<()> {
        self.check_all(cells)?;
        self.store.batch(|store| {
            cells.iter().try_for_each(|&pos| match target {
                ColorTarget::Background => store.set_background(pos, color),
                ColorTarget::Text => store.set_foreground(pos, color),
            })
        })?;
        self.modified = true;
        Ok(())
    }

    /// Change the grid size. Both dimensions must be in `1..=MAX_EXTENT`.
    pub fn resize(&mut self, rows: usize, cols: usize) -> Result<()> {
        let valid = 1..=MAX_EXTENT;
        if !valid.contains(&rows) || !valid.contains(&cols) {
            return Err(GridError::InvalidExtent {
                rows,
                cols,
                max: MAX_EXTENT,
            });
        }
        self.store.resize(rows, cols);
        self.modified = true;
        Ok(())
    }

    /// Delete a row or column; later ones shift down by one.
    pub fn remove(&mut self, axis: Axis, index: usize) -> Result<()> {
        self.store.remove(axis, index)?;
        self.modified = true;
        Ok(())
    }
}
