//! File codecs. Both go through [`Snapshot`](gridmacro_engine::engine::Snapshot).

pub mod json;
pub mod xlsx;

use crate::document::MAX_EXTENT;
use crate::error::{GridError, Result};
use gridmacro_engine::engine::CellPos;

pub use json::{parse_json, read_json, write_json, write_json_content};
pub use xlsx::{read_xlsx, write_xlsx};

/// Reject positions whose bounding box exceeds `MAX_EXTENT` in either
/// dimension. Loading materializes the whole box, so this runs before
/// anything is built from a file.
pub(crate) fn check_extent<'a>(positions: impl IntoIterator<Item = &'a CellPos>) -> Result<()> {
    let (mut rows, mut cols) = (0usize, 0usize);
    for pos in positions {
        rows = rows.max(pos.row.saturating_add(1));
        cols = cols.max(pos.col.saturating_add(1));
    }
    if rows > MAX_EXTENT || cols > MAX_EXTENT {
        return Err(GridError::InvalidExtent {
            rows,
            cols,
            max: MAX_EXTENT,
        });
    }
    Ok(())
}
