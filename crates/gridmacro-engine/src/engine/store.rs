//! The authoritative position-indexed cell container.
//!
//! [`CellStore`] is cheap to clone; clones share the same cells, extent and
//! change log, which is how the Rhai built-ins reach the grid.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::{DashMap, DashSet};
use thiserror::Error;

use super::cell::{Cell, CellPos, Rgb};
use super::selector::Selector;
use super::snapshot::{CellRecord, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    fn coord(self, pos: CellPos) -> usize {
        match self {
            Axis::Row => pos.row,
            Axis::Column => pos.col,
        }
    }

    fn shifted(self, pos: CellPos) -> CellPos {
        match self {
            Axis::Row => CellPos::new(pos.row - 1, pos.col),
            Axis::Column => CellPos::new(pos.row, pos.col - 1),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Row => f.write_str("row"),
            Axis::Column => f.write_str("column"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: i64,
        col: i64,
        rows: usize,
        cols: usize,
    },

    #[error("no cell at ({row}, {col})")]
    NotMaterialized { row: i64, col: i64 },

    #[error("{axis} index {index} is out of range (grid has {len})")]
    IndexOutOfRange { axis: Axis, index: usize, len: usize },
}

/// What changed since the last [`CellStore::take_changes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Changes {
    None,
    Cells(BTreeSet<CellPos>),
    All,
}

#[derive(Debug, Default)]
struct Inner {
    cells: DashMap<CellPos, Cell>,
    rows: AtomicUsize,
    cols: AtomicUsize,
    changed: DashSet<CellPos>,
    all_changed: AtomicBool,
    batch_depth: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct CellStore {
    inner: Arc<Inner>,
}

impl CellStore {
    /// A `rows` x `cols` grid with every position materialized with defaults.
    pub fn new(rows: usize, cols: usize) -> Self {
        let store = CellStore::default();
        store.resize(rows, cols);
        store
    }

    /// (rows, cols).
    pub fn extent(&self) -> (usize, usize) {
        (
            self.inner.rows.load(Ordering::SeqCst),
            self.inner.cols.load(Ordering::SeqCst),
        )
    }

    pub fn in_bounds(&self, pos: CellPos) -> bool {
        let (rows, cols) = self.extent();
        pos.row < rows && pos.col < cols
    }

    /// Validate script-supplied coordinates against the extent.
    pub fn position(&self, row: i64, col: i64) -> Result<CellPos, StoreError> {
        let (rows, cols) = self.extent();
        match (usize::try_from(row), usize::try_from(col)) {
            (Ok(r), Ok(c)) if r < rows && c < cols => Ok(CellPos::new(r, c)),
            _ => Err(StoreError::OutOfBounds {
                row,
                col,
                rows,
                cols,
            }),
        }
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        self.inner.cells.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.inner.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cells.is_empty()
    }

    pub fn get(&self, pos: CellPos) -> Option<Cell> {
        self.inner.cells.get(&pos).map(|cell| cell.clone())
    }

    /// Text at `pos`, or `""` when nothing is there.
    pub fn get_value(&self, pos: CellPos) -> String {
        self.inner
            .cells
            .get(&pos)
            .map(|cell| cell.text.clone())
            .unwrap_or_default()
    }

    /// Texts at every (row, col) of the cross product, row-major.
    ///
    /// Fails on the first position that is not materialized, so the result
    /// never outgrows the cells actually present.
    pub fn get_values(&self, rows: &Selector, cols: &Selector) -> Result<Vec<String>, StoreError> {
        let mut values = Vec::new();
        if rows.is_empty() || cols.is_empty() {
            return Ok(values);
        }
        for row in rows.iter() {
            for col in cols.iter() {
                let missing = StoreError::NotMaterialized { row, col };
                let (Ok(r), Ok(c)) = (usize::try_from(row), usize::try_from(col)) else {
                    return Err(missing);
                };
                let Some(cell) = self.inner.cells.get(&CellPos::new(r, c)) else {
                    return Err(missing);
                };
                values.push(cell.text.clone());
            }
        }
        Ok(values)
    }

    pub fn set_value(&self, pos: CellPos, text: impl Into<String>) -> Result<(), StoreError> {
        let text = text.into();
        self.update(pos, |cell| cell.text = text)
    }

    pub fn set_background(&self, pos: CellPos, color: Rgb) -> Result<(), StoreError> {
        self.update(pos, |cell| cell.background = color)
    }

    pub fn set_foreground(&self, pos: CellPos, color: Rgb) -> Result<(), StoreError> {
        self.update(pos, |cell| cell.foreground = color)
    }

    /// Reset text and both colors to defaults.
    pub fn clear(&self, pos: CellPos) -> Result<(), StoreError> {
        self.update(pos, |cell| *cell = Cell::default())
    }

    fn update(&self, pos: CellPos, apply: impl FnOnce(&mut Cell)) -> Result<(), StoreError> {
        self.check_bounds(pos)?;
        apply(&mut self.inner.cells.entry(pos).or_default());
        self.record(pos);
        Ok(())
    }

    fn check_bounds(&self, pos: CellPos) -> Result<(), StoreError> {
        if self.in_bounds(pos) {
            return Ok(());
        }
        let (rows, cols) = self.extent();
        Err(StoreError::OutOfBounds {
            row: pos.row as i64,
            col: pos.col as i64,
            rows,
            cols,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner
            .cells
            .iter()
            .map(|entry| (*entry.key(), CellRecord::from(entry.value())))
            .collect()
    }

    /// Replace every cell with the snapshot's contents.
    ///
    /// The extent becomes the snapshot's bounding box (unchanged for an empty
    /// snapshot); positions inside it that the snapshot omits get defaults.
    /// Every position in the box is materialized, so callers bound the
    /// snapshot's extent first.
    pub fn restore(&self, snapshot: &Snapshot) {
        self.batch(|store| {
            let (rows, cols) = snapshot.extent().unwrap_or_else(|| store.extent());
            store.inner.cells.clear();
            for (pos, record) in snapshot {
                store.inner.cells.insert(*pos, Cell::from(record.clone()));
            }
            store.set_extent(rows, cols);
            store.materialize();
        });
    }

    /// Change the extent. Cells outside it are dropped and new positions are
    /// materialized with defaults; surviving cells keep text and colors.
    pub fn resize(&self, rows: usize, cols: usize) {
        self.batch(|store| {
            store
                .inner
                .cells
                .retain(|pos, _| pos.row < rows && pos.col < cols);
            store.set_extent(rows, cols);
            store.materialize();
        });
    }

    /// Delete a row or column, shifting later ones down by one.
    pub fn remove(&self, axis: Axis, index: usize) -> Result<(), StoreError> {
        let (rows, cols) = self.extent();
        let len = match axis {
            Axis::Row => rows,
            Axis::Column => cols,
        };
        if index >= len {
            return Err(StoreError::IndexOutOfRange { axis, index, len });
        }

        self.batch(|store| {
            let cells: Vec<(CellPos, Cell)> = store
                .inner
                .cells
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect();
            store.inner.cells.clear();
            for (pos, cell) in cells {
                let coord = axis.coord(pos);
                if coord == index {
                    continue;
                }
                let target = if coord > index { axis.shifted(pos) } else { pos };
                store.inner.cells.insert(target, cell);
            }
            match axis {
                Axis::Row => store.set_extent(rows - 1, cols),
                Axis::Column => store.set_extent(rows, cols - 1),
            }
        });
        Ok(())
    }

    fn set_extent(&self, rows: usize, cols: usize) {
        self.inner.rows.store(rows, Ordering::SeqCst);
        self.inner.cols.store(cols, Ordering::SeqCst);
    }

    fn materialize(&self) {
        let (rows, cols) = self.extent();
        for row in 0..rows {
            for col in 0..cols {
                self.inner.cells.entry(CellPos::new(row, col)).or_default();
            }
        }
    }

    /// Run `f` with per-cell change records suppressed; the whole batch is
    /// recorded as a single "everything changed" marker.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        self.inner.batch_depth.fetch_add(1, Ordering::SeqCst);
        let result = f(self);
        if self.inner.batch_depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.changed.clear();
            self.inner.all_changed.store(true, Ordering::SeqCst);
        }
        result
    }

    fn record(&self, pos: CellPos) {
        if self.inner.batch_depth.load(Ordering::SeqCst) == 0
            && !self.inner.all_changed.load(Ordering::SeqCst)
        {
            self.inner.changed.insert(pos);
        }
    }

    /// Drain the change log.
    pub fn take_changes(&self) -> Changes {
        if self.inner.all_changed.swap(false, Ordering::SeqCst) {
            self.inner.changed.clear();
            return Changes::All;
        }
        let cells: BTreeSet<CellPos> = self.inner.changed.iter().map(|pos| *pos).collect();
        self.inner.changed.clear();
        if cells.is_empty() {
            Changes::None
        } else {
            Changes::Cells(cells)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::selector::Slice;
    use proptest::prelude::*;

    fn column_of(values: &[&str]) -> CellStore {
        let store = CellStore::new(values.len().max(1), 2);
        for (row, value) in values.iter().enumerate() {
            store.set_value(CellPos::new(row, 0), *value).unwrap();
        }
        store
    }

    #[test]
    fn test_new_materializes_defaults() {
        let store = CellStore::new(10, 10);
        assert_eq!(store.len(), 100);
        assert_eq!(store.get(CellPos::new(9, 9)), Some(Cell::default()));
        assert_eq!(store.get_value(CellPos::new(20, 20)), "");
    }

    #[test]
    fn test_get_values_cross_product_row_major() {
        let store = CellStore::new(2, 2);
        store.set_value(CellPos::new(0, 0), "a").unwrap();
        store.set_value(CellPos::new(0, 1), "b").unwrap();
        store.set_value(CellPos::new(1, 0), "c").unwrap();
        store.set_value(CellPos::new(1, 1), "d").unwrap();

        let all = Selector::Range(Slice::unit(0, 2));
        assert_eq!(store.get_values(&all, &all).unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(
            store.get_values(&Selector::Scalar(1), &all).unwrap(),
            vec!["c", "d"]
        );
    }

    #[test]
    fn test_get_values_fails_outside_materialized() {
        let store = column_of(&["1", "2"]);
        let err = store
            .get_values(&Selector::Range(Slice::unit(0, 5)), &Selector::Scalar(0))
            .unwrap_err();
        assert_eq!(err, StoreError::NotMaterialized { row: 2, col: 0 });

        let err = store
            .get_values(&Selector::Scalar(-1), &Selector::Scalar(0))
            .unwrap_err();
        assert_eq!(err, StoreError::NotMaterialized { row: -1, col: 0 });
    }

    #[test]
    fn test_get_values_huge_range_fails_fast() {
        let store = CellStore::new(10, 10);
        let huge = Selector::Range(Slice::new(0, 4_000_000_000, 1000).unwrap());
        let err = store.get_values(&huge, &huge).unwrap_err();
        assert_eq!(err, StoreError::NotMaterialized { row: 0, col: 1000 });

        let empty = Selector::Range(Slice::unit(3, 3));
        assert!(store.get_values(&huge, &empty).unwrap().is_empty());
    }

    #[test]
    fn test_writes_outside_extent_fail() {
        let store = CellStore::new(2, 2);
        assert!(matches!(
            store.set_value(CellPos::new(2, 0), "x"),
            Err(StoreError::OutOfBounds { row: 2, col: 0, .. })
        ));
        assert!(store.position(-1, 0).is_err());
        assert_eq!(store.position(1, 1).unwrap(), CellPos::new(1, 1));
    }

    #[test]
    fn test_set_color_keeps_text() {
        let store = column_of(&["7"]);
        let pos = CellPos::new(0, 0);
        store.set_background(pos, Rgb(255, 0, 0)).unwrap();
        store.set_foreground(pos, Rgb(0, 0, 255)).unwrap();
        let cell = store.get(pos).unwrap();
        assert_eq!(cell.text, "7");
        assert_eq!(cell.background, Rgb(255, 0, 0));
        assert_eq!(cell.foreground, Rgb(0, 0, 255));
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = column_of(&["7"]);
        let pos = CellPos::new(0, 0);
        store.set_background(pos, Rgb(1, 2, 3)).unwrap();
        store.clear(pos).unwrap();
        assert_eq!(store.get(pos), Some(Cell::default()));
    }

    #[test]
    fn test_remove_row_shifts_with_colors() {
        let store = column_of(&["a", "b", "c"]);
        store.set_background(CellPos::new(2, 0), Rgb(9, 9, 9)).unwrap();
        store.remove(Axis::Row, 1).unwrap();

        assert_eq!(store.extent(), (2, 2));
        assert_eq!(store.get_value(CellPos::new(0, 0)), "a");
        let moved = store.get(CellPos::new(1, 0)).unwrap();
        assert_eq!(moved.text, "c");
        assert_eq!(moved.background, Rgb(9, 9, 9));
        assert!(!store.contains(CellPos::new(2, 0)));
    }

    #[test]
    fn test_remove_column() {
        let store = CellStore::new(1, 3);
        store.set_value(CellPos::new(0, 2), "z").unwrap();
        store.remove(Axis::Column, 0).unwrap();
        assert_eq!(store.extent(), (1, 2));
        assert_eq!(store.get_value(CellPos::new(0, 1)), "z");
    }

    #[test]
    fn test_remove_out_of_range() {
        let store = CellStore::new(2, 2);
        assert_eq!(
            store.remove(Axis::Column, 2),
            Err(StoreError::IndexOutOfRange {
                axis: Axis::Column,
                index: 2,
                len: 2
            })
        );
    }

    #[test]
    fn test_resize_keeps_survivors() {
        let store = CellStore::new(3, 3);
        store.set_value(CellPos::new(0, 0), "keep").unwrap();
        store.set_background(CellPos::new(0, 0), Rgb(5, 5, 5)).unwrap();
        store.set_value(CellPos::new(2, 2), "drop").unwrap();

        store.resize(2, 4);
        assert_eq!(store.extent(), (2, 4));
        assert_eq!(store.len(), 8);
        assert_eq!(store.get(CellPos::new(0, 0)).unwrap().background, Rgb(5, 5, 5));
        assert!(!store.contains(CellPos::new(2, 2)));
        assert_eq!(store.get(CellPos::new(1, 3)), Some(Cell::default()));
    }

    #[test]
    fn test_restore_replaces_everything() {
        let store = CellStore::new(5, 5);
        store.set_value(CellPos::new(4, 4), "old").unwrap();

        let mut snapshot = Snapshot::new();
        snapshot.insert(
            CellPos::new(1, 1),
            CellRecord {
                value: "new".into(),
                color: Rgb(1, 1, 1),
                text_color: Rgb(2, 2, 2),
            },
        );
        store.restore(&snapshot);

        assert_eq!(store.extent(), (2, 2));
        assert!(!store.contains(CellPos::new(4, 4)));
        assert_eq!(store.get_value(CellPos::new(1, 1)), "new");
        assert_eq!(store.get(CellPos::new(0, 0)), Some(Cell::default()));
    }

    #[test]
    fn test_change_tracking() {
        let store = CellStore::new(2, 2);
        assert_eq!(store.take_changes(), Changes::All);
        assert_eq!(store.take_changes(), Changes::None);

        store.set_value(CellPos::new(0, 1), "x").unwrap();
        store.set_background(CellPos::new(1, 0), Rgb(0, 0, 0)).unwrap();
        assert_eq!(
            store.take_changes(),
            Changes::Cells([CellPos::new(0, 1), CellPos::new(1, 0)].into())
        );
    }

    #[test]
    fn test_batch_suppresses_per_cell_records() {
        let store = CellStore::new(2, 2);
        store.take_changes();
        store.batch(|s| {
            s.set_value(CellPos::new(0, 0), "a").unwrap();
            s.set_value(CellPos::new(1, 1), "b").unwrap();
        });
        assert_eq!(store.take_changes(), Changes::All);
        assert_eq!(store.take_changes(), Changes::None);
    }

    #[test]
    fn test_clones_share_state() {
        let store = CellStore::new(1, 1);
        let other = store.clone();
        other.set_value(CellPos::new(0, 0), "shared").unwrap();
        assert_eq!(store.get_value(CellPos::new(0, 0)), "shared");
    }

    fn arb_store() -> impl Strategy<Value = CellStore> {
        let record = ("[ -~]{0,12}", any::<(u8, u8, u8)>(), any::<(u8, u8, u8)>());
        (1usize..6, 1usize..6, proptest::collection::vec(record, 0..20)).prop_map(
            |(rows, cols, edits)| {
                let store = CellStore::new(rows, cols);
                for (i, (text, bg, fg)) in edits.into_iter().enumerate() {
                    let pos = CellPos::new(i % rows, (i / rows) % cols);
                    store.set_value(pos, text).unwrap();
                    store.set_background(pos, Rgb(bg.0, bg.1, bg.2)).unwrap();
                    store.set_foreground(pos, Rgb(fg.0, fg.1, fg.2)).unwrap();
                }
                store
            },
        )
    }

    proptest! {
        #[test]
        fn prop_restore_of_snapshot_is_identity(store in arb_store()) {
            let before = store.snapshot();
            let extent = store.extent();
            let target = CellStore::new(7, 3);
            target.restore(&before);
            prop_assert_eq!(target.snapshot(), before);
            prop_assert_eq!(target.extent(), extent);
        }
    }
}
