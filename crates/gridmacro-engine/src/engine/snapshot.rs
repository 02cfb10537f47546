//! Position-keyed dump of the store shared by the file codecs.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Deserializer, Serialize};

use super::cell::{Cell, CellPos, Rgb};

/// One entry of a [`Snapshot`]: `{"value", "color", "text_color"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    #[serde(default)]
    pub value: String,
    #[serde(default = "white", deserialize_with = "white_if_null")]
    pub color: Rgb,
    #[serde(default = "black", deserialize_with = "black_if_null")]
    pub text_color: Rgb,
}

fn white() -> Rgb {
    Rgb::WHITE
}

fn black() -> Rgb {
    Rgb::BLACK
}

fn white_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rgb, D::Error> {
    Ok(Option::<Rgb>::deserialize(deserializer)?.unwrap_or(Rgb::WHITE))
}

fn black_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rgb, D::Error> {
    Ok(Option::<Rgb>::deserialize(deserializer)?.unwrap_or(Rgb::BLACK))
}

impl Default for CellRecord {
    fn default() -> Self {
        CellRecord::from(&Cell::default())
    }
}

impl From<&Cell> for CellRecord {
    fn from(cell: &Cell) -> Self {
        CellRecord {
            value: cell.text.clone(),
            color: cell.background,
            text_color: cell.foreground,
        }
    }
}

impl From<CellRecord> for Cell {
    fn from(record: CellRecord) -> Self {
        Cell {
            text: record.value,
            background: record.color,
            foreground: record.text_color,
        }
    }
}

/// Full dump of a store, ordered row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    cells: BTreeMap<CellPos, CellRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: CellPos, record: CellRecord) -> Option<CellRecord> {
        self.cells.insert(pos, record)
    }

    pub fn get(&self, pos: &CellPos) -> Option<&CellRecord> {
        self.cells.get(pos)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, CellPos, CellRecord> {
        self.cells.iter()
    }

    /// Smallest (rows, cols) extent containing every entry. Saturates at
    /// `usize::MAX` for a position on the last index.
    pub fn extent(&self) -> Option<(usize, usize)> {
        let rows = self.cells.keys().map(|p| p.row).max()?;
        let cols = self.cells.keys().map(|p| p.col).max()?;
        Some((rows.saturating_add(1), cols.saturating_add(1)))
    }
}

impl FromIterator<(CellPos, CellRecord)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (CellPos, CellRecord)>>(iter: I) -> Self {
        Snapshot {
            cells: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = (CellPos, CellRecord);
    type IntoIter = btree_map::IntoIter<CellPos, CellRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a CellPos, &'a CellRecord);
    type IntoIter = btree_map::Iter<'a, CellPos, CellRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
