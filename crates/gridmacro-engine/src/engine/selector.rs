//! Axis selectors.
//!
//! An axis is addressed either by a single index or by a strided half-open
//! slice. [`RangeAddressor`] turns a [`Selector`] into the concrete index (or
//! index sequence) it denotes. Bounds are not checked here; the cell store
//! decides whether a resolved index exists.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("slice step cannot be zero")]
    ZeroStep,
}

/// `start, start + step, ...` while strictly before `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    start: i64,
    stop: i64,
    step: i64,
}

impl Slice {
    pub fn new(start: i64, stop: i64, step: i64) -> Result<Self, SelectorError> {
        if step == 0 {
            return Err(SelectorError::ZeroStep);
        }
        Ok(Slice { start, stop, step })
    }

    /// Slice with the default step of 1.
    pub fn unit(start: i64, stop: i64) -> Self {
        Slice {
            start,
            stop,
            step: 1,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn stop(&self) -> i64 {
        self.stop
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// Number of indices the slice yields.
    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let count = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / (-step) + 1
        } else {
            0
        };
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: i64) -> bool {
        let in_span = if self.step > 0 {
            self.start <= index && index < self.stop
        } else {
            self.stop < index && index <= self.start
        };
        in_span && (index as i128 - self.start as i128) % self.step as i128 == 0
    }

    pub fn iter(&self) -> Indices {
        Indices {
            next: self.start,
            remaining: self.len(),
            step: self.step,
        }
    }
}

/// Either a single index or a slice along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Scalar(i64),
    Range(Slice),
}

impl Selector {
    pub fn len(&self) -> usize {
        match self {
            Selector::Scalar(_) => 1,
            Selector::Range(slice) => slice.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Indices {
        match self {
            Selector::Scalar(index) => Indices {
                next: *index,
                remaining: 1,
                step: 1,
            },
            Selector::Range(slice) => slice.iter(),
        }
    }

    /// Index at `position` within the selected sequence. Negative positions
    /// count from the end.
    pub fn nth(&self, position: i64) -> Option<i64> {
        let len = self.len() as i64;
        let position = if position < 0 { len + position } else { position };
        if position < 0 || position >= len {
            return None;
        }
        match self {
            Selector::Scalar(index) => Some(*index),
            Selector::Range(slice) => Some(slice.start + position * slice.step),
        }
    }
}

impl From<i64> for Selector {
    fn from(index: i64) -> Self {
        Selector::Scalar(index)
    }
}

impl From<Slice> for Selector {
    fn from(slice: Slice) -> Self {
        Selector::Range(slice)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Scalar(index) => write!(f, "{}", index),
            Selector::Range(slice) if slice.step == 1 => {
                write!(f, "range({}, {})", slice.start, slice.stop)
            }
            Selector::Range(slice) => {
                write!(f, "range({}, {}, {})", slice.start, slice.stop, slice.step)
            }
        }
    }
}

impl IntoIterator for Selector {
    type Item = i64;
    type IntoIter = Indices;

    fn into_iter(self) -> Indices {
        self.iter()
    }
}

/// Iterator over the indices of a selector.
#[derive(Debug, Clone)]
pub struct Indices {
    next: i64,
    remaining: usize,
    step: i64,
}

impl Iterator for Indices {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next;
        self.remaining -= 1;
        self.next = self.next.wrapping_add(self.step);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Indices {}

/// What a selector resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Index(i64),
    Sequence(Vec<i64>),
}

impl Resolved {
    pub fn into_vec(self) -> Vec<i64> {
        match self {
            Resolved::Index(index) => vec![index],
            Resolved::Sequence(indices) => indices,
        }
    }
}

/// Resolves selectors. Bound into scripts under the name `R`, where `R[k]`
/// yields `k` and `R[a:b:s]` yields a range selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeAddressor;

impl RangeAddressor {
    pub fn resolve(&self, selector: &Selector) -> Resolved {
        match selector {
            Selector::Scalar(index) => Resolved::Index(*index),
            Selector::Range(slice) => Resolved::Sequence(slice.iter().collect()),
        }
    }
}
