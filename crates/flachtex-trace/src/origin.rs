//! Origin records: which part of a string came from where.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::range::Range;

/// Identifier of a source, usually a file path. `None` marks synthetic text.
pub type Origin = Option<Arc<str>>;

/// Bytes `[begin, end)` of the owning string were read from `origin`,
/// starting at byte `offset` of that source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginRange {
    pub begin: usize,
    pub end: usize,
    pub origin: Origin,
    #[serde(default)]
    pub offset: usize,
}

impl OriginRange {
    pub fn new(begin: usize, end: usize, origin: Origin, offset: usize) -> Self {
        Self {
            begin,
            end,
            origin,
            offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn range(&self) -> Range {
        Range::new(self.begin, self.end)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.begin <= index && index < self.end
    }

    /// Offset in the source of the local byte `index`, if covered.
    pub fn source_offset(&self, index: usize) -> Option<usize> {
        self.contains(index).then(|| self.offset + (index - self.begin))
    }

    /// Clip the record to the window `[begin, end)` and rebase it so that
    /// `begin` becomes local index 0. Returns `None` when nothing remains.
    ///
    /// When the window starts inside the record the source offset moves
    /// forward by the number of bytes cut from the front.
    pub fn clip(&self, begin: usize, end: usize) -> Option<Self> {
        if self.end <= begin || self.begin >= end {
            return None;
        }
        let first = self.begin.max(begin);
        let last = self.end.min(end);
        Some(Self {
            begin: first - begin,
            end: last - begin,
            origin: self.origin.clone(),
            offset: self.offset + (first - self.begin),
        })
    }

    /// Move the record `n` bytes to the right.
    pub fn shifted(&self, n: usize) -> Self {
        Self {
            begin: self.begin + n,
            end: self.end + n,
            origin: self.origin.clone(),
            offset: self.offset,
        }
    }

    /// Whether `next` continues this record without a gap, both locally and
    /// in the source.
    pub(crate) fn continues_into(&self, next: &OriginRange) -> bool {
        self.end == next.begin
            && self.origin == next.origin
            && self.offset + self.len() == next.offset
    }
}

impl fmt::Display for OriginRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = self.origin.as_deref().unwrap_or("<none>");
        write!(f, "{}[{}:{}:+{}]", origin, self.begin, self.end, self.offset)
    }
}
