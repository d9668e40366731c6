//! The traceable string itself.
//!
//! Content is addressed by byte offsets. Every operation returns a new
//! value; origin records are clipped and shifted, never patched in place.

use std::cell::OnceCell;
use std::fmt;
use std::ops::{Add, Bound, RangeBounds};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};
use crate::origin::{Origin, OriginRange};

/// Where a single byte of a [`TraceableString`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition<'a> {
    /// Source identifier, `None` for synthetic text.
    pub origin: Option<&'a str>,
    /// Byte offset inside that source.
    pub offset: usize,
}

impl<'a> SourcePosition<'a> {
    pub fn new(origin: Option<&'a str>, offset: usize) -> Self {
        Self { origin, offset }
    }
}

/// A string together with the provenance of its bytes.
///
/// Records in `origins` are sorted by `begin` and never overlap. They do not
/// need to cover the whole content: bytes outside every record have no
/// known origin.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "TraceableStringData", into = "TraceableStringData")]
pub struct TraceableString {
    content: String,
    origins: Vec<OriginRange>,
    line_index: OnceCell<Vec<usize>>,
}

impl TraceableString {
    /// Wrap `content` read from `origin`, starting at source offset 0.
    pub fn new(content: impl Into<String>, origin: Option<&str>) -> Self {
        Self::with_offset(content, origin, 0)
    }

    /// Wrap `content` read from `origin`, starting at source byte `offset`.
    pub fn with_offset(content: impl Into<String>, origin: Option<&str>, offset: usize) -> Self {
        Self::with_origin(content, origin.map(Arc::from), offset)
    }

    /// Like [`TraceableString::with_offset`] but shares an existing origin.
    pub fn with_origin(content: impl Into<String>, origin: Origin, offset: usize) -> Self {
        let content = content.into();
        let origins = if content.is_empty() {
            Vec::new()
        } else {
            vec![OriginRange::new(0, content.len(), origin, offset)]
        };
        Self {
            content,
            origins,
            line_index: OnceCell::new(),
        }
    }

    /// Text without a known origin, e.g. inserted separators.
    pub fn synthetic(content: impl Into<String>) -> Self {
        Self::with_origin(content, None, 0)
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn into_string(self) -> String {
        self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn origins(&self) -> &[OriginRange] {
        &self.origins
    }

    /// Copy out the bytes in `range`, with origin records clipped to it.
    ///
    /// Fails with [`TraceError::Range`] for reversed or out-of-bounds
    /// windows and with [`TraceError::Unsupported`] when a bound would split
    /// a multi-byte character.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> TraceResult<Self> {
        let begin = match range.start_bound() {
            Bound::Included(&b) => b,
            Bound::Excluded(&b) => b + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len(),
        };
        if begin > end || end > self.len() {
            return Err(TraceError::Range {
                begin,
                end,
                len: self.len(),
            });
        }
        if !self.content.is_char_boundary(begin) || !self.content.is_char_boundary(end) {
            return Err(TraceError::Unsupported(format!(
                "slice [{}:{}] splits a multi-byte character",
                begin, end
            )));
        }
        let origins = self
            .origins
            .iter()
            .filter_map(|o| o.clip(begin, end))
            .collect();
        Ok(Self {
            content: self.content[begin..end].to_string(),
            origins,
            line_index: OnceCell::new(),
        })
    }

    /// `self` followed by `other`; the records of `other` move right by
    /// `self.len()`.
    pub fn concat(&self, other: &TraceableString) -> Self {
        let mut joined = Self {
            content: self.content.clone(),
            origins: self.origins.clone(),
            line_index: OnceCell::new(),
        };
        joined.append(other);
        joined
    }

    /// Concatenate all `pieces` in order.
    pub fn join<'a, I>(pieces: I) -> Self
    where
        I: IntoIterator<Item = &'a TraceableString>,
    {
        let mut joined = Self::default();
        for piece in pieces {
            joined.append(piece);
        }
        joined
    }

    // Only called on values no one else has observed yet.
    fn append(&mut self, other: &TraceableString) {
        let shift = self.content.len();
        self.content.push_str(&other.content);
        for record in other.origins.iter().filter(|o| !o.is_empty()) {
            let moved = record.shifted(shift);
            match self.origins.last_mut() {
                Some(last) if last.continues_into(&moved) => last.end = moved.end,
                _ => self.origins.push(moved),
            }
        }
        self.line_index = OnceCell::new();
    }

    /// Origin of byte `index`, or `None` when no record covers it.
    pub fn origin_at(&self, index: usize) -> TraceResult<Option<SourcePosition<'_>>> {
        if index >= self.len() {
            return Err(TraceError::Index {
                index,
                len: self.len(),
            });
        }
        Ok(self.origins.iter().find_map(|o| {
            o.source_offset(index)
                .map(|offset| SourcePosition::new(o.origin.as_deref(), offset))
        }))
    }

    /// Origin of byte `column` on zero-based line `line`.
    pub fn origin_at_line(
        &self,
        line: usize,
        column: usize,
    ) -> TraceResult<Option<SourcePosition<'_>>> {
        let index = self.line_index.get_or_init(|| line_starts(&self.content));
        let start = index.get(line).ok_or(TraceError::Line {
            line,
            lines: index.len(),
        })?;
        self.origin_at(start + column)
    }

    /// `{"content": ..., "origins": [{"begin", "end", "origin", "offset"}]}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "content": self.content,
            "origins": self.origins,
        })
    }

    /// Inverse of [`TraceableString::to_json`].
    pub fn from_json(value: &serde_json::Value) -> TraceResult<Self> {
        Ok(Self::deserialize(value)?)
    }
}

/// Byte offsets at which each line of `content` starts.
fn line_starts(content: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(content.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

impl PartialEq for TraceableString {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content && self.origins == other.origins
    }
}

impl Eq for TraceableString {}

impl fmt::Debug for TraceableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceableString")
            .field("content", &self.content)
            .field("origins", &self.origins)
            .finish()
    }
}

impl fmt::Display for TraceableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

impl AsRef<str> for TraceableString {
    fn as_ref(&self) -> &str {
        &self.content
    }
}

impl Add<&TraceableString> for TraceableString {
    type Output = TraceableString;

    fn add(mut self, rhs: &TraceableString) -> Self::Output {
        self.append(rhs);
        self
    }
}

impl Add<TraceableString> for TraceableString {
    type Output = TraceableString;

    fn add(self, rhs: TraceableString) -> Self::Output {
        self + &rhs
    }
}

#[derive(Serialize, Deserialize)]
struct TraceableStringData {
    content: String,
    origins: Vec<OriginRange>,
}

impl TryFrom<TraceableStringData> for TraceableString {
    type Error = TraceError;

    fn try_from(data: TraceableStringData) -> Result<Self, Self::Error> {
        let mut previous_end = 0;
        for record in &data.origins {
            if record.begin > record.end || record.end > data.content.len() {
                return Err(TraceError::Format(format!(
                    "origin {} does not fit content of length {}",
                    record,
                    data.content.len()
                )));
            }
            if record.begin < previous_end {
                return Err(TraceError::Format(format!(
                    "origin {} overlaps or precedes the previous record",
                    record
                )));
            }
            previous_end = record.end;
        }
        Ok(Self {
            content: data.content,
            origins: data.origins,
            line_index: OnceCell::new(),
        })
    }
}

impl From<TraceableString> for TraceableStringData {
    fn from(s: TraceableString) -> Self {
        Self {
            content: s.content,
            origins: s.origins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> TraceableString {
        TraceableString::new("line 0\nline 1\n", Some("main.tex"))
            + TraceableString::new("line 2\nline 3", Some("sub.tex"))
            + TraceableString::synthetic("{}")
            + TraceableString::with_offset("line 4\n", Some("main.tex"), 30)
    }

    #[test]
    fn test_new_covers_content() {
        let s = TraceableString::new("abc", Some("a.tex"));
        assert_eq!(s.origins().len(), 1);
        assert_eq!(s.origins()[0].range().len(), 3);
        assert_eq!(
            s.origin_at(2).unwrap(),
            Some(SourcePosition::new(Some("a.tex"), 2))
        );
    }

    #[test]
    fn test_slice_translates_offsets() {
        let s = sample();
        for (a, b) in [(0, 0), (0, s.len()), (3, 17), (14, 28), (20, s.len())] {
            let part = s.slice(a..b).unwrap();
            assert_eq!(part.as_str(), &s.as_str()[a..b]);
            for i in 0..part.len() {
                assert_eq!(part.origin_at(i).unwrap(), s.origin_at(a + i).unwrap());
            }
        }
    }

    #[test]
    fn test_split_and_concat_is_identity() {
        let s = sample();
        for k in 0..=s.len() {
            let left = s.slice(..k).unwrap();
            let right = s.slice(k..).unwrap();
            assert_eq!(left.concat(&right), s, "split at {}", k);
        }
    }

    #[test]
    fn test_concat_shifts_right_operand() {
        let s =
            TraceableString::new("ab", Some("x")).concat(&TraceableString::new("cd", Some("y")));
        assert_eq!(s.as_str(), "abcd");
        assert_eq!(
            s.origin_at(2).unwrap(),
            Some(SourcePosition::new(Some("y"), 0))
        );
        assert_eq!(s.origins()[1].begin, 2);
    }

    #[test]
    fn test_slice_bounds() {
        let s = TraceableString::new("abc", Some("x"));
        assert!(matches!(s.slice(2..5), Err(TraceError::Range { .. })));
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = s.slice(2..1);
        assert!(matches!(reversed, Err(TraceError::Range { .. })));
        let umlaut = TraceableString::new("aüb", Some("x"));
        assert!(matches!(umlaut.slice(0..2), Err(TraceError::Unsupported(_))));
    }

    #[test]
    fn test_origin_at_gap_and_bounds() {
        let s = TraceableString::new("abcdef", Some("x"));
        let gappy = TraceableString::from_json(&serde_json::json!({
            "content": s.as_str(),
            "origins": [{"begin": 0, "end": 2, "origin": "x", "offset": 0}],
        }))
        .unwrap();
        assert_eq!(gappy.origin_at(3).unwrap(), None);
        assert!(matches!(s.origin_at(6), Err(TraceError::Index { .. })));
    }

    #[test]
    fn test_origin_at_line() {
        let s = sample();
        assert_eq!(
            s.origin_at_line(0, 4).unwrap(),
            Some(SourcePosition::new(Some("main.tex"), 4))
        );
        assert_eq!(
            s.origin_at_line(2, 4).unwrap(),
            Some(SourcePosition::new(Some("sub.tex"), 4))
        );
        assert_eq!(
            s.origin_at_line(3, 7).unwrap(),
            Some(SourcePosition::new(None, 1))
        );
        assert!(matches!(s.origin_at_line(9, 0), Err(TraceError::Line { .. })));
    }

    #[test]
    fn test_json_round_trip() {
        let s = sample().slice(3..25).unwrap();
        let json = s.to_json();
        assert_eq!(json["origins"][0]["origin"], "main.tex");
        assert_eq!(TraceableString::from_json(&json).unwrap(), s);

        let text = serde_json::to_string(&s).unwrap();
        let back: TraceableString = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_json_offset_defaults_to_zero() {
        let s = TraceableString::from_json(&serde_json::json!({
            "content": "abc",
            "origins": [{"begin": 0, "end": 3, "origin": null}],
        }))
        .unwrap();
        assert_eq!(s, TraceableString::synthetic("abc"));
    }

    #[test]
    fn test_json_rejects_malformed_data() {
        for bad in [
            serde_json::json!({"origins": []}),
            serde_json::json!({"content": "abc", "origins": [42]}),
            serde_json::json!({
                "content": "abc",
                "origins": [{"begin": 0, "end": 9, "origin": "x"}]
            }),
            serde_json::json!({"content": "abc"}),
        ] {
            assert!(matches!(
                TraceableString::from_json(&bad),
                Err(TraceError::Format(_))
            ));
        }
    }
}
