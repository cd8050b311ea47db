//! FILENAME: drill-engine/src/path.rs
//! Drill path identities.
//!
//! A drill path names one value inside a nested hierarchy by the chain of
//! values leading to it: `[2023].[2].[5]`. Paths are compared by exact string
//! equality everywhere, including after a round trip through persisted state,
//! so the encoding below must stay stable.
//!
//! Encoding:
//! - each value is wrapped in brackets, segments are joined with `.`
//! - `[`, `]` and `\` inside a value are escaped with `\`
//! - the null value is the segment `[\N]`; the empty string is `[]`

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use condition_list::DataValue;

const NULL_SEGMENT: &str = "\\N";

/// One decoded segment of a drill path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Null,
    Value(String),
}

/// Canonical identity of one value within a nested hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrillPath(String);

impl DrillPath {
    /// The empty path above every top-level value.
    pub fn root() -> Self {
        DrillPath(String::new())
    }

    /// Wraps an already encoded path (e.g. read from persisted state).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        DrillPath(raw.into())
    }

    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a DataValue>,
    {
        let mut path = DrillPath::root();
        for value in values {
            path.push(value);
        }
        path
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path of `value` one level below this one.
    pub fn child(&self, value: &DataValue) -> DrillPath {
        let mut path = self.clone();
        path.push(value);
        path
    }

    fn push(&mut self, value: &DataValue) {
        if !self.0.is_empty() {
            self.0.push('.');
        }
        self.0.push('[');
        if value.is_null() {
            self.0.push_str(NULL_SEGMENT);
        } else {
            for ch in value.to_string().chars() {
                if matches!(ch, '[' | ']' | '\\') {
                    self.0.push('\\');
                }
                self.0.push(ch);
            }
        }
        self.0.push(']');
    }

    /// Decoded segments, root first. Parsing stops at the first malformed
    /// segment.
    pub fn segments(&self) -> SmallVec<[PathSegment; 4]> {
        self.scan().into_iter().map(|(_, seg)| seg).collect()
    }

    pub fn depth(&self) -> usize {
        self.scan().len()
    }

    /// The path one level up, or None for the root.
    pub fn parent(&self) -> Option<DrillPath> {
        let spans = self.scan();
        let (start, _) = spans.last()?;
        // Drop the separating '.' as well.
        let end = start.saturating_sub(1);
        Some(DrillPath(self.0[..end].to_string()))
    }

    /// True when `ancestor` is a strict prefix of this path on a segment
    /// boundary. Every non-root path descends from the root.
    pub fn is_descendant_of(&self, ancestor: &DrillPath) -> bool {
        if self.0.len() <= ancestor.0.len() {
            return false;
        }
        if ancestor.is_root() {
            return true;
        }
        self.0.starts_with(&ancestor.0) && self.0[ancestor.0.len()..].starts_with(".[")
    }

    /// Byte offset of each segment's opening bracket with its decoded value.
    fn scan(&self) -> SmallVec<[(usize, PathSegment); 4]> {
        let mut out = SmallVec::new();
        let bytes = self.0.as_bytes();
        let mut chars = self.0.char_indices().peekable();

        loop {
            let start = match chars.next() {
                Some((i, '[')) => i,
                _ => break,
            };
            let mut text = String::new();
            let mut escaped_null = false;
            let mut closed = false;
            while let Some((_, ch)) = chars.next() {
                match ch {
                    '\\' => match chars.next() {
                        Some((_, 'N')) if text.is_empty() => escaped_null = true,
                        Some((_, next)) => text.push(next),
                        None => break,
                    },
                    ']' => {
                        closed = true;
                        break;
                    }
                    _ => text.push(ch),
                }
            }
            if !closed {
                break;
            }
            let segment = if escaped_null && text.is_empty() {
                PathSegment::Null
            } else {
                PathSegment::Value(text)
            };
            out.push((start, segment));

            match chars.next() {
                None => break,
                Some((i, '.')) if bytes.get(i + 1) == Some(&b'[') => {}
                Some(_) => break,
            }
        }
        out
    }
}

impl fmt::Display for DrillPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
