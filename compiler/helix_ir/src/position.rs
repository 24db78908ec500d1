//! Source positions and call traces.
//!
//! Positions are diagnostic metadata only. [`Pos`] compares, hashes and orders
//! by its wrapped value, so two expressions that differ only in where they
//! were written intern to the same node.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::Name;

/// A 1-based line/column pair.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        LineCol { line, col }
    }
}

/// Source position key: module identity plus a line/column range.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct PosKey {
    pub module: Name,
    pub start: LineCol,
    pub end: LineCol,
}

impl PosKey {
    pub const fn new(module: Name, start: LineCol, end: LineCol) -> Self {
        PosKey { module, start, end }
    }
}

/// A value tagged with the position it was written at.
#[derive(Clone, Debug)]
pub struct Pos<T> {
    pub value: T,
    pub key: PosKey,
}

impl<T> Pos<T> {
    pub fn new(value: T, key: PosKey) -> Self {
        Pos { value, key }
    }
}

impl<T: PartialEq> PartialEq for Pos<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Pos<T> {}

impl<T: Hash> Hash for Pos<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: PartialOrd> PartialOrd for Pos<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<T: Ord> Ord for Pos<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

/// Ordered chain of positions, outermost call first.
///
/// Immutable and cheap to clone; [`Trace::push`] allocates a new chain.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Trace(Rc<[PosKey]>);

impl Trace {
    /// The empty trace.
    pub fn empty() -> Self {
        Trace(Rc::from(Vec::new()))
    }

    /// A new trace extended with `key` as its innermost position.
    #[must_use]
    pub fn push(&self, key: PosKey) -> Trace {
        if self.0.last() == Some(&key) {
            return self.clone();
        }
        let mut keys = Vec::with_capacity(self.0.len() + 1);
        keys.extend_from_slice(&self.0);
        keys.push(key);
        Trace(Rc::from(keys))
    }

    /// Positions from outermost to innermost.
    pub fn positions(&self) -> &[PosKey] {
        &self.0
    }

    /// The innermost position, if any.
    pub fn innermost(&self) -> Option<PosKey> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}
