//! Hash-consed tree nodes.
//!
//! [`NodeInterner`] canonicalizes structurally equal values to one shared
//! [`Node`]. A node's identity is its [`Symbol`]: equality, hashing and
//! ordering of nodes compare symbols only, so comparing two interned
//! subtrees is O(1) no matter how large they are.
//!
//! Children of interned values are themselves nodes, so hashing a value
//! during interning touches only its immediate fields.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::interner::{next_index, InternError};

/// Identity of an interned node, assigned in interning order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    /// Get raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An interned value.
///
/// Cloning is a reference-count bump. Two nodes from the same interner are
/// equal iff their values are structurally equal.
pub struct Node<T> {
    symbol: Symbol,
    /// Content hash computed once at interning time.
    content_hash: u64,
    value: Rc<T>,
}

impl<T> Node<T> {
    /// The node's identity.
    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Structural hash of the value, stable for equal values.
    #[inline]
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Borrow the interned value.
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Share the interned value.
    #[inline]
    pub fn shared(&self) -> Rc<T> {
        Rc::clone(&self.value)
    }
}

impl<T> Clone for Node<T> {
    #[inline]
    fn clone(&self) -> Self {
        Node {
            symbol: self.symbol,
            content_hash: self.content_hash,
            value: Rc::clone(&self.value),
        }
    }
}

impl<T> PartialEq for Node<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl<T> Eq for Node<T> {}

impl<T> Hash for Node<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl<T> PartialOrd for Node<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Node<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.symbol.cmp(&other.symbol)
    }
}

impl<T> Deref for Node<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.symbol)?;
        self.value.fmt(f)
    }
}

/// Hash a value with the same hasher the interner uses.
pub fn content_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    FxBuildHasher.hash_one(value)
}

/// Hash-consing table for one value type.
///
/// Never evicts: the table lives as long as the compilation that owns it.
pub struct NodeInterner<T> {
    map: FxHashMap<Rc<T>, Symbol>,
    nodes: Vec<(u64, Rc<T>)>,
}

impl<T: Hash + Eq> NodeInterner<T> {
    /// Create an empty interner.
    pub fn new() -> Self {
        NodeInterner {
            map: FxHashMap::default(),
            nodes: Vec::new(),
        }
    }

    /// Try to intern a value, returning an error on overflow.
    ///
    /// Returns the existing node when a structurally equal value was interned
    /// before, otherwise a node with the next symbol.
    pub fn try_intern(&mut self, value: T) -> Result<Node<T>, InternError> {
        if let Some(&symbol) = self.map.get(&value) {
            let (content_hash, value) = &self.nodes[symbol.index()];
            return Ok(Node {
                symbol,
                content_hash: *content_hash,
                value: Rc::clone(value),
            });
        }
        let symbol = Symbol(next_index("node", self.nodes.len())?);
        let content_hash = content_hash(&value);
        let value = Rc::new(value);
        self.nodes.push((content_hash, Rc::clone(&value)));
        self.map.insert(Rc::clone(&value), symbol);
        Ok(Node {
            symbol,
            content_hash,
            value,
        })
    }

    /// Intern a value.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct values are interned.
    /// Use `try_intern` for fallible interning.
    pub fn intern(&mut self, value: T) -> Node<T> {
        self.try_intern(value).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Fetch a previously interned node by symbol.
    pub fn get(&self, symbol: Symbol) -> Option<Node<T>> {
        self.nodes
            .get(symbol.index())
            .map(|(content_hash, value)| Node {
                symbol,
                content_hash: *content_hash,
                value: Rc::clone(value),
            })
    }

    /// Number of distinct values interned.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T: Hash + Eq> Default for NodeInterner<T> {
    fn default() -> Self {
        Self::new()
    }
}
