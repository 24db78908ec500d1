//! String interner for identifiers.
//!
//! Provides O(1) interning and lookup. One interner belongs to one
//! compilation; it is never shared between independent compilations.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::Name;

/// Error when an interner runs out of handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// More than `u32::MAX` distinct entries.
    Overflow { interner: &'static str, count: usize },
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternError::Overflow { interner, count } => write!(
                f,
                "{interner} interner exceeded capacity: {count} entries, max is {}",
                u32::MAX
            ),
        }
    }
}

impl std::error::Error for InternError {}

/// The next handle of a table holding `count` entries.
pub(crate) fn next_index(interner: &'static str, count: usize) -> Result<u32, InternError> {
    u32::try_from(count).map_err(|_| InternError::Overflow { interner, count })
}

/// String interner mapping identifier text to [`Name`] handles.
pub struct StringInterner {
    /// Map from string content to its handle.
    map: FxHashMap<Rc<str>, Name>,
    /// Storage for string contents, indexed by `Name::index`.
    strings: Vec<Rc<str>>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let empty: Rc<str> = Rc::from("");
        let mut map = FxHashMap::default();
        map.insert(Rc::clone(&empty), Name::EMPTY);
        StringInterner {
            map,
            strings: vec![empty],
        }
    }

    /// Try to intern a string, returning its Name or an error on overflow.
    pub fn try_intern(&mut self, s: &str) -> Result<Name, InternError> {
        if let Some(&name) = self.map.get(s) {
            return Ok(name);
        }
        let name = Name::from_raw(next_index("string", self.strings.len())?);
        let stored: Rc<str> = Rc::from(s);
        self.strings.push(Rc::clone(&stored));
        self.map.insert(stored, name);
        Ok(name)
    }

    /// Intern a string, returning its Name.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct strings are interned.
    /// Use `try_intern` for fallible interning.
    pub fn intern(&mut self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Look up the string for a Name.
    ///
    /// Names from a different interner resolve to `"<unknown>"`.
    pub fn lookup(&self, name: Name) -> &str {
        self.strings.get(name.index()).map_or("<unknown>", |s| s)
    }

    /// Look up a string without interning it.
    pub fn get(&self, s: &str) -> Option<Name> {
        self.map.get(s).copied()
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the interner holds only the empty string.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for looking up interned string names.
///
/// Lets formatting code accept anything that can resolve a [`Name`] without
/// depending on the concrete interner.
pub trait StringLookup {
    /// Look up the string for an interned name.
    fn lookup(&self, name: Name) -> &str;
}

impl StringLookup for StringInterner {
    fn lookup(&self, name: Name) -> &str {
        StringInterner::lookup(self, name)
    }
}
