//! Common-subexpression table.
//!
//! Maps a pure operation applied to already evaluated operands to the
//! variable that holds its result. One table per specialized body. Each
//! branch of a dynamic conditional runs in its own scope; popping the scope
//! forgets everything the branch added, so a result bound in one branch is
//! never reused in its sibling.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use helix_ir::{Op, TyTag, TypedExpr};

/// An operation with its operands.
pub type CseKey = (Op, SmallVec<[TypedExpr; 2]>);

#[derive(Default)]
pub struct CseTable {
    entries: FxHashMap<CseKey, TyTag>,
    /// Keys added in each open scope, innermost last.
    scopes: Vec<Vec<CseKey>>,
}

impl CseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CseKey) -> Option<&TyTag> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CseKey, var: TyTag) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(key.clone());
        }
        self.entries.insert(key, var);
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for key in scope {
                self.entries.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
