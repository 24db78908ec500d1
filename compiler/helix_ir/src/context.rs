//! Owner of everything a surface program is made of.
//!
//! `AstContext` holds the string interner, the expression and pattern
//! interners, and the caches derived from interned nodes (free variables,
//! lowered patterns, prefiltered functions). Caches are keyed by node
//! [`Symbol`], so each node is analyzed at most once per compilation.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::{
    Expr, ExprKind, Name, NodeInterner, Pattern, PatternKind, StringInterner, StringLookup,
    Symbol,
};

pub struct AstContext {
    names: StringInterner,
    exprs: NodeInterner<ExprKind>,
    patterns: NodeInterner<PatternKind>,
    /// Free variables per expression, in order of first use.
    pub(crate) free_vars: FxHashMap<Symbol, Rc<[Name]>>,
    pub(crate) lowered_patterns: FxHashMap<Symbol, Expr>,
    pub(crate) prefiltered: FxHashMap<Symbol, Expr>,
    next_fresh: u32,
}

impl AstContext {
    pub fn new() -> Self {
        AstContext {
            names: StringInterner::new(),
            exprs: NodeInterner::new(),
            patterns: NodeInterner::new(),
            free_vars: FxHashMap::default(),
            lowered_patterns: FxHashMap::default(),
            prefiltered: FxHashMap::default(),
            next_fresh: 0,
        }
    }

    #[inline]
    pub fn name(&mut self, s: &str) -> Name {
        self.names.intern(s)
    }

    #[inline]
    pub fn resolve(&self, name: Name) -> &str {
        self.names.lookup(name)
    }

    pub fn names(&self) -> &StringInterner {
        &self.names
    }

    /// Intern an expression node.
    #[inline]
    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        self.exprs.intern(kind)
    }

    /// Intern a pattern node.
    #[inline]
    pub fn pattern(&mut self, kind: PatternKind) -> Pattern {
        self.patterns.intern(kind)
    }

    /// A name no user program can spell.
    ///
    /// Generated names start with a space, which the surface syntax does not
    /// allow in identifiers.
    pub fn fresh_name(&mut self, hint: &str) -> Name {
        let n = self.next_fresh;
        self.next_fresh += 1;
        self.names.intern(&format!(" {hint}_{n}"))
    }

    /// Number of distinct expression nodes.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for AstContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StringLookup for AstContext {
    fn lookup(&self, name: Name) -> &str {
        self.names.lookup(name)
    }
}
