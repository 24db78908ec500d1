//! Patterns.
//!
//! Patterns never reach the evaluator directly: `AstContext::lower_pattern`
//! compiles them to nested conditionals over primitive ops.

use std::rc::Rc;

use crate::{Expr, Literal, Name, Node};

/// An interned pattern.
pub type Pattern = Node<PatternKind>;

/// One `pattern -> body` arm.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Clause {
    pub pattern: Pattern,
    pub body: Expr,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum PatternKind {
    Wildcard,
    Var(Name),
    Lit(Literal),
    /// Fixed-length tuple destructuring.
    Tuple(Rc<[Pattern]>),
    /// Prefix destructuring; the last pattern matches the remaining tuple.
    Cons(Rc<[Pattern]>, Pattern),
    /// Succeeds when the value's type equals the type the expression evaluates to.
    TypeEq(Pattern, Expr),
    /// Applies the function and matches the result.
    Active(Expr, Pattern),
    /// Applies the function, which returns `(bool, value)`; on `true` matches the value.
    PartialActive(Expr, Pattern),
    /// Applies the predicate; on `true` matches the original value.
    ExtensionActive(Expr, Pattern),
    Or(Rc<[Pattern]>),
    And(Rc<[Pattern]>),
    /// Guard evaluated after the inner pattern bound its variables.
    When(Pattern, Expr),
    Module(ModulePattern),
    /// Ordered arms; the first arm whose pattern matches is taken.
    Clauses(Rc<[Clause]>),
}

/// Pattern over the fields of a module.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ModulePattern {
    /// Field must be present; its value is bound to `bind`.
    Member { field: Name, bind: Name },
    /// Field must be present and its value must match `pattern`.
    Inner { field: Name, pattern: Pattern },
    And(Rc<[ModulePattern]>),
    Or(Rc<[ModulePattern]>),
    /// Exactly one side matches; only that side's bindings are visible.
    Xor(Rc<ModulePattern>, Rc<ModulePattern>),
    /// Succeeds when the inner pattern fails; binds nothing.
    Not(Rc<ModulePattern>),
}
