//! Surface expressions.
//!
//! Expressions are interned [`Node`]s: equal subtrees are one node, and a
//! node's symbol is the code identity used in join-point keys.

use std::rc::Rc;

use crate::{Literal, Name, Node, Op, Pattern, Pos};

/// An interned surface expression.
pub type Expr = Node<ExprKind>;

/// Names free in a function body, sorted by `Name`.
pub type FreeVars = Rc<[Name]>;

/// Parameter and body of a function literal.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct FunctionCore {
    pub param: Name,
    pub body: Expr,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ExprKind {
    Var(Name),
    Lit(Literal),
    /// A first-class matcher. Evaluates to a one-argument function.
    Pattern(Pattern),
    /// Function capturing the whole lexical environment.
    Function(FunctionCore),
    /// Function capturing only the listed free variables.
    FunctionFilt(FreeVars, FunctionCore),
    /// Function that can refer to itself under the given name.
    RecFunction(Name, FunctionCore),
    Tuple(Rc<[Expr]>),
    Op(Op, Rc<[Expr]>),
    Pos(Pos<Expr>),
}

impl ExprKind {
    /// The expression with any position wrappers removed.
    pub fn unwrap_pos(&self) -> &ExprKind {
        let mut kind = self;
        while let ExprKind::Pos(pos) = kind {
            kind = pos.value.value();
        }
        kind
    }
}
