//! Statement sequencing.
//!
//! Evaluation produces runtime work as a flat list of statements in the
//! order it happened. When a body is finished the list is folded, from the
//! last statement to the first, into nested `Let`/`State` nodes around the
//! body's result.

use helix_ir::{Trace, TyTag, TypedExpr};

enum Statement {
    Let {
        bind: TyTag,
        bound: TypedExpr,
        trace: Trace,
    },
    State {
        stmt: TypedExpr,
        trace: Trace,
    },
}

#[derive(Default)]
pub struct StatementSeq {
    statements: Vec<Statement>,
}

impl StatementSeq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_let(&mut self, bind: TyTag, bound: TypedExpr, trace: Trace) {
        self.statements.push(Statement::Let { bind, bound, trace });
    }

    pub fn push_state(&mut self, stmt: TypedExpr, trace: Trace) {
        self.statements.push(Statement::State { stmt, trace });
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Close the sequence around `result`.
    pub fn wrap(self, result: TypedExpr) -> TypedExpr {
        self.statements
            .into_iter()
            .rev()
            .fold(result, |rest, statement| match statement {
                Statement::Let { bind, bound, trace } => {
                    TypedExpr::let_in(bind, bound, rest, trace)
                }
                Statement::State { stmt, trace } => TypedExpr::state(stmt, rest, trace),
            })
    }
}
