//! Compilation output.

use helix_ir::{JoinPointKey, JoinPointKind, Ty, TyTag, TypedExpr};

/// A monomorphic function produced by a method, closure or kernel join point.
#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub key: JoinPointKey,
    pub kind: JoinPointKind,
    /// Captured runtime variables, in the order call sites pass them.
    pub params: Vec<TyTag>,
    /// The argument, for closures.
    pub closure_param: Option<TyTag>,
    pub ty: Ty,
    pub body: TypedExpr,
}

/// Everything a back end needs.
///
/// `functions` are in the order their bodies finished, so a function that
/// calls another non-recursively comes after it.
#[derive(Clone, Debug)]
pub struct Program {
    pub main: TypedExpr,
    pub ty: Ty,
    pub functions: Vec<FunctionDef>,
    /// Definitions of recursive types, one per key.
    pub rec_types: Vec<(JoinPointKey, Ty)>,
}

impl Program {
    pub fn function(&self, key: &JoinPointKey) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| &f.key == key)
    }

    pub fn functions_of(&self, kind: JoinPointKind) -> impl Iterator<Item = &FunctionDef> {
        self.functions.iter().filter(move |f| f.kind == kind)
    }
}
