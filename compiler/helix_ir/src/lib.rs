//! Helix IR - Surface AST, typed IR and environments
//!
//! This crate contains the data model shared by the Helix partial evaluator:
//! - Names and the string interner
//! - Hash-consed nodes ([`Node`], [`NodeInterner`])
//! - Source positions and call traces
//! - Literals, primitive types and the closed [`Op`] set
//! - Surface expressions and patterns, plus their builder
//! - Types and the typed IR the evaluator produces
//! - Environments in their three representations
//! - Free-variable analysis and pattern lowering
//!
//! # Design Philosophy
//!
//! - **Intern trees**: structurally equal expressions, patterns and consed
//!   environments are one node, compared by symbol in O(1).
//! - **Store types**: composite typed nodes carry their type, so type
//!   derivation never walks a body.
//! - **No globals**: everything mutable lives in an [`AstContext`] or in the
//!   evaluator's compilation context.
//!
//! Floats are stored as bits so every IR type can be hashed and ordered.

mod builder;
mod context;
mod env;
mod expr;
mod free_vars;
mod interner;
mod literal;
mod lower_pattern;
mod name;
mod node;
mod op;
mod pattern;
mod position;
pub mod stack;
mod ty;
mod typed;

pub use context::AstContext;
pub use env::{EnvMap, EnvTerm};
pub use expr::{Expr, ExprKind, FreeVars, FunctionCore};
pub use interner::{InternError, StringInterner, StringLookup};
pub use literal::{Literal, PrimitiveType};
pub use name::Name;
pub use node::{content_hash, Node, NodeInterner, Symbol};
pub use op::{ArrayKind, JoinPointKind, LayoutKind, Op};
pub use pattern::{Clause, ModulePattern, Pattern, PatternKind};
pub use position::{LineCol, Pos, PosKey, Trace};
pub use ty::{MacroPart, MapKind, Ty, TyEnv};
pub use typed::{
    type_of, JoinPointCall, JoinPointKey, JoinPointKeyData, LetNode, OpNode, StateNode, Tag,
    TagGen, TyTag, TypedExpr,
};
