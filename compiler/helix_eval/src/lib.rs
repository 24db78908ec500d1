//! Helix Eval - Type-directed partial evaluator with join-point specialization.
//!
//! This crate turns a surface program into a typed, monomorphic program. Static
//! values (literals, types, functions, modules) are computed away; runtime work
//! remains as let-bound operations in the typed IR.
//!
//! # Architecture
//!
//! - [`Compilation`]: all mutable state of one compilation, threaded explicitly
//! - [`LangEnv`]: the per-body scope (environment, tags, statements, CSE table)
//! - `eval`: expression evaluation, one submodule per operation area
//! - `specialize`: join-point specialization and its memo tables
//! - [`Renamer`]: canonical renaming for keys and instantiation
//! - [`Program`]: the output a back end consumes
//!
//! # Example
//!
//! ```
//! use helix_eval::Compilation;
//! use helix_ir::{AstContext, EnvTerm, Literal, Op};
//!
//! let mut ast = AstContext::new();
//! let one = ast.lit(Literal::Int32(1));
//! let two = ast.lit(Literal::Int32(2));
//! let sum = ast.op(Op::Add, vec![one, two]);
//!
//! let mut compilation = Compilation::new(ast);
//! let program = compilation.compile(&sum, EnvTerm::empty()).unwrap();
//! assert_eq!(program.main.as_lit(), Some(&Literal::Int32(3)));
//! ```

mod compilation;
mod config;
mod cse;
pub mod errors;
mod eval;
mod format;
mod lang_env;
mod program;
mod renamer;
mod seq;
mod specialize;
mod tracing_setup;

pub use compilation::{Compilation, Instance, JoinPointResult, JoinPointState};
pub use config::{EvalConfig, SpecializationStats};
pub use cse::{CseKey, CseTable};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use format::{format_type, format_type_into};
pub use lang_env::LangEnv;
pub use program::{FunctionDef, Program};
pub use renamer::{env_params, next_free_tag, Renamed, Renamer};
pub use seq::StatementSeq;
pub use tracing_setup::init_tracing;
