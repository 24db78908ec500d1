//! Evaluation errors.
//!
//! Every failure aborts the compilation. Errors carry the trace of the
//! evaluation that raised them; the constructors below are the only way the
//! evaluator builds them.

use helix_ir::{JoinPointKey, JoinPointKind, Trace};

/// Result of an evaluation step.
pub type EvalResult<T> = Result<T, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("pattern match failure: {message}")]
    PatternMiss { message: String },

    #[error("type mismatch in {context}: expected {expected}, got {got}")]
    TypeMismatch {
        context: String,
        expected: String,
        got: String,
    },

    #[error("unbound name `{name}`")]
    UnboundName { name: String },

    #[error(
        "unsupported recursion shape: {kind} join point called itself before its result type \
         was known; annotate the result type"
    )]
    UnsupportedRecursion { kind: &'static str },

    #[error("macro error: {message}")]
    MacroError { message: String },

    #[error("value of type {ty} is not callable")]
    NotCallable { ty: String },

    #[error("{message}")]
    UserError { message: String },

    #[error("specialization depth limit of {limit} exceeded")]
    SpecializationDepthExceeded { limit: usize },
}

/// An evaluation error with the trace of where it was raised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub trace: Trace,
    /// Join point whose re-entry raised `UnsupportedRecursion`.
    pub(crate) pending: Option<(JoinPointKind, JoinPointKey)>,
}

impl EvalError {
    fn new(kind: EvalErrorKind, trace: &Trace) -> Self {
        EvalError {
            kind,
            trace: trace.clone(),
            pending: None,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

// Pattern Errors

#[cold]
pub fn pattern_miss(message: impl Into<String>, trace: &Trace) -> EvalError {
    EvalError::new(
        EvalErrorKind::PatternMiss {
            message: message.into(),
        },
        trace,
    )
}

// Type Errors

#[cold]
pub fn type_mismatch(
    context: impl Into<String>,
    expected: impl Into<String>,
    got: impl Into<String>,
    trace: &Trace,
) -> EvalError {
    EvalError::new(
        EvalErrorKind::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            got: got.into(),
        },
        trace,
    )
}

#[cold]
pub fn not_callable(ty: impl Into<String>, trace: &Trace) -> EvalError {
    EvalError::new(EvalErrorKind::NotCallable { ty: ty.into() }, trace)
}

// Name Errors

#[cold]
pub fn unbound_name(name: impl Into<String>, trace: &Trace) -> EvalError {
    EvalError::new(EvalErrorKind::UnboundName { name: name.into() }, trace)
}

// Specialization Errors

#[cold]
pub fn unsupported_recursion(kind: JoinPointKind, key: JoinPointKey, trace: &Trace) -> EvalError {
    EvalError {
        kind: EvalErrorKind::UnsupportedRecursion { kind: kind.name() },
        trace: trace.clone(),
        pending: Some((kind, key)),
    }
}

#[cold]
pub fn depth_exceeded(limit: usize, trace: &Trace) -> EvalError {
    EvalError::new(EvalErrorKind::SpecializationDepthExceeded { limit }, trace)
}

// Foreign Escape Errors

#[cold]
pub fn macro_error(message: impl Into<String>, trace: &Trace) -> EvalError {
    EvalError::new(
        EvalErrorKind::MacroError {
            message: message.into(),
        },
        trace,
    )
}

// User Errors

#[cold]
pub fn user_error(message: impl Into<String>, trace: &Trace) -> EvalError {
    EvalError::new(
        EvalErrorKind::UserError {
            message: message.into(),
        },
        trace,
    )
}
