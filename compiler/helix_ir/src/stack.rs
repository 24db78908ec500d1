//! Stack growth for recursive tree walks.
//!
//! Surface trees and typed bodies can nest arbitrarily deep (long `let`
//! chains, deeply curried calls, recursive specializations). Every recursive
//! walk in the compiler goes through [`ensure_sufficient_stack`], which grows
//! the native stack in 1MB segments once fewer than 128KB remain.

/// Run `f`, first growing the stack if it is close to exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const SEGMENT: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, SEGMENT, f)
}

/// On wasm the engine owns the stack; `f` runs directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
