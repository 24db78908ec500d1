//! Evaluator configuration and counters.

use std::env;

/// Knobs for one compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalConfig {
    /// Share the results of equal pure operations within a body.
    pub cse: bool,
    /// Evaluate operations on literals at compile time.
    pub fold_constants: bool,
    /// Maximum number of join-point bodies being evaluated at once.
    pub max_specialization_depth: usize,
    /// Record source positions into traces.
    pub record_traces: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            cse: true,
            fold_constants: true,
            max_specialization_depth: 512,
            record_traces: true,
        }
    }
}

impl EvalConfig {
    /// Defaults overridden by `HELIX_MAX_SPECIALIZATION_DEPTH`, `HELIX_NO_CSE`
    /// and `HELIX_NO_FOLD`.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the variables
    /// [`EvalConfig::from_env`] reads.
    ///
    /// A depth that does not parse is ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(depth) = lookup("HELIX_MAX_SPECIALIZATION_DEPTH")
            .and_then(|v| v.trim().parse().ok())
        {
            config.max_specialization_depth = depth;
        }
        let flag_set = |var: &str| {
            lookup(var).is_some_and(|v| !matches!(v.as_str(), "" | "0" | "false"))
        };
        if flag_set("HELIX_NO_CSE") {
            config.cse = false;
        }
        if flag_set("HELIX_NO_FOLD") {
            config.fold_constants = false;
        }
        config
    }
}

/// Specialization counters, accumulated over a compilation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpecializationStats {
    /// Join-point bodies evaluated to completion.
    pub bodies_evaluated: usize,
    /// Calls answered from a finished entry.
    pub cache_hits: usize,
    /// Calls that reached an entry still being evaluated.
    pub recursive_hits: usize,
    pub cse_hits: usize,
}
