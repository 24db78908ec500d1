//! Per-body evaluation state.

use std::mem;

use helix_ir::{EnvTerm, JoinPointKey, JoinPointKind, TagGen, Trace};

use crate::cse::CseTable;
use crate::seq::StatementSeq;

/// State of one evaluation scope: the body of the program or of a join
/// point. Never shared between bodies.
pub struct LangEnv {
    pub env: EnvTerm,
    pub tags: TagGen,
    pub seq: StatementSeq,
    pub cse: CseTable,
    pub trace: Trace,
    /// Number of enclosing dynamic branches.
    pub dynamic_depth: u32,
    /// The join point whose body this scope evaluates; `None` for the
    /// program body.
    pub owner: Option<(JoinPointKind, JoinPointKey)>,
}

/// What [`LangEnv::enter_branch`] saved.
pub(crate) struct BranchSave {
    seq: StatementSeq,
    env: EnvTerm,
    trace: Trace,
}

impl LangEnv {
    pub fn new(env: EnvTerm, tags: TagGen, trace: Trace) -> Self {
        LangEnv {
            env,
            tags,
            seq: StatementSeq::new(),
            cse: CseTable::new(),
            trace,
            dynamic_depth: 0,
            owner: None,
        }
    }

    /// The scope of a join-point body.
    pub fn for_join_point(
        env: EnvTerm,
        tags: TagGen,
        trace: Trace,
        kind: JoinPointKind,
        key: JoinPointKey,
    ) -> Self {
        LangEnv {
            owner: Some((kind, key)),
            ..Self::new(env, tags, trace)
        }
    }

    /// Whether this scope evaluates the body of `key`.
    pub fn owns(&self, kind: JoinPointKind, key: &JoinPointKey) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|(owner_kind, owner_key)| *owner_kind == kind && owner_key == key)
    }

    /// Start a branch of a dynamic conditional: a fresh statement list and
    /// a fresh CSE scope.
    pub(crate) fn enter_branch(&mut self) -> BranchSave {
        self.cse.push_scope();
        self.dynamic_depth += 1;
        BranchSave {
            seq: mem::take(&mut self.seq),
            env: self.env.clone(),
            trace: self.trace.clone(),
        }
    }

    /// Finish a branch and return its statements.
    pub(crate) fn leave_branch(&mut self, save: BranchSave) -> StatementSeq {
        self.cse.pop_scope();
        self.dynamic_depth -= 1;
        self.env = save.env;
        self.trace = save.trace;
        mem::replace(&mut self.seq, save.seq)
    }
}
