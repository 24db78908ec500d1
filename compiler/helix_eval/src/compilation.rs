//! The compilation context.
//!
//! A `Compilation` owns all mutable state of one compilation: the surface
//! AST context, the environment and key interners, the join-point tables,
//! the recursive-type table and the counters. It is threaded explicitly
//! through evaluation. Independent compilations share nothing.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use helix_ir::{
    AstContext, EnvMap, EnvTerm, Expr, JoinPointKey, JoinPointKeyData, JoinPointKind,
    NodeInterner, TagGen, Trace, Ty, TyTag, TypedExpr,
};

use crate::errors::{pattern_miss, EvalResult};
use crate::lang_env::LangEnv;
use crate::program::{FunctionDef, Program};
use crate::renamer::{next_free_tag, Renamer};
use crate::{EvalConfig, SpecializationStats};

/// A finished join-point body.
#[derive(Clone, Debug)]
pub struct JoinPointResult {
    /// Body in canonical tags.
    pub body: TypedExpr,
    pub ty: Ty,
    /// Formal parameters, one per captured runtime variable.
    pub params: Rc<[TyTag]>,
    /// Argument of a closure body.
    pub closure_param: Option<TyTag>,
}

#[derive(Clone, Debug)]
pub enum JoinPointState {
    /// The body is being evaluated. Holds the result type when it is already
    /// known from an annotation or a sibling branch.
    InEvaluation(Option<Ty>),
    Done(Rc<JoinPointResult>),
}

#[derive(Clone, Debug)]
pub(crate) struct JoinPointEntry {
    pub(crate) state: JoinPointState,
    /// Trace of the call that first requested the join point.
    pub(crate) trace: Trace,
}

/// One table per join-point kind.
#[derive(Default)]
pub(crate) struct JoinPointTables {
    method: FxHashMap<JoinPointKey, JoinPointEntry>,
    closure: FxHashMap<JoinPointKey, JoinPointEntry>,
    ty: FxHashMap<JoinPointKey, JoinPointEntry>,
    cuda: FxHashMap<JoinPointKey, JoinPointEntry>,
}

impl JoinPointTables {
    pub(crate) fn table(&self, kind: JoinPointKind) -> &FxHashMap<JoinPointKey, JoinPointEntry> {
        match kind {
            JoinPointKind::Method => &self.method,
            JoinPointKind::Closure => &self.closure,
            JoinPointKind::Type => &self.ty,
            JoinPointKind::Cuda => &self.cuda,
        }
    }

    pub(crate) fn table_mut(
        &mut self,
        kind: JoinPointKind,
    ) -> &mut FxHashMap<JoinPointKey, JoinPointEntry> {
        match kind {
            JoinPointKind::Method => &mut self.method,
            JoinPointKind::Closure => &mut self.closure,
            JoinPointKind::Type => &mut self.ty,
            JoinPointKind::Cuda => &mut self.cuda,
        }
    }
}

/// A cached body cloned into a caller's tag space.
#[derive(Clone, Debug)]
pub struct Instance {
    pub body: TypedExpr,
    pub params: Vec<TyTag>,
    pub closure_param: Option<TyTag>,
}

pub struct Compilation {
    pub(crate) ast: AstContext,
    pub(crate) envs: NodeInterner<EnvMap>,
    pub(crate) keys: NodeInterner<JoinPointKeyData>,
    pub(crate) tables: JoinPointTables,
    /// Definitions of recursive types, by the key that produced them.
    pub(crate) rec_types: FxHashMap<JoinPointKey, Ty>,
    /// Join points in the order their bodies finished.
    pub(crate) finished: Vec<(JoinPointKind, JoinPointKey)>,
    pub(crate) config: EvalConfig,
    pub(crate) stats: SpecializationStats,
    /// Join-point bodies currently being evaluated.
    pub(crate) depth: usize,
}

impl Compilation {
    /// A compilation configured from the process environment.
    pub fn new(ast: AstContext) -> Self {
        Self::with_config(ast, EvalConfig::from_env())
    }

    pub fn with_config(ast: AstContext, config: EvalConfig) -> Self {
        Compilation {
            ast,
            envs: NodeInterner::new(),
            keys: NodeInterner::new(),
            tables: JoinPointTables::default(),
            rec_types: FxHashMap::default(),
            finished: Vec::new(),
            config,
            stats: SpecializationStats::default(),
            depth: 0,
        }
    }

    pub fn ast(&self) -> &AstContext {
        &self.ast
    }

    pub fn ast_mut(&mut self) -> &mut AstContext {
        &mut self.ast
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn stats(&self) -> SpecializationStats {
        self.stats
    }

    /// State of a join point, if it was ever requested and did not fail.
    pub fn join_point(&self, kind: JoinPointKind, key: &JoinPointKey) -> Option<&JoinPointState> {
        self.tables.table(kind).get(key).map(|entry| &entry.state)
    }

    /// Trace of the call that first requested a join point.
    pub fn join_point_trace(&self, kind: JoinPointKind, key: &JoinPointKey) -> Option<&Trace> {
        self.tables.table(kind).get(key).map(|entry| &entry.trace)
    }

    /// Number of entries in the table for `kind`.
    pub fn join_point_count(&self, kind: JoinPointKind) -> usize {
        self.tables.table(kind).len()
    }

    /// Join points of every kind, in the order their bodies finished.
    pub fn finish_order(&self) -> &[(JoinPointKind, JoinPointKey)] {
        &self.finished
    }

    /// Definition of a recursive type.
    pub fn rec_type(&self, key: &JoinPointKey) -> Option<&Ty> {
        self.rec_types.get(key)
    }

    /// Forget the join points that finished after the first `mark`.
    ///
    /// Their bodies may depend on a result type that turned out wrong.
    pub(crate) fn forget_finished_since(&mut self, mark: usize) {
        let mark = mark.min(self.finished.len());
        for (kind, key) in self.finished.split_off(mark) {
            self.tables.table_mut(kind).remove(&key);
            self.rec_types.remove(&key);
        }
    }

    /// Compile `expr` under `env`.
    ///
    /// Functions in `expr` are prefiltered first. Variables already in `env`
    /// keep their tags; new tags start above the highest one.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn compile(&mut self, expr: &Expr, env: EnvTerm) -> EvalResult<Program> {
        let expr = self.ast.prefilter(expr);
        let start = env
            .canonicalize()
            .values()
            .map(next_free_tag)
            .max()
            .unwrap_or(0);
        let mut lenv = LangEnv::new(env, TagGen::starting_at(start), Trace::empty());
        let result = self.eval(&mut lenv, &expr)?;
        let main = std::mem::take(&mut lenv.seq).wrap(result);
        if main.ends_in_pattern_miss() {
            return Err(pattern_miss(
                "no clause matched on any path of the program",
                &lenv.trace,
            ));
        }
        let ty = main.ty();
        debug!(
            functions = self.finished.len(),
            bodies = self.stats.bodies_evaluated,
            "compilation finished"
        );
        Ok(self.program(main, ty))
    }

    fn program(&self, main: TypedExpr, ty: Ty) -> Program {
        let mut functions = Vec::new();
        let mut rec_types = Vec::new();
        for (kind, key) in &self.finished {
            if *kind == JoinPointKind::Type {
                if let Some(def) = self.rec_types.get(key) {
                    rec_types.push((key.clone(), def.clone()));
                }
                continue;
            }
            if let Some(JoinPointState::Done(result)) = self.join_point(*kind, key) {
                functions.push(FunctionDef {
                    key: key.clone(),
                    kind: *kind,
                    params: result.params.to_vec(),
                    closure_param: result.closure_param.clone(),
                    ty: result.ty.clone(),
                    body: result.body.clone(),
                });
            }
        }
        Program {
            main,
            ty,
            functions,
            rec_types,
        }
    }

    /// Clone a finished body into the tag space of `tags`.
    ///
    /// Parameters and every bound variable get fresh tags, so two
    /// instances never share a tag.
    pub fn instantiate(
        &mut self,
        kind: JoinPointKind,
        key: &JoinPointKey,
        tags: &mut TagGen,
    ) -> Option<Instance> {
        let JoinPointState::Done(result) = self.join_point(kind, key)?.clone() else {
            return None;
        };
        let mut renamer = Renamer::new(&mut self.envs, std::mem::take(tags));
        let params = renamer.fresh_params(&result.params);
        let closure_param = result
            .closure_param
            .as_ref()
            .and_then(|param| renamer.fresh_params(std::slice::from_ref(param)).pop());
        let body = renamer.rename(&result.body);
        *tags = renamer.finish().tags;
        Some(Instance {
            body,
            params,
            closure_param,
        })
    }
}
