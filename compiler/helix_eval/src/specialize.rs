//! Join-point specialization.
//!
//! A join point is a piece of code evaluated once per distinct shape of its
//! captured environment. The key is the body together with the consed,
//! canonically renamed captures; runtime variables in the captures become
//! the specialization's parameters and the caller passes its own variables
//! in the same order.
//!
//! Entries move through `absent -> InEvaluation -> Done`. A body that fails
//! leaves no entry behind. Reaching an entry that is still in evaluation is
//! recursion: it succeeds when the result type is already known (from an
//! annotation or from a sibling branch), produces a `Rec` back-reference for
//! type join points, and is an error otherwise.

use std::rc::Rc;

use tracing::{debug, trace};

use helix_ir::stack::ensure_sufficient_stack;
use helix_ir::{
    EnvMap, EnvTerm, Expr, JoinPointKey, JoinPointKeyData, JoinPointKind, Name, Node, TagGen,
    Trace, Ty, TyTag, TypedExpr,
};

use crate::compilation::{Compilation, JoinPointEntry, JoinPointResult, JoinPointState};
use crate::errors::{
    depth_exceeded, pattern_miss, type_mismatch, unbound_name, unsupported_recursion, EvalResult,
};
use crate::lang_env::LangEnv;
use crate::renamer::{Renamed, Renamer};

/// Extra inputs of a specialization request.
#[derive(Default)]
pub(crate) struct SpecializeOpts {
    /// Declared result type.
    pub(crate) annot: Option<Ty>,
    /// Closure argument name and domain.
    pub(crate) param: Option<(Name, Ty)>,
}

/// What a call site needs to emit a join-point call.
pub(crate) struct Specialized {
    pub(crate) key: JoinPointKey,
    /// Caller-side variables, aligned with the body's parameters.
    pub(crate) call_args: Rc<[TyTag]>,
    pub(crate) ty: Ty,
}

/// Captures renamed into canonical tags.
struct Captured {
    env: Node<EnvMap>,
    call_args: Rc<[TyTag]>,
    params: Rc<[TyTag]>,
    closure_param: Option<TyTag>,
    tags: TagGen,
}

impl Compilation {
    /// Specialize `body` under the captures it takes from `env`.
    #[tracing::instrument(level = "debug", skip_all, fields(kind = kind.name()))]
    pub(crate) fn specialize(
        &mut self,
        env: &EnvTerm,
        trace: &Trace,
        kind: JoinPointKind,
        body: &Expr,
        opts: SpecializeOpts,
    ) -> EvalResult<Specialized> {
        let captured = self.capture_env(env, trace, body, opts.param.as_ref())?;
        let key = self.keys.intern(JoinPointKeyData {
            body: body.clone(),
            env: captured.env.clone(),
        });
        let call_args = Rc::clone(&captured.call_args);

        if let Some(entry) = self.tables.table(kind).get(&key) {
            let ty = match &entry.state {
                JoinPointState::Done(result) => {
                    self.stats.cache_hits += 1;
                    trace!(key = %key.symbol(), "join point cache hit");
                    result.ty.clone()
                }
                JoinPointState::InEvaluation(Some(ty)) => {
                    self.stats.recursive_hits += 1;
                    trace!(key = %key.symbol(), "recursive join point with known type");
                    ty.clone()
                }
                JoinPointState::InEvaluation(None) => {
                    self.stats.recursive_hits += 1;
                    if kind == JoinPointKind::Type {
                        return Ok(Specialized {
                            ty: Ty::Rec(key.clone()),
                            key,
                            call_args,
                        });
                    }
                    return Err(unsupported_recursion(kind, key, trace));
                }
            };
            return Ok(Specialized {
                key,
                call_args,
                ty,
            });
        }

        let limit = self.config.max_specialization_depth;
        if self.depth >= limit {
            return Err(depth_exceeded(limit, trace));
        }
        self.tables.table_mut(kind).insert(
            key.clone(),
            JoinPointEntry {
                state: JoinPointState::InEvaluation(opts.annot),
                trace: trace.clone(),
            },
        );
        debug!(
            key = %key.symbol(),
            params = captured.params.len(),
            depth = self.depth,
            "specializing join point"
        );

        self.depth += 1;
        let outcome =
            ensure_sufficient_stack(|| self.specialize_body(kind, &key, body, captured, trace));
        self.depth -= 1;

        match outcome {
            Ok(ty) => Ok(Specialized {
                key,
                call_args,
                ty,
            }),
            Err(err) => {
                self.tables.table_mut(kind).remove(&key);
                debug!(key = %key.symbol(), error = %err, "join point failed");
                Err(err)
            }
        }
    }

    /// Look up and rename the captures of `body`.
    fn capture_env(
        &mut self,
        env: &EnvTerm,
        trace: &Trace,
        body: &Expr,
        param: Option<&(Name, Ty)>,
    ) -> EvalResult<Captured> {
        let free = self.ast.free_vars(body);
        let param_name = param.map(|(name, _)| *name);
        let mut values = Vec::with_capacity(free.len());
        for name in free.iter().copied() {
            if param_name == Some(name) {
                continue;
            }
            match env.lookup(name) {
                Some(value) => values.push((name, value.clone())),
                None => return Err(unbound_name(self.ast.resolve(name), trace)),
            }
        }

        let mut renamer = Renamer::new(&mut self.envs, TagGen::default());
        let mut captures = EnvMap::new();
        for (name, value) in &values {
            captures.insert(*name, renamer.rename(value));
        }
        let closure_param = param.map(|(name, dom)| {
            let var = renamer.fresh_var(dom.clone());
            let value = if dom.is_unit() {
                TypedExpr::from_unit_type(dom)
            } else {
                TypedExpr::Var(var.clone())
            };
            captures.insert(*name, value);
            var
        });
        let Renamed {
            call_args,
            method_pars,
            tags,
        } = renamer.finish();
        Ok(Captured {
            env: EnvTerm::plain(captures).cons(&mut self.envs),
            call_args: Rc::from(call_args),
            params: Rc::from(method_pars),
            closure_param,
            tags,
        })
    }

    /// Evaluate a join-point body and record the result.
    fn specialize_body(
        &mut self,
        kind: JoinPointKind,
        key: &JoinPointKey,
        body: &Expr,
        captured: Captured,
        trace: &Trace,
    ) -> EvalResult<Ty> {
        let mut lenv = LangEnv::for_join_point(
            EnvTerm::Consed(captured.env),
            captured.tags,
            trace.clone(),
            kind,
            key.clone(),
        );
        let value = self.eval(&mut lenv, body)?;
        let (body, mut ty) = if kind == JoinPointKind::Type {
            // Type join points are evaluated for their type only.
            let ty = value.ty();
            (TypedExpr::Type(ty.clone()), ty)
        } else {
            let body = std::mem::take(&mut lenv.seq).wrap(value);
            if body.ends_in_pattern_miss() {
                return Err(pattern_miss(
                    format!("no clause matched on any path of a {} body", kind.name()),
                    trace,
                ));
            }
            let ty = body.ty();
            (body, ty)
        };

        if let Some(JoinPointState::InEvaluation(Some(expected))) = self.join_point(kind, key) {
            if *expected != ty {
                return Err(type_mismatch(
                    format!("{} join point result", kind.name()),
                    self.format_type(expected),
                    self.format_type(&ty),
                    trace,
                ));
            }
        }
        if kind == JoinPointKind::Cuda && !ty.is_unit() {
            return Err(type_mismatch(
                "kernel result",
                "()",
                self.format_type(&ty),
                trace,
            ));
        }
        if kind == JoinPointKind::Type && ty.mentions_rec(key) {
            self.rec_types.insert(key.clone(), ty);
            ty = Ty::Rec(key.clone());
        }

        let result = JoinPointResult {
            body,
            ty: ty.clone(),
            params: captured.params,
            closure_param: captured.closure_param,
        };
        if let Some(entry) = self.tables.table_mut(kind).get_mut(key) {
            entry.state = JoinPointState::Done(Rc::new(result));
        }
        self.finished.push((kind, key.clone()));
        self.stats.bodies_evaluated += 1;
        debug!(key = %key.symbol(), ty = %self.format_type(&ty), "join point done");
        Ok(ty)
    }
}
