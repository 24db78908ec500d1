//! Conditionals, union dispatch, pattern misses and join-point entries.
//!
//! A conditional on a static boolean evaluates one branch inline. On a
//! runtime boolean both branches are evaluated, each in its own statement
//! sequence and CSE scope, and must agree on a type. A branch that ends in a
//! pattern miss takes the type of its sibling; when every branch misses the
//! whole conditional is a miss. A branch that recursed into the enclosing
//! join point before its type was known is retried under the type of a
//! sibling; `Case` branches get the same treatment.

use std::rc::Rc;

use tracing::debug;

use helix_ir::{
    Expr, ExprKind, JoinPointCall, JoinPointKey, JoinPointKind, MapKind, Op, Trace, Ty,
    TypedExpr,
};

use crate::compilation::{Compilation, JoinPointState};
use crate::errors::{not_callable, pattern_miss, type_mismatch, EvalError, EvalResult};
use crate::eval::{arity_error, operands};
use crate::lang_env::LangEnv;
use crate::specialize::SpecializeOpts;

/// One branch of a dynamic split. Branches can run twice, so they are `Fn`.
type Branch<'b> = &'b dyn Fn(&mut Compilation, &mut LangEnv) -> EvalResult<TypedExpr>;

impl Compilation {
    pub(super) fn eval_if(&mut self, lenv: &mut LangEnv, args: &[Expr]) -> EvalResult<TypedExpr> {
        let [cond, then, otherwise] = args else {
            return Err(arity_error(&Op::If, 3, args.len(), &lenv.trace));
        };
        let cond = self.eval(lenv, cond)?;
        if let Some(taken) = cond.as_bool() {
            return self.eval(lenv, if taken { then } else { otherwise });
        }
        let cond_ty = cond.ty();
        if cond_ty != Ty::bool() {
            return Err(type_mismatch(
                "if condition",
                "bool",
                self.format_type(&cond_ty),
                &lenv.trace,
            ));
        }

        let then_branch = |c: &mut Self, lenv: &mut LangEnv| c.eval(lenv, then);
        let else_branch = |c: &mut Self, lenv: &mut LangEnv| c.eval(lenv, otherwise);
        let branches: [Branch<'_>; 2] = [&then_branch, &else_branch];
        let bodies = self.eval_branches(lenv, &branches)?;
        self.finish_branches(lenv, Op::If, cond, Vec::new(), bodies)
    }

    /// Evaluate the branches of a dynamic split, each in its own scope.
    ///
    /// A branch that called this body's own join point before its result
    /// type was known is retried once a sibling has given the join point a
    /// type. If the retry fails, everything that finished under that type is
    /// forgotten, the join point goes back to unknown, and the recursion
    /// error is raised again for an enclosing split to handle.
    fn eval_branches(
        &mut self,
        lenv: &mut LangEnv,
        branches: &[Branch<'_>],
    ) -> EvalResult<Vec<TypedExpr>> {
        let mut bodies = Vec::with_capacity(branches.len());
        let mut pending = None;
        for branch in branches {
            match self.eval_branch(lenv, *branch) {
                Ok(body) => bodies.push(Some(body)),
                Err(err) => {
                    let Some((kind, key)) = self.pending_recursion(lenv, &err) else {
                        return Err(err);
                    };
                    if pending.is_none() {
                        pending = Some((err, kind, key));
                    }
                    bodies.push(None);
                }
            }
        }
        let Some((err, kind, key)) = pending else {
            return Ok(bodies.into_iter().flatten().collect());
        };
        let Some(ty) = bodies
            .iter()
            .flatten()
            .find(|body| !body.ends_in_pattern_miss())
            .map(TypedExpr::ty)
        else {
            return Err(err);
        };

        debug!(
            key = %key.symbol(),
            ty = %self.format_type(&ty),
            "typing recursive join point from a sibling branch"
        );
        self.set_pending_type(kind, &key, Some(ty));
        let mark = self.finished.len();
        let mut retried = Vec::with_capacity(bodies.len());
        for (body, branch) in bodies.into_iter().zip(branches) {
            let body = match body {
                Some(body) => body,
                None => match self.eval_branch(lenv, *branch) {
                    Ok(body) => body,
                    Err(retry_err) => {
                        debug!(
                            key = %key.symbol(),
                            error = %retry_err,
                            "retry under the sibling type failed"
                        );
                        self.forget_finished_since(mark);
                        self.set_pending_type(kind, &key, None);
                        return Err(err);
                    }
                },
            };
            retried.push(body);
        }
        Ok(retried)
    }

    fn set_pending_type(&mut self, kind: JoinPointKind, key: &JoinPointKey, ty: Option<Ty>) {
        if let Some(entry) = self.tables.table_mut(kind).get_mut(key) {
            entry.state = JoinPointState::InEvaluation(ty);
        }
    }

    /// The join point a recursion error was raised for, if it is the one
    /// whose body `lenv` evaluates and its type is still unknown.
    fn pending_recursion(
        &self,
        lenv: &LangEnv,
        err: &EvalError,
    ) -> Option<(JoinPointKind, JoinPointKey)> {
        let (kind, key) = err.pending.as_ref()?;
        if !lenv.owns(*kind, key) {
            return None;
        }
        match self.join_point(*kind, key)? {
            JoinPointState::InEvaluation(None) => Some((*kind, key.clone())),
            _ => None,
        }
    }

    /// Evaluate one branch of a dynamic split and close it.
    fn eval_branch(
        &mut self,
        lenv: &mut LangEnv,
        branch: impl FnOnce(&mut Self, &mut LangEnv) -> EvalResult<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        let save = lenv.enter_branch();
        let result = branch(self, lenv);
        let seq = lenv.leave_branch(save);
        result.map(|value| seq.wrap(value))
    }

    /// Emit a branching op over finished branch bodies.
    ///
    /// `If` is `[cond, then, else]`. `Case` is `[scrutinee, x1, body1, ...]`
    /// with one binder per body.
    fn finish_branches(
        &self,
        lenv: &mut LangEnv,
        op: Op,
        head: TypedExpr,
        binders: Vec<TypedExpr>,
        bodies: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        let (bodies, ty) = self.merge_branches(op.name(), bodies, &lenv.trace)?;
        let mut args = Vec::with_capacity(binders.len() + bodies.len() + 1);
        args.push(head);
        if binders.is_empty() {
            args.extend(bodies);
        } else {
            for (binder, body) in binders.into_iter().zip(bodies) {
                args.push(binder);
                args.push(body);
            }
        }
        match ty {
            Some(ty) => Ok(Self::bind_result(lenv, TypedExpr::op(op, args, ty.clone()), ty)),
            None => {
                lenv.seq
                    .push_state(TypedExpr::op(op, args, Ty::unit()), lenv.trace.clone());
                Ok(miss_placeholder(TypedExpr::unit()))
            }
        }
    }

    /// Unify the types of branch bodies. Bodies that miss are retyped to
    /// the common type; `None` means every body misses.
    fn merge_branches(
        &self,
        context: &str,
        bodies: Vec<TypedExpr>,
        trace: &Trace,
    ) -> EvalResult<(Vec<TypedExpr>, Option<Ty>)> {
        let Some(ty) = bodies
            .iter()
            .find(|body| !body.ends_in_pattern_miss())
            .map(TypedExpr::ty)
        else {
            return Ok((bodies, None));
        };
        for body in &bodies {
            if !body.ends_in_pattern_miss() && body.ty() != ty {
                return Err(type_mismatch(
                    format!("branches of {context}"),
                    self.format_type(&ty),
                    self.format_type(&body.ty()),
                    trace,
                ));
            }
        }
        let bodies = bodies
            .into_iter()
            .map(|body| {
                if body.ends_in_pattern_miss() {
                    retype_miss(&body, &ty)
                } else {
                    body
                }
            })
            .collect();
        Ok((bodies, Some(ty)))
    }

    // ── Case ──

    /// Split a value by its runtime union member and apply `f` to each.
    pub(super) fn case(
        &mut self,
        lenv: &mut LangEnv,
        value: TypedExpr,
        f: TypedExpr,
    ) -> EvalResult<TypedExpr> {
        let var = match &value {
            TypedExpr::Box(inner, _) => return self.apply(lenv, f, (**inner).clone()),
            TypedExpr::Var(var) if matches!(var.ty, Ty::Union(_) | Ty::Rec(_)) => var.clone(),
            _ => return self.apply(lenv, f, value),
        };
        let members = self.union_members_of(lenv, &var.ty)?;
        let mut binders = Vec::with_capacity(members.len());
        let mut applications = Vec::with_capacity(members.len());
        for member in members {
            let binder = Self::fresh_var(lenv, member.clone());
            let bound = if member.is_unit() {
                TypedExpr::from_unit_type(&member)
            } else {
                TypedExpr::Var(binder.clone())
            };
            binders.push(TypedExpr::Var(binder));
            let f = f.clone();
            applications.push(move |c: &mut Self, lenv: &mut LangEnv| {
                c.apply(lenv, f.clone(), bound.clone())
            });
        }
        let branches: Vec<Branch<'_>> = applications
            .iter()
            .map(|application| application as Branch<'_>)
            .collect();
        let bodies = self.eval_branches(lenv, &branches)?;
        self.finish_branches(lenv, Op::Case, value, binders, bodies)
    }

    // ── Pattern misses ──

    /// Inside a dynamic branch a miss is a placeholder the enclosing
    /// conditional resolves; outside one no clause can ever match.
    pub(super) fn pattern_miss(
        &self,
        lenv: &LangEnv,
        value: TypedExpr,
    ) -> EvalResult<TypedExpr> {
        if lenv.dynamic_depth == 0 {
            return Err(pattern_miss(
                format!(
                    "no clause matched a value of type {}",
                    self.format_type(&value.ty())
                ),
                &lenv.trace,
            ));
        }
        Ok(miss_placeholder(value))
    }

    // ── Annotations and join points ──

    pub(super) fn eval_type_annot(
        &mut self,
        lenv: &mut LangEnv,
        args: &[Expr],
    ) -> EvalResult<TypedExpr> {
        let [value, annot] = args else {
            return Err(arity_error(&Op::TypeAnnot, 2, args.len(), &lenv.trace));
        };
        if let ExprKind::Op(op @ Op::JoinPointEntryMethod, inner) = value.value().unwrap_pos() {
            let [body] = &inner[..] else {
                return Err(arity_error(op, 1, inner.len(), &lenv.trace));
            };
            let annot = self.eval(lenv, annot)?.ty();
            return self.eval_join_entry(lenv, op, body, Some(annot));
        }
        let value = self.eval(lenv, value)?;
        let annot = self.eval(lenv, annot)?.ty();
        let ty = value.ty();
        if ty != annot {
            return Err(type_mismatch(
                "type annotation",
                self.format_type(&annot),
                self.format_type(&ty),
                &lenv.trace,
            ));
        }
        Ok(value)
    }

    pub(super) fn eval_join_entry(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        body: &Expr,
        annot: Option<Ty>,
    ) -> EvalResult<TypedExpr> {
        let kind = match op {
            Op::JoinPointEntryType => JoinPointKind::Type,
            Op::JoinPointEntryCuda => JoinPointKind::Cuda,
            _ => JoinPointKind::Method,
        };
        let spec = self.specialize(
            &lenv.env,
            &lenv.trace,
            kind,
            body,
            SpecializeOpts { annot, param: None },
        )?;
        if kind == JoinPointKind::Type {
            return Ok(TypedExpr::Type(spec.ty));
        }
        let call = TypedExpr::JoinPoint(Rc::new(JoinPointCall {
            key: spec.key,
            kind,
            args: spec.call_args,
            ty: spec.ty.clone(),
        }));
        Ok(Self::bind_result(lenv, call, spec.ty))
    }

    /// `[f; domain]` or `[f; domain; range]`: commit a static function to a
    /// runtime closure.
    pub(super) fn closure_create(
        &mut self,
        lenv: &mut LangEnv,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        let (f, dom, range) = match values.len() {
            2 => {
                let [f, dom] = operands(&Op::ClosureCreate, values, &lenv.trace)?;
                (f, dom.ty(), None)
            }
            _ => {
                let [f, dom, range] = operands(&Op::ClosureCreate, values, &lenv.trace)?;
                (f, dom.ty(), Some(range.ty()))
            }
        };
        let (env, core) = match &f {
            TypedExpr::Map(env, MapKind::Function(core)) => (env.clone(), core),
            TypedExpr::Map(env, MapKind::RecFunction(this, core)) => {
                (env.bind(*this, f.clone()), core)
            }
            other => return Err(not_callable(self.format_type(&other.ty()), &lenv.trace)),
        };
        let spec = self.specialize(
            &env,
            &lenv.trace,
            JoinPointKind::Closure,
            &core.body,
            SpecializeOpts {
                annot: range,
                param: Some((core.param, dom.clone())),
            },
        )?;
        let ty = Ty::Closure(Rc::new(dom), Rc::new(spec.ty));
        let call = TypedExpr::JoinPoint(Rc::new(JoinPointCall {
            key: spec.key,
            kind: JoinPointKind::Closure,
            args: spec.call_args,
            ty: ty.clone(),
        }));
        Ok(Self::bind_result(lenv, call, ty))
    }
}

/// A pattern-miss node standing for "no clause matched here".
fn miss_placeholder(value: TypedExpr) -> TypedExpr {
    TypedExpr::op(Op::PatternMiss, vec![value], Ty::unit())
}

/// Give a missing body the type of its siblings.
fn retype_miss(expr: &TypedExpr, ty: &Ty) -> TypedExpr {
    match expr {
        TypedExpr::Let(node) => TypedExpr::let_in(
            node.bind.clone(),
            node.bound.clone(),
            retype_miss(&node.rest, ty),
            node.trace.clone(),
        ),
        TypedExpr::State(node) => {
            TypedExpr::state(node.stmt.clone(), retype_miss(&node.rest, ty), node.trace.clone())
        }
        TypedExpr::Op(node) if node.op == Op::PatternMiss => {
            TypedExpr::op(Op::PatternMiss, node.args.to_vec(), ty.clone())
        }
        other => other.clone(),
    }
}
