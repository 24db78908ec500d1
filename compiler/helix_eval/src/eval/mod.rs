//! The partial evaluator.
//!
//! `eval` walks a surface expression under a [`LangEnv`] and returns a typed
//! value. Values are atomic: a literal, a type, a variable, a tuple or map of
//! values, or a boxed value. Every runtime operation is bound to a fresh
//! variable in the current statement sequence (or emitted as a statement
//! when its result carries no data), and the variable is what flows on.
//!
//! Submodules split the operations by area:
//!
//! - `apply` - function application, closures, boxing
//! - `control` - conditionals, `Case`, pattern misses, join-point entries
//! - `fold` - typing and constant folding of primitive operations
//! - `data` - tuples, modules and layouts
//! - `runtime` - arrays, references, type operations and foreign escapes

mod apply;
mod control;
mod data;
mod fold;
mod runtime;

use smallvec::SmallVec;
use tracing::trace;

use helix_ir::stack::ensure_sufficient_stack;
use helix_ir::{
    EnvTerm, Expr, ExprKind, FreeVars, Literal, MapKind, Op, Trace, Ty, TyTag, TypedExpr,
};

use crate::compilation::Compilation;
use crate::cse::CseKey;
use crate::errors::{type_mismatch, unbound_name, user_error, EvalResult};
use crate::lang_env::LangEnv;

impl Compilation {
    /// Evaluate `expr` in `lenv`.
    pub(crate) fn eval(&mut self, lenv: &mut LangEnv, expr: &Expr) -> EvalResult<TypedExpr> {
        ensure_sufficient_stack(|| self.eval_inner(lenv, expr))
    }

    fn eval_inner(&mut self, lenv: &mut LangEnv, expr: &Expr) -> EvalResult<TypedExpr> {
        match expr.value() {
            ExprKind::Var(name) => match lenv.env.lookup(*name) {
                Some(value) => Ok(value.clone()),
                None => Err(unbound_name(self.ast.resolve(*name), &lenv.trace)),
            },
            ExprKind::Lit(lit) => Ok(TypedExpr::Lit(lit.clone())),
            ExprKind::Pattern(pattern) => {
                let lowered = self.ast.lower_pattern(pattern);
                self.eval(lenv, &lowered)
            }
            ExprKind::Function(core) => {
                let used = self.ast.free_var_set(expr);
                Ok(capture(lenv, used, MapKind::Function(core.clone())))
            }
            ExprKind::FunctionFilt(used, core) => Ok(capture(
                lenv,
                used.clone(),
                MapKind::Function(core.clone()),
            )),
            ExprKind::RecFunction(this, core) => {
                let used = self.ast.free_var_set(expr);
                Ok(capture(
                    lenv,
                    used,
                    MapKind::RecFunction(*this, core.clone()),
                ))
            }
            ExprKind::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items.iter() {
                    values.push(self.eval(lenv, item)?);
                }
                Ok(TypedExpr::tuple(values))
            }
            ExprKind::Op(op, args) => self.eval_op(lenv, op, args),
            ExprKind::Pos(pos) => {
                if !self.config.record_traces {
                    return self.eval(lenv, &pos.value);
                }
                let outer = lenv.trace.push(pos.key);
                let saved = std::mem::replace(&mut lenv.trace, outer);
                let result = self.eval(lenv, &pos.value);
                lenv.trace = saved;
                result
            }
        }
    }

    /// Evaluate `body` with `env` in place of the current environment.
    pub(crate) fn eval_in(
        &mut self,
        lenv: &mut LangEnv,
        env: EnvTerm,
        body: &Expr,
    ) -> EvalResult<TypedExpr> {
        let saved = std::mem::replace(&mut lenv.env, env);
        let result = self.eval(lenv, body);
        lenv.env = saved;
        result
    }

    fn eval_op(&mut self, lenv: &mut LangEnv, op: &Op, args: &[Expr]) -> EvalResult<TypedExpr> {
        match op {
            Op::If => self.eval_if(lenv, args),
            Op::TypeAnnot => self.eval_type_annot(lenv, args),
            Op::JoinPointEntryMethod | Op::JoinPointEntryType | Op::JoinPointEntryCuda => {
                let [body] = args else {
                    return Err(arity_error(op, 1, args.len(), &lenv.trace));
                };
                self.eval_join_entry(lenv, op, body, None)
            }
            _ => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(lenv, arg)?);
                }
                self.apply_op(lenv, op, values)
            }
        }
    }

    /// Apply an operation whose operands are all evaluated.
    fn apply_op(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        let trace = lenv.trace.clone();
        match op {
            Op::Apply => {
                let [f, arg] = operands(op, values, &trace)?;
                self.apply(lenv, f, arg)
            }
            Op::Case => {
                let [value, f] = operands(op, values, &trace)?;
                self.case(lenv, value, f)
            }
            Op::Dynamize => {
                let [value] = operands(op, values, &trace)?;
                Ok(Self::to_runtime(lenv, value))
            }
            Op::PatternMiss => {
                let [value] = operands(op, values, &trace)?;
                self.pattern_miss(lenv, value)
            }
            Op::ErrorType => {
                let [message] = operands(op, values, &trace)?;
                let text = match message.as_lit().and_then(Literal::as_str) {
                    Some(text) => text.to_owned(),
                    None => self.format_type(&message.ty()),
                };
                Err(user_error(text, &trace))
            }
            Op::ClosureCreate => self.closure_create(lenv, values),

            Op::Add
            | Op::Sub
            | Op::Mult
            | Op::Div
            | Op::Mod
            | Op::LT
            | Op::LTE
            | Op::EQ
            | Op::NEQ
            | Op::GT
            | Op::GTE
            | Op::BitAnd
            | Op::BitOr
            | Op::BitXor
            | Op::ShiftLeft
            | Op::ShiftRight
            | Op::Neg
            | Op::Not
            | Op::BitNot
            | Op::Sqrt
            | Op::Log
            | Op::Exp
            | Op::Convert => self.prim_op(lenv, op, values),

            Op::TupleLengthEq(_)
            | Op::TupleLengthGe(_)
            | Op::TupleIndex(_)
            | Op::TupleSlice(_) => self.tuple_op(lenv, op, values),

            Op::ModuleCreate(_)
            | Op::ModuleWith(_)
            | Op::ModuleWithout(_)
            | Op::ModuleOpen(_)
            | Op::ModuleHasMember(_)
            | Op::ModuleMap
            | Op::ModuleFold
            | Op::MapGetField(_) => self.module_op(lenv, op, values),

            Op::LayoutTo(_) | Op::LayoutIndex(_) => self.layout_op(lenv, op, values),

            Op::ArrayCreate(_)
            | Op::ArrayLength
            | Op::ArrayIndex
            | Op::ArraySet
            | Op::ReferenceCreate
            | Op::ReferenceGet
            | Op::ReferenceSet => self.array_op(lenv, op, values),

            Op::TypeGet
            | Op::TypeUnion
            | Op::TypeLitCreate
            | Op::EqType
            | Op::TypeMacroHost
            | Op::TypeMacroAccel => self.type_op(lenv, op, values),

            Op::MacroHost | Op::MacroAccel => self.macro_op(lenv, op, values),

            Op::If
            | Op::TypeAnnot
            | Op::JoinPointEntryMethod
            | Op::JoinPointEntryType
            | Op::JoinPointEntryCuda => Err(type_mismatch(
                op.name(),
                "unevaluated operands",
                "values",
                &trace,
            )),
        }
    }

    // ── Emission ──

    /// Bind `expr` to a fresh variable, or emit it as a statement when its
    /// type carries no runtime data.
    pub(crate) fn bind_result(lenv: &mut LangEnv, expr: TypedExpr, ty: Ty) -> TypedExpr {
        if ty.is_unit() {
            lenv.seq.push_state(expr, lenv.trace.clone());
            return TypedExpr::from_unit_type(&ty);
        }
        let var = TyTag::new(lenv.tags.fresh(), ty);
        lenv.seq.push_let(var.clone(), expr, lenv.trace.clone());
        TypedExpr::Var(var)
    }

    /// Emit a runtime operation. Pure operations go through the CSE table.
    pub(crate) fn emit(
        &mut self,
        lenv: &mut LangEnv,
        op: Op,
        args: Vec<TypedExpr>,
        ty: Ty,
    ) -> TypedExpr {
        if !(self.config.cse && op.is_pure() && !ty.is_unit()) {
            return Self::bind_result(lenv, TypedExpr::op(op, args, ty.clone()), ty);
        }
        let key: CseKey = (op.clone(), args.iter().cloned().collect::<SmallVec<_>>());
        if let Some(var) = lenv.cse.get(&key) {
            self.stats.cse_hits += 1;
            trace!(op = op.name(), tag = %var.tag, "cse hit");
            return TypedExpr::Var(var.clone());
        }
        let result = Self::bind_result(lenv, TypedExpr::op(op, args, ty.clone()), ty);
        if let TypedExpr::Var(var) = &result {
            lenv.cse.insert(key, var.clone());
        }
        result
    }

    /// Turn static leaves of a value into runtime variables.
    ///
    /// Literals and boxes become let-bound; tuples and maps keep their
    /// static structure.
    pub(crate) fn to_runtime(lenv: &mut LangEnv, value: TypedExpr) -> TypedExpr {
        match value {
            TypedExpr::Lit(lit) => {
                let ty = Ty::Prim(lit.ty());
                Self::bind_result(lenv, TypedExpr::Lit(lit), ty)
            }
            TypedExpr::Box(inner, ty) => {
                let inner = Self::to_runtime(lenv, (*inner).clone());
                Self::bind_result(lenv, TypedExpr::Box(inner.into(), ty.clone()), ty)
            }
            TypedExpr::Tuple(items) => {
                let items = items
                    .iter()
                    .map(|item| Self::to_runtime(lenv, item.clone()))
                    .collect();
                TypedExpr::tuple(items)
            }
            TypedExpr::Map(env, kind) => {
                let map = env
                    .canonicalize()
                    .iter()
                    .map(|(name, value)| (*name, Self::to_runtime(lenv, value.clone())))
                    .collect();
                TypedExpr::Map(EnvTerm::plain(map), kind)
            }
            other => other,
        }
    }
}

/// A function value closing over the current environment.
fn capture(lenv: &LangEnv, used: FreeVars, kind: MapKind) -> TypedExpr {
    TypedExpr::Map(EnvTerm::unfiltered(lenv.env.canonicalize(), used), kind)
}

/// Destructure exactly `N` operands.
pub(crate) fn operands<const N: usize>(
    op: &Op,
    values: Vec<TypedExpr>,
    trace: &Trace,
) -> EvalResult<[TypedExpr; N]> {
    let got = values.len();
    values
        .try_into()
        .map_err(|_| arity_error(op, N, got, trace))
}

#[cold]
pub(crate) fn arity_error(
    op: &Op,
    expected: usize,
    got: usize,
    trace: &Trace,
) -> crate::errors::EvalError {
    type_mismatch(
        op.name(),
        format!("{expected} operands"),
        format!("{got} operands"),
        trace,
    )
}
