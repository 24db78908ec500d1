//! Alpha-renaming of typed values and bodies.
//!
//! Renaming serves two purposes:
//!
//! - Building a specialization key: the captured values of a join point are
//!   renamed into canonical tags `0..n` in order of first occurrence, so two
//!   call sites that pass differently named variables of the same types
//!   produce the same key. The caller's tags are reported as `call_args`
//!   and the canonical tags as `method_pars`, positionally aligned.
//! - Instantiating a cached body at a new site: every bound tag gets a tag
//!   from the site's counter, so instantiating one body twice yields
//!   disjoint tags.
//!
//! Variables whose type carries no runtime data become type values and are
//! never reported. Environments nested in renamed values are consed.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use helix_ir::stack::ensure_sufficient_stack;
use helix_ir::{
    EnvMap, EnvTerm, JoinPointCall, NodeInterner, Op, OpNode, Tag, TagGen, Ty, TyTag, TypedExpr,
};

pub struct Renamer<'a> {
    envs: &'a mut NodeInterner<EnvMap>,
    tags: TagGen,
    mapping: FxHashMap<Tag, Tag>,
    call_args: Vec<TyTag>,
    method_pars: Vec<TyTag>,
}

/// What a renaming pass touched.
pub struct Renamed {
    /// Caller-side variables, one per free runtime variable.
    pub call_args: Vec<TyTag>,
    /// The new variables they were renamed to.
    pub method_pars: Vec<TyTag>,
    /// The counter after the last tag handed out.
    pub tags: TagGen,
}

impl<'a> Renamer<'a> {
    pub fn new(envs: &'a mut NodeInterner<EnvMap>, tags: TagGen) -> Self {
        Renamer {
            envs,
            tags,
            mapping: FxHashMap::default(),
            call_args: Vec::new(),
            method_pars: Vec::new(),
        }
    }

    /// A renamer that maps each `(old, new)` pair without reporting it.
    pub fn with_params(
        envs: &'a mut NodeInterner<EnvMap>,
        tags: TagGen,
        params: impl IntoIterator<Item = (Tag, Tag)>,
    ) -> Self {
        let mut renamer = Self::new(envs, tags);
        renamer.mapping.extend(params);
        renamer
    }

    /// Give each parameter a fresh tag and map it, without reporting it.
    pub fn fresh_params(&mut self, params: &[TyTag]) -> Vec<TyTag> {
        params.iter().map(|param| self.bind(param)).collect()
    }

    /// Allocate an unreported fresh variable of type `ty`.
    pub fn fresh_var(&mut self, ty: Ty) -> TyTag {
        TyTag::new(self.tags.fresh(), ty)
    }

    pub fn finish(self) -> Renamed {
        Renamed {
            call_args: self.call_args,
            method_pars: self.method_pars,
            tags: self.tags,
        }
    }

    /// Rename a value or body.
    pub fn rename(&mut self, expr: &TypedExpr) -> TypedExpr {
        ensure_sufficient_stack(|| self.rename_inner(expr))
    }

    /// Rename every value of an environment and cons the result.
    pub fn rename_env(&mut self, env: &EnvTerm) -> EnvTerm {
        let renamed: EnvMap = env
            .bindings()
            .map(|(name, value)| (name, self.rename(value)))
            .collect();
        EnvTerm::Consed(EnvTerm::plain(renamed).cons(self.envs))
    }

    fn rename_inner(&mut self, expr: &TypedExpr) -> TypedExpr {
        match expr {
            TypedExpr::Type(_) | TypedExpr::Lit(_) => expr.clone(),
            TypedExpr::Var(var) => {
                if var.ty.is_unit() {
                    TypedExpr::from_unit_type(&var.ty)
                } else {
                    TypedExpr::Var(self.use_var(var))
                }
            }
            TypedExpr::Tuple(items) => {
                TypedExpr::Tuple(items.iter().map(|item| self.rename(item)).collect())
            }
            TypedExpr::Map(env, kind) => TypedExpr::Map(self.rename_env(env), kind.clone()),
            TypedExpr::Box(inner, ty) => TypedExpr::Box(Rc::new(self.rename(inner)), ty.clone()),
            TypedExpr::Let(node) => {
                let bound = self.rename(&node.bound);
                let bind = self.bind(&node.bind);
                let rest = self.rename(&node.rest);
                TypedExpr::let_in(bind, bound, rest, node.trace.clone())
            }
            TypedExpr::State(node) => {
                let stmt = self.rename(&node.stmt);
                let rest = self.rename(&node.rest);
                TypedExpr::state(stmt, rest, node.trace.clone())
            }
            TypedExpr::Op(node) => self.rename_op(node),
            TypedExpr::JoinPoint(call) => TypedExpr::JoinPoint(Rc::new(JoinPointCall {
                key: call.key.clone(),
                kind: call.kind,
                args: call.args.iter().map(|arg| self.use_var(arg)).collect(),
                ty: call.ty.clone(),
            })),
        }
    }

    /// `Case` binds a variable per branch: `[scrutinee, x1, body1, ...]`.
    fn rename_op(&mut self, node: &OpNode) -> TypedExpr {
        let args: Vec<TypedExpr> = if node.op == Op::Case {
            let mut args = Vec::with_capacity(node.args.len());
            let mut rest = node.args.iter();
            if let Some(scrutinee) = rest.next() {
                args.push(self.rename(scrutinee));
            }
            while let Some(binder) = rest.next() {
                match binder {
                    TypedExpr::Var(var) => args.push(TypedExpr::Var(self.bind(var))),
                    other => args.push(self.rename(other)),
                }
                if let Some(body) = rest.next() {
                    args.push(self.rename(body));
                }
            }
            args
        } else {
            node.args.iter().map(|arg| self.rename(arg)).collect()
        };
        TypedExpr::op(node.op.clone(), args, node.ty.clone())
    }

    /// A binding occurrence: always a fresh tag.
    fn bind(&mut self, var: &TyTag) -> TyTag {
        let tag = self.tags.fresh();
        self.mapping.insert(var.tag, tag);
        TyTag::new(tag, var.ty.clone())
    }

    /// A use occurrence: the mapped tag, or a new parameter.
    fn use_var(&mut self, var: &TyTag) -> TyTag {
        if let Some(&tag) = self.mapping.get(&var.tag) {
            return TyTag::new(tag, var.ty.clone());
        }
        let tag = self.tags.fresh();
        self.mapping.insert(var.tag, tag);
        let param = TyTag::new(tag, var.ty.clone());
        self.call_args.push(var.clone());
        self.method_pars.push(param.clone());
        param
    }
}

/// The runtime variables of `env` in canonical order.
///
/// For an environment already renamed into canonical tags this is the
/// parameter list the renaming produced.
pub fn env_params(envs: &mut NodeInterner<EnvMap>, env: &EnvTerm) -> Vec<TyTag> {
    let mut renamer = Renamer::new(envs, TagGen::default());
    renamer.rename_env(env);
    renamer.finish().call_args
}

/// One past the highest tag used by a value, or zero.
pub fn next_free_tag(expr: &TypedExpr) -> u32 {
    match expr {
        TypedExpr::Var(var) => var.tag.raw() + 1,
        TypedExpr::Tuple(items) => items.iter().map(next_free_tag).max().unwrap_or(0),
        TypedExpr::Map(env, _) => env
            .canonicalize()
            .values()
            .map(next_free_tag)
            .max()
            .unwrap_or(0),
        TypedExpr::Box(inner, _) => next_free_tag(inner),
        _ => 0,
    }
}
