//! Function application.
//!
//! Static functions are inlined: the body is evaluated in the captured
//! environment extended with the argument. Variables of map type are
//! materialized into static maps of field reads first, so applying them
//! inlines too. Only closures produce a runtime call.

use std::rc::Rc;

use helix_ir::{EnvMap, EnvTerm, Literal, MapKind, Name, Op, Ty, TyTag, TypedExpr};

use crate::compilation::Compilation;
use crate::errors::{not_callable, type_mismatch, unbound_name, EvalResult};
use crate::lang_env::LangEnv;
use crate::renamer::{env_params, Renamer};

impl Compilation {
    pub(crate) fn apply(
        &mut self,
        lenv: &mut LangEnv,
        f: TypedExpr,
        arg: TypedExpr,
    ) -> EvalResult<TypedExpr> {
        match &f {
            TypedExpr::Map(env, MapKind::Function(core)) => {
                let inner = env.bind(core.param, arg);
                self.eval_in(lenv, inner, &core.body)
            }
            TypedExpr::Map(env, MapKind::RecFunction(this, core)) => {
                let inner = env.bind(*this, f.clone()).bind(core.param, arg);
                self.eval_in(lenv, inner, &core.body)
            }
            TypedExpr::Map(env, MapKind::Module) => {
                let Some(field) = arg.as_lit().and_then(Literal::as_str) else {
                    return Err(not_callable(self.format_type(&f.ty()), &lenv.trace));
                };
                let name = self.ast.name(field);
                match env.lookup(name) {
                    Some(value) => Ok(value.clone()),
                    None => Err(unbound_name(format!("field `{field}`"), &lenv.trace)),
                }
            }
            TypedExpr::Var(var) => match &var.ty {
                Ty::Map(..) => {
                    let map = self.materialize_map(lenv, var);
                    self.apply(lenv, map, arg)
                }
                Ty::Layout(..) => {
                    let map = self.unpack_layout(lenv, var);
                    self.apply(lenv, map, arg)
                }
                Ty::Closure(dom, range) => {
                    if arg.ty() != **dom {
                        return Err(type_mismatch(
                            "closure argument",
                            self.format_type(dom),
                            self.format_type(&arg.ty()),
                            &lenv.trace,
                        ));
                    }
                    let arg = Self::to_runtime(lenv, arg);
                    let range = (**range).clone();
                    Ok(self.emit(lenv, Op::Apply, vec![f.clone(), arg], range))
                }
                other => Err(not_callable(self.format_type(other), &lenv.trace)),
            },
            TypedExpr::Type(ty @ (Ty::Union(_) | Ty::Rec(_))) => self.box_value(lenv, ty, arg),
            TypedExpr::Type(ty @ Ty::Map(..)) => {
                let map = TypedExpr::from_unit_type(ty);
                self.apply(lenv, map, arg)
            }
            other => Err(not_callable(self.format_type(&other.ty()), &lenv.trace)),
        }
    }

    /// Inject `value` into the union or recursive type `ty`.
    fn box_value(&self, lenv: &LangEnv, ty: &Ty, value: TypedExpr) -> EvalResult<TypedExpr> {
        let members = self.union_members_of(lenv, ty)?;
        let value_ty = value.ty();
        if !members.contains(&value_ty) {
            return Err(type_mismatch(
                "box",
                format!("a member of {}", self.format_type(ty)),
                self.format_type(&value_ty),
                &lenv.trace,
            ));
        }
        Ok(TypedExpr::Box(Rc::new(value), ty.clone()))
    }

    /// The members of a union, unfolding a recursive type first.
    ///
    /// Any other type is its own single member.
    pub(crate) fn union_members_of(&self, lenv: &LangEnv, ty: &Ty) -> EvalResult<Vec<Ty>> {
        let ty = match ty {
            Ty::Rec(key) => match self.rec_types.get(key) {
                Some(def) => def,
                None => {
                    return Err(type_mismatch(
                        "recursive type",
                        "a finished definition",
                        self.format_type(ty),
                        &lenv.trace,
                    ))
                }
            },
            other => other,
        };
        Ok(match ty.union_members() {
            Some(members) => members.to_vec(),
            None => vec![ty.clone()],
        })
    }

    /// A static map whose fields are runtime reads of `var`.
    pub(crate) fn materialize_map(&mut self, lenv: &mut LangEnv, var: &TyTag) -> TypedExpr {
        let Ty::Map(fields, kind) = &var.ty else {
            return TypedExpr::Var(var.clone());
        };
        let mut map = EnvMap::new();
        for (name, ty) in fields.iter() {
            let value = self.read_field(lenv, var, *name, ty);
            map.insert(*name, value);
        }
        TypedExpr::Map(EnvTerm::plain(map), kind.clone())
    }

    /// Runtime read of one field of a map-typed variable.
    pub(crate) fn read_field(
        &mut self,
        lenv: &mut LangEnv,
        var: &TyTag,
        name: Name,
        ty: &Ty,
    ) -> TypedExpr {
        if ty.is_unit() {
            return TypedExpr::from_unit_type(ty);
        }
        self.emit(
            lenv,
            Op::MapGetField(name),
            vec![TypedExpr::Var(var.clone())],
            ty.clone(),
        )
    }

    /// Read the runtime fields of a layout-typed variable and substitute them
    /// into its canonical environment.
    pub(crate) fn unpack_layout(&mut self, lenv: &mut LangEnv, var: &TyTag) -> TypedExpr {
        let Ty::Layout(_, env, kind) = &var.ty else {
            return TypedExpr::Var(var.clone());
        };
        let fields = env_params(&mut self.envs, env);
        let mut substitution = Vec::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            let index = u32::try_from(i).unwrap_or(u32::MAX);
            let read = self.emit(
                lenv,
                Op::LayoutIndex(index),
                vec![TypedExpr::Var(var.clone())],
                field.ty.clone(),
            );
            if let TypedExpr::Var(new) = read {
                substitution.push((field.tag, new.tag));
            }
        }
        let tags = std::mem::take(&mut lenv.tags);
        let mut renamer = Renamer::with_params(&mut self.envs, tags, substitution);
        let env = renamer.rename_env(env);
        lenv.tags = renamer.finish().tags;
        TypedExpr::Map(env, kind.clone())
    }

    /// A fresh variable in the current body.
    pub(crate) fn fresh_var(lenv: &mut LangEnv, ty: Ty) -> TyTag {
        TyTag::new(lenv.tags.fresh(), ty)
    }
}
