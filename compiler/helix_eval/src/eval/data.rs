//! Tuples, modules and layouts.
//!
//! Tuples and modules are static structure: indexing a tuple value or
//! opening a module value costs nothing at runtime. Only when the structure
//! itself is a runtime variable (a join-point result, a closure argument)
//! are field and element reads emitted.

use helix_ir::{EnvMap, EnvTerm, Literal, MapKind, Name, Op, TagGen, Ty, TyTag, TypedExpr};

use crate::compilation::Compilation;
use crate::errors::{type_mismatch, unbound_name, EvalError, EvalResult};
use crate::eval::{arity_error, operands};
use crate::lang_env::LangEnv;
use crate::renamer::{env_params, Renamer};

impl Compilation {
    // ── Tuples ──

    pub(super) fn tuple_op(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        let [value] = operands(op, values, &lenv.trace)?;
        match *op {
            Op::TupleLengthEq(n) => Ok(TypedExpr::Lit(Literal::Bool(
                tuple_len(&value).is_some_and(|len| len == n as usize),
            ))),
            Op::TupleLengthGe(n) => Ok(TypedExpr::Lit(Literal::Bool(
                tuple_len(&value).is_some_and(|len| len >= n as usize),
            ))),
            Op::TupleIndex(i) => self.tuple_index(lenv, &value, i as usize),
            Op::TupleSlice(n) => {
                let start = n as usize;
                let len = match tuple_len(&value) {
                    Some(len) if len >= start => len,
                    _ => return Err(self.not_a_tuple(lenv, op, &value)),
                };
                let mut items = Vec::with_capacity(len - start);
                for i in start..len {
                    items.push(self.tuple_index(lenv, &value, i)?);
                }
                Ok(TypedExpr::tuple(items))
            }
            _ => Err(self.not_a_tuple(lenv, op, &value)),
        }
    }

    fn tuple_index(
        &mut self,
        lenv: &mut LangEnv,
        value: &TypedExpr,
        i: usize,
    ) -> EvalResult<TypedExpr> {
        let op = Op::TupleIndex(u32::try_from(i).unwrap_or(u32::MAX));
        match value {
            TypedExpr::Tuple(items) => match items.get(i) {
                Some(item) => Ok(item.clone()),
                None => Err(self.not_a_tuple(lenv, &op, value)),
            },
            TypedExpr::Type(Ty::List(items)) => match items.get(i) {
                Some(item) => Ok(TypedExpr::from_unit_type(item)),
                None => Err(self.not_a_tuple(lenv, &op, value)),
            },
            TypedExpr::Var(var) => match &var.ty {
                Ty::List(items) => match items.get(i) {
                    Some(item) if item.is_unit() => Ok(TypedExpr::from_unit_type(item)),
                    Some(item) => Ok(self.emit(lenv, op, vec![value.clone()], item.clone())),
                    None => Err(self.not_a_tuple(lenv, &op, value)),
                },
                _ => Err(self.not_a_tuple(lenv, &op, value)),
            },
            _ => Err(self.not_a_tuple(lenv, &op, value)),
        }
    }

    #[cold]
    fn not_a_tuple(&self, lenv: &LangEnv, op: &Op, value: &TypedExpr) -> EvalError {
        let expected = match op {
            Op::TupleIndex(i) => format!("a tuple with more than {i} elements"),
            Op::TupleSlice(n) => format!("a tuple with at least {n} elements"),
            _ => "a tuple".to_owned(),
        };
        type_mismatch(
            op.name(),
            expected,
            self.format_type(&value.ty()),
            &lenv.trace,
        )
    }

    // ── Modules ──

    pub(super) fn module_op(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        match op {
            Op::ModuleCreate(names) => {
                if names.len() != values.len() {
                    return Err(arity_error(
                        op,
                        names.len(),
                        values.len(),
                        &lenv.trace,
                    ));
                }
                let map: EnvMap = names.iter().copied().zip(values).collect();
                Ok(TypedExpr::Map(EnvTerm::plain(map), MapKind::Module))
            }
            Op::ModuleWith(names) => {
                let mut values = values.into_iter();
                let Some(module) = values.next() else {
                    return Err(arity_error(op, names.len() + 1, 0, &lenv.trace));
                };
                let (mut env, kind) = self.module_value(lenv, op, module)?;
                if values.len() != names.len() {
                    return Err(arity_error(
                        op,
                        names.len() + 1,
                        values.len() + 1,
                        &lenv.trace,
                    ));
                }
                for (name, value) in names.iter().zip(values) {
                    env = env.bind(*name, value);
                }
                Ok(TypedExpr::Map(env, kind))
            }
            Op::ModuleWithout(names) => {
                let [module] = operands(op, values, &lenv.trace)?;
                let (env, kind) = self.module_value(lenv, op, module)?;
                let mut map = (*env.canonicalize()).clone();
                for name in names.iter() {
                    map.remove(name);
                }
                Ok(TypedExpr::Map(EnvTerm::plain(map), kind))
            }
            Op::ModuleOpen(name) | Op::MapGetField(name) => {
                let [module] = operands(op, values, &lenv.trace)?;
                self.open_field(lenv, op, module, *name)
            }
            Op::ModuleHasMember(name) => {
                let [module] = operands(op, values, &lenv.trace)?;
                Ok(TypedExpr::Lit(Literal::Bool(has_member(&module, *name))))
            }
            Op::ModuleMap => {
                let [f, module] = operands(op, values, &lenv.trace)?;
                let (env, _) = self.module_value(lenv, op, module)?;
                let mut map = EnvMap::new();
                for (name, value) in env.canonicalize().iter() {
                    let key = self.field_key(*name);
                    let partial = self.apply(lenv, f.clone(), key)?;
                    map.insert(*name, self.apply(lenv, partial, value.clone())?);
                }
                Ok(TypedExpr::Map(EnvTerm::plain(map), MapKind::Module))
            }
            Op::ModuleFold => {
                let [f, state, module] = operands(op, values, &lenv.trace)?;
                let (env, _) = self.module_value(lenv, op, module)?;
                let mut acc = state;
                for (name, value) in env.canonicalize().iter() {
                    let key = self.field_key(*name);
                    let with_state = self.apply(lenv, f.clone(), acc)?;
                    let with_key = self.apply(lenv, with_state, key)?;
                    acc = self.apply(lenv, with_key, value.clone())?;
                }
                Ok(acc)
            }
            _ => Err(type_mismatch(
                op.name(),
                "a module operation",
                "other",
                &lenv.trace,
            )),
        }
    }

    /// A field name as a type-level string, which is what map and fold
    /// callbacks receive.
    fn field_key(&self, name: Name) -> TypedExpr {
        TypedExpr::Type(Ty::Lit(Literal::string(self.ast.resolve(name))))
    }

    fn open_field(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        module: TypedExpr,
        name: Name,
    ) -> EvalResult<TypedExpr> {
        // Reading one field of a runtime map needs just that field.
        if let TypedExpr::Var(var) = &module {
            if let Ty::Map(fields, _) = &var.ty {
                return match fields.get(&name) {
                    Some(ty) => Ok(self.read_field(lenv, var, name, ty)),
                    None => Err(self.missing_field(lenv, name)),
                };
            }
        }
        let (env, _) = self.module_value(lenv, op, module)?;
        match env.lookup(name) {
            Some(value) => Ok(value.clone()),
            None => Err(self.missing_field(lenv, name)),
        }
    }

    #[cold]
    fn missing_field(&self, lenv: &LangEnv, name: Name) -> EvalError {
        unbound_name(
            format!("field `{}`", self.ast.resolve(name)),
            &lenv.trace,
        )
    }

    /// The environment and kind of anything module-like.
    fn module_value(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        value: TypedExpr,
    ) -> EvalResult<(EnvTerm, MapKind)> {
        let value = match value {
            TypedExpr::Var(var) => match &var.ty {
                Ty::Map(..) => self.materialize_map(lenv, &var),
                Ty::Layout(..) => self.unpack_layout(lenv, &var),
                _ => TypedExpr::Var(var),
            },
            TypedExpr::Type(ty @ Ty::Map(..)) => TypedExpr::from_unit_type(&ty),
            other => other,
        };
        match value {
            TypedExpr::Map(env, kind) => Ok((env, kind)),
            other => Err(type_mismatch(
                op.name(),
                "a module",
                self.format_type(&other.ty()),
                &lenv.trace,
            )),
        }
    }

    // ── Layouts ──

    pub(super) fn layout_op(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        let [value] = operands(op, values, &lenv.trace)?;
        match *op {
            Op::LayoutTo(layout) => {
                let (env, kind) = self.module_value(lenv, op, value)?;
                let mut renamer = Renamer::new(&mut self.envs, TagGen::default());
                let canonical = renamer.rename_env(&env);
                let fields = renamer.finish().call_args;
                let ty = Ty::Layout(layout, canonical, kind);
                let packed = TypedExpr::Tuple(fields.into_iter().map(TypedExpr::Var).collect());
                Ok(Self::bind_result(
                    lenv,
                    TypedExpr::op(op.clone(), vec![packed], ty.clone()),
                    ty,
                ))
            }
            Op::LayoutIndex(i) => {
                let TypedExpr::Var(var) = &value else {
                    return Err(self.not_a_layout(lenv, op, &value));
                };
                let Ty::Layout(_, env, _) = &var.ty else {
                    return Err(self.not_a_layout(lenv, op, &value));
                };
                let fields: Vec<TyTag> = env_params(&mut self.envs, env);
                match fields.get(i as usize) {
                    Some(field) => {
                        let ty = field.ty.clone();
                        Ok(self.emit(lenv, op.clone(), vec![value.clone()], ty))
                    }
                    None => Err(self.not_a_layout(lenv, op, &value)),
                }
            }
            _ => Err(self.not_a_layout(lenv, op, &value)),
        }
    }

    #[cold]
    fn not_a_layout(&self, lenv: &LangEnv, op: &Op, value: &TypedExpr) -> EvalError {
        type_mismatch(
            op.name(),
            "a layout with that many fields",
            self.format_type(&value.ty()),
            &lenv.trace,
        )
    }
}

/// Static length of a tuple-shaped value.
fn tuple_len(value: &TypedExpr) -> Option<usize> {
    match value {
        TypedExpr::Tuple(items) => Some(items.len()),
        other => match other.ty() {
            Ty::List(items) => Some(items.len()),
            _ => None,
        },
    }
}

/// Whether a module-like value has a field, decided from its type.
fn has_member(value: &TypedExpr, name: Name) -> bool {
    match value {
        TypedExpr::Map(env, _) => env.lookup(name).is_some(),
        other => match other.ty() {
            Ty::Map(fields, _) => fields.contains_key(&name),
            Ty::Layout(_, env, _) => env.lookup(name).is_some(),
            _ => false,
        },
    }
}
