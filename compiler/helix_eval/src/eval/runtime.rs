//! Arrays, references, type-level operations and foreign escapes.

use std::rc::Rc;

use helix_ir::{ArrayKind, Literal, MacroPart, Op, PrimitiveType, Ty, TypedExpr};

use crate::compilation::Compilation;
use crate::errors::{macro_error, type_mismatch, EvalError, EvalResult};
use crate::eval::operands;
use crate::lang_env::LangEnv;

impl Compilation {
    // ── Arrays and references ──

    pub(super) fn array_op(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        match *op {
            Op::ArrayCreate(kind) => {
                let [elem, len] = operands(op, values, &lenv.trace)?;
                self.expect_index(lenv, op, &len)?;
                let elem = elem.ty();
                let ty = Ty::Array(kind, Rc::new(elem.clone()));
                let len = Self::to_runtime(lenv, len);
                Ok(self.emit(lenv, op.clone(), vec![TypedExpr::Type(elem), len], ty))
            }
            Op::ArrayLength => {
                let [array] = operands(op, values, &lenv.trace)?;
                self.element_type(lenv, op, &array)?;
                Ok(self.emit(
                    lenv,
                    Op::ArrayLength,
                    vec![array],
                    Ty::Prim(PrimitiveType::Int64),
                ))
            }
            Op::ArrayIndex => {
                let [array, index] = operands(op, values, &lenv.trace)?;
                let elem = self.element_type(lenv, op, &array)?;
                self.expect_index(lenv, op, &index)?;
                Ok(self.emit(lenv, Op::ArrayIndex, vec![array, index], elem))
            }
            Op::ArraySet => {
                let [array, index, value] = operands(op, values, &lenv.trace)?;
                let elem = self.element_type(lenv, op, &array)?;
                self.expect_index(lenv, op, &index)?;
                self.expect_element(lenv, op, &elem, &value)?;
                let value = Self::to_runtime(lenv, value);
                Ok(self.emit(lenv, Op::ArraySet, vec![array, index, value], Ty::unit()))
            }
            Op::ReferenceCreate => {
                let [value] = operands(op, values, &lenv.trace)?;
                let ty = Ty::Array(ArrayKind::Reference, Rc::new(value.ty()));
                let value = Self::to_runtime(lenv, value);
                Ok(self.emit(lenv, Op::ReferenceCreate, vec![value], ty))
            }
            Op::ReferenceGet => {
                let [reference] = operands(op, values, &lenv.trace)?;
                let elem = self.element_type(lenv, op, &reference)?;
                Ok(self.emit(lenv, Op::ReferenceGet, vec![reference], elem))
            }
            Op::ReferenceSet => {
                let [reference, value] = operands(op, values, &lenv.trace)?;
                let elem = self.element_type(lenv, op, &reference)?;
                self.expect_element(lenv, op, &elem, &value)?;
                let value = Self::to_runtime(lenv, value);
                Ok(self.emit(lenv, Op::ReferenceSet, vec![reference, value], Ty::unit()))
            }
            _ => Err(type_mismatch(
                op.name(),
                "an array operation",
                "other",
                &lenv.trace,
            )),
        }
    }

    /// Element type of an array or reference operand. References only go
    /// with reference ops, arrays with array ops.
    fn element_type(&self, lenv: &LangEnv, op: &Op, value: &TypedExpr) -> EvalResult<Ty> {
        let wants_reference = matches!(op, Op::ReferenceGet | Op::ReferenceSet);
        match value.ty() {
            Ty::Array(kind, elem) if (kind == ArrayKind::Reference) == wants_reference => {
                Ok((*elem).clone())
            }
            other => Err(type_mismatch(
                op.name(),
                if wants_reference { "a reference" } else { "an array" },
                self.format_type(&other),
                &lenv.trace,
            )),
        }
    }

    fn expect_index(&self, lenv: &LangEnv, op: &Op, index: &TypedExpr) -> EvalResult<()> {
        match index.ty().as_prim() {
            Some(prim) if prim.is_int() => Ok(()),
            _ => Err(type_mismatch(
                format!("{} index", op.name()),
                "an integer",
                self.format_type(&index.ty()),
                &lenv.trace,
            )),
        }
    }

    fn expect_element(
        &self,
        lenv: &LangEnv,
        op: &Op,
        elem: &Ty,
        value: &TypedExpr,
    ) -> EvalResult<()> {
        let ty = value.ty();
        if ty == *elem {
            return Ok(());
        }
        Err(type_mismatch(
            format!("{} value", op.name()),
            self.format_type(elem),
            self.format_type(&ty),
            &lenv.trace,
        ))
    }

    // ── Types ──

    pub(super) fn type_op(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        match op {
            Op::TypeGet => {
                let [value] = operands(op, values, &lenv.trace)?;
                Ok(TypedExpr::Type(value.ty()))
            }
            Op::TypeUnion => {
                let [a, b] = operands(op, values, &lenv.trace)?;
                Ok(TypedExpr::Type(Ty::union([a.ty(), b.ty()])))
            }
            Op::TypeLitCreate => {
                let [value] = operands(op, values, &lenv.trace)?;
                match value {
                    TypedExpr::Lit(lit) => Ok(TypedExpr::Type(Ty::Lit(lit))),
                    other => Err(type_mismatch(
                        op.name(),
                        "a literal",
                        self.format_type(&other.ty()),
                        &lenv.trace,
                    )),
                }
            }
            Op::EqType => {
                let [a, b] = operands(op, values, &lenv.trace)?;
                Ok(TypedExpr::Lit(Literal::Bool(a.ty() == b.ty())))
            }
            Op::TypeMacroHost | Op::TypeMacroAccel => {
                let parts = values
                    .iter()
                    .map(|value| self.type_macro_part(lenv, value))
                    .collect::<EvalResult<Rc<[MacroPart]>>>()?;
                Ok(TypedExpr::Type(if *op == Op::TypeMacroHost {
                    Ty::HostMacro(parts)
                } else {
                    Ty::AccelMacro(parts)
                }))
            }
            _ => Err(type_mismatch(
                op.name(),
                "a type operation",
                "other",
                &lenv.trace,
            )),
        }
    }

    fn type_macro_part(&self, lenv: &LangEnv, value: &TypedExpr) -> EvalResult<MacroPart> {
        match value {
            TypedExpr::Lit(Literal::String(text)) => Ok(MacroPart::Text(Rc::clone(text))),
            TypedExpr::Type(ty) => Ok(MacroPart::Type(ty.clone())),
            TypedExpr::Var(var) => Ok(MacroPart::Type(var.ty.clone())),
            other => Err(self.bad_macro_part(lenv, other)),
        }
    }

    // ── Foreign escapes ──

    /// `[result type; part...]`: text passed through to the back end with
    /// variables and types spliced in.
    pub(super) fn macro_op(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        let mut values = values.into_iter();
        let Some(result) = values.next() else {
            return Err(macro_error("missing result type", &lenv.trace));
        };
        let ty = result.ty();
        let mut args = Vec::with_capacity(values.len() + 1);
        args.push(TypedExpr::Type(ty.clone()));
        for value in values {
            match value {
                TypedExpr::Lit(Literal::String(_)) | TypedExpr::Var(_) | TypedExpr::Type(_) => {
                    args.push(value);
                }
                other => return Err(self.bad_macro_part(lenv, &other)),
            }
        }
        Ok(Self::bind_result(
            lenv,
            TypedExpr::op(op.clone(), args, ty.clone()),
            ty,
        ))
    }

    #[cold]
    fn bad_macro_part(&self, lenv: &LangEnv, value: &TypedExpr) -> EvalError {
        macro_error(
            format!(
                "a macro part must be a string literal, a variable or a type, got a value of type {}",
                self.format_type(&value.ty())
            ),
            &lenv.trace,
        )
    }
}
