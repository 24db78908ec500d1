//! Primitive operations: typing and constant folding.
//!
//! Every primitive op is typed from its operand types first. If all operands
//! are literals the op is then evaluated at compile time; a fold that would
//! overflow, divide by zero or shift out of range returns `None` and the op
//! is emitted for runtime instead.

use helix_ir::{Literal, Op, PrimitiveType, Ty, TypedExpr};

use crate::compilation::Compilation;
use crate::errors::{type_mismatch, EvalResult};
use crate::eval::arity_error;
use crate::lang_env::LangEnv;

impl Compilation {
    pub(super) fn prim_op(
        &mut self,
        lenv: &mut LangEnv,
        op: &Op,
        values: Vec<TypedExpr>,
    ) -> EvalResult<TypedExpr> {
        let result = self.prim_type(lenv, op, &values)?;
        if self.config.fold_constants {
            if let Some(lit) = fold(op, &values, result) {
                return Ok(TypedExpr::Lit(lit));
            }
        }
        Ok(self.emit(lenv, op.clone(), values, Ty::Prim(result)))
    }

    /// Result type of a primitive op, checking its operands.
    fn prim_type(
        &self,
        lenv: &LangEnv,
        op: &Op,
        values: &[TypedExpr],
    ) -> EvalResult<PrimitiveType> {
        let expected = if op.is_unary() { 1 } else { 2 };
        if values.len() != expected {
            return Err(arity_error(op, expected, values.len(), &lenv.trace));
        }
        let prims: Vec<Option<PrimitiveType>> =
            values.iter().map(|value| value.ty().as_prim()).collect();
        let result = match (op, prims.as_slice()) {
            (Op::Convert, [_, Some(from)]) if from.is_numeric() => {
                values[0].ty().as_prim().filter(|to| to.is_numeric())
            }
            (_, [Some(a), Some(b)]) if op.is_binary_arith() && a == b && a.is_numeric() => {
                Some(*a)
            }
            (_, [Some(a), Some(b)]) if op.is_comparison() && a == b => Some(PrimitiveType::Bool),
            (Op::BitAnd | Op::BitOr | Op::BitXor, [Some(a), Some(b)])
                if a == b && (a.is_int() || *a == PrimitiveType::Bool) =>
            {
                Some(*a)
            }
            (Op::ShiftLeft | Op::ShiftRight, [Some(a), Some(b)]) if a.is_int() && b.is_int() => {
                Some(*a)
            }
            (Op::Neg, [Some(a)]) if a.is_signed_int() || a.is_float() => Some(*a),
            (Op::Not, [Some(PrimitiveType::Bool)]) => Some(PrimitiveType::Bool),
            (Op::BitNot, [Some(a)]) if a.is_int() => Some(*a),
            (Op::Sqrt | Op::Log | Op::Exp, [Some(a)]) if a.is_float() => Some(*a),
            _ => None,
        };
        result.ok_or_else(|| {
            let got: Vec<String> = values
                .iter()
                .map(|value| self.format_type(&value.ty()))
                .collect();
            type_mismatch(
                op.name(),
                operand_requirement(op),
                got.join(", "),
                &lenv.trace,
            )
        })
    }
}

fn operand_requirement(op: &Op) -> &'static str {
    match op {
        Op::Convert => "a numeric type and a numeric value",
        Op::Not => "bool",
        Op::Neg => "a signed integer or float",
        Op::BitNot => "an integer",
        Op::Sqrt | Op::Log | Op::Exp => "a float",
        Op::ShiftLeft | Op::ShiftRight => "integers",
        Op::BitAnd | Op::BitOr | Op::BitXor => "matching integers or bools",
        _ if op.is_comparison() => "matching primitive operands",
        _ => "matching numeric operands",
    }
}

/// Fold an op whose operands are all literals.
fn fold(op: &Op, values: &[TypedExpr], result: PrimitiveType) -> Option<Literal> {
    match values {
        [TypedExpr::Lit(a)] => fold_unary(op, a, result),
        [TypedExpr::Type(_), TypedExpr::Lit(v)] if *op == Op::Convert => fold_convert(v, result),
        [TypedExpr::Lit(a), TypedExpr::Lit(b)] => fold_binary(op, a, b, result),
        _ => None,
    }
}

fn fold_binary(op: &Op, left: &Literal, right: &Literal, result: PrimitiveType) -> Option<Literal> {
    if op.is_comparison() {
        return fold_comparison(op, left, right).map(Literal::Bool);
    }
    if let (Some(a), Some(b)) = (left.as_i128(), right.as_i128()) {
        let value = match op {
            Op::Add => a.checked_add(b),
            Op::Sub => a.checked_sub(b),
            Op::Mult => a.checked_mul(b),
            // Division by zero: defer to runtime.
            Op::Div | Op::Mod if b == 0 => None,
            Op::Div => a.checked_div(b),
            Op::Mod => a.checked_rem(b),
            Op::BitAnd => Some(a & b),
            Op::BitOr => Some(a | b),
            Op::BitXor => Some(a ^ b),
            Op::ShiftLeft => {
                let shift = u32::try_from(b).ok().filter(|&s| s < bit_width(result))?;
                a.checked_shl(shift)
            }
            Op::ShiftRight => {
                let shift = u32::try_from(b).ok().filter(|&s| s < bit_width(result))?;
                Some(a >> shift)
            }
            _ => None,
        }?;
        return Literal::int_of(result, value);
    }
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        let value = match op {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mult => a * b,
            Op::Div | Op::Mod if b == 0.0 => return None,
            Op::Div => a / b,
            Op::Mod => a % b,
            _ => return None,
        };
        return Literal::float_of(result, value);
    }
    match (op, left.as_bool(), right.as_bool()) {
        (Op::BitAnd, Some(a), Some(b)) => Some(Literal::Bool(a & b)),
        (Op::BitOr, Some(a), Some(b)) => Some(Literal::Bool(a | b)),
        (Op::BitXor, Some(a), Some(b)) => Some(Literal::Bool(a ^ b)),
        _ => None,
    }
}

/// Compare two literals of one type. Unordered floats are not folded.
fn fold_comparison(op: &Op, left: &Literal, right: &Literal) -> Option<bool> {
    let ordering = match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b)?,
        _ => left.cmp(right),
    };
    Some(match op {
        Op::LT => ordering.is_lt(),
        Op::LTE => ordering.is_le(),
        Op::EQ => ordering.is_eq(),
        Op::NEQ => ordering.is_ne(),
        Op::GT => ordering.is_gt(),
        Op::GTE => ordering.is_ge(),
        _ => return None,
    })
}

fn fold_unary(op: &Op, value: &Literal, result: PrimitiveType) -> Option<Literal> {
    if let Some(v) = value.as_i128() {
        return match op {
            Op::Neg => Literal::int_of(result, v.checked_neg()?),
            Op::BitNot if result.is_signed_int() => Literal::int_of(result, !v),
            Op::BitNot => {
                let mask = (1_i128 << bit_width(result)) - 1;
                Literal::int_of(result, mask ^ v)
            }
            _ => None,
        };
    }
    if let Some(v) = value.as_f64() {
        let folded = match op {
            Op::Neg => -v,
            Op::Sqrt => v.sqrt(),
            Op::Log => v.ln(),
            Op::Exp => v.exp(),
            _ => return None,
        };
        return Literal::float_of(result, folded);
    }
    match (op, value.as_bool()) {
        (Op::Not, Some(b)) => Some(Literal::Bool(!b)),
        _ => None,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "numeric conversion is the operation being folded; range is checked first"
)]
fn fold_convert(value: &Literal, to: PrimitiveType) -> Option<Literal> {
    if to.is_int() {
        if let Some(v) = value.as_i128() {
            return Literal::int_of(to, v);
        }
        let f = value.as_f64()?.trunc();
        // i128 covers every target integer type.
        if !f.is_finite() || f.abs() >= 1e38 {
            return None;
        }
        return Literal::int_of(to, f as i128);
    }
    if let Some(v) = value.as_i128() {
        return Literal::float_of(to, v as f64);
    }
    Literal::float_of(to, value.as_f64()?)
}

const fn bit_width(ty: PrimitiveType) -> u32 {
    match ty {
        PrimitiveType::Int8 | PrimitiveType::UInt8 => 8,
        PrimitiveType::Int16 | PrimitiveType::UInt16 => 16,
        PrimitiveType::Int32 | PrimitiveType::UInt32 => 32,
        _ => 64,
    }
}
