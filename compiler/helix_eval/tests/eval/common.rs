//! Shared builders and IR walkers.

use helix_eval::{init_tracing, Compilation, EvalConfig, EvalResult, Program};
use helix_ir::{AstContext, EnvTerm, Expr, Literal, Op, PrimitiveType, Ty, TypedExpr};

pub fn int(ast: &mut AstContext, value: i32) -> Expr {
    ast.lit(Literal::Int32(value))
}

/// `dyn value`: forces a literal to be a runtime variable.
pub fn dynamic(ast: &mut AstContext, value: Expr) -> Expr {
    ast.op(Op::Dynamize, vec![value])
}

pub fn dyn_int(ast: &mut AstContext, value: i32) -> Expr {
    let lit = int(ast, value);
    dynamic(ast, lit)
}

/// The type of a literal, as a type value.
pub fn type_of_lit(ast: &mut AstContext, lit: Literal) -> Expr {
    let value = ast.lit(lit);
    ast.op(Op::TypeGet, vec![value])
}

pub fn binary(ast: &mut AstContext, op: Op, left: Expr, right: Expr) -> Expr {
    ast.op(op, vec![left, right])
}

pub fn compile(ast: AstContext, expr: &Expr) -> (Compilation, EvalResult<Program>) {
    compile_with(ast, expr, EvalConfig::default())
}

pub fn compile_with(
    ast: AstContext,
    expr: &Expr,
    config: EvalConfig,
) -> (Compilation, EvalResult<Program>) {
    init_tracing();
    let mut compilation = Compilation::with_config(ast, config);
    let result = compilation.compile(expr, EnvTerm::empty());
    (compilation, result)
}

pub fn i32_ty() -> Ty {
    Ty::Prim(PrimitiveType::Int32)
}

/// Visit every node of a typed body.
pub fn walk(expr: &TypedExpr, visit: &mut impl FnMut(&TypedExpr)) {
    visit(expr);
    match expr {
        TypedExpr::Let(node) => {
            walk(&node.bound, visit);
            walk(&node.rest, visit);
        }
        TypedExpr::State(node) => {
            walk(&node.stmt, visit);
            walk(&node.rest, visit);
        }
        TypedExpr::Op(node) => {
            for arg in node.args.iter() {
                walk(arg, visit);
            }
        }
        TypedExpr::Tuple(items) => {
            for item in items.iter() {
                walk(item, visit);
            }
        }
        TypedExpr::Box(inner, _) => walk(inner, visit),
        TypedExpr::Type(_)
        | TypedExpr::Var(_)
        | TypedExpr::Map(..)
        | TypedExpr::Lit(_)
        | TypedExpr::JoinPoint(_) => {}
    }
}

pub fn count_ops(expr: &TypedExpr, op: &Op) -> usize {
    let mut count = 0;
    walk(expr, &mut |node| {
        if matches!(node, TypedExpr::Op(n) if n.op == *op) {
            count += 1;
        }
    });
    count
}

pub fn count_join_calls(expr: &TypedExpr) -> usize {
    let mut count = 0;
    walk(expr, &mut |node| {
        if matches!(node, TypedExpr::JoinPoint(_)) {
            count += 1;
        }
    });
    count
}
