//! Pattern matching, observed through evaluation of lowered patterns.

use helix_eval::EvalErrorKind;
use helix_ir::{AstContext, Expr, Literal, ModulePattern, Op, Pattern, TypedExpr};
use pretty_assertions::assert_eq;

use crate::common::{binary, compile, count_ops, dyn_int, dynamic, i32_ty, int, type_of_lit};

/// `match scrutinee with pattern -> 1 | _ -> 0`.
fn test_match(ast: &mut AstContext, scrutinee: Expr, pattern: Pattern) -> Expr {
    let yes = int(ast, 1);
    let no = int(ast, 0);
    let otherwise = ast.pat_wildcard();
    ast.match_(scrutinee, vec![(pattern, yes), (otherwise, no)])
}

fn static_result(ast: AstContext, expr: &Expr) -> Literal {
    let (_, program) = compile(ast, expr);
    program
        .unwrap()
        .main
        .as_lit()
        .cloned()
        .expect("a static result")
}

// ── Clauses ──

#[test]
fn first_matching_clause_wins() {
    let build = |value: i32| {
        let mut ast = AstContext::new();
        let x = ast.name("x");
        let scrutinee = int(&mut ast, value);
        let one = ast.pat_lit(Literal::Int32(1));
        let one_body = ast.lit(Literal::string("one"));
        let any = ast.pat_var(x);
        let xv = ast.var(x);
        let inc = int(&mut ast, 1);
        let any_body = binary(&mut ast, Op::Add, xv, inc);
        let expr = ast.match_(scrutinee, vec![(one, one_body), (any, any_body)]);
        static_result(ast, &expr)
    };
    assert_eq!(build(1), Literal::string("one"));
    assert_eq!(build(5), Literal::Int32(6));
}

#[test]
fn static_miss_is_an_error() {
    let mut ast = AstContext::new();
    let scrutinee = int(&mut ast, 3);
    let one = ast.pat_lit(Literal::Int32(1));
    let body = int(&mut ast, 10);
    let expr = ast.match_(scrutinee, vec![(one, body)]);
    let (_, program) = compile(ast, &expr);

    assert!(matches!(
        program.unwrap_err().kind,
        EvalErrorKind::PatternMiss { .. }
    ));
}

#[test]
fn literal_of_another_type_does_not_match() {
    let mut ast = AstContext::new();
    let scrutinee = ast.lit(Literal::Int64(1));
    let pattern = ast.pat_lit(Literal::Int32(1));
    let expr = test_match(&mut ast, scrutinee, pattern);
    assert_eq!(static_result(ast, &expr), Literal::Int32(0));
}

#[test]
fn dynamic_literal_match_becomes_a_conditional() {
    let mut ast = AstContext::new();
    let scrutinee = dyn_int(&mut ast, 5);
    let pattern = ast.pat_lit(Literal::Int32(5));
    let expr = test_match(&mut ast, scrutinee, pattern);
    let (_, program) = compile(ast, &expr);
    let program = program.unwrap();

    assert_eq!(program.ty, i32_ty());
    assert_eq!(count_ops(&program.main, &Op::If), 1);
    assert_eq!(count_ops(&program.main, &Op::EQ), 1);
    assert_eq!(count_ops(&program.main, &Op::PatternMiss), 0);
}

#[test]
fn dynamic_miss_takes_the_type_of_its_sibling() {
    let mut ast = AstContext::new();
    let scrutinee = dyn_int(&mut ast, 5);
    let five = ast.pat_lit(Literal::Int32(5));
    let body = int(&mut ast, 1);
    let expr = ast.match_(scrutinee, vec![(five, body)]);
    let (_, program) = compile(ast, &expr);
    let program = program.unwrap();

    assert_eq!(program.ty, i32_ty());
    assert_eq!(count_ops(&program.main, &Op::PatternMiss), 1);
}

#[test]
fn runtime_values_of_the_wrong_shape_never_match() {
    let mut ast = AstContext::new();
    let scrutinee = dyn_int(&mut ast, 5);
    let pair = {
        let a = ast.pat_wildcard();
        let b = ast.pat_wildcard();
        ast.pat_tuple(vec![a, b])
    };
    let body = int(&mut ast, 1);
    let expr = ast.match_(scrutinee, vec![(pair, body)]);
    let (_, program) = compile(ast, &expr);

    assert!(matches!(
        program.unwrap_err().kind,
        EvalErrorKind::PatternMiss { .. }
    ));
}

// ── Tuples ──

#[test]
fn tuple_patterns_destructure() {
    let mut ast = AstContext::new();
    let (a, b) = (ast.name("a"), ast.name("b"));
    let one = int(&mut ast, 1);
    let two = dyn_int(&mut ast, 2);
    let scrutinee = ast.tuple(vec![one, two]);
    let pa = ast.pat_var(a);
    let pb = ast.pat_var(b);
    let pattern = ast.pat_tuple(vec![pa, pb]);
    let av = ast.var(a);
    let bv = ast.var(b);
    let body = binary(&mut ast, Op::Add, av, bv);
    let expr = ast.match_(scrutinee, vec![(pattern, body)]);
    let (_, program) = compile(ast, &expr);
    let program = program.unwrap();

    assert_eq!(program.ty, i32_ty());
    assert_eq!(count_ops(&program.main, &Op::Add), 1);
    assert_eq!(count_ops(&program.main, &Op::If), 0);
}

#[test]
fn tuple_length_is_checked_statically() {
    let mut ast = AstContext::new();
    let one = int(&mut ast, 1);
    let two = int(&mut ast, 2);
    let scrutinee = ast.tuple(vec![one, two]);
    let items = (0..3).map(|_| ast.pat_wildcard()).collect();
    let triple = ast.pat_tuple(items);
    let expr = test_match(&mut ast, scrutinee, triple);
    assert_eq!(static_result(ast, &expr), Literal::Int32(0));
}

#[test]
fn cons_patterns_bind_the_rest() {
    let mut ast = AstContext::new();
    let (head, rest) = (ast.name("head"), ast.name("rest"));
    let items = (1..=3).map(|i| int(&mut ast, i)).collect();
    let scrutinee = ast.tuple(items);
    let ph = ast.pat_var(head);
    let pr = ast.pat_var(rest);
    let pattern = ast.pat_cons(vec![ph], pr);
    let body = ast.var(rest);
    let expr = ast.match_(scrutinee, vec![(pattern, body)]);
    let (_, program) = compile(ast, &expr);
    let program = program.unwrap();

    assert_eq!(
        program.main,
        TypedExpr::tuple(vec![
            TypedExpr::Lit(Literal::Int32(2)),
            TypedExpr::Lit(Literal::Int32(3)),
        ])
    );
}

// ── Combinators ──

#[test]
fn or_patterns_try_each_alternative() {
    let build = |value: i32| {
        let mut ast = AstContext::new();
        let scrutinee = int(&mut ast, value);
        let one = ast.pat_lit(Literal::Int32(1));
        let two = ast.pat_lit(Literal::Int32(2));
        let either = ast.pat_or(vec![one, two]);
        let expr = test_match(&mut ast, scrutinee, either);
        static_result(ast, &expr)
    };
    assert_eq!(build(2), Literal::Int32(1));
    assert_eq!(build(3), Literal::Int32(0));
}

#[test]
fn and_patterns_need_every_part() {
    let mut ast = AstContext::new();
    let x = ast.name("x");
    let scrutinee = int(&mut ast, 4);
    let bind = ast.pat_var(x);
    let four = ast.pat_lit(Literal::Int32(4));
    let both = ast.pat_and(vec![bind, four]);
    let body = ast.var(x);
    let zero = int(&mut ast, 0);
    let otherwise = ast.pat_wildcard();
    let expr = ast.match_(scrutinee, vec![(both, body), (otherwise, zero)]);
    assert_eq!(static_result(ast, &expr), Literal::Int32(4));
}

#[test]
fn guards_see_pattern_bindings() {
    let build = |value: i32| {
        let mut ast = AstContext::new();
        let x = ast.name("x");
        let scrutinee = int(&mut ast, value);
        let bind = ast.pat_var(x);
        let xv = ast.var(x);
        let three = int(&mut ast, 3);
        let guard = binary(&mut ast, Op::GT, xv, three);
        let guarded = ast.pat_when(bind, guard);
        let expr = test_match(&mut ast, scrutinee, guarded);
        static_result(ast, &expr)
    };
    assert_eq!(build(5), Literal::Int32(1));
    assert_eq!(build(2), Literal::Int32(0));
}

#[test]
fn nested_clause_lists_act_as_alternatives() {
    let mut ast = AstContext::new();
    let scrutinee = int(&mut ast, 7);
    let seven = ast.pat_lit(Literal::Int32(7));
    let ignored = int(&mut ast, 100);
    let eight = ast.pat_lit(Literal::Int32(8));
    let ignored_too = int(&mut ast, 200);
    let nested = ast.clauses(vec![(seven, ignored), (eight, ignored_too)]);
    let expr = test_match(&mut ast, scrutinee, nested);
    assert_eq!(static_result(ast, &expr), Literal::Int32(1));
}

// ── Active patterns ──

/// `fun v -> v % 2 == 0`.
fn is_even(ast: &mut AstContext) -> Expr {
    let v = ast.name("v");
    let vv = ast.var(v);
    let two = int(ast, 2);
    let rem = binary(ast, Op::Mod, vv, two);
    let zero = int(ast, 0);
    let test = binary(ast, Op::EQ, rem, zero);
    ast.func(v, test)
}

#[test]
fn active_patterns_match_the_result() {
    let mut ast = AstContext::new();
    let f = is_even(&mut ast);
    let scrutinee = int(&mut ast, 4);
    let yes = ast.pat_lit(Literal::Bool(true));
    let active = ast.pat_active(f, yes);
    let expr = test_match(&mut ast, scrutinee, active);
    assert_eq!(static_result(ast, &expr), Literal::Int32(1));
}

#[test]
fn partial_active_patterns_match_the_payload() {
    let mut ast = AstContext::new();
    let (v, y) = (ast.name("v"), ast.name("y"));
    let vv = ast.var(v);
    let zero = int(&mut ast, 0);
    let positive = binary(&mut ast, Op::GT, vv.clone(), zero);
    let two = int(&mut ast, 2);
    let doubled = binary(&mut ast, Op::Mult, vv, two);
    let result = ast.tuple(vec![positive, doubled]);
    let f = ast.func(v, result);

    let scrutinee = int(&mut ast, 3);
    let bind = ast.pat_var(y);
    let partial = ast.pat_partial_active(f, bind);
    let body = ast.var(y);
    let fallback = int(&mut ast, -1);
    let otherwise = ast.pat_wildcard();
    let expr = ast.match_(scrutinee, vec![(partial, body), (otherwise, fallback)]);
    assert_eq!(static_result(ast, &expr), Literal::Int32(6));
}

#[test]
fn extension_patterns_keep_the_original_value() {
    let mut ast = AstContext::new();
    let y = ast.name("y");
    let f = is_even(&mut ast);
    let scrutinee = int(&mut ast, 4);
    let bind = ast.pat_var(y);
    let ext = ast.pat_extension_active(f, bind);
    let body = ast.var(y);
    let fallback = int(&mut ast, -1);
    let otherwise = ast.pat_wildcard();
    let expr = ast.match_(scrutinee, vec![(ext, body), (otherwise, fallback)]);
    assert_eq!(static_result(ast, &expr), Literal::Int32(4));
}

// ── Modules ──

#[test]
fn module_patterns_require_the_member() {
    let build = |field: &str| {
        let mut ast = AstContext::new();
        let (a, x) = (ast.name("a"), ast.name("x"));
        let name = ast.name(field);
        let one = int(&mut ast, 41);
        let scrutinee = ast.module(vec![(name, one)]);
        let member = ast.pat_module(ModulePattern::Member { field: a, bind: x });
        let xv = ast.var(x);
        let inc = int(&mut ast, 1);
        let body = binary(&mut ast, Op::Add, xv, inc);
        let zero = int(&mut ast, 0);
        let otherwise = ast.pat_wildcard();
        let expr = ast.match_(scrutinee, vec![(member, body), (otherwise, zero)]);
        static_result(ast, &expr)
    };
    assert_eq!(build("a"), Literal::Int32(42));
    assert_eq!(build("b"), Literal::Int32(0));
}

#[test]
fn negated_module_patterns_invert_membership() {
    let mut ast = AstContext::new();
    let (a, b, x) = (ast.name("a"), ast.name("b"), ast.name("x"));
    let one = int(&mut ast, 1);
    let scrutinee = ast.module(vec![(b, one)]);
    let member = ModulePattern::Member { field: a, bind: x };
    let pattern = ast.pat_module(ModulePattern::Not(member.into()));
    let expr = test_match(&mut ast, scrutinee, pattern);
    assert_eq!(static_result(ast, &expr), Literal::Int32(1));
}

// ── Unions ──

#[test]
fn union_values_dispatch_per_member() {
    let mut ast = AstContext::new();
    let int_ty = type_of_lit(&mut ast, Literal::Int32(0));
    let float_ty = type_of_lit(&mut ast, Literal::f64(0.0));
    let union = ast.op(Op::TypeUnion, vec![int_ty.clone(), float_ty]);
    let one = int(&mut ast, 1);
    let boxed = ast.apply(union, one);
    let scrutinee = dynamic(&mut ast, boxed);
    let any = ast.pat_wildcard();
    let is_int = ast.pat_type_eq(any, int_ty);
    let expr = test_match(&mut ast, scrutinee, is_int);
    let (_, program) = compile(ast, &expr);
    let program = program.unwrap();

    assert_eq!(program.ty, i32_ty());
    assert_eq!(count_ops(&program.main, &Op::Case), 1);
    assert!(matches!(program.main.tail(), TypedExpr::Var(_)));
}

#[test]
fn boxing_checks_membership() {
    let mut ast = AstContext::new();
    let int_ty = type_of_lit(&mut ast, Literal::Int32(0));
    let float_ty = type_of_lit(&mut ast, Literal::f64(0.0));
    let union = ast.op(Op::TypeUnion, vec![int_ty, float_ty]);
    let flag = ast.lit(Literal::Bool(true));
    let boxed = ast.apply(union, flag);
    let (_, program) = compile(ast, &boxed);

    assert!(matches!(
        program.unwrap_err().kind,
        EvalErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn static_boxes_match_without_a_case() {
    let mut ast = AstContext::new();
    let int_ty = type_of_lit(&mut ast, Literal::Int32(0));
    let float_ty = type_of_lit(&mut ast, Literal::f64(0.0));
    let union = ast.op(Op::TypeUnion, vec![int_ty, float_ty.clone()]);
    let half = ast.lit(Literal::f64(0.5));
    let scrutinee = ast.apply(union, half);
    let any = ast.pat_wildcard();
    let is_float = ast.pat_type_eq(any, float_ty);
    let expr = test_match(&mut ast, scrutinee, is_float);
    let (_, program) = compile(ast, &expr);
    let program = program.unwrap();

    assert_eq!(program.main.as_lit(), Some(&Literal::Int32(1)));
    assert_eq!(program.ty, i32_ty());
}
