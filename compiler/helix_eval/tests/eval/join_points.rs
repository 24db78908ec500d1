//! Join-point specialization: memoization, recursion, closures and kernels.

use helix_eval::{EvalConfig, EvalErrorKind, JoinPointState};
use helix_ir::{
    AstContext, Expr, JoinPointKey, JoinPointKind, LineCol, Literal, Op, PosKey, TagGen, Ty,
    TypedExpr,
};
use pretty_assertions::assert_eq;

use crate::common::{
    binary, compile, compile_with, count_join_calls, count_ops, dyn_int, dynamic, i32_ty, int,
    type_of_lit, walk,
};

/// `fun x -> join (x + x)`.
fn doubler(ast: &mut AstContext) -> Expr {
    let x = ast.name("x");
    let xv = ast.var(x);
    let sum = binary(ast, Op::Add, xv.clone(), xv);
    let body = ast.join_method(sum);
    ast.func(x, body)
}

/// `let f = doubler in (f a, f b)`.
fn call_twice(ast: &mut AstContext, a: Expr, b: Expr) -> Expr {
    let f = ast.name("f");
    let func = doubler(ast);
    let fv = ast.var(f);
    let first = ast.apply(fv.clone(), a);
    let second = ast.apply(fv, b);
    let pair = ast.tuple(vec![first, second]);
    ast.let_in(f, func, pair)
}

/// `rec sum n = body(if n == 0 then 0 else n + sum (n - 1))`, with the
/// branches in the given order when `base_first` is false.
fn countdown(ast: &mut AstContext, base_first: bool, annotate: bool) -> Expr {
    let sum = ast.name("sum");
    let n = ast.name("n");
    let nv = ast.var(n);
    let zero = int(ast, 0);
    let one = int(ast, 1);
    let below = binary(ast, Op::Sub, nv.clone(), one);
    let sv = ast.var(sum);
    let rec_call = ast.apply(sv, below);
    let step = binary(ast, Op::Add, nv.clone(), rec_call);
    let base = int(ast, 0);
    let body = if base_first {
        let cond = binary(ast, Op::EQ, nv, zero);
        ast.if_(cond, base, step)
    } else {
        let cond = binary(ast, Op::GT, nv, zero);
        ast.if_(cond, step, base)
    };
    let join = if annotate {
        let ty = type_of_lit(ast, Literal::Int32(0));
        ast.join_method_annot(body, ty)
    } else {
        ast.join_method(body)
    };
    ast.rec_func(sum, n, join)
}

/// `rec t n = join_type (if n == 0 then i32 else (t (n - 1),))`.
fn nested_type(ast: &mut AstContext) -> Expr {
    let t = ast.name("t");
    let n = ast.name("n");
    let nv = ast.var(n);
    let zero = int(ast, 0);
    let one = int(ast, 1);
    let cond = binary(ast, Op::EQ, nv.clone(), zero);
    let base = type_of_lit(ast, Literal::Int32(0));
    let below = binary(ast, Op::Sub, nv, one);
    let tv = ast.var(t);
    let inner = ast.apply(tv, below);
    let wrapped = ast.tuple(vec![inner]);
    let body = ast.if_(cond, base, wrapped);
    let join = ast.join_type(body);
    ast.rec_func(t, n, join)
}

/// `if m > 5 then (f (m - 1)).0 else 1`: recurses into `f` but, taken on
/// its own, suggests `f` returns `i32`.
fn first_of_recursive_call(ast: &mut AstContext, f: Expr, m: Expr) -> Expr {
    let five = int(ast, 5);
    let one = int(ast, 1);
    let cond = binary(ast, Op::GT, m.clone(), five);
    let below = binary(ast, Op::Sub, m, one);
    let call = ast.apply(f, below);
    let first = ast.op(Op::TupleIndex(0), vec![call]);
    let base = int(ast, 1);
    ast.if_(cond, first, base)
}

/// `if n > 0 then (inner, inner) else (0, 0)` applied as `f (dyn 10)`,
/// where `inner` is built by `make_inner` from `f` and `n`.
fn pair_recursion(
    ast: &mut AstContext,
    make_inner: impl FnOnce(&mut AstContext, Expr, Expr) -> Expr,
) -> Expr {
    let f = ast.name("f");
    let n = ast.name("n");
    let fv = ast.var(f);
    let nv = ast.var(n);
    let inner = make_inner(ast, fv, nv.clone());
    let zero = int(ast, 0);
    let cond = binary(ast, Op::GT, nv, zero);
    let pair = ast.tuple(vec![inner.clone(), inner]);
    let base_a = int(ast, 0);
    let base_b = int(ast, 0);
    let base = ast.tuple(vec![base_a, base_b]);
    let body = ast.if_(cond, pair, base);
    let join = ast.join_method(body);
    let rec = ast.rec_func(f, n, join);
    let ten = dyn_int(ast, 10);
    ast.apply(rec, ten)
}

/// `rec f n = join (let p = fun m -> join (if m > 5 then (f (m - 1)).0 else 1)
/// in if n > 0 then (p n, p n) else (0, 0))`, applied to a runtime 10.
fn outer_and_inner_recursion(ast: &mut AstContext) -> Expr {
    pair_recursion(ast, |ast, fv, nv| {
        let p = ast.name("p");
        let m = ast.name("m");
        let mv = ast.var(m);
        let inner_body = first_of_recursive_call(ast, fv, mv);
        let inner_join = ast.join_method(inner_body);
        let inner = ast.func(m, inner_join);
        let pv = ast.var(p);
        let call = ast.apply(pv, nv);
        ast.let_in(p, inner, call)
    })
}

fn join_call_keys(expr: &TypedExpr) -> Vec<JoinPointKey> {
    let mut keys = Vec::new();
    walk(expr, &mut |node| {
        if let TypedExpr::JoinPoint(call) = node {
            keys.push(call.key.clone());
        }
    });
    keys
}

// ── Memoization ──

#[test]
fn equal_argument_types_share_one_body() {
    let mut ast = AstContext::new();
    let a = dyn_int(&mut ast, 1);
    let b = dyn_int(&mut ast, 2);
    let program_expr = call_twice(&mut ast, a, b);
    let (compilation, program) = compile(ast, &program_expr);
    let program = program.unwrap();

    let stats = compilation.stats();
    assert_eq!(stats.bodies_evaluated, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(program.functions.len(), 1);
    assert_eq!(program.functions[0].params.len(), 1);
    assert_eq!(program.ty, Ty::tuple(vec![i32_ty(), i32_ty()]));
    assert_eq!(count_join_calls(&program.main), 2);
}

#[test]
fn different_argument_types_get_separate_bodies() {
    let mut ast = AstContext::new();
    let a = dyn_int(&mut ast, 1);
    let half = ast.lit(Literal::f64(1.5));
    let b = dynamic(&mut ast, half);
    let program_expr = call_twice(&mut ast, a, b);
    let (compilation, program) = compile(ast, &program_expr);
    let program = program.unwrap();

    assert_eq!(compilation.stats().bodies_evaluated, 2);
    assert_eq!(compilation.stats().cache_hits, 0);
    assert_eq!(compilation.join_point_count(JoinPointKind::Method), 2);
    assert_eq!(program.functions.len(), 2);
}

#[test]
fn static_arguments_are_part_of_the_key() {
    let mut ast = AstContext::new();
    let a = int(&mut ast, 1);
    let b = int(&mut ast, 2);
    let program_expr = call_twice(&mut ast, a, b);
    let (compilation, program) = compile(ast, &program_expr);
    let program = program.unwrap();

    assert_eq!(compilation.stats().bodies_evaluated, 2);
    let bodies: Vec<_> = program
        .functions
        .iter()
        .map(|f| f.body.as_lit().cloned())
        .collect();
    assert_eq!(
        bodies,
        vec![Some(Literal::Int32(2)), Some(Literal::Int32(4))]
    );
    assert!(program.functions.iter().all(|f| f.params.is_empty()));
}

#[test]
fn instances_never_share_tags() {
    let mut ast = AstContext::new();
    let a = dyn_int(&mut ast, 1);
    let b = dyn_int(&mut ast, 2);
    let program_expr = call_twice(&mut ast, a, b);
    let (mut compilation, program) = compile(ast, &program_expr);
    let key = program.unwrap().functions[0].key.clone();

    let mut tags = TagGen::starting_at(100);
    let first = compilation
        .instantiate(JoinPointKind::Method, &key, &mut tags)
        .unwrap();
    let second = compilation
        .instantiate(JoinPointKind::Method, &key, &mut tags)
        .unwrap();

    assert_eq!(first.params.len(), 1);
    assert!(first.params[0].tag.raw() >= 100);
    assert_ne!(first.params[0].tag, second.params[0].tag);
    assert_eq!(first.body.ty(), second.body.ty());
    assert!(compilation
        .instantiate(JoinPointKind::Closure, &key, &mut tags)
        .is_none());
}

// ── Recursion ──

#[test]
fn annotated_recursion_uses_the_declared_type() {
    let mut ast = AstContext::new();
    let sum = countdown(&mut ast, true, true);
    let ten = dyn_int(&mut ast, 10);
    let main = ast.apply(sum, ten);
    let (compilation, program) = compile(ast, &main);
    let program = program.unwrap();

    assert_eq!(program.ty, i32_ty());
    let stats = compilation.stats();
    assert_eq!(stats.bodies_evaluated, 1);
    assert_eq!(stats.recursive_hits, 1);
    assert_eq!(program.functions.len(), 1);
    let body = &program.functions[0].body;
    assert_eq!(count_ops(body, &Op::If), 1);
    assert_eq!(count_join_calls(body), 1);
}

#[test]
fn unannotated_recursion_is_typed_from_the_base_case() {
    for base_first in [true, false] {
        let mut ast = AstContext::new();
        let sum = countdown(&mut ast, base_first, false);
        let ten = dyn_int(&mut ast, 10);
        let main = ast.apply(sum, ten);
        let (compilation, program) = compile(ast, &main);
        let program = program.unwrap();

        assert_eq!(program.ty, i32_ty());
        assert_eq!(compilation.stats().bodies_evaluated, 1);
        assert!(compilation.stats().recursive_hits >= 1);
        assert_eq!(count_join_calls(&program.functions[0].body), 1);
    }
}

#[test]
fn recursion_without_a_base_case_is_rejected() {
    let mut ast = AstContext::new();
    let lp = ast.name("loop");
    let n = ast.name("n");
    let nv = ast.var(n);
    let one = int(&mut ast, 1);
    let next = binary(&mut ast, Op::Add, nv, one);
    let lv = ast.var(lp);
    let call = ast.apply(lv, next);
    let join = ast.join_method(call);
    let f = ast.rec_func(lp, n, join);
    let zero = dyn_int(&mut ast, 0);
    let main = ast.apply(f, zero);
    let (compilation, program) = compile(ast, &main);

    let err = program.unwrap_err();
    assert!(matches!(
        err.kind,
        EvalErrorKind::UnsupportedRecursion { .. }
    ));
    assert_eq!(compilation.join_point_count(JoinPointKind::Method), 0);
}

#[test]
fn inner_join_points_leave_the_outer_type_to_its_own_branches() {
    let mut ast = AstContext::new();
    let main = outer_and_inner_recursion(&mut ast);
    let (compilation, program) = compile(ast, &main);
    let program = program.unwrap();

    let pair = Ty::tuple(vec![i32_ty(), i32_ty()]);
    assert_eq!(program.ty, pair);
    assert_eq!(program.functions.len(), 2);
    assert!(compilation.stats().recursive_hits >= 1);
}

#[test]
fn mutually_recursive_join_points_finish_inner_first() {
    let mut ast = AstContext::new();
    let main = outer_and_inner_recursion(&mut ast);
    let (compilation, program) = compile(ast, &main);
    let program = program.unwrap();

    let types: Vec<Ty> = program.functions.iter().map(|f| f.ty.clone()).collect();
    assert_eq!(types, vec![i32_ty(), Ty::tuple(vec![i32_ty(), i32_ty()])]);
    let (inner, outer) = (&program.functions[0], &program.functions[1]);

    let order: Vec<(JoinPointKind, JoinPointKey)> = compilation.finish_order().to_vec();
    assert_eq!(
        order,
        vec![
            (JoinPointKind::Method, inner.key.clone()),
            (JoinPointKind::Method, outer.key.clone()),
        ]
    );
    for function in [inner, outer] {
        assert!(matches!(
            compilation.join_point(JoinPointKind::Method, &function.key),
            Some(JoinPointState::Done(_))
        ));
    }

    assert_eq!(join_call_keys(&program.main), vec![outer.key.clone()]);
    assert_eq!(join_call_keys(&outer.body), vec![inner.key.clone(); 2]);
    assert_eq!(join_call_keys(&inner.body), vec![outer.key.clone()]);
}

#[test]
fn a_wrong_guess_is_retracted_for_an_enclosing_branch() {
    // The inner `if` types `f` as `i32` from its `else 1`, which makes
    // `.0` fail; the outer `if` then types `f` from `(0, 0)`.
    let mut ast = AstContext::new();
    let main = pair_recursion(&mut ast, first_of_recursive_call);
    let (compilation, program) = compile(ast, &main);
    let program = program.unwrap();

    assert_eq!(program.ty, Ty::tuple(vec![i32_ty(), i32_ty()]));
    assert_eq!(program.functions.len(), 1);
    assert_eq!(compilation.finish_order().len(), 1);
    assert!(count_ops(&program.functions[0].body, &Op::If) >= 2);
}

#[test]
fn union_dispatch_types_recursion_from_a_sibling_member() {
    // rec f x = join (case x of y -> if y is bool then 0 else f (dyn (box true)))
    let mut ast = AstContext::new();
    let f = ast.name("f");
    let x = ast.name("x");
    let y = ast.name("y");
    let int_ty = type_of_lit(&mut ast, Literal::Int32(0));
    let bool_ty = type_of_lit(&mut ast, Literal::Bool(true));
    let union = ast.op(Op::TypeUnion, vec![int_ty, bool_ty]);

    let yv = ast.var(y);
    let any_bool = ast.lit(Literal::Bool(false));
    let is_bool = ast.op(Op::EqType, vec![yv, any_bool]);
    let yes = ast.lit(Literal::Bool(true));
    let boxed = ast.apply(union.clone(), yes);
    let next = dynamic(&mut ast, boxed);
    let fv = ast.var(f);
    let rec_call = ast.apply(fv, next);
    let base = int(&mut ast, 0);
    let member_body = ast.if_(is_bool, base, rec_call);
    let handler = ast.func(y, member_body);
    let xv = ast.var(x);
    let split = ast.op(Op::Case, vec![xv, handler]);
    let join = ast.join_method(split);
    let rec = ast.rec_func(f, x, join);

    let seven = int(&mut ast, 7);
    let start = ast.apply(union, seven);
    let arg = dynamic(&mut ast, start);
    let main = ast.apply(rec, arg);
    let (compilation, program) = compile(ast, &main);
    let program = program.unwrap();

    assert_eq!(program.ty, i32_ty());
    assert_eq!(program.functions.len(), 1);
    let body = &program.functions[0].body;
    assert_eq!(count_ops(body, &Op::Case), 1);
    assert_eq!(count_join_calls(body), 1);
    assert!(compilation.stats().recursive_hits >= 1);
}

// ── Type join points ──

#[test]
fn recursive_types_close_with_a_back_reference() {
    let mut ast = AstContext::new();
    let list = ast.name("list");
    let elem = ast.name("elem");
    let nil_text = ast.lit(Literal::string("nil"));
    let nil = ast.op(Op::TypeLitCreate, vec![nil_text]);
    let ev = ast.var(elem);
    let lv = ast.var(list);
    let ev2 = ast.var(elem);
    let tail = ast.apply(lv, ev2);
    let cons = ast.tuple(vec![ev, tail]);
    let union = ast.op(Op::TypeUnion, vec![nil, cons]);
    let join = ast.join_type(union);
    let f = ast.rec_func(list, elem, join);
    let i32_type = type_of_lit(&mut ast, Literal::Int32(0));
    let main = ast.apply(f, i32_type);
    let (compilation, program) = compile(ast, &main);
    let program = program.unwrap();

    let Ty::Rec(key) = &program.ty else {
        panic!("expected a recursive type, got {:?}", program.ty);
    };
    let def = compilation.rec_type(key).unwrap();
    let members = def.union_members().unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.contains(&Ty::Lit(Literal::string("nil"))));
    assert!(members.contains(&Ty::tuple(vec![i32_ty(), Ty::Rec(key.clone())])));
    assert_eq!(program.rec_types.len(), 1);
    assert_eq!(compilation.stats().bodies_evaluated, 1);
}

#[test]
fn type_functions_nest_deeply() {
    let mut ast = AstContext::new();
    let t = nested_type(&mut ast);
    let fifty = int(&mut ast, 50);
    let main = ast.apply(t, fifty);
    let (compilation, program) = compile(ast, &main);
    let program = program.unwrap();

    let mut depth = 0;
    let mut ty = &program.ty;
    while let Ty::List(items) = ty {
        assert_eq!(items.len(), 1);
        ty = &items[0];
        depth += 1;
    }
    assert_eq!(depth, 50);
    assert_eq!(*ty, i32_ty());
    assert_eq!(compilation.stats().bodies_evaluated, 51);
    assert!(program.rec_types.is_empty());
}

#[test]
fn specialization_depth_is_limited() {
    let mut ast = AstContext::new();
    let t = nested_type(&mut ast);
    let fifty = int(&mut ast, 50);
    let main = ast.apply(t, fifty);
    let config = EvalConfig {
        max_specialization_depth: 10,
        ..EvalConfig::default()
    };
    let (compilation, program) = compile_with(ast, &main, config);

    assert_eq!(
        program.unwrap_err().kind,
        EvalErrorKind::SpecializationDepthExceeded { limit: 10 }
    );
    assert_eq!(compilation.join_point_count(JoinPointKind::Type), 0);
}

// ── Closures ──

#[test]
fn closures_become_runtime_functions() {
    let mut ast = AstContext::new();
    let c = ast.name("c");
    let x = ast.name("x");
    let xv = ast.var(x);
    let body = binary(&mut ast, Op::Add, xv.clone(), xv);
    let f = ast.func(x, body);
    let dom = type_of_lit(&mut ast, Literal::Int32(0));
    let closure = ast.op(Op::ClosureCreate, vec![f, dom]);
    let cv = ast.var(c);
    let five = dyn_int(&mut ast, 5);
    let call = ast.apply(cv, five);
    let main = ast.let_in(c, closure, call);
    let (_, program) = compile(ast, &main);
    let program = program.unwrap();

    assert_eq!(program.ty, i32_ty());
    assert_eq!(count_ops(&program.main, &Op::Apply), 1);
    let closures: Vec<_> = program.functions_of(JoinPointKind::Closure).collect();
    assert_eq!(closures.len(), 1);
    assert_eq!(closures[0].closure_param.as_ref().map(|p| p.ty.clone()), Some(i32_ty()));
    assert_eq!(closures[0].ty, i32_ty());
}

#[test]
fn closure_range_annotation_is_checked() {
    let mut ast = AstContext::new();
    let x = ast.name("x");
    let xv = ast.var(x);
    let f = ast.func(x, xv);
    let dom = type_of_lit(&mut ast, Literal::Int32(0));
    let range = type_of_lit(&mut ast, Literal::f64(0.0));
    let closure = ast.op(Op::ClosureCreate, vec![f, dom, range]);
    let (_, program) = compile(ast, &closure);

    assert!(matches!(
        program.unwrap_err().kind,
        EvalErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn closure_arguments_must_match_the_domain() {
    let mut ast = AstContext::new();
    let x = ast.name("x");
    let xv = ast.var(x);
    let f = ast.func(x, xv);
    let dom = type_of_lit(&mut ast, Literal::Int32(0));
    let closure = ast.op(Op::ClosureCreate, vec![f, dom]);
    let wrong = ast.lit(Literal::Bool(true));
    let main = ast.apply(closure, wrong);
    let (_, program) = compile(ast, &main);

    match program.unwrap_err().kind {
        EvalErrorKind::TypeMismatch { context, .. } => assert_eq!(context, "closure argument"),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

// ── Kernels ──

#[test]
fn kernels_return_unit() {
    let mut ast = AstContext::new();
    let unit = ast.unit();
    let kernel = ast.join_cuda(unit);
    let (_, program) = compile(ast, &kernel);
    let program = program.unwrap();

    assert_eq!(program.ty, Ty::unit());
    assert_eq!(program.functions_of(JoinPointKind::Cuda).count(), 1);
    assert!(matches!(program.main, TypedExpr::State(_)));
}

#[test]
fn kernels_with_results_are_rejected() {
    let mut ast = AstContext::new();
    let one = int(&mut ast, 1);
    let kernel = ast.join_cuda(one);
    let (compilation, program) = compile(ast, &kernel);

    assert!(matches!(
        program.unwrap_err().kind,
        EvalErrorKind::TypeMismatch { .. }
    ));
    assert_eq!(compilation.join_point_count(JoinPointKind::Cuda), 0);
}

// ── Traces ──

#[test]
fn errors_carry_the_innermost_position() {
    let mut ast = AstContext::new();
    let module = ast.name("main.hx");
    let key = PosKey::new(module, LineCol::new(3, 5), LineCol::new(3, 12));
    let missing = ast.ident("missing");
    let main = ast.pos(missing, key);
    let (_, program) = compile(ast, &main);

    let err = program.unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UnboundName {
            name: "missing".to_owned()
        }
    );
    assert_eq!(err.trace.innermost(), Some(key));
}

#[test]
fn join_points_remember_where_they_were_requested() {
    let mut ast = AstContext::new();
    let module = ast.name("main.hx");
    let key = PosKey::new(module, LineCol::new(7, 1), LineCol::new(7, 20));
    let x = ast.name("x");
    let xv = ast.var(x);
    let body = binary(&mut ast, Op::Mult, xv.clone(), xv);
    let join = ast.join_method(body);
    let located = ast.pos(join, key);
    let f = ast.func(x, located);
    let arg = dyn_int(&mut ast, 3);
    let main = ast.apply(f, arg);
    let (compilation, program) = compile(ast, &main);
    let program = program.unwrap();

    let jp = &program.functions[0].key;
    let trace = compilation
        .join_point_trace(JoinPointKind::Method, jp)
        .unwrap();
    assert_eq!(trace.innermost(), Some(key));
}
