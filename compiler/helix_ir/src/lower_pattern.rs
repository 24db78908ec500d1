//! Pattern lowering.
//!
//! A pattern becomes a one-argument function built from conditionals and
//! primitive ops. The shape of every lowered match is
//! `lower(v, pattern, success, failure)`, where `failure` is always a call of
//! a thunk that was bound before the pattern bound any variable. A clause
//! therefore never sees the bindings of a clause that failed before it.
//!
//! Sub-patterns that inspect their value go through `Case`, which splits a
//! union-typed value into one branch per member before the inspection.
//!
//! A pattern that is not a clause list lowers to a predicate returning
//! `true` on match and `false` otherwise. A clause list nested inside another
//! pattern matches when any of its clause patterns does; its bodies are
//! ignored.

use std::rc::Rc;

use crate::stack::ensure_sufficient_stack;
use crate::{AstContext, Clause, Expr, Literal, ModulePattern, Name, Op, Pattern, PatternKind};

impl AstContext {
    /// The function a pattern denotes. Memoized per pattern node.
    pub fn lower_pattern(&mut self, pattern: &Pattern) -> Expr {
        if let Some(done) = self.lowered_patterns.get(&pattern.symbol()) {
            return done.clone();
        }
        let result = ensure_sufficient_stack(|| self.lower_top(pattern));
        self.lowered_patterns.insert(pattern.symbol(), result.clone());
        result
    }

    fn lower_top(&mut self, pattern: &Pattern) -> Expr {
        let clauses: Rc<[Clause]> = match pattern.value() {
            PatternKind::Clauses(clauses) => Rc::clone(clauses),
            _ => {
                let yes = self.lit(Literal::Bool(true));
                let no = self.lit(Literal::Bool(false));
                let wildcard = self.pat_wildcard();
                Rc::from(vec![
                    Clause {
                        pattern: pattern.clone(),
                        body: yes,
                    },
                    Clause {
                        pattern: wildcard,
                        body: no,
                    },
                ])
            }
        };

        let arg = self.fresh_name("arg");
        let scrutinee = self.fresh_name("scrutinee");
        let miss_arg = self.var(scrutinee);
        let mut acc = self.op(Op::PatternMiss, vec![miss_arg]);
        for clause in clauses.iter().rev() {
            acc = self.with_failure(acc, |ctx, fail| {
                ctx.lower(scrutinee, &clause.pattern, clause.body.clone(), fail)
            });
        }
        let inner = self.func(scrutinee, acc);
        let arg_var = self.var(arg);
        let split = self.op(Op::Case, vec![arg_var, inner]);
        self.func(arg, split)
    }

    /// `let k = fun _ -> failure in build(k ())`.
    fn with_failure(
        &mut self,
        failure: Expr,
        build: impl FnOnce(&mut Self, Expr) -> Expr,
    ) -> Expr {
        let k = self.fresh_name("fail");
        let thunk = self.thunk(failure);
        let call = self.force(k);
        let body = build(self, call);
        self.let_in(k, thunk, body)
    }

    /// Match `v` against a sub-pattern, splitting unions first when the
    /// sub-pattern inspects its value.
    fn lower_sub(&mut self, v: Name, pattern: &Pattern, succ: Expr, fail: Expr) -> Expr {
        if matches!(pattern.value(), PatternKind::Wildcard | PatternKind::Var(_)) {
            return self.lower(v, pattern, succ, fail);
        }
        let part = self.fresh_name("part");
        let body = self.lower(part, pattern, succ, fail);
        let f = self.func(part, body);
        let value = self.var(v);
        self.op(Op::Case, vec![value, f])
    }

    fn lower(&mut self, v: Name, pattern: &Pattern, succ: Expr, fail: Expr) -> Expr {
        ensure_sufficient_stack(|| self.lower_uncached(v, pattern, succ, fail))
    }

    fn lower_uncached(&mut self, v: Name, pattern: &Pattern, succ: Expr, fail: Expr) -> Expr {
        match pattern.value() {
            PatternKind::Wildcard => succ,
            PatternKind::Var(name) => {
                let value = self.var(v);
                self.let_in(*name, value, succ)
            }
            PatternKind::Lit(lit) => {
                let value = self.var(v);
                let expected = self.lit(lit.clone());
                let same_type = self.op(Op::EqType, vec![value.clone(), expected.clone()]);
                let same_value = self.op(Op::EQ, vec![value, expected]);
                let inner = self.if_(same_value, succ, fail.clone());
                self.if_(same_type, inner, fail)
            }
            PatternKind::Tuple(items) => {
                let matched = self.lower_elements(v, items, succ, &fail);
                let len = tuple_len(items.len());
                let value = self.var(v);
                let check = self.op(Op::TupleLengthEq(len), vec![value]);
                self.if_(check, matched, fail)
            }
            PatternKind::Cons(items, rest) => {
                let len = tuple_len(items.len());
                let rest_name = self.fresh_name("rest");
                let rest_match = self.lower_sub(rest_name, rest, succ, fail.clone());
                let value = self.var(v);
                let slice = self.op(Op::TupleSlice(len), vec![value.clone()]);
                let with_rest = self.let_in(rest_name, slice, rest_match);
                let matched = self.lower_elements(v, items, with_rest, &fail);
                let check = self.op(Op::TupleLengthGe(len), vec![value]);
                self.if_(check, matched, fail)
            }
            PatternKind::TypeEq(inner, ty) => {
                let matched = self.lower_sub(v, inner, succ, fail.clone());
                let value = self.var(v);
                let check = self.op(Op::EqType, vec![value, ty.clone()]);
                self.if_(check, matched, fail)
            }
            PatternKind::Active(f, inner) => {
                let result = self.fresh_name("active");
                let matched = self.lower_sub(result, inner, succ, fail);
                let value = self.var(v);
                let call = self.apply(f.clone(), value);
                self.let_in(result, call, matched)
            }
            PatternKind::PartialActive(f, inner) => {
                let result = self.fresh_name("partial");
                let payload = self.fresh_name("payload");
                let matched = self.lower_sub(payload, inner, succ, fail.clone());
                let result_var = self.var(result);
                let get_payload = self.op(Op::TupleIndex(1), vec![result_var.clone()]);
                let bound = self.let_in(payload, get_payload, matched);
                let flag = self.op(Op::TupleIndex(0), vec![result_var]);
                let branch = self.if_(flag, bound, fail);
                let value = self.var(v);
                let call = self.apply(f.clone(), value);
                self.let_in(result, call, branch)
            }
            PatternKind::ExtensionActive(f, inner) => {
                let matched = self.lower_sub(v, inner, succ, fail.clone());
                let value = self.var(v);
                let check = self.apply(f.clone(), value);
                self.if_(check, matched, fail)
            }
            PatternKind::Or(alternatives) => self.lower_alternatives(v, alternatives, &succ, fail),
            PatternKind::And(parts) => {
                let mut acc = succ;
                for part in parts.iter().rev() {
                    acc = self.lower_sub(v, part, acc, fail.clone());
                }
                acc
            }
            PatternKind::When(inner, guard) => {
                let guarded = self.if_(guard.clone(), succ, fail.clone());
                self.lower_sub(v, inner, guarded, fail)
            }
            PatternKind::Module(module) => self.lower_module(v, module, succ, fail),
            PatternKind::Clauses(clauses) => {
                let alternatives: Vec<Pattern> =
                    clauses.iter().map(|clause| clause.pattern.clone()).collect();
                self.lower_alternatives(v, &alternatives, &succ, fail)
            }
        }
    }

    /// Try each alternative in turn; the success continuation is repeated
    /// once per alternative since each binds its own variables.
    fn lower_alternatives(
        &mut self,
        v: Name,
        alternatives: &[Pattern],
        succ: &Expr,
        fail: Expr,
    ) -> Expr {
        let mut acc = fail;
        for alternative in alternatives.iter().rev() {
            acc = self.with_failure(acc, |ctx, next| {
                ctx.lower_sub(v, alternative, succ.clone(), next)
            });
        }
        acc
    }

    /// Bind each tuple element to a fresh name and match it.
    fn lower_elements(&mut self, v: Name, items: &[Pattern], succ: Expr, fail: &Expr) -> Expr {
        let mut acc = succ;
        for (i, item) in items.iter().enumerate().rev() {
            let element = self.fresh_name("elem");
            let matched = self.lower_sub(element, item, acc, fail.clone());
            let value = self.var(v);
            let index = self.op(Op::TupleIndex(tuple_len(i)), vec![value]);
            acc = self.let_in(element, index, matched);
        }
        acc
    }

    fn lower_module(&mut self, v: Name, pattern: &ModulePattern, succ: Expr, fail: Expr) -> Expr {
        match pattern {
            ModulePattern::Member { field, bind } => {
                let value = self.var(v);
                let has = self.op(Op::ModuleHasMember(*field), vec![value.clone()]);
                let open = self.op(Op::ModuleOpen(*field), vec![value]);
                let bound = self.let_in(*bind, open, succ);
                self.if_(has, bound, fail)
            }
            ModulePattern::Inner { field, pattern } => {
                let inner = self.fresh_name("field");
                let matched = self.lower_sub(inner, pattern, succ, fail.clone());
                let value = self.var(v);
                let has = self.op(Op::ModuleHasMember(*field), vec![value.clone()]);
                let open = self.op(Op::ModuleOpen(*field), vec![value]);
                let bound = self.let_in(inner, open, matched);
                self.if_(has, bound, fail)
            }
            ModulePattern::And(parts) => {
                let mut acc = succ;
                for part in parts.iter().rev() {
                    acc = self.lower_module(v, part, acc, fail.clone());
                }
                acc
            }
            ModulePattern::Or(alternatives) => {
                let mut acc = fail;
                for alternative in alternatives.iter().rev() {
                    acc = self.with_failure(acc, |ctx, next| {
                        ctx.lower_module(v, alternative, succ.clone(), next)
                    });
                }
                acc
            }
            ModulePattern::Not(inner) => {
                let s = self.fresh_name("not");
                let thunk = self.thunk(succ);
                let call = self.force(s);
                let body = self.lower_module(v, inner, fail, call);
                self.let_in(s, thunk, body)
            }
            ModulePattern::Xor(a, b) => {
                // a matched: b must fail. a failed: b must match.
                let f = self.fresh_name("xor_fail");
                let fail_thunk = self.thunk(fail);
                let call_f = self.force(f);
                let only_b = self.lower_module(v, b, succ.clone(), call_f);
                let body = self.with_failure(only_b, |ctx, try_b| {
                    let s = ctx.fresh_name("xor_ok");
                    let ok_thunk = ctx.thunk(succ);
                    let call_s = ctx.force(s);
                    let call_f = ctx.force(f);
                    let b_must_fail = ctx.lower_module(v, b, call_f, call_s);
                    let after_a = ctx.let_in(s, ok_thunk, b_must_fail);
                    ctx.lower_module(v, a, after_a, try_b)
                });
                self.let_in(f, fail_thunk, body)
            }
        }
    }
}

fn tuple_len(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
