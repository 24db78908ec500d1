//! Constructors for surface expressions and patterns.
//!
//! The parser is an external collaborator; these helpers are how it, the
//! pattern lowering pass and tests build interned trees.

use std::rc::Rc;

use crate::stack::ensure_sufficient_stack;
use crate::{
    AstContext, Clause, Expr, ExprKind, FunctionCore, Literal, ModulePattern, Name, Op, Pattern,
    PatternKind, Pos, PosKey,
};

impl AstContext {
    // ── Expressions ──

    pub fn var(&mut self, name: Name) -> Expr {
        self.expr(ExprKind::Var(name))
    }

    /// Variable by source spelling.
    pub fn ident(&mut self, name: &str) -> Expr {
        let name = self.name(name);
        self.var(name)
    }

    pub fn lit(&mut self, lit: Literal) -> Expr {
        self.expr(ExprKind::Lit(lit))
    }

    pub fn func(&mut self, param: Name, body: Expr) -> Expr {
        self.expr(ExprKind::Function(FunctionCore { param, body }))
    }

    pub fn rec_func(&mut self, this: Name, param: Name, body: Expr) -> Expr {
        self.expr(ExprKind::RecFunction(this, FunctionCore { param, body }))
    }

    pub fn tuple(&mut self, items: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Tuple(Rc::from(items)))
    }

    pub fn unit(&mut self) -> Expr {
        self.tuple(Vec::new())
    }

    pub fn op(&mut self, op: Op, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Op(op, Rc::from(args)))
    }

    pub fn apply(&mut self, f: Expr, arg: Expr) -> Expr {
        self.op(Op::Apply, vec![f, arg])
    }

    /// `let name = bound in rest`, encoded as an immediately applied function.
    pub fn let_in(&mut self, name: Name, bound: Expr, rest: Expr) -> Expr {
        let f = self.func(name, rest);
        self.apply(f, bound)
    }

    pub fn if_(&mut self, cond: Expr, then: Expr, otherwise: Expr) -> Expr {
        self.op(Op::If, vec![cond, then, otherwise])
    }

    /// A function ignoring its argument.
    pub fn thunk(&mut self, body: Expr) -> Expr {
        let param = self.fresh_name("_");
        self.func(param, body)
    }

    /// Call a thunk bound to `name`.
    pub fn force(&mut self, name: Name) -> Expr {
        let f = self.var(name);
        let unit = self.unit();
        self.apply(f, unit)
    }

    /// Method join point around `body`.
    pub fn join_method(&mut self, body: Expr) -> Expr {
        self.op(Op::JoinPointEntryMethod, vec![body])
    }

    /// Method join point whose result type is declared up front.
    pub fn join_method_annot(&mut self, body: Expr, ty: Expr) -> Expr {
        let join = self.join_method(body);
        self.op(Op::TypeAnnot, vec![join, ty])
    }

    pub fn join_type(&mut self, body: Expr) -> Expr {
        self.op(Op::JoinPointEntryType, vec![body])
    }

    pub fn join_cuda(&mut self, body: Expr) -> Expr {
        self.op(Op::JoinPointEntryCuda, vec![body])
    }

    /// `{ field = value; ... }`.
    pub fn module(&mut self, fields: Vec<(Name, Expr)>) -> Expr {
        let (names, values): (Vec<Name>, Vec<Expr>) = fields.into_iter().unzip();
        self.op(Op::ModuleCreate(Rc::from(names)), values)
    }

    /// `module.field`.
    pub fn field(&mut self, module: Expr, field: Name) -> Expr {
        self.op(Op::ModuleOpen(field), vec![module])
    }

    pub fn pos(&mut self, value: Expr, key: PosKey) -> Expr {
        self.expr(ExprKind::Pos(Pos::new(value, key)))
    }

    pub fn pattern_expr(&mut self, pattern: Pattern) -> Expr {
        self.expr(ExprKind::Pattern(pattern))
    }

    // ── Patterns ──

    pub fn pat_wildcard(&mut self) -> Pattern {
        self.pattern(PatternKind::Wildcard)
    }

    pub fn pat_var(&mut self, name: Name) -> Pattern {
        self.pattern(PatternKind::Var(name))
    }

    pub fn pat_lit(&mut self, lit: Literal) -> Pattern {
        self.pattern(PatternKind::Lit(lit))
    }

    pub fn pat_tuple(&mut self, items: Vec<Pattern>) -> Pattern {
        self.pattern(PatternKind::Tuple(Rc::from(items)))
    }

    pub fn pat_cons(&mut self, items: Vec<Pattern>, rest: Pattern) -> Pattern {
        self.pattern(PatternKind::Cons(Rc::from(items), rest))
    }

    pub fn pat_type_eq(&mut self, inner: Pattern, ty: Expr) -> Pattern {
        self.pattern(PatternKind::TypeEq(inner, ty))
    }

    pub fn pat_active(&mut self, f: Expr, inner: Pattern) -> Pattern {
        self.pattern(PatternKind::Active(f, inner))
    }

    pub fn pat_partial_active(&mut self, f: Expr, inner: Pattern) -> Pattern {
        self.pattern(PatternKind::PartialActive(f, inner))
    }

    pub fn pat_extension_active(&mut self, f: Expr, inner: Pattern) -> Pattern {
        self.pattern(PatternKind::ExtensionActive(f, inner))
    }

    pub fn pat_or(&mut self, alternatives: Vec<Pattern>) -> Pattern {
        self.pattern(PatternKind::Or(Rc::from(alternatives)))
    }

    pub fn pat_and(&mut self, parts: Vec<Pattern>) -> Pattern {
        self.pattern(PatternKind::And(Rc::from(parts)))
    }

    pub fn pat_when(&mut self, inner: Pattern, guard: Expr) -> Pattern {
        self.pattern(PatternKind::When(inner, guard))
    }

    pub fn pat_module(&mut self, module: ModulePattern) -> Pattern {
        self.pattern(PatternKind::Module(module))
    }

    pub fn clauses(&mut self, arms: Vec<(Pattern, Expr)>) -> Pattern {
        let arms: Vec<Clause> = arms
            .into_iter()
            .map(|(pattern, body)| Clause { pattern, body })
            .collect();
        self.pattern(PatternKind::Clauses(Rc::from(arms)))
    }

    /// `match scrutinee with arms`.
    pub fn match_(&mut self, scrutinee: Expr, arms: Vec<(Pattern, Expr)>) -> Expr {
        let clauses = self.clauses(arms);
        let f = self.pattern_expr(clauses);
        self.apply(f, scrutinee)
    }

    // ── Prefiltering ──

    /// Rewrite every function literal to capture only its free variables and
    /// lower every pattern.
    pub fn prefilter(&mut self, expr: &Expr) -> Expr {
        if let Some(done) = self.prefiltered.get(&expr.symbol()) {
            return done.clone();
        }
        let result = ensure_sufficient_stack(|| self.prefilter_uncached(expr));
        self.prefiltered.insert(expr.symbol(), result.clone());
        result
    }

    fn prefilter_uncached(&mut self, expr: &Expr) -> Expr {
        match expr.value() {
            ExprKind::Var(_) | ExprKind::Lit(_) => expr.clone(),
            ExprKind::Pattern(pattern) => {
                let lowered = self.lower_pattern(pattern);
                self.prefilter(&lowered)
            }
            ExprKind::Function(core) | ExprKind::FunctionFilt(_, core) => {
                let used = self.free_var_set(expr);
                let body = self.prefilter(&core.body);
                self.expr(ExprKind::FunctionFilt(
                    used,
                    FunctionCore {
                        param: core.param,
                        body,
                    },
                ))
            }
            ExprKind::RecFunction(this, core) => {
                let body = self.prefilter(&core.body);
                self.rec_func(*this, core.param, body)
            }
            ExprKind::Tuple(items) => {
                let items = items.iter().map(|item| self.prefilter(item)).collect();
                self.tuple(items)
            }
            ExprKind::Op(op, args) => {
                let args = args.iter().map(|arg| self.prefilter(arg)).collect();
                self.op(op.clone(), args)
            }
            ExprKind::Pos(pos) => {
                let value = self.prefilter(&pos.value);
                self.pos(value, pos.key)
            }
        }
    }
}
