//! Free-variable analysis.
//!
//! Results are in order of first use, which fixes the parameter order of
//! specialized bodies. Each node is analyzed once; a parent combines the
//! cached lists of its children.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::stack::ensure_sufficient_stack;
use crate::{AstContext, Expr, ExprKind, FreeVars, Name};

type NameBuf = SmallVec<[Name; 8]>;

fn push_unique(out: &mut NameBuf, names: &[Name], bound: &[Name]) {
    for name in names {
        if !bound.contains(name) && !out.contains(name) {
            out.push(*name);
        }
    }
}

impl AstContext {
    /// Names free in `expr`, in order of first use.
    pub fn free_vars(&mut self, expr: &Expr) -> Rc<[Name]> {
        if let Some(cached) = self.free_vars.get(&expr.symbol()) {
            return Rc::clone(cached);
        }
        let result = ensure_sufficient_stack(|| self.compute_free_vars(expr));
        self.free_vars.insert(expr.symbol(), Rc::clone(&result));
        result
    }

    /// Names free in `expr`, sorted.
    pub fn free_var_set(&mut self, expr: &Expr) -> FreeVars {
        let mut names = self.free_vars(expr).to_vec();
        names.sort_unstable();
        Rc::from(names)
    }

    fn compute_free_vars(&mut self, expr: &Expr) -> Rc<[Name]> {
        let mut out = NameBuf::new();
        match expr.value() {
            ExprKind::Var(name) => out.push(*name),
            ExprKind::Lit(_) => {}
            ExprKind::Pattern(pattern) => {
                let lowered = self.lower_pattern(pattern);
                return self.free_vars(&lowered);
            }
            ExprKind::Function(core) | ExprKind::FunctionFilt(_, core) => {
                let body = self.free_vars(&core.body);
                push_unique(&mut out, &body, &[core.param]);
            }
            ExprKind::RecFunction(this, core) => {
                let body = self.free_vars(&core.body);
                push_unique(&mut out, &body, &[*this, core.param]);
            }
            ExprKind::Tuple(items) | ExprKind::Op(_, items) => {
                for item in items.iter() {
                    let names = self.free_vars(item);
                    push_unique(&mut out, &names, &[]);
                }
            }
            ExprKind::Pos(pos) => return self.free_vars(&pos.value),
        }
        Rc::from(out.as_slice())
    }
}
