//! Typed intermediate representation.
//!
//! This is what the evaluator produces. Every composite node stores its
//! result type, so [`TypedExpr::ty`] never recurses further than one level
//! into tuples and maps.

use std::fmt;
use std::rc::Rc;

use crate::{EnvMap, EnvTerm, Expr, JoinPointKind, Literal, MapKind, Node, Op, Trace, Ty};

/// A runtime variable identity, unique within one specialized body.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Tag(u32);

impl Tag {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Tag(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A tagged runtime variable together with its type.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TyTag {
    pub tag: Tag,
    pub ty: Ty,
}

impl TyTag {
    pub fn new(tag: Tag, ty: Ty) -> Self {
        TyTag { tag, ty }
    }
}

/// Monotonic tag counter.
#[derive(Clone, Debug, Default)]
pub struct TagGen {
    next: u32,
}

impl TagGen {
    /// A counter whose first tag is `start`.
    pub const fn starting_at(start: u32) -> Self {
        TagGen { next: start }
    }

    /// # Panics
    /// Panics if the counter wraps.
    #[expect(
        clippy::expect_used,
        reason = "every tag names a distinct IR variable; u32::MAX of them cannot be built"
    )]
    pub fn fresh(&mut self) -> Tag {
        let tag = Tag(self.next);
        self.next = self.next.checked_add(1).expect("tag counter overflow");
        tag
    }

    /// The tag the next call to [`TagGen::fresh`] returns.
    pub const fn peek(&self) -> Tag {
        Tag(self.next)
    }
}

/// Identity of a specialization: the code plus its consed captures.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct JoinPointKeyData {
    pub body: Expr,
    pub env: Node<EnvMap>,
}

/// Interned join-point key.
pub type JoinPointKey = Node<JoinPointKeyData>;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct LetNode {
    pub bind: TyTag,
    pub bound: TypedExpr,
    pub rest: TypedExpr,
    pub ty: Ty,
    pub trace: Trace,
}

/// A statement executed for its effect.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct StateNode {
    pub stmt: TypedExpr,
    pub rest: TypedExpr,
    pub ty: Ty,
    pub trace: Trace,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct OpNode {
    pub op: Op,
    pub args: Rc<[TypedExpr]>,
    pub ty: Ty,
}

/// Call of a specialized body. `args` are the caller's tags, aligned with the
/// body's parameters.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct JoinPointCall {
    pub key: JoinPointKey,
    pub kind: JoinPointKind,
    pub args: Rc<[TyTag]>,
    pub ty: Ty,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum TypedExpr {
    /// A value with no runtime data, represented by its type.
    Type(Ty),
    Var(TyTag),
    Tuple(Rc<[TypedExpr]>),
    /// An evaluated function or module.
    Map(EnvTerm, MapKind),
    /// A value injected into a union or recursive type.
    Box(Rc<TypedExpr>, Ty),
    Lit(Literal),
    Let(Rc<LetNode>),
    State(Rc<StateNode>),
    Op(Rc<OpNode>),
    JoinPoint(Rc<JoinPointCall>),
}

impl TypedExpr {
    pub fn unit() -> Self {
        TypedExpr::Tuple(Rc::from(Vec::new()))
    }

    /// The value of a type with no runtime data.
    ///
    /// Tuples and maps are rebuilt so they can be indexed and applied; any
    /// other type is its own value.
    pub fn from_unit_type(ty: &Ty) -> Self {
        match ty {
            Ty::List(items) => TypedExpr::Tuple(items.iter().map(TypedExpr::from_unit_type).collect()),
            Ty::Map(env, kind) => TypedExpr::Map(
                EnvTerm::plain(
                    env.iter()
                        .map(|(name, ty)| (*name, TypedExpr::from_unit_type(ty)))
                        .collect(),
                ),
                kind.clone(),
            ),
            _ => TypedExpr::Type(ty.clone()),
        }
    }

    pub fn var(tag: Tag, ty: Ty) -> Self {
        TypedExpr::Var(TyTag::new(tag, ty))
    }

    pub fn tuple(elements: Vec<TypedExpr>) -> Self {
        TypedExpr::Tuple(Rc::from(elements))
    }

    pub fn op(op: Op, args: Vec<TypedExpr>, ty: Ty) -> Self {
        TypedExpr::Op(Rc::new(OpNode {
            op,
            args: Rc::from(args),
            ty,
        }))
    }

    /// `let bind = bound in rest`.
    pub fn let_in(bind: TyTag, bound: TypedExpr, rest: TypedExpr, trace: Trace) -> Self {
        let ty = rest.ty();
        TypedExpr::Let(Rc::new(LetNode {
            bind,
            bound,
            rest,
            ty,
            trace,
        }))
    }

    /// `stmt; rest`.
    pub fn state(stmt: TypedExpr, rest: TypedExpr, trace: Trace) -> Self {
        let ty = rest.ty();
        TypedExpr::State(Rc::new(StateNode {
            stmt,
            rest,
            ty,
            trace,
        }))
    }

    /// Type of this node.
    ///
    /// Composite nodes return their stored type. Value nodes (tuples and
    /// maps) carry no type field; theirs is rebuilt from the stored types of
    /// their fields, one level deep.
    pub fn ty(&self) -> Ty {
        match self {
            TypedExpr::Type(ty) | TypedExpr::Box(_, ty) => ty.clone(),
            TypedExpr::Var(var) => var.ty.clone(),
            TypedExpr::Tuple(elements) => Ty::List(elements.iter().map(TypedExpr::ty).collect()),
            TypedExpr::Map(env, kind) => Ty::Map(
                Rc::new(env.bindings().map(|(name, value)| (name, value.ty())).collect()),
                kind.clone(),
            ),
            TypedExpr::Lit(lit) => Ty::Prim(lit.ty()),
            TypedExpr::Let(node) => node.ty.clone(),
            TypedExpr::State(node) => node.ty.clone(),
            TypedExpr::Op(node) => node.ty.clone(),
            TypedExpr::JoinPoint(node) => node.ty.clone(),
        }
    }

    pub fn as_lit(&self) -> Option<&Literal> {
        match self {
            TypedExpr::Lit(lit) => Some(lit),
            TypedExpr::Type(Ty::Lit(lit)) => Some(lit),
            _ => None,
        }
    }

    /// Statically known boolean.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_lit().and_then(Literal::as_bool)
    }

    pub fn as_var(&self) -> Option<&TyTag> {
        match self {
            TypedExpr::Var(var) => Some(var),
            _ => None,
        }
    }

    /// The final expression after any `let`/statement prefix.
    pub fn tail(&self) -> &TypedExpr {
        let mut expr = self;
        loop {
            match expr {
                TypedExpr::Let(node) => expr = &node.rest,
                TypedExpr::State(node) => expr = &node.rest,
                _ => return expr,
            }
        }
    }

    /// Whether this expression ends in a pattern-miss placeholder.
    pub fn ends_in_pattern_miss(&self) -> bool {
        matches!(self.tail(), TypedExpr::Op(node) if node.op == Op::PatternMiss)
    }

    /// Whether the value is known at compile time.
    pub fn is_static(&self) -> bool {
        match self {
            TypedExpr::Type(_) | TypedExpr::Lit(_) | TypedExpr::Map(..) => true,
            TypedExpr::Tuple(elements) => elements.iter().all(TypedExpr::is_static),
            _ => false,
        }
    }
}

/// Type derivation.
pub fn type_of(expr: &TypedExpr) -> Ty {
    expr.ty()
}
