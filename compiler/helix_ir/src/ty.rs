//! Types.
//!
//! Types are plain values compared structurally, with one exception:
//! [`Ty::Rec`] names a recursive type by the join-point key that produced it
//! and is compared nominally. This is what keeps recursive types finite.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{
    ArrayKind, EnvTerm, FunctionCore, JoinPointKey, LayoutKind, Literal, Name, PrimitiveType,
};

/// Field types of a module or captured-variable types of a closure.
pub type TyEnv = BTreeMap<Name, Ty>;

/// What an evaluated map value is.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum MapKind {
    Function(FunctionCore),
    /// A function bound under a name so its body can call itself.
    RecFunction(Name, FunctionCore),
    Module,
}

/// One piece of a foreign-type escape.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum MacroPart {
    Text(Rc<str>),
    Type(Ty),
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Ty {
    Prim(PrimitiveType),
    /// Tuple of types; the empty tuple is the unit type.
    List(Rc<[Ty]>),
    /// A value lifted to the type level.
    Lit(Literal),
    /// Type of an evaluated function or module: its kind plus the types of
    /// what it holds.
    Map(Rc<TyEnv>, MapKind),
    /// A module or closure committed to a physical layout. The environment
    /// holds canonically renamed variables, one per runtime field.
    Layout(LayoutKind, EnvTerm, MapKind),
    /// First-class runtime closure: domain then range.
    Closure(Rc<Ty>, Rc<Ty>),
    /// Sorted, deduplicated members.
    Union(Rc<[Ty]>),
    /// Back-reference to the recursive type produced by a type join point.
    Rec(JoinPointKey),
    Array(ArrayKind, Rc<Ty>),
    HostMacro(Rc<[MacroPart]>),
    AccelMacro(Rc<[MacroPart]>),
}

impl Ty {
    /// The empty tuple.
    pub fn unit() -> Ty {
        Ty::List(Rc::from(Vec::new()))
    }

    pub const fn bool() -> Ty {
        Ty::Prim(PrimitiveType::Bool)
    }

    pub fn tuple(elements: Vec<Ty>) -> Ty {
        Ty::List(Rc::from(elements))
    }

    /// Build a union, flattening nested unions.
    ///
    /// A union with a single distinct member is that member.
    pub fn union(members: impl IntoIterator<Item = Ty>) -> Ty {
        let mut flat = Vec::new();
        for member in members {
            match member {
                Ty::Union(inner) => flat.extend(inner.iter().cloned()),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        if flat.len() == 1 {
            if let Some(only) = flat.pop() {
                return only;
            }
        }
        Ty::Union(Rc::from(flat))
    }

    /// Whether values of this type carry no runtime data.
    ///
    /// Such values are represented by the type alone.
    pub fn is_unit(&self) -> bool {
        match self {
            Ty::Lit(_) => true,
            Ty::List(elements) => elements.iter().all(Ty::is_unit),
            Ty::Map(env, _) => env.values().all(Ty::is_unit),
            _ => false,
        }
    }

    pub fn as_prim(&self) -> Option<PrimitiveType> {
        match self {
            Ty::Prim(p) => Some(*p),
            _ => None,
        }
    }

    pub fn union_members(&self) -> Option<&[Ty]> {
        match self {
            Ty::Union(members) => Some(members),
            _ => None,
        }
    }

    /// Whether `Rec(key)` occurs anywhere inside this type.
    pub fn mentions_rec(&self, key: &JoinPointKey) -> bool {
        match self {
            Ty::Rec(k) => k == key,
            Ty::Prim(_) | Ty::Lit(_) => false,
            Ty::List(elements) | Ty::Union(elements) => {
                elements.iter().any(|t| t.mentions_rec(key))
            }
            Ty::Map(env, _) => env.values().any(|t| t.mentions_rec(key)),
            Ty::Layout(_, env, _) => env
                .canonicalize()
                .values()
                .any(|v| v.ty().mentions_rec(key)),
            Ty::Closure(dom, range) => dom.mentions_rec(key) || range.mentions_rec(key),
            Ty::Array(_, elem) => elem.mentions_rec(key),
            Ty::HostMacro(parts) | Ty::AccelMacro(parts) => parts.iter().any(|part| match part {
                MacroPart::Type(t) => t.mentions_rec(key),
                MacroPart::Text(_) => false,
            }),
        }
    }
}
