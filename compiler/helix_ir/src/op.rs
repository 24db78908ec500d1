//! Primitive operations.
//!
//! `Op` is closed: the evaluator gives every variant exactly one typing rule.
//! Variants that carry data (field names, tuple indices, kinds) are still
//! single operations; the data is part of the operation's identity.

use std::fmt;
use std::rc::Rc;

use crate::Name;

/// Which specialization table a join point belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinPointKind {
    /// A method: a specialized function called by value.
    Method,
    /// The body of a first-class runtime closure.
    Closure,
    /// A type-level computation; produces a type, never a function.
    Type,
    /// An accelerator kernel.
    Cuda,
}

impl JoinPointKind {
    pub const ALL: [JoinPointKind; 4] = [Self::Method, Self::Closure, Self::Type, Self::Cuda];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Closure => "closure",
            Self::Type => "type",
            Self::Cuda => "cuda",
        }
    }
}

/// Physical representation a module or closure is committed to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutKind {
    Stack,
    PackedStack,
    Heap,
    HeapMutable,
}

impl LayoutKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::PackedStack => "packed_stack",
            Self::Heap => "heap",
            Self::HeapMutable => "heap_mut",
        }
    }
}

/// Storage class of an array.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayKind {
    /// Host heap array.
    Heap,
    /// Host single-element reference cell.
    Reference,
    CudaGlobal,
    CudaShared,
    CudaLocal,
}

impl ArrayKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Heap => "array",
            Self::Reference => "ref",
            Self::CudaGlobal => "cuda_global",
            Self::CudaShared => "cuda_shared",
            Self::CudaLocal => "cuda_local",
        }
    }
}

/// A primitive operation.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Op {
    // Control
    Apply,
    If,
    Case,
    TypeAnnot,
    Dynamize,
    PatternMiss,
    ErrorType,

    // Join points
    JoinPointEntryMethod,
    JoinPointEntryType,
    JoinPointEntryCuda,
    ClosureCreate,

    // Arithmetic
    Add,
    Sub,
    Mult,
    Div,
    Mod,

    // Comparison
    LT,
    LTE,
    EQ,
    NEQ,
    GT,
    GTE,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,

    // Unary
    Neg,
    Not,
    BitNot,
    Sqrt,
    Log,
    Exp,

    /// Numeric conversion: `[type; value]`.
    Convert,

    // Tuples
    TupleLengthEq(u32),
    TupleLengthGe(u32),
    TupleIndex(u32),
    TupleSlice(u32),

    // Modules
    ModuleCreate(Rc<[Name]>),
    ModuleWith(Rc<[Name]>),
    ModuleWithout(Rc<[Name]>),
    ModuleOpen(Name),
    ModuleHasMember(Name),
    ModuleMap,
    ModuleFold,
    /// Runtime read of one field of a module-typed variable.
    MapGetField(Name),

    // Layouts
    LayoutTo(LayoutKind),
    /// Runtime read of the n-th captured value of a layout-typed variable.
    LayoutIndex(u32),

    // Arrays and references
    ArrayCreate(ArrayKind),
    ArrayLength,
    ArrayIndex,
    ArraySet,
    ReferenceCreate,
    ReferenceGet,
    ReferenceSet,

    // Types
    TypeGet,
    TypeUnion,
    TypeLitCreate,
    EqType,
    TypeMacroHost,
    TypeMacroAccel,

    // Foreign text escapes
    MacroHost,
    MacroAccel,
}

impl Op {
    /// Whether a runtime application of this op has no side effects, so equal
    /// applications may share one result.
    pub fn is_pure(&self) -> bool {
        matches!(
            self,
            Op::Add
                | Op::Sub
                | Op::Mult
                | Op::Div
                | Op::Mod
                | Op::LT
                | Op::LTE
                | Op::EQ
                | Op::NEQ
                | Op::GT
                | Op::GTE
                | Op::BitAnd
                | Op::BitOr
                | Op::BitXor
                | Op::ShiftLeft
                | Op::ShiftRight
                | Op::Neg
                | Op::Not
                | Op::BitNot
                | Op::Sqrt
                | Op::Log
                | Op::Exp
                | Op::Convert
                | Op::TupleIndex(_)
                | Op::TupleSlice(_)
                | Op::MapGetField(_)
                | Op::ArrayLength
        )
    }

    pub fn is_binary_arith(&self) -> bool {
        matches!(self, Op::Add | Op::Sub | Op::Mult | Op::Div | Op::Mod)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Op::LT | Op::LTE | Op::EQ | Op::NEQ | Op::GT | Op::GTE
        )
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            Op::BitAnd | Op::BitOr | Op::BitXor | Op::ShiftLeft | Op::ShiftRight
        )
    }

    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Op::Neg | Op::Not | Op::BitNot | Op::Sqrt | Op::Log | Op::Exp
        )
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Apply => "apply",
            Op::If => "if",
            Op::Case => "case",
            Op::TypeAnnot => "type_annot",
            Op::Dynamize => "dyn",
            Op::PatternMiss => "pattern_miss",
            Op::ErrorType => "error_type",
            Op::JoinPointEntryMethod => "join",
            Op::JoinPointEntryType => "join_type",
            Op::JoinPointEntryCuda => "join_cuda",
            Op::ClosureCreate => "closure",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mult => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::LT => "<",
            Op::LTE => "<=",
            Op::EQ => "==",
            Op::NEQ => "!=",
            Op::GT => ">",
            Op::GTE => ">=",
            Op::BitAnd => "&&&",
            Op::BitOr => "|||",
            Op::BitXor => "^^^",
            Op::ShiftLeft => "<<<",
            Op::ShiftRight => ">>>",
            Op::Neg => "negate",
            Op::Not => "not",
            Op::BitNot => "bit_not",
            Op::Sqrt => "sqrt",
            Op::Log => "log",
            Op::Exp => "exp",
            Op::Convert => "convert",
            Op::TupleLengthEq(_) => "tuple_length_eq",
            Op::TupleLengthGe(_) => "tuple_length_ge",
            Op::TupleIndex(_) => "tuple_index",
            Op::TupleSlice(_) => "tuple_slice",
            Op::ModuleCreate(_) => "module_create",
            Op::ModuleWith(_) => "module_with",
            Op::ModuleWithout(_) => "module_without",
            Op::ModuleOpen(_) => "module_open",
            Op::ModuleHasMember(_) => "module_has_member",
            Op::ModuleMap => "module_map",
            Op::ModuleFold => "module_fold",
            Op::MapGetField(_) => "map_get_field",
            Op::LayoutTo(_) => "layout_to",
            Op::LayoutIndex(_) => "layout_index",
            Op::ArrayCreate(_) => "array_create",
            Op::ArrayLength => "array_length",
            Op::ArrayIndex => "array_index",
            Op::ArraySet => "array_set",
            Op::ReferenceCreate => "ref_create",
            Op::ReferenceGet => "ref_get",
            Op::ReferenceSet => "ref_set",
            Op::TypeGet => "type_get",
            Op::TypeUnion => "type_union",
            Op::TypeLitCreate => "type_lit",
            Op::EqType => "eq_type",
            Op::TypeMacroHost => "type_macro_host",
            Op::TypeMacroAccel => "type_macro_accel",
            Op::MacroHost => "macro_host",
            Op::MacroAccel => "macro_accel",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
