//! Literal constants and their primitive types.
//!
//! Floats are stored as raw bits so literals can be hashed, ordered and used
//! inside interned nodes.

use std::fmt;
use std::rc::Rc;

/// Nominal primitive type of a literal.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Bool,
    String,
    Char,
}

impl PrimitiveType {
    pub const fn is_signed_int(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_int(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn is_numeric(self) -> bool {
        self.is_int() || self.is_float()
    }

    /// Surface name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::UInt8 => "u8",
            Self::UInt16 => "u16",
            Self::UInt32 => "u32",
            Self::UInt64 => "u64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Char => "char",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A literal constant.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    /// `f32` stored as bits.
    Float32(u32),
    /// `f64` stored as bits.
    Float64(u64),
    Bool(bool),
    String(Rc<str>),
    Char(char),
}

impl Literal {
    pub fn f32(value: f32) -> Self {
        Literal::Float32(value.to_bits())
    }

    pub fn f64(value: f64) -> Self {
        Literal::Float64(value.to_bits())
    }

    pub fn string(value: &str) -> Self {
        Literal::String(Rc::from(value))
    }

    /// The literal's primitive type.
    pub const fn ty(&self) -> PrimitiveType {
        match self {
            Literal::Int8(_) => PrimitiveType::Int8,
            Literal::Int16(_) => PrimitiveType::Int16,
            Literal::Int32(_) => PrimitiveType::Int32,
            Literal::Int64(_) => PrimitiveType::Int64,
            Literal::UInt8(_) => PrimitiveType::UInt8,
            Literal::UInt16(_) => PrimitiveType::UInt16,
            Literal::UInt32(_) => PrimitiveType::UInt32,
            Literal::UInt64(_) => PrimitiveType::UInt64,
            Literal::Float32(_) => PrimitiveType::Float32,
            Literal::Float64(_) => PrimitiveType::Float64,
            Literal::Bool(_) => PrimitiveType::Bool,
            Literal::String(_) => PrimitiveType::String,
            Literal::Char(_) => PrimitiveType::Char,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer literals widened to `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Literal::Int8(v) => Some(i128::from(v)),
            Literal::Int16(v) => Some(i128::from(v)),
            Literal::Int32(v) => Some(i128::from(v)),
            Literal::Int64(v) => Some(i128::from(v)),
            Literal::UInt8(v) => Some(i128::from(v)),
            Literal::UInt16(v) => Some(i128::from(v)),
            Literal::UInt32(v) => Some(i128::from(v)),
            Literal::UInt64(v) => Some(i128::from(v)),
            _ => None,
        }
    }

    /// Float literals widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Literal::Float32(bits) => Some(f64::from(f32::from_bits(bits))),
            Literal::Float64(bits) => Some(f64::from_bits(bits)),
            _ => None,
        }
    }

    /// Build an integer literal of type `ty`, if `value` fits.
    pub fn int_of(ty: PrimitiveType, value: i128) -> Option<Literal> {
        Some(match ty {
            PrimitiveType::Int8 => Literal::Int8(i8::try_from(value).ok()?),
            PrimitiveType::Int16 => Literal::Int16(i16::try_from(value).ok()?),
            PrimitiveType::Int32 => Literal::Int32(i32::try_from(value).ok()?),
            PrimitiveType::Int64 => Literal::Int64(i64::try_from(value).ok()?),
            PrimitiveType::UInt8 => Literal::UInt8(u8::try_from(value).ok()?),
            PrimitiveType::UInt16 => Literal::UInt16(u16::try_from(value).ok()?),
            PrimitiveType::UInt32 => Literal::UInt32(u32::try_from(value).ok()?),
            PrimitiveType::UInt64 => Literal::UInt64(u64::try_from(value).ok()?),
            _ => return None,
        })
    }

    /// Build a float literal of type `ty`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "narrowing to f32 is the conversion being requested"
    )]
    pub fn float_of(ty: PrimitiveType, value: f64) -> Option<Literal> {
        match ty {
            PrimitiveType::Float32 => Some(Literal::f32(value as f32)),
            PrimitiveType::Float64 => Some(Literal::f64(value)),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int8(v) => write!(f, "{v}i8"),
            Literal::Int16(v) => write!(f, "{v}i16"),
            Literal::Int32(v) => write!(f, "{v}i32"),
            Literal::Int64(v) => write!(f, "{v}"),
            Literal::UInt8(v) => write!(f, "{v}u8"),
            Literal::UInt16(v) => write!(f, "{v}u16"),
            Literal::UInt32(v) => write!(f, "{v}u32"),
            Literal::UInt64(v) => write!(f, "{v}u64"),
            Literal::Float32(bits) => write!(f, "{}f32", f32::from_bits(*bits)),
            Literal::Float64(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Char(c) => write!(f, "{c:?}"),
        }
    }
}
