//! Classification of type descriptors.

use core::fmt;

/// Number of descriptor kinds.
pub const KINDS: usize = 4;

/// Number of built-in primitive types.
pub const PTYPES: usize = 7;

/// The kind of a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// A built-in scalar type.
    Primitive,
    /// A free callable.
    Function,
    /// A callable member of an owner type; its unqualified name carries the
    /// `Owner::Name` form.
    Method,
    /// A named structure type.
    Struct,
}

impl Kind {
    /// Whether instances of this kind can be called.
    pub const fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }

    /// Whether unqualified names of this kind carry an `Owner::` prefix.
    pub const fn uses_owner_prefix(&self) -> bool {
        matches!(self, Self::Method)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primitive => "primitive",
            Self::Function => "function",
            Self::Method => "method",
            Self::Struct => "struct",
        };
        f.write_str(name)
    }
}

/// Tag of a built-in primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PType {
    /// The stateless unit type.
    None,
    /// Signed 64-bit integers.
    Int,
    /// Unsigned 64-bit integers.
    UInt,
    /// IEEE-754 64-bit floats.
    Float,
    /// Booleans.
    Bool,
    /// 32-bit characters.
    Char,
    /// First-class references to loaded types.
    Type,
}

impl PType {
    /// The primitive's unqualified name inside the built-in parcel.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Int => "Int",
            Self::UInt => "UInt",
            Self::Float => "Float",
            Self::Bool => "Bool",
            Self::Char => "Char",
            Self::Type => "Type",
        }
    }
}

impl fmt::Display for PType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
