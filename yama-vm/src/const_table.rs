//! Constant tables: the indexed pool of object and type constants consumed
//! by bytecode and call signatures.

use core::fmt;

use yama_asm::ConstId;
use yama_types::{fmt_char, fmt_float, Bool, Char, Float, Int, UInt};

use crate::callsig::CallSig;
use crate::kind::Kind;
use crate::ty::Type;
use crate::value::Value;

/// One entry of an unlinked constant table.
///
/// Exactly nine kinds: five object constants (scalar literals embedded in
/// the table) and four type constants (symbolic references to other types).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstInfo {
    /// An embedded [`Int`] literal.
    Int(Int),
    /// An embedded [`UInt`] literal.
    UInt(UInt),
    /// An embedded [`Float`] literal.
    Float(Float),
    /// An embedded [`Bool`] literal.
    Bool(Bool),
    /// An embedded [`Char`] literal.
    Char(Char),
    /// A reference to a primitive type, by qualified name.
    PrimitiveType(String),
    /// A reference to a function type: qualified name plus its symbolic call
    /// signature (indices into the same table).
    FunctionType(String, CallSig),
    /// A reference to a method type: qualified name plus its symbolic call
    /// signature (indices into the same table).
    MethodType(String, CallSig),
    /// A reference to a struct type, by qualified name.
    StructType(String),
}

impl ConstInfo {
    /// Whether this entry embeds an object (a scalar literal).
    pub const fn is_object_const(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::UInt(_) | Self::Float(_) | Self::Bool(_) | Self::Char(_)
        )
    }

    /// Whether this entry references a type symbolically.
    pub const fn is_type_const(&self) -> bool {
        !self.is_object_const()
    }

    /// The referenced type's qualified name, for type constants.
    pub fn qualified_name(&self) -> Option<&str> {
        match self {
            Self::PrimitiveType(name)
            | Self::FunctionType(name, _)
            | Self::MethodType(name, _)
            | Self::StructType(name) => Some(name),
            _ => None,
        }
    }

    /// The symbolic call signature, for function and method type constants.
    pub fn callsig(&self) -> Option<&CallSig> {
        match self {
            Self::FunctionType(_, callsig) | Self::MethodType(_, callsig) => Some(callsig),
            _ => None,
        }
    }

    /// The referenced type's kind, for type constants.
    pub const fn kind(&self) -> Option<Kind> {
        match self {
            Self::PrimitiveType(_) => Some(Kind::Primitive),
            Self::FunctionType(..) => Some(Kind::Function),
            Self::MethodType(..) => Some(Kind::Method),
            Self::StructType(_) => Some(Kind::Struct),
            _ => None,
        }
    }

    /// The embedded scalar as a value, for object constants.
    pub fn object(&self) -> Option<Value> {
        match *self {
            Self::Int(v) => Some(Value::Int(v)),
            Self::UInt(v) => Some(Value::UInt(v)),
            Self::Float(v) => Some(Value::Float(v)),
            Self::Bool(v) => Some(Value::Bool(v)),
            Self::Char(v) => Some(Value::Char(v)),
            _ => None,
        }
    }
}

impl fmt::Display for ConstInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "int {v}"),
            Self::UInt(v) => write!(f, "uint {v}u"),
            Self::Float(v) => write!(f, "float {}", fmt_float(*v)),
            Self::Bool(v) => write!(f, "bool {v}"),
            Self::Char(v) => write!(f, "char '{}'", fmt_char(*v)),
            Self::PrimitiveType(name) => write!(f, "primitive type {name}"),
            Self::FunctionType(name, callsig) => write!(f, "function type {name} [{callsig}]"),
            Self::MethodType(name, callsig) => write!(f, "method type {name} [{callsig}]"),
            Self::StructType(name) => write!(f, "struct type {name}"),
        }
    }
}

/// An unlinked constant table, built by chaining `add_*` methods and sealed
/// by handing it to a type descriptor.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstTableInfo {
    entries: Vec<ConstInfo>,
}

impl ConstTableInfo {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `index`.
    pub fn get(&self, index: usize) -> Option<&ConstInfo> {
        self.entries.get(index)
    }

    /// The entry a bytecode operand refers to.
    pub fn konst(&self, id: ConstId) -> Option<&ConstInfo> {
        self.get(id as usize)
    }

    /// All entries in index order.
    pub fn entries(&self) -> &[ConstInfo] {
        &self.entries
    }

    fn add(mut self, entry: ConstInfo) -> Self {
        self.entries.push(entry);
        self
    }

    /// Appends an [`Int`] object constant.
    pub fn add_int(self, v: Int) -> Self {
        self.add(ConstInfo::Int(v))
    }

    /// Appends a [`UInt`] object constant.
    pub fn add_uint(self, v: UInt) -> Self {
        self.add(ConstInfo::UInt(v))
    }

    /// Appends a [`Float`] object constant.
    pub fn add_float(self, v: Float) -> Self {
        self.add(ConstInfo::Float(v))
    }

    /// Appends a [`Bool`] object constant.
    pub fn add_bool(self, v: Bool) -> Self {
        self.add(ConstInfo::Bool(v))
    }

    /// Appends a [`Char`] object constant.
    pub fn add_char(self, v: Char) -> Self {
        self.add(ConstInfo::Char(v))
    }

    /// Appends a primitive type constant.
    pub fn add_primitive_type(self, qualified_name: impl Into<String>) -> Self {
        self.add(ConstInfo::PrimitiveType(qualified_name.into()))
    }

    /// Appends a function type constant.
    pub fn add_function_type(self, qualified_name: impl Into<String>, callsig: CallSig) -> Self {
        self.add(ConstInfo::FunctionType(qualified_name.into(), callsig))
    }

    /// Appends a method type constant.
    pub fn add_method_type(self, qualified_name: impl Into<String>, callsig: CallSig) -> Self {
        self.add(ConstInfo::MethodType(qualified_name.into(), callsig))
    }

    /// Appends a struct type constant.
    pub fn add_struct_type(self, qualified_name: impl Into<String>) -> Self {
        self.add(ConstInfo::StructType(qualified_name.into()))
    }
}

/// The linked constant table of a loaded type: entry access plus the type
/// handles its type constants resolved to.
#[derive(Debug, Clone, Copy)]
pub struct ConstTable<'a> {
    owner: &'a Type,
}

impl<'a> ConstTable<'a> {
    pub(crate) fn new(owner: &'a Type) -> Self {
        Self { owner }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.owner.info().consts().len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The unlinked entry at `index`.
    pub fn get(&self, index: usize) -> Option<&'a ConstInfo> {
        self.owner.info().consts().get(index)
    }

    /// The resolved handle of the type constant at `index`.
    pub fn ty(&self, index: usize) -> Option<Type> {
        self.owner.resolved_const(index)
    }

    /// The embedded value of the object constant at `index`.
    pub fn object(&self, index: usize) -> Option<Value> {
        self.get(index)?.object()
    }
}
