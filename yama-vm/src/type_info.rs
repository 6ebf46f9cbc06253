//! Type descriptors: the immutable records the compiler (or host code)
//! produces and the domain verifies, links and loads.

use core::fmt;
use std::sync::Arc;

use yama_asm::Code;

use crate::callsig::CallSig;
use crate::const_table::ConstTableInfo;
use crate::context::Context;
use crate::error::CmdResult;
use crate::kind::{Kind, PType};

/// A registered host call function.
///
/// Runs synchronously on the calling thread with the execution context as
/// sole argument. The returned [`CmdResult`] only drives early exit; the
/// context's own panic state is authoritative.
pub type NativeFn = Arc<dyn Fn(&mut Context) -> CmdResult + Send + Sync>;

/// What happens when a callable is invoked: interpret a bytecode body, or
/// run registered host code.
#[derive(Clone)]
pub enum CallBody {
    /// Interpret this bytecode body.
    Bcode(Code),
    /// Invoke this host function.
    Native(NativeFn),
}

impl CallBody {
    /// Wraps a host function.
    pub fn native(f: impl Fn(&mut Context) -> CmdResult + Send + Sync + 'static) -> Self {
        Self::Native(Arc::new(f))
    }

    /// Wraps a bytecode body.
    pub fn bcode(code: Code) -> Self {
        Self::Bcode(code)
    }

    /// The bytecode body, if this is not host code.
    pub fn code(&self) -> Option<&Code> {
        match self {
            Self::Bcode(code) => Some(code),
            Self::Native(_) => None,
        }
    }
}

impl fmt::Debug for CallBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bcode(code) => f.debug_tuple("Bcode").field(&code.len()).finish(),
            Self::Native(_) => f.debug_tuple("Native").finish(),
        }
    }
}

/// Kind-specific payload of a descriptor.
#[derive(Debug, Clone)]
enum Info {
    Primitive {
        ptype: PType,
    },
    Function {
        callsig: CallSig,
        max_locals: usize,
        call: CallBody,
    },
    Method {
        callsig: CallSig,
        max_locals: usize,
        call: CallBody,
    },
    Struct,
}

/// An immutable type descriptor.
///
/// Carries everything the verifier and loader need: the unqualified name
/// (with an `Owner::` prefix iff the kind is method), the constant table,
/// and the kind payload: a call signature, register budget and call body
/// for callables, or a primitive tag.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    unqualified_name: String,
    consts: ConstTableInfo,
    info: Info,
}

impl TypeInfo {
    /// Describes a primitive type.
    pub fn primitive(name: impl Into<String>, consts: ConstTableInfo, ptype: PType) -> Self {
        Self {
            unqualified_name: name.into(),
            consts,
            info: Info::Primitive { ptype },
        }
    }

    /// Describes a function type.
    pub fn function(
        name: impl Into<String>,
        consts: ConstTableInfo,
        callsig: CallSig,
        max_locals: usize,
        call: CallBody,
    ) -> Self {
        Self {
            unqualified_name: name.into(),
            consts,
            info: Info::Function {
                callsig,
                max_locals,
                call,
            },
        }
    }

    /// Describes a method type. `name` carries the `Owner::Name` form.
    pub fn method(
        name: impl Into<String>,
        consts: ConstTableInfo,
        callsig: CallSig,
        max_locals: usize,
        call: CallBody,
    ) -> Self {
        Self {
            unqualified_name: name.into(),
            consts,
            info: Info::Method {
                callsig,
                max_locals,
                call,
            },
        }
    }

    /// Describes a struct type.
    pub fn strukt(name: impl Into<String>, consts: ConstTableInfo) -> Self {
        Self {
            unqualified_name: name.into(),
            consts,
            info: Info::Struct,
        }
    }

    /// The descriptor's unqualified name.
    pub fn unqualified_name(&self) -> &str {
        &self.unqualified_name
    }

    /// The descriptor's constant table.
    pub fn consts(&self) -> &ConstTableInfo {
        &self.consts
    }

    /// The descriptor's kind.
    pub fn kind(&self) -> Kind {
        match self.info {
            Info::Primitive { .. } => Kind::Primitive,
            Info::Function { .. } => Kind::Function,
            Info::Method { .. } => Kind::Method,
            Info::Struct => Kind::Struct,
        }
    }

    /// The primitive tag, for primitives.
    pub fn ptype(&self) -> Option<PType> {
        match self.info {
            Info::Primitive { ptype } => Some(ptype),
            _ => None,
        }
    }

    /// The call signature, for callables.
    pub fn callsig(&self) -> Option<&CallSig> {
        match &self.info {
            Info::Function { callsig, .. } | Info::Method { callsig, .. } => Some(callsig),
            _ => None,
        }
    }

    /// The register budget of one call frame, for callables; zero otherwise.
    pub fn max_locals(&self) -> usize {
        match self.info {
            Info::Function { max_locals, .. } | Info::Method { max_locals, .. } => max_locals,
            _ => 0,
        }
    }

    /// The call body, for callables.
    pub fn call(&self) -> Option<&CallBody> {
        match &self.info {
            Info::Function { call, .. } | Info::Method { call, .. } => Some(call),
            _ => None,
        }
    }

    /// The bytecode body, for bytecode callables.
    pub fn bcode(&self) -> Option<&Code> {
        self.call().and_then(CallBody::code)
    }

    /// The `Owner` part of a member type's unqualified name.
    pub fn owner_name(&self) -> Option<&str> {
        self.unqualified_name.split_once("::").map(|(owner, _)| owner)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.unqualified_name)
    }
}
