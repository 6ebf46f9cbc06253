//! Loaded type handles.

use core::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use yama_asm::ConstId;

use crate::callsig::CallSig;
use crate::const_table::ConstTable;
use crate::kind::{Kind, PType};
use crate::type_info::{CallBody, TypeInfo};

struct Inner {
    fullname: String,
    info: Arc<TypeInfo>,
    // One slot per constant-table entry; `Some` for resolved type constants.
    // Written exactly once when the loader freezes the handle; cycles close
    // because the handle exists before its slots do.
    resolved: OnceLock<Box<[Option<Type>]>>,
}

/// A shared, stable handle to a verified and linked type descriptor.
///
/// Handles are canonical per domain: two handles compare equal iff they
/// refer to the same loaded descriptor.
#[derive(Clone)]
pub struct Type(Arc<Inner>);

impl Type {
    pub(crate) fn new(fullname: impl Into<String>, info: Arc<TypeInfo>) -> Self {
        Self(Arc::new(Inner {
            fullname: fullname.into(),
            info,
            resolved: OnceLock::new(),
        }))
    }

    /// Freezes the resolved type-constant slots. Single-shot.
    pub(crate) fn freeze(&self, slots: Vec<Option<Type>>) {
        let _ = self.0.resolved.set(slots.into_boxed_slice());
    }

    /// The fully qualified `head:unqualified` name.
    pub fn fullname(&self) -> &str {
        &self.0.fullname
    }

    /// The underlying descriptor.
    pub fn info(&self) -> &TypeInfo {
        &self.0.info
    }

    /// The descriptor's unqualified name.
    pub fn unqualified_name(&self) -> &str {
        self.0.info.unqualified_name()
    }

    /// The descriptor's kind.
    pub fn kind(&self) -> Kind {
        self.0.info.kind()
    }

    /// The primitive tag, for primitives.
    pub fn ptype(&self) -> Option<PType> {
        self.0.info.ptype()
    }

    /// Whether values of this type can be called.
    pub fn is_callable(&self) -> bool {
        self.kind().is_callable()
    }

    /// The symbolic call signature, for callables.
    pub fn callsig(&self) -> Option<&CallSig> {
        self.0.info.callsig()
    }

    /// The register budget of one call frame, for callables.
    pub fn max_locals(&self) -> usize {
        self.0.info.max_locals()
    }

    /// The call body, for callables.
    pub(crate) fn call(&self) -> Option<&CallBody> {
        self.0.info.call()
    }

    /// The linked constant table.
    pub fn consts(&self) -> ConstTable<'_> {
        ConstTable::new(self)
    }

    /// The handle the type constant at `index` resolved to.
    pub fn resolved_const(&self, index: usize) -> Option<Type> {
        self.0
            .resolved
            .get()
            .and_then(|slots| slots.get(index))
            .and_then(Option::clone)
    }

    /// The resolved type of callable parameter `index`.
    pub fn param_type(&self, index: usize) -> Option<Type> {
        let konst = *self.callsig()?.params().get(index)?;
        self.resolved_const(konst as usize)
    }

    /// Number of callable parameters.
    pub fn param_count(&self) -> usize {
        self.callsig().map(|sig| sig.params().len()).unwrap_or(0)
    }

    /// The resolved return type of a callable.
    pub fn return_type(&self) -> Option<Type> {
        let konst: ConstId = self.callsig()?.ret();
        self.resolved_const(konst as usize)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fullname())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.fullname())
    }
}
