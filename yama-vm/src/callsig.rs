//! Symbolic call signatures.

use core::fmt;

use yama_asm::ConstId;

/// A call signature: parameter and return types as indices of type constants
/// in the enclosing constant table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallSig {
    params: Vec<ConstId>,
    ret: ConstId,
}

impl CallSig {
    /// Creates a signature from parameter constant-indices and a return
    /// constant-index.
    pub fn new(params: Vec<ConstId>, ret: ConstId) -> Self {
        Self { params, ret }
    }

    /// Parameter type constant-indices, in declaration order.
    pub fn params(&self) -> &[ConstId] {
        &self.params
    }

    /// Return type constant-index.
    pub fn ret(&self) -> ConstId {
        self.ret
    }
}

impl fmt::Display for CallSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "k{param}")?;
        }
        write!(f, ") -> k{}", self.ret)
    }
}
