//! The compiler interface.
//!
//! The source-language front-end lives outside this crate; the VM consumes
//! it through this contract: text in, a module (which must still pass the
//! verifier before loading) or a list of diagnostics out.

use core::fmt;

use crate::domain::Domain;
use crate::dsignal::DSignal;
use crate::module::ModuleInfo;

/// A named piece of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    /// Display name of the source (a path, usually).
    pub name: String,
    /// The text itself.
    pub text: String,
}

impl SourceText {
    /// Creates a named source.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A position within a source text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One compilation diagnostic: a fine-grained signal plus where it arose.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{loc}: {signal}: {message}")]
pub struct CompileDiagnostic {
    /// The fine-grained failure signal (one of the `Compile*` codes).
    pub signal: DSignal,
    /// Where the failure arose.
    pub loc: SourceLoc,
    /// Human-readable context.
    pub message: String,
}

impl CompileDiagnostic {
    /// Creates a diagnostic.
    pub fn new(signal: DSignal, loc: SourceLoc, message: impl Into<String>) -> Self {
        Self {
            signal,
            loc,
            message: message.into(),
        }
    }
}

/// A source-language front-end.
///
/// Implementations lower `src` into a module against a read-only view of the
/// domain's installed parcels. No partial module is ever emitted: the result
/// is the whole module or the list of diagnostics.
pub trait Compiler: Send + Sync {
    /// Compiles `src` into a module.
    fn compile(&self, src: &SourceText, dm: &Domain) -> Result<ModuleInfo, Vec<CompileDiagnostic>>;
}
