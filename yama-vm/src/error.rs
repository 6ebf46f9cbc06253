//! Error types of the domain, verifier and execution context.

use crate::dsignal::DSignal;

/// Marker error of a VM panic.
///
/// Low-level context commands return this so host code can early-exit with
/// `?`; the authoritative panic state lives on the context itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the execution context panicked")]
pub struct Panicked;

/// Result of a low-level context command.
pub type CmdResult = Result<(), Panicked>;

/// Static verification failure, carrying the exact diagnostic signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("verification failed ({signal}): {detail}")]
pub struct VerifyError {
    /// The fine-grained failure signal.
    pub signal: DSignal,
    /// Human-readable context.
    pub detail: String,
}

impl VerifyError {
    pub(crate) fn new(signal: DSignal, detail: impl Into<String>) -> Self {
        Self {
            signal,
            detail: detail.into(),
        }
    }
}

/// Failure to apply an install batch to a domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    /// The domain already hosts a parcel under this head name.
    #[error("head `{0}` is already installed")]
    HeadAlreadyInstalled(String),
    /// The batch installs two parcels under the same head name.
    #[error("head `{0}` appears twice in the batch")]
    DuplicateHead(String),
    /// A dep mapping names an installer head not present in the batch.
    #[error("dep mapping installer `{0}` is not installed by the batch")]
    UnknownInstaller(String),
    /// A dep mapping names a dep the installer's parcel does not declare.
    #[error("parcel under `{head}` declares no dep named `{dep}`")]
    UndeclaredDep {
        /// Installing head name.
        head: String,
        /// Unknown dep name.
        dep: String,
    },
    /// A dep mapping's target head is neither installed nor in the batch.
    #[error("dep target head `{0}` is not installed")]
    UnknownTargetHead(String),
    /// A declared dep of an installed parcel was left unmapped.
    #[error("dep `{dep}` of parcel under `{head}` is not mapped")]
    UnmappedDep {
        /// Installing head name.
        head: String,
        /// Unmapped dep name.
        dep: String,
    },
    /// The domain is already bound to an execution context.
    #[error("the domain is sealed; installs must happen before any context binds")]
    Sealed,
}

/// Failure to load a type from a domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The qualified name is not `head:(Owner::)?Name` shaped.
    #[error("malformed qualified name `{0}`")]
    MalformedName(String),
    /// No parcel is installed under the name's head.
    #[error("no parcel installed under head `{0}`")]
    HeadNotFound(String),
    /// The parcel's importer produced no module for the root path.
    #[error("parcel under `{0}` has no root module")]
    ModuleNotFound(String),
    /// The module has no type of this unqualified name.
    #[error("type `{0}` not found")]
    NotFound(String),
    /// A member type's owner is missing from the same module.
    #[error("owner of member type `{0}` not found in its module")]
    OwnerNotFound(String),
    /// The descriptor failed static verification.
    #[error(transparent)]
    VerifyFailed(#[from] VerifyError),
    /// A type constant's dep alias has no mapping in the domain.
    #[error("dep alias `{alias}` of `{fullname}` is not mapped")]
    UnmappedAlias {
        /// Qualified name of the failing descriptor.
        fullname: String,
        /// Unmapped dep alias.
        alias: String,
    },
    /// A type constant resolved to a descriptor of a different kind.
    #[error("constant `{symbol}` of `{fullname}` resolved to a {actual} type")]
    ConstKindMismatch {
        /// Qualified name of the failing descriptor.
        fullname: String,
        /// The constant's qualified name.
        symbol: String,
        /// Kind the symbol actually resolved to.
        actual: crate::kind::Kind,
    },
}
