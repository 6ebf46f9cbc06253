//! Yama VM implementation: domain/loader, static verifier and execution
//! context.
//!
//! Modules flow through the system in one direction: a [`ModuleFactory`]
//! produces a [`ModuleInfo`], a [`Parcel`] ships it, an [`InstallBatch`]
//! installs it into a [`Domain`], and [`Domain::load`] verifies and links
//! individual descriptors into [`Type`] handles that a [`Context`] can push
//! and call.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod callsig;
pub mod compiler;
pub mod const_table;
pub mod consts;
pub mod context;
pub mod debug;
pub mod domain;
pub mod dsignal;
pub mod error;
pub mod kind;
pub mod module;
pub mod parcel;
mod qname;
pub mod ty;
pub mod type_info;
pub mod value;
pub mod verifier;

pub use callsig::CallSig;
pub use compiler::{CompileDiagnostic, Compiler, SourceLoc, SourceText};
pub use const_table::{ConstInfo, ConstTable, ConstTableInfo};
pub use consts::{MAX_CALL_FRAMES, USER_MAX_LOCALS};
pub use context::Context;
pub use debug::{DebugCat, DebugSink, SignalCounter, StderrSink};
pub use domain::{Domain, DomainConfig};
pub use dsignal::DSignal;
pub use error::{CmdResult, InstallError, LoadError, Panicked, VerifyError};
pub use kind::{Kind, PType, KINDS, PTYPES};
pub use module::{ModuleFactory, ModuleInfo};
pub use parcel::{InstallBatch, Parcel, ParcelMetadata};
pub use ty::Type;
pub use type_info::{CallBody, NativeFn, TypeInfo};
pub use value::Value;
pub use verifier::Verifier;

// Re-export the sibling crates the public API is built from.
#[doc(no_inline)]
pub use yama_asm;
#[doc(no_inline)]
pub use yama_types;
