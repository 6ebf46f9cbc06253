//! Fine-grained diagnostic signals.
//!
//! Every distinct verifier or compiler failure mode raises its own signal, so
//! tooling and tests can assert on the exact cause rather than on message
//! text.

use crate::debug::DebugCat;

/// A fine-grained diagnostic signal code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)] // variant names are the documentation
pub enum DSignal {
    // Verifier, descriptor layer.
    VerifTypeUnqualifiedNameInvalid,
    VerifTypeOwnerNotInModule,
    VerifTypeCallsigInvalid,
    VerifConstQualifiedNameInvalid,
    VerifConstCallsigInvalid,
    VerifCallsigParamOutOfBounds,
    VerifCallsigParamNotTypeConst,
    VerifCallsigReturnOutOfBounds,
    VerifCallsigReturnNotTypeConst,

    // Verifier, bytecode layer.
    VerifBinaryIsEmpty,
    VerifBranchTargetOutOfBounds,
    VerifFallsOffFinalInstr,
    VerifViolatesRegisterCoherence,
    VerifPushingOverflows,
    VerifDestOutOfBounds,
    VerifDestWrongType,
    VerifSrcOutOfBounds,
    VerifTopDoesNotExist,
    VerifTopWrongType,
    VerifObjectConstOutOfBounds,
    VerifNotAnObjectConst,
    VerifTypeConstOutOfBounds,
    VerifNotATypeConst,
    VerifArgOutOfBounds,
    VerifCallArgsEmpty,
    VerifCallArgsOutOfBounds,
    VerifCallObjNotCallable,
    VerifCallWrongArgCount,
    VerifCallWrongArgTypes,
    VerifDestAndSrcTypesDiffer,
    VerifDestAndConstTypesDiffer,
    VerifDestAndTypeConstTypesDiffer,
    VerifDestAndArgTypesDiffer,

    // Compiler.
    CompileSyntaxError,
    CompileNameConflict,
    CompileUndeclaredName,
    CompileNotAType,
    CompileInvalidLocalVar,
    CompileNonlocalVar,
    CompileTypeMismatch,
    CompileNonassignableExpr,
    CompileInvalidOperation,
    CompileNumericOverflow,
    CompileNumericUnderflow,
    CompileIllegalUnicode,
    CompileWrongArgCount,
    CompileNoReturnStmt,
    CompileLocalFn,
    CompileInvalidParamList,
    CompileNotInLoop,
    CompileNotAnExpr,
}

impl DSignal {
    /// The debug category this signal is posted under.
    pub const fn category(&self) -> DebugCat {
        if (*self as u32) < (Self::CompileSyntaxError as u32) {
            DebugCat::VERIF
        } else {
            DebugCat::COMPILE
        }
    }
}
