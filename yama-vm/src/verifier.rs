//! Static verification of type descriptors.
//!
//! Two layers. The descriptor layer proves names and call signatures
//! well-formed: unqualified names agree with their kind, constant symbols use
//! the declaring parcel's aliases, and every call-signature index points at a
//! type constant. The bytecode layer symbolically executes the body over its
//! control-flow graph and proves every reachable instruction register- and
//! type-safe, so the interpreter never re-checks.

use std::collections::VecDeque;
use std::sync::Arc;

use itertools::Itertools;
use yama_asm::{Code, ConstId, Instr, RegId};

use crate::callsig::CallSig;
use crate::const_table::ConstTableInfo;
use crate::consts::BUILTIN_HEAD;
use crate::debug::{post_signal, post_with, DebugCat, DebugSink};
use crate::dsignal::DSignal;
use crate::error::VerifyError;
use crate::kind::{Kind, PType};
use crate::module::ModuleInfo;
use crate::parcel::ParcelMetadata;
use crate::qname::{split_qualified, split_unqualified};
use crate::type_info::TypeInfo;

/// The static verifier. Pure with respect to the descriptors it inspects;
/// failures surface both as a typed error and as fine-grained signals on the
/// debug sink.
pub struct Verifier {
    dbg: Option<Arc<dyn DebugSink>>,
}

impl Verifier {
    /// Creates a verifier posting signals to `dbg`.
    pub fn new(dbg: Option<Arc<dyn DebugSink>>) -> Self {
        Self { dbg }
    }

    /// Verifies every descriptor of a module, including the member/owner
    /// relation only a whole module can prove.
    pub fn verify_module(
        &self,
        module: &ModuleInfo,
        md: &ParcelMetadata,
        head: &str,
    ) -> Result<(), VerifyError> {
        for info in module.types() {
            if let Some(owner) = info.owner_name() {
                if !module.contains(owner) {
                    return Err(self.fail(
                        DSignal::VerifTypeOwnerNotInModule,
                        format!(
                            "member type `{}` has no owner `{owner}` in its module",
                            info.unqualified_name()
                        ),
                    ));
                }
            }
            self.verify_type(info, md, head)?;
        }
        Ok(())
    }

    /// Verifies a single descriptor against the metadata of the parcel that
    /// declares it, installed under `head`.
    pub fn verify_type(
        &self,
        info: &TypeInfo,
        md: &ParcelMetadata,
        head: &str,
    ) -> Result<(), VerifyError> {
        post_with(&self.dbg, DebugCat::VERIF, || {
            format!("verifying `{head}:{}`", info.unqualified_name())
        });
        self.check_unqualified_name(info)?;
        if let Some(callsig) = info.callsig() {
            self.check_callsig(info.consts(), callsig).map_err(|err| {
                post_signal(&self.dbg, DSignal::VerifTypeCallsigInvalid);
                err
            })?;
        }
        for (index, entry) in info.consts().entries().iter().enumerate() {
            if let Some(symbol) = entry.qualified_name() {
                self.check_const_symbol(md, index, symbol, entry.kind())?;
            }
            if let Some(callsig) = entry.callsig() {
                self.check_callsig(info.consts(), callsig).map_err(|err| {
                    post_signal(&self.dbg, DSignal::VerifConstCallsigInvalid);
                    err
                })?;
            }
        }
        if let Some(code) = info.bcode() {
            self.verify_bcode(info, code, md)?;
        }
        Ok(())
    }

    fn fail(&self, signal: DSignal, detail: impl Into<String>) -> VerifyError {
        let err = VerifyError::new(signal, detail);
        post_signal(&self.dbg, signal);
        post_with(&self.dbg, DebugCat::VERIF, || err.to_string());
        err
    }

    fn check_unqualified_name(&self, info: &TypeInfo) -> Result<(), VerifyError> {
        let name = info.unqualified_name();
        let invalid = |detail: String| self.fail(DSignal::VerifTypeUnqualifiedNameInvalid, detail);
        match split_unqualified(name) {
            None => Err(invalid(format!("`{name}` is not a legal type name"))),
            Some((Some(_), _)) if !info.kind().uses_owner_prefix() => Err(invalid(format!(
                "`{name}` carries an owner prefix but is a {}",
                info.kind()
            ))),
            Some((None, _)) if info.kind().uses_owner_prefix() => Err(invalid(format!(
                "`{name}` is a {} and needs an owner prefix",
                info.kind()
            ))),
            Some(_) => Ok(()),
        }
    }

    fn check_const_symbol(
        &self,
        md: &ParcelMetadata,
        index: usize,
        symbol: &str,
        kind: Option<Kind>,
    ) -> Result<(), VerifyError> {
        let invalid = |detail: String| self.fail(DSignal::VerifConstQualifiedNameInvalid, detail);
        let Some(q) = split_qualified(symbol) else {
            return Err(invalid(format!("constant {index}: malformed name `{symbol}`")));
        };
        if !md.is_self_or_dep_name(q.head) {
            return Err(invalid(format!(
                "constant {index}: `{}` is not `{}` or a declared dep name",
                q.head,
                md.self_name()
            )));
        }
        let wants_owner = kind.map(|k| k.uses_owner_prefix()).unwrap_or(false);
        if q.owner.is_some() != wants_owner {
            return Err(invalid(format!(
                "constant {index}: owner prefix of `{symbol}` disagrees with its kind"
            )));
        }
        Ok(())
    }

    fn check_callsig(
        &self,
        consts: &ConstTableInfo,
        callsig: &CallSig,
    ) -> Result<(), VerifyError> {
        for &param in callsig.params() {
            match consts.konst(param) {
                None => {
                    return Err(self.fail(
                        DSignal::VerifCallsigParamOutOfBounds,
                        format!("callsig param index k{param} is out of bounds"),
                    ))
                }
                Some(entry) if !entry.is_type_const() => {
                    return Err(self.fail(
                        DSignal::VerifCallsigParamNotTypeConst,
                        format!("callsig param index k{param} is not a type constant"),
                    ))
                }
                Some(_) => (),
            }
        }
        match consts.konst(callsig.ret()) {
            None => Err(self.fail(
                DSignal::VerifCallsigReturnOutOfBounds,
                format!("callsig return index k{} is out of bounds", callsig.ret()),
            )),
            Some(entry) if !entry.is_type_const() => Err(self.fail(
                DSignal::VerifCallsigReturnNotTypeConst,
                format!("callsig return index k{} is not a type constant", callsig.ret()),
            )),
            Some(_) => Ok(()),
        }
    }

    fn verify_bcode(
        &self,
        info: &TypeInfo,
        code: &Code,
        md: &ParcelMetadata,
    ) -> Result<(), VerifyError> {
        if code.is_empty() {
            return Err(self.fail(
                DSignal::VerifBinaryIsEmpty,
                format!("`{}` has an empty bytecode body", info.unqualified_name()),
            ));
        }
        self.check_static(info, code)?;
        Analysis::new(self, info, code, md.self_name()).run()
    }

    /// Frame-independent checks, applied to reachable and unreachable
    /// instructions alike.
    fn check_static(&self, info: &TypeInfo, code: &Code) -> Result<(), VerifyError> {
        let consts = info.consts();
        for (pc, instr) in code.instrs().iter().enumerate() {
            match *instr {
                Instr::PutConst { konst, .. } => {
                    self.check_object_const(consts, pc, konst)?;
                }
                Instr::PutTypeConst { konst, .. } | Instr::DefaultInit { konst, .. } => {
                    self.check_type_const(consts, pc, konst)?;
                }
                Instr::PutArg { arg, .. } => {
                    let arg_count = 1 + info.callsig().map(|sig| sig.params().len()).unwrap_or(0);
                    if arg as usize >= arg_count {
                        return Err(self.fail(
                            DSignal::VerifArgOutOfBounds,
                            format!("{pc}: argument a{arg} is out of bounds"),
                        ));
                    }
                }
                _ => (),
            }
            if let Some(offset) = instr.branch_offset() {
                if code.branch_target(pc, offset).is_none() {
                    return Err(self.fail(
                        DSignal::VerifBranchTargetOutOfBounds,
                        format!("{pc}: branch target is outside the body"),
                    ));
                }
            }
        }
        // Exactly the final instruction can fall off the end; everything
        // before it has an in-bounds fallthrough by construction.
        if let Some(last) = code.instrs().last() {
            if last.falls_through() {
                return Err(self.fail(
                    DSignal::VerifFallsOffFinalInstr,
                    format!("{}: control falls off the final instruction", code.len() - 1),
                ));
            }
        }
        Ok(())
    }

    fn check_object_const(
        &self,
        consts: &ConstTableInfo,
        pc: usize,
        konst: ConstId,
    ) -> Result<(), VerifyError> {
        match consts.konst(konst) {
            None => Err(self.fail(
                DSignal::VerifObjectConstOutOfBounds,
                format!("{pc}: constant k{konst} is out of bounds"),
            )),
            Some(entry) if !entry.is_object_const() => Err(self.fail(
                DSignal::VerifNotAnObjectConst,
                format!("{pc}: constant k{konst} is not an object constant"),
            )),
            Some(_) => Ok(()),
        }
    }

    fn check_type_const(
        &self,
        consts: &ConstTableInfo,
        pc: usize,
        konst: ConstId,
    ) -> Result<(), VerifyError> {
        match consts.konst(konst) {
            None => Err(self.fail(
                DSignal::VerifTypeConstOutOfBounds,
                format!("{pc}: constant k{konst} is out of bounds"),
            )),
            Some(entry) if !entry.is_type_const() => Err(self.fail(
                DSignal::VerifNotATypeConst,
                format!("{pc}: constant k{konst} is not a type constant"),
            )),
            Some(_) => Ok(()),
        }
    }
}

/// The symbolic register type: a qualified name. The lattice is flat; two
/// distinct names disagree, with no subtyping and no widening.
///
/// Scalar-valued instructions produce the built-in primitives' canonical
/// names (`yama:Int` and friends), which is also how well-formed modules
/// address them in their constant tables.
type VType = String;

fn prim_vtype(ptype: PType) -> VType {
    format!("{BUILTIN_HEAD}:{}", ptype.name())
}

/// Worklist fix-point over the control-flow graph: a map from instruction
/// index to its abstract incoming frame (per-register types). Seeded at the
/// entry with the empty frame; a merge at a join point requires frames to
/// agree exactly.
struct Analysis<'a> {
    verifier: &'a Verifier,
    info: &'a TypeInfo,
    code: &'a Code,
    self_name: &'a str,
    max_locals: usize,
    frames: Vec<Option<Vec<VType>>>,
    worklist: VecDeque<usize>,
}

impl<'a> Analysis<'a> {
    fn new(verifier: &'a Verifier, info: &'a TypeInfo, code: &'a Code, self_name: &'a str) -> Self {
        Self {
            verifier,
            info,
            code,
            self_name,
            max_locals: info.max_locals(),
            frames: vec![None; code.len()],
            worklist: VecDeque::new(),
        }
    }

    fn run(mut self) -> Result<(), VerifyError> {
        self.frames[0] = Some(Vec::new());
        self.worklist.push_back(0);
        while let Some(pc) = self.worklist.pop_front() {
            self.step(pc)?;
        }
        Ok(())
    }

    fn fail(&self, signal: DSignal, detail: impl Into<String>) -> VerifyError {
        self.verifier.fail(signal, detail)
    }

    fn step(&mut self, pc: usize) -> Result<(), VerifyError> {
        let mut frame = self
            .frames
            .get(pc)
            .cloned()
            .flatten()
            .unwrap_or_default();
        let instr = match self.code.get(pc) {
            Some(instr) => *instr,
            None => return Ok(()),
        };
        match instr {
            Instr::Noop => self.flow(pc, frame),
            Instr::Pop { n } => {
                let keep = frame.len().saturating_sub(n as usize);
                frame.truncate(keep);
                self.flow(pc, frame)
            }
            Instr::PutNone { dst, reinit } => {
                self.write(
                    &mut frame,
                    pc,
                    dst,
                    prim_vtype(PType::None),
                    reinit,
                    DSignal::VerifDestWrongType,
                )?;
                self.flow(pc, frame)
            }
            Instr::PutConst { dst, konst, reinit } => {
                let vtype = self.object_const_vtype(konst);
                self.write(
                    &mut frame,
                    pc,
                    dst,
                    vtype,
                    reinit,
                    DSignal::VerifDestAndConstTypesDiffer,
                )?;
                self.flow(pc, frame)
            }
            Instr::PutTypeConst { dst, reinit, .. } => {
                self.write(
                    &mut frame,
                    pc,
                    dst,
                    prim_vtype(PType::Type),
                    reinit,
                    DSignal::VerifDestWrongType,
                )?;
                self.flow(pc, frame)
            }
            Instr::PutArg { dst, arg, reinit } => {
                let vtype = self.arg_vtype(arg);
                self.write(
                    &mut frame,
                    pc,
                    dst,
                    vtype,
                    reinit,
                    DSignal::VerifDestAndArgTypesDiffer,
                )?;
                self.flow(pc, frame)
            }
            Instr::Copy { src, dst, reinit } => {
                let vtype = match src.index().and_then(|i| frame.get(i)) {
                    Some(vtype) => vtype.clone(),
                    None => {
                        return Err(self.fail(
                            DSignal::VerifSrcOutOfBounds,
                            format!("{pc}: source register {src} does not exist"),
                        ))
                    }
                };
                self.write(
                    &mut frame,
                    pc,
                    dst,
                    vtype,
                    reinit,
                    DSignal::VerifDestAndSrcTypesDiffer,
                )?;
                self.flow(pc, frame)
            }
            Instr::DefaultInit { dst, konst, reinit } => {
                let vtype = self.type_const_vtype(konst);
                self.write(
                    &mut frame,
                    pc,
                    dst,
                    vtype,
                    reinit,
                    DSignal::VerifDestAndTypeConstTypesDiffer,
                )?;
                self.flow(pc, frame)
            }
            Instr::Call { args, dst, reinit } => {
                let ret = self.check_call(&mut frame, pc, args)?;
                self.write(&mut frame, pc, dst, ret, reinit, DSignal::VerifDestWrongType)?;
                self.flow(pc, frame)
            }
            Instr::CallNr { args } => {
                self.check_call(&mut frame, pc, args)?;
                self.flow(pc, frame)
            }
            Instr::Ret { src } => {
                // The returned object's type is deliberately unchecked; only
                // the register itself must exist.
                if src.index().map(|i| i >= frame.len()).unwrap_or(true) {
                    return Err(self.fail(
                        DSignal::VerifSrcOutOfBounds,
                        format!("{pc}: return register {src} does not exist"),
                    ));
                }
                Ok(())
            }
            Instr::Jump { offset } => {
                let target = self.target(pc, offset);
                self.merge(target, frame)
            }
            Instr::JumpTrue { pops, offset } | Instr::JumpFalse { pops, offset } => {
                match frame.last() {
                    None => {
                        return Err(self.fail(
                            DSignal::VerifTopDoesNotExist,
                            format!("{pc}: conditional branch on an empty frame"),
                        ))
                    }
                    Some(top) if *top != prim_vtype(PType::Bool) => {
                        return Err(self.fail(
                            DSignal::VerifTopWrongType,
                            format!("{pc}: conditional branch on `{top}`"),
                        ))
                    }
                    Some(_) => (),
                }
                let keep = frame.len().saturating_sub(pops as usize);
                frame.truncate(keep);
                let target = self.target(pc, offset);
                self.merge(target, frame.clone())?;
                self.merge(pc + 1, frame)
            }
        }
    }

    /// Propagates `frame` to the fallthrough successor.
    fn flow(&mut self, pc: usize, frame: Vec<VType>) -> Result<(), VerifyError> {
        self.merge(pc + 1, frame)
    }

    /// Merges `frame` into the abstract incoming frame at `pc`. The lattice
    /// is flat, so a merge either agrees exactly or fails.
    fn merge(&mut self, pc: usize, frame: Vec<VType>) -> Result<(), VerifyError> {
        match &self.frames[pc] {
            None => {
                self.frames[pc] = Some(frame);
                self.worklist.push_back(pc);
                Ok(())
            }
            Some(existing) if *existing == frame => Ok(()),
            Some(existing) => {
                let diff = existing
                    .iter()
                    .zip(frame.iter())
                    .positions(|(a, b)| a != b)
                    .map(|i| format!("r{i}"))
                    .join(", ");
                Err(self.fail(
                    DSignal::VerifViolatesRegisterCoherence,
                    if diff.is_empty() {
                        format!("{pc}: register counts disagree between control paths")
                    } else {
                        format!("{pc}: register types disagree between control paths ({diff})")
                    },
                ))
            }
        }
    }

    /// Statically-validated branch target; `check_static` proved it exists.
    fn target(&self, pc: usize, offset: i16) -> usize {
        self.code.branch_target(pc, offset).unwrap_or(0)
    }

    fn write(
        &self,
        frame: &mut Vec<VType>,
        pc: usize,
        dst: RegId,
        vtype: VType,
        reinit: bool,
        mismatch: DSignal,
    ) -> Result<(), VerifyError> {
        match dst.index() {
            // A newtop destination is always a fresh register, so the
            // reinit flag has nothing to relax there.
            None => {
                if frame.len() >= self.max_locals {
                    return Err(self.fail(
                        DSignal::VerifPushingOverflows,
                        format!("{pc}: pushing would exceed {} locals", self.max_locals),
                    ));
                }
                frame.push(vtype);
                Ok(())
            }
            Some(index) => match frame.get_mut(index) {
                None => Err(self.fail(
                    DSignal::VerifDestOutOfBounds,
                    format!("{pc}: destination register r{index} does not exist"),
                )),
                Some(slot) if !reinit && *slot != vtype => Err(self.fail(
                    mismatch,
                    format!("{pc}: r{index} holds `{slot}` but `{vtype}` is written"),
                )),
                Some(slot) => {
                    *slot = vtype;
                    Ok(())
                }
            },
        }
    }

    /// The type a `put_const` writes; `check_static` proved the entry an
    /// object constant.
    fn object_const_vtype(&self, konst: ConstId) -> VType {
        use crate::const_table::ConstInfo;
        match self.info.consts().konst(konst) {
            Some(ConstInfo::Int(_)) => prim_vtype(PType::Int),
            Some(ConstInfo::UInt(_)) => prim_vtype(PType::UInt),
            Some(ConstInfo::Float(_)) => prim_vtype(PType::Float),
            Some(ConstInfo::Bool(_)) => prim_vtype(PType::Bool),
            Some(ConstInfo::Char(_)) => prim_vtype(PType::Char),
            _ => prim_vtype(PType::None),
        }
    }

    /// The type a `default_init` writes; `check_static` proved the entry a
    /// type constant.
    fn type_const_vtype(&self, konst: ConstId) -> VType {
        self.info
            .consts()
            .konst(konst)
            .and_then(|entry| entry.qualified_name())
            .map(str::to_string)
            .unwrap_or_else(|| prim_vtype(PType::None))
    }

    /// The type a `put_arg` writes: the callable itself for argument 0, the
    /// declared parameter type otherwise. `check_static` proved the index.
    fn arg_vtype(&self, arg: u16) -> VType {
        if arg == 0 {
            return format!("{}:{}", self.self_name, self.info.unqualified_name());
        }
        self.info
            .callsig()
            .and_then(|sig| sig.params().get(arg as usize - 1))
            .and_then(|&konst| self.info.consts().konst(konst))
            .and_then(|entry| entry.qualified_name())
            .map(str::to_string)
            .unwrap_or_else(|| prim_vtype(PType::None))
    }

    /// Validates a call's argument region against the callee's signature and
    /// pops it, returning the callee's declared return type.
    fn check_call(
        &self,
        frame: &mut Vec<VType>,
        pc: usize,
        args: u16,
    ) -> Result<VType, VerifyError> {
        let args = args as usize;
        if args == 0 {
            return Err(self.fail(
                DSignal::VerifCallArgsEmpty,
                format!("{pc}: a call needs at least a callable"),
            ));
        }
        if args > frame.len() {
            return Err(self.fail(
                DSignal::VerifCallArgsOutOfBounds,
                format!("{pc}: argument registers exceed the frame"),
            ));
        }
        let callee_at = frame.len() - args;
        let callee = frame[callee_at].clone();
        let Some(callsig) = self.callable_sig(&callee) else {
            return Err(self.fail(
                DSignal::VerifCallObjNotCallable,
                format!("{pc}: `{callee}` is not a callable type"),
            ));
        };
        if callsig.params().len() != args - 1 {
            return Err(self.fail(
                DSignal::VerifCallWrongArgCount,
                format!(
                    "{pc}: `{callee}` takes {} arguments, {} are laid out",
                    callsig.params().len(),
                    args - 1
                ),
            ));
        }
        for (i, &param) in callsig.params().iter().enumerate() {
            let expected = self.type_const_vtype(param);
            let actual = &frame[callee_at + 1 + i];
            if *actual != expected {
                return Err(self.fail(
                    DSignal::VerifCallWrongArgTypes,
                    format!(
                        "{pc}: argument {} of `{callee}` is `{actual}`, not `{expected}`",
                        i + 1
                    ),
                ));
            }
        }
        let ret = self.type_const_vtype(callsig.ret());
        frame.truncate(callee_at);
        Ok(ret)
    }

    /// The symbolic call signature of the callable named `vtype`, found
    /// through this descriptor's own constant table.
    fn callable_sig(&self, vtype: &str) -> Option<&CallSig> {
        self.info.consts().entries().iter().find_map(|entry| {
            (entry.qualified_name() == Some(vtype)
                && entry.kind().map(|k| k.is_callable()).unwrap_or(false))
            .then(|| entry.callsig())
            .flatten()
        })
    }
}
