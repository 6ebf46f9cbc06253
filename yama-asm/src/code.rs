use core::fmt;
use core::fmt::Write;

use crate::{ConstId, Instr, RegId};

/// An immutable-once-built sequence of bytecode instructions.
///
/// Built by chaining `add_*` methods, one per opcode:
///
/// ```
/// use yama_asm::{Code, NEWTOP};
///
/// let code = Code::new()
///     .add_put_const(NEWTOP, 1, false)
///     .add_ret(0);
/// assert_eq!(code.len(), 2);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Code {
    instrs: Vec<Instr>,
}

impl Code {
    /// Creates an empty instruction sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Whether the sequence holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// The instruction at program counter `pc`.
    pub fn get(&self, pc: usize) -> Option<&Instr> {
        self.instrs.get(pc)
    }

    /// All instructions in program order.
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    /// Resolves a branch at `pc` to its target program counter.
    ///
    /// Targets are relative to the *next* instruction, so an offset of `0`
    /// branches to `pc + 1`. Returns `None` if the target lies outside the
    /// instruction sequence.
    pub fn branch_target(&self, pc: usize, offset: i16) -> Option<usize> {
        let target = (pc as i64).checked_add(1)?.checked_add(offset as i64)?;
        if target < 0 || target as usize >= self.instrs.len() {
            None
        } else {
            Some(target as usize)
        }
    }

    /// Renders one instruction per line, with program counters.
    pub fn fmt_disassembly(&self) -> String {
        let mut out = String::new();
        for (pc, instr) in self.instrs.iter().enumerate() {
            let _ = writeln!(out, "{pc:>4}: {instr}");
        }
        out
    }

    fn add(mut self, instr: Instr) -> Self {
        self.instrs.push(instr);
        self
    }

    /// Appends a `noop`.
    pub fn add_noop(self) -> Self {
        self.add(Instr::Noop)
    }

    /// Appends a `pop` of `n` registers.
    pub fn add_pop(self, n: u16) -> Self {
        self.add(Instr::Pop { n })
    }

    /// Appends a `put_none` writing to `dst`.
    pub fn add_put_none(self, dst: impl Into<RegId>, reinit: bool) -> Self {
        self.add(Instr::PutNone {
            dst: dst.into(),
            reinit,
        })
    }

    /// Appends a `put_const` writing object constant `konst` to `dst`.
    pub fn add_put_const(self, dst: impl Into<RegId>, konst: ConstId, reinit: bool) -> Self {
        self.add(Instr::PutConst {
            dst: dst.into(),
            konst,
            reinit,
        })
    }

    /// Appends a `put_type_const` writing a type value for `konst` to `dst`.
    pub fn add_put_type_const(self, dst: impl Into<RegId>, konst: ConstId, reinit: bool) -> Self {
        self.add(Instr::PutTypeConst {
            dst: dst.into(),
            konst,
            reinit,
        })
    }

    /// Appends a `put_arg` copying argument `arg` to `dst`.
    pub fn add_put_arg(self, dst: impl Into<RegId>, arg: u16, reinit: bool) -> Self {
        self.add(Instr::PutArg {
            dst: dst.into(),
            arg,
            reinit,
        })
    }

    /// Appends a `copy` from `src` to `dst`.
    pub fn add_copy(self, src: impl Into<RegId>, dst: impl Into<RegId>, reinit: bool) -> Self {
        self.add(Instr::Copy {
            src: src.into(),
            dst: dst.into(),
            reinit,
        })
    }

    /// Appends a `default_init` writing the default of type constant `konst`
    /// to `dst`.
    pub fn add_default_init(self, dst: impl Into<RegId>, konst: ConstId, reinit: bool) -> Self {
        self.add(Instr::DefaultInit {
            dst: dst.into(),
            konst,
            reinit,
        })
    }

    /// Appends a `call` of the top `args` registers, writing the return value
    /// to `dst`.
    pub fn add_call(self, args: u16, dst: impl Into<RegId>, reinit: bool) -> Self {
        self.add(Instr::Call {
            args,
            dst: dst.into(),
            reinit,
        })
    }

    /// Appends a `call_nr` of the top `args` registers.
    pub fn add_call_nr(self, args: u16) -> Self {
        self.add(Instr::CallNr { args })
    }

    /// Appends a `ret` returning the value of `src`.
    pub fn add_ret(self, src: impl Into<RegId>) -> Self {
        self.add(Instr::Ret { src: src.into() })
    }

    /// Appends an unconditional `jump`.
    pub fn add_jump(self, offset: i16) -> Self {
        self.add(Instr::Jump { offset })
    }

    /// Appends a `jump_true` popping `pops` registers.
    pub fn add_jump_true(self, pops: u16, offset: i16) -> Self {
        self.add(Instr::JumpTrue { pops, offset })
    }

    /// Appends a `jump_false` popping `pops` registers.
    pub fn add_jump_false(self, pops: u16, offset: i16) -> Self {
        self.add(Instr::JumpFalse { pops, offset })
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fmt_disassembly())
    }
}
