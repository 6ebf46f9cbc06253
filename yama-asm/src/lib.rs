//! Instruction set of the Yama VM.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod code;
mod instr;
mod opcode;

pub use code::Code;
pub use instr::{ConstId, Instr, RegId, NEWTOP};
pub use opcode::Opcode;

/// Number of distinct opcodes in the instruction set.
pub const OPCODES: usize = 14;
