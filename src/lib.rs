//! Shared Z80 instruction table: the single source of truth consulted by
//! both the `zasm` assembler and the `zdis` disassembler.

pub mod reserved;
pub mod table;
pub mod types;

pub use reserved::ReservedSet;
pub use table::{InstructionDescriptor, InstructionKind, InstructionTable};
pub use types::{Byte, SByte, SWord, Word, ADDRESS_SPACE};
