//! Two-pass Z80 assembler.
//!
//! Source text goes in, a flat list of laid-out, fully-resolved
//! [`AsmLine`]s comes out; [`emit::to_binary`] turns those into the final
//! byte image. See [`Assembler::assemble`] for the pipeline itself.

pub mod assembler;
pub mod directives;
pub mod emit;
pub mod encode;
pub mod error;
pub mod expr;
pub mod fixup;
pub mod symtab;
pub mod tokenizer;

pub use assembler::{AsmLine, Assembler};
pub use error::{Error, ErrorKind, Result};
pub use fixup::{Fixup, FixupKind};

pub use z80::ReservedSet;
