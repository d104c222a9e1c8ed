//! Deferred operand resolution, applied once pass-1 has assigned every
//! label its final address.
//!
//! Each `Fixup` carries its own expression tokens directly, rather than an
//! index/length slice into the owning line's token list, so pass-2 doesn't
//! need to keep the originating `AsmLine`'s full token list around.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupKind {
    /// A plain byte operand (`DB`, or an instruction's byte-immediate slot).
    Byte,
    /// A little-endian word operand (`DW`, or an instruction's word slot).
    Word,
    /// A signed 8-bit PC-relative displacement (`JR`/`DJNZ` targets).
    Rel8,
}

#[derive(Debug, Clone)]
pub struct Fixup {
    /// Byte offset within the line's opcode buffer where the value lands.
    pub offset: usize,
    /// Number of bytes the placeholder occupies (1 for `Byte`/`Rel8`, 2 for `Word`).
    pub size: u8,
    pub kind: FixupKind,
    pub expr_tokens: Vec<String>,
}
